//! In-memory stand-in for the PetPulse REST backend.
//!
//! Serves the subset of `/api/v1` the client binds, with FastAPI-shaped
//! error bodies (`{"detail": "..."}`, or a list of field errors for 422).
//! Tokens are random UUIDs kept in memory; every route except login,
//! registration, streaming and AI analysis requires one.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const MOCK_TIMESTAMP: &str = "2025-01-01T00:00:00";

/// Bytes served for binary endpoints.
pub const PDF_MAGIC: &[u8] = b"%PDF-1.4\n";
pub const JPEG_FRAME: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
pub const PNG_QR: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub display_name: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub slack_channel: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: i64,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommunityPost {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub title: Option<String>,
    pub pet_id: Option<i64>,
    pub user_name: Option<String>,
    pub pet_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: i64,
    pub url: String,
    pub storage_key: String,
    pub file_size_bytes: Option<i64>,
    pub mime_type: String,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub display_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub slack_webhook_url: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub slack_channel: Option<Option<String>>,
}

#[derive(Deserialize)]
pub struct CreatePet {
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePet {
    pub name: Option<String>,
    pub species: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub breed: Option<Option<String>>,
}

#[derive(Deserialize)]
pub struct CreatePost {
    pub content: String,
    pub title: Option<String>,
    pub pet_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdatePost {
    pub content: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub pet_id: Option<Option<i64>>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct Account {
    user: User,
    password: String,
}

struct OwnedPet {
    owner_id: i64,
    pet: Pet,
    picture: Option<StoredFile>,
}

struct StoredRecord {
    pet_id: i64,
    record: MedicalRecord,
    data: Vec<u8>,
}

struct StoredFile {
    content_type: String,
    data: Vec<u8>,
}

#[derive(Default)]
pub struct Backend {
    next_id: i64,
    accounts: HashMap<i64, Account>,
    tokens: HashMap<String, i64>,
    pets: HashMap<i64, OwnedPet>,
    posts: HashMap<i64, CommunityPost>,
    records: HashMap<i64, StoredRecord>,
}

impl Backend {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn owned_pet(&self, user_id: i64, pet_id: i64) -> Result<&OwnedPet, ApiFailure> {
        self.pets
            .get(&pet_id)
            .filter(|entry| entry.owner_id == user_id)
            .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Pet not found"))
    }

    fn owned_pet_mut(&mut self, user_id: i64, pet_id: i64) -> Result<&mut OwnedPet, ApiFailure> {
        self.pets
            .get_mut(&pet_id)
            .filter(|entry| entry.owner_id == user_id)
            .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Pet not found"))
    }
}

pub type Db = Arc<RwLock<Backend>>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error response with a FastAPI-style `detail` body.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    detail: Value,
}

impl ApiFailure {
    pub fn new(status: StatusCode, detail: &str) -> Self {
        Self {
            status,
            detail: Value::String(detail.to_string()),
        }
    }

    /// 422 with a single field-level error.
    pub fn validation(field: &str, msg: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: json!([{ "loc": ["body", field], "msg": msg, "type": "value_error" }]),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Could not validate credentials")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Backend::default()));
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/users", post(create_user))
        .route("/users/me", get(me).patch(update_me))
        .route("/users/me/pets", get(my_pets))
        .route("/users/me/upcoming-events", get(upcoming_events))
        .route("/users/me/calendar/events", get(my_calendar_events))
        .route("/pets", get(list_pets).post(create_pet))
        .route("/pets/{id}", get(get_pet).patch(update_pet).delete(delete_pet))
        .route("/pets/{id}/profile-picture", get(get_profile_picture).post(upload_profile_picture))
        .route("/pets/{id}/qr-code", get(pet_qr_code))
        .route("/pets/{id}/stats/activity", get(activity_stats))
        .route("/pets/{id}/calendar/events", get(pet_calendar_events))
        .route(
            "/pets/{id}/veterinary/medical-records",
            get(list_medical_records).post(upload_medical_record),
        )
        .route(
            "/pets/{id}/veterinary/medical-records/{record_id}",
            axum::routing::delete(delete_medical_record),
        )
        .route(
            "/pets/{id}/veterinary/medical-records/{record_id}/file",
            get(medical_record_file),
        )
        .route("/community/posts", get(list_posts).post(create_post))
        .route(
            "/community/posts/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/stream/url", get(stream_url))
        .route("/stream/current-frame", get(current_frame))
        .route("/gemini/models", get(list_models))
        .route("/gemini/analyze-pet", post(analyze_pet))
        .route("/gemini/analyze-audio", post(analyze_audio))
        .route("/gemini/analyze-activity", post(analyze_activity));
    Router::new().nest("/api/v1", api).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock PetPulse backend listening");
    }
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn current_user(db: &Db, headers: &HeaderMap) -> Result<i64, ApiFailure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(ApiFailure::unauthorized)?;
    db.read()
        .await
        .tokens
        .get(token)
        .copied()
        .ok_or_else(ApiFailure::unauthorized)
}

struct Upload {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiFailure> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiFailure::new(StatusCode::BAD_REQUEST, &e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiFailure::new(StatusCode::BAD_REQUEST, &e.body_text()))?;
        debug!(%file_name, %content_type, bytes = data.len(), "received upload");
        return Ok(Upload {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }
    Err(ApiFailure::validation("file", "Field required"))
}

fn binary(content_type: &str, data: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, content_type.to_string())], data).into_response()
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ApiFailure> {
    if value.trim().is_empty() {
        return Err(ApiFailure::validation(field, "String should have at least 1 character"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Auth & users
// ---------------------------------------------------------------------------

async fn login(State(db): State<Db>, Json(input): Json<LoginRequest>) -> Result<Json<Value>, ApiFailure> {
    let mut backend = db.write().await;
    let user_id = backend
        .accounts
        .values()
        .find(|account| account.user.email == input.email && account.password == input.password)
        .map(|account| account.user.id)
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "Incorrect email or password"))?;
    let token = Uuid::new_v4().to_string();
    backend.tokens.insert(token.clone(), user_id);
    Ok(Json(json!({ "access_token": token, "token_type": "bearer" })))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Result<Json<User>, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let backend = db.read().await;
    backend
        .accounts
        .get(&user_id)
        .map(|account| Json(account.user.clone()))
        .ok_or_else(ApiFailure::unauthorized)
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), ApiFailure> {
    require_non_empty("name", &input.name)?;
    if !input.email.contains('@') {
        return Err(ApiFailure::validation("email", "value is not a valid email address"));
    }
    if input.password.chars().count() < 8 {
        return Err(ApiFailure::validation("password", "String should have at least 8 characters"));
    }
    let mut backend = db.write().await;
    if backend.accounts.values().any(|account| account.user.email == input.email) {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Email already registered"));
    }
    let id = backend.allocate_id();
    let user = User {
        id,
        name: input.name,
        email: input.email,
        display_name: None,
        slack_webhook_url: None,
        slack_channel: None,
        created_at: MOCK_TIMESTAMP.to_string(),
        updated_at: MOCK_TIMESTAMP.to_string(),
    };
    backend.accounts.insert(
        id,
        Account {
            user: user.clone(),
            password: input.password,
        },
    );
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_me(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<UpdateUser>,
) -> Result<Json<User>, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    if let Some(password) = &input.password {
        if password.chars().count() < 8 {
            return Err(ApiFailure::validation("password", "String should have at least 8 characters"));
        }
    }
    let mut backend = db.write().await;
    let account = backend
        .accounts
        .get_mut(&user_id)
        .ok_or_else(ApiFailure::unauthorized)?;
    if let Some(name) = input.name {
        account.user.name = name;
    }
    if let Some(email) = input.email {
        account.user.email = email;
    }
    if let Some(password) = input.password {
        account.password = password;
    }
    if let Some(display_name) = input.display_name {
        account.user.display_name = display_name;
    }
    if let Some(slack_webhook_url) = input.slack_webhook_url {
        account.user.slack_webhook_url = slack_webhook_url;
    }
    if let Some(slack_channel) = input.slack_channel {
        account.user.slack_channel = slack_channel;
    }
    Ok(Json(account.user.clone()))
}

async fn my_pets(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Vec<Pet>>, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let backend = db.read().await;
    let mut pets: Vec<Pet> = backend
        .pets
        .values()
        .filter(|entry| entry.owner_id == user_id)
        .map(|entry| entry.pet.clone())
        .collect();
    pets.sort_by_key(|pet| pet.id);
    Ok(Json(pets))
}

#[derive(Deserialize)]
struct LimitParams {
    #[serde(default = "default_event_limit")]
    limit: usize,
}

fn default_event_limit() -> usize {
    50
}

async fn upcoming_events(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<LimitParams>,
) -> Result<Json<Value>, ApiFailure> {
    current_user(&db, &headers).await?;
    Ok(Json(json!({ "events": [], "limit": params.limit })))
}

#[derive(Deserialize)]
struct CalendarParams {
    start: String,
    end: String,
    #[serde(default = "default_include_activity")]
    include_activity: bool,
}

fn default_include_activity() -> bool {
    true
}

async fn my_calendar_events(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<CalendarParams>,
) -> Result<Json<Value>, ApiFailure> {
    current_user(&db, &headers).await?;
    Ok(Json(calendar_body(&params)))
}

fn calendar_body(params: &CalendarParams) -> Value {
    json!({
        "start": params.start,
        "end": params.end,
        "include_activity": params.include_activity,
        "events": [],
    })
}

// ---------------------------------------------------------------------------
// Pets
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PageParams {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_page_limit")]
    limit: usize,
}

fn default_page_limit() -> usize {
    100
}

async fn list_pets(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<Pet>>, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let backend = db.read().await;
    let mut pets: Vec<Pet> = backend
        .pets
        .values()
        .filter(|entry| entry.owner_id == user_id)
        .map(|entry| entry.pet.clone())
        .collect();
    pets.sort_by_key(|pet| pet.id);
    Ok(Json(pets.into_iter().skip(page.skip).take(page.limit).collect()))
}

async fn create_pet(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreatePet>,
) -> Result<(StatusCode, Json<Pet>), ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    require_non_empty("name", &input.name)?;
    require_non_empty("species", &input.species)?;
    let mut backend = db.write().await;
    let id = backend.allocate_id();
    let pet = Pet {
        id,
        name: input.name,
        species: input.species,
        breed: input.breed,
        created_at: MOCK_TIMESTAMP.to_string(),
        updated_at: MOCK_TIMESTAMP.to_string(),
    };
    backend.pets.insert(
        id,
        OwnedPet {
            owner_id: user_id,
            pet: pet.clone(),
            picture: None,
        },
    );
    Ok((StatusCode::CREATED, Json(pet)))
}

async fn get_pet(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Pet>, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let backend = db.read().await;
    Ok(Json(backend.owned_pet(user_id, id)?.pet.clone()))
}

async fn update_pet(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdatePet>,
) -> Result<Json<Pet>, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let mut backend = db.write().await;
    let entry = backend.owned_pet_mut(user_id, id)?;
    if let Some(name) = input.name {
        require_non_empty("name", &name)?;
        entry.pet.name = name;
    }
    if let Some(species) = input.species {
        require_non_empty("species", &species)?;
        entry.pet.species = species;
    }
    if let Some(breed) = input.breed {
        entry.pet.breed = breed;
    }
    Ok(Json(entry.pet.clone()))
}

async fn delete_pet(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let mut backend = db.write().await;
    backend.owned_pet(user_id, id)?;
    backend.pets.remove(&id);
    backend.records.retain(|_, record| record.pet_id != id);
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_profile_picture(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let upload = read_upload(multipart).await?;
    if !upload.content_type.starts_with("image/") {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "File must be an image"));
    }
    let mut backend = db.write().await;
    backend.owned_pet(user_id, id)?;
    let media_id = backend.allocate_id();
    let entry = backend.owned_pet_mut(user_id, id)?;
    entry.picture = Some(StoredFile {
        content_type: upload.content_type,
        data: upload.data,
    });
    let url = format!("/api/v1/pets/{id}/profile-picture");
    Ok(Json(json!({ "url": url, "profile_picture_url": url, "media_id": media_id })))
}

async fn get_profile_picture(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let backend = db.read().await;
    let picture = backend
        .owned_pet(user_id, id)?
        .picture
        .as_ref()
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "No profile picture"))?;
    Ok(binary(&picture.content_type, picture.data.clone()))
}

async fn pet_qr_code(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    db.read().await.owned_pet(user_id, id)?;
    Ok(binary("image/png", PNG_QR.to_vec()))
}

#[derive(Deserialize)]
struct DaysParams {
    #[serde(default = "default_days")]
    days: u32,
}

fn default_days() -> u32 {
    7
}

async fn activity_stats(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(params): Query<DaysParams>,
) -> Result<Json<Value>, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    db.read().await.owned_pet(user_id, id)?;
    let daily: Vec<Value> = (0..params.days)
        .map(|day| json!({ "day": day, "active_minutes": 0, "sleep_minutes": 0 }))
        .collect();
    Ok(Json(json!({ "pet_id": id, "days": params.days, "daily": daily })))
}

async fn pet_calendar_events(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(params): Query<CalendarParams>,
) -> Result<Json<Value>, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    db.read().await.owned_pet(user_id, id)?;
    Ok(Json(calendar_body(&params)))
}

// ---------------------------------------------------------------------------
// Medical records
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RecordParams {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_event_limit")]
    limit: usize,
    visit_id: Option<i64>,
}

async fn list_medical_records(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(params): Query<RecordParams>,
) -> Result<Json<Vec<MedicalRecord>>, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let backend = db.read().await;
    backend.owned_pet(user_id, id)?;
    // Records are not linked to visits here, so a visit filter matches none.
    if params.visit_id.is_some() {
        return Ok(Json(Vec::new()));
    }
    let mut records: Vec<MedicalRecord> = backend
        .records
        .values()
        .filter(|stored| stored.pet_id == id)
        .map(|stored| stored.record.clone())
        .collect();
    records.sort_by_key(|record| record.id);
    Ok(Json(records.into_iter().skip(params.skip).take(params.limit).collect()))
}

async fn upload_medical_record(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MedicalRecord>), ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let upload = read_upload(multipart).await?;
    if upload.content_type != "application/pdf" {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Only PDF files are allowed"));
    }
    let mut backend = db.write().await;
    backend.owned_pet(user_id, id)?;
    let record_id = backend.allocate_id();
    let record = MedicalRecord {
        id: record_id,
        url: format!("/api/v1/pets/{id}/veterinary/medical-records/{record_id}/file"),
        storage_key: format!("pets/{id}/medical/{}", upload.file_name),
        file_size_bytes: Some(upload.data.len() as i64),
        mime_type: upload.content_type,
        created_at: MOCK_TIMESTAMP.to_string(),
    };
    backend.records.insert(
        record_id,
        StoredRecord {
            pet_id: id,
            record: record.clone(),
            data: upload.data,
        },
    );
    Ok((StatusCode::CREATED, Json(record)))
}

async fn medical_record_file(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, record_id)): Path<(i64, i64)>,
) -> Result<Response, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let backend = db.read().await;
    backend.owned_pet(user_id, id)?;
    let stored = backend
        .records
        .get(&record_id)
        .filter(|stored| stored.pet_id == id)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Medical record not found"))?;
    Ok(binary(&stored.record.mime_type, stored.data.clone()))
}

async fn delete_medical_record(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, record_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let mut backend = db.write().await;
    backend.owned_pet(user_id, id)?;
    let attached = backend
        .records
        .get(&record_id)
        .is_some_and(|stored| stored.pet_id == id);
    if !attached {
        return Err(ApiFailure::new(StatusCode::NOT_FOUND, "Medical record not found"));
    }
    backend.records.remove(&record_id);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Community
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PostPageParams {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_event_limit")]
    limit: usize,
}

async fn list_posts(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(page): Query<PostPageParams>,
) -> Result<Json<Vec<CommunityPost>>, ApiFailure> {
    current_user(&db, &headers).await?;
    let backend = db.read().await;
    let mut posts: Vec<CommunityPost> = backend.posts.values().cloned().collect();
    posts.sort_by_key(|post| std::cmp::Reverse(post.id));
    Ok(Json(posts.into_iter().skip(page.skip).take(page.limit).collect()))
}

async fn create_post(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreatePost>,
) -> Result<(StatusCode, Json<CommunityPost>), ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    require_non_empty("content", &input.content)?;
    let mut backend = db.write().await;
    let pet_name = match input.pet_id {
        Some(pet_id) => Some(backend.owned_pet(user_id, pet_id)?.pet.name.clone()),
        None => None,
    };
    let user_name = backend.accounts.get(&user_id).map(|account| account.user.name.clone());
    let id = backend.allocate_id();
    let post = CommunityPost {
        id,
        user_id,
        content: input.content,
        title: input.title,
        pet_id: input.pet_id,
        user_name,
        pet_name,
        created_at: MOCK_TIMESTAMP.to_string(),
        updated_at: MOCK_TIMESTAMP.to_string(),
    };
    backend.posts.insert(id, post.clone());
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<CommunityPost>, ApiFailure> {
    current_user(&db, &headers).await?;
    let backend = db.read().await;
    backend
        .posts
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Post not found"))
}

async fn update_post(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdatePost>,
) -> Result<Json<CommunityPost>, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let mut backend = db.write().await;
    let post = backend
        .posts
        .get_mut(&id)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Post not found"))?;
    if post.user_id != user_id {
        return Err(ApiFailure::new(StatusCode::FORBIDDEN, "Not allowed to edit this post"));
    }
    if let Some(content) = input.content {
        require_non_empty("content", &content)?;
        post.content = content;
    }
    if let Some(title) = input.title {
        post.title = title;
    }
    if let Some(pet_id) = input.pet_id {
        post.pet_id = pet_id;
    }
    Ok(Json(post.clone()))
}

async fn delete_post(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    let user_id = current_user(&db, &headers).await?;
    let mut backend = db.write().await;
    let post = backend
        .posts
        .get(&id)
        .ok_or_else(|| ApiFailure::new(StatusCode::NOT_FOUND, "Post not found"))?;
    if post.user_id != user_id {
        return Err(ApiFailure::new(StatusCode::FORBIDDEN, "Not allowed to delete this post"));
    }
    backend.posts.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ChannelParams {
    #[serde(default = "default_channel")]
    channel: String,
}

fn default_channel() -> String {
    "speedingchimp".to_string()
}

/// Channels named `offline` have no live stream.
fn resolve_stream(channel: &str) -> Result<String, ApiFailure> {
    let name = channel.rsplit('/').next().unwrap_or(channel);
    if name == "offline" {
        return Err(ApiFailure::new(
            StatusCode::NOT_FOUND,
            &format!("No streams found for https://twitch.tv/{name} (channel may be offline)"),
        ));
    }
    Ok(format!("https://hls.mock/{name}/index.m3u8"))
}

async fn stream_url(Query(params): Query<ChannelParams>) -> Result<Json<Value>, ApiFailure> {
    let stream_url = resolve_stream(&params.channel)?;
    Ok(Json(json!({ "stream_url": stream_url, "channel": params.channel })))
}

async fn current_frame(Query(params): Query<ChannelParams>) -> Result<Response, ApiFailure> {
    resolve_stream(&params.channel)?;
    Ok(binary("image/jpeg", JPEG_FRAME.to_vec()))
}

// ---------------------------------------------------------------------------
// AI analysis
// ---------------------------------------------------------------------------

const MODELS: [(&str, &str); 3] = [
    ("gemini", "Gemini"),
    ("llama", "Llama (text only)"),
    ("llama_vision", "Llama Vision"),
];

#[derive(Deserialize)]
struct ModelParams {
    #[serde(default = "default_model")]
    model: String,
}

fn default_model() -> String {
    "gemini".to_string()
}

fn check_model(model: &str) -> Result<(), ApiFailure> {
    if MODELS.iter().any(|(id, _)| *id == model) {
        Ok(())
    } else {
        Err(ApiFailure::new(StatusCode::BAD_REQUEST, &format!("Unknown model: {model}")))
    }
}

async fn list_models() -> Json<Vec<(String, String)>> {
    Json(
        MODELS
            .iter()
            .map(|(id, label)| (id.to_string(), label.to_string()))
            .collect(),
    )
}

async fn analyze_pet(Query(params): Query<ModelParams>, multipart: Multipart) -> Result<Json<Value>, ApiFailure> {
    check_model(&params.model)?;
    let upload = read_upload(multipart).await?;
    if !ALLOWED_IMAGE_TYPES.contains(&upload.content_type.as_str()) {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            &format!("Invalid file type. Allowed: {}", ALLOWED_IMAGE_TYPES.join(", ")),
        ));
    }
    Ok(Json(json!({
        "species": [{ "species": "dog", "percentage": 92.0 }, { "species": "wolf", "percentage": 8.0 }],
        "breeds": [{ "breed": "Beagle", "percentage": 75.0 }, { "breed": "Harrier", "percentage": 25.0 }],
    })))
}

async fn analyze_audio(Query(params): Query<ModelParams>, multipart: Multipart) -> Result<Json<Value>, ApiFailure> {
    check_model(&params.model)?;
    let upload = read_upload(multipart).await?;
    if !upload.content_type.starts_with("audio/") {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Invalid file type. Expected audio"));
    }
    Ok(Json(json!({
        "species": [{ "species": "dog", "percentage": 88.0 }],
        "emotion": "excited",
        "summary": "Short repeated barks, likely play.",
    })))
}

async fn analyze_activity(Query(params): Query<ModelParams>, multipart: Multipart) -> Result<Json<Value>, ApiFailure> {
    check_model(&params.model)?;
    let upload = read_upload(multipart).await?;
    if !upload.content_type.starts_with("image/") && !upload.content_type.starts_with("video/") {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "Invalid file type. Expected image or video"));
    }
    Ok(Json(json!({ "activity": "sleeping", "confidence": 0.81 })))
}

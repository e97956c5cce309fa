use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, CommunityPost, MedicalRecord, Pet, User, JPEG_FRAME, PDF_MAGIC};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "mockboundary";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if body.is_some() {
        builder = builder.header(http::header::CONTENT_TYPE, "application/json");
    }
    builder.body(body.unwrap_or_default().to_string()).unwrap()
}

fn upload(uri: &str, token: Option<&str>, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Register a user and log in, returning the bearer token.
async fn signed_in(app: &Router, email: &str) -> String {
    let body = format!(r#"{{"name":"Sam","email":"{email}","password":"longenough"}}"#);
    let resp = app
        .clone()
        .oneshot(request("POST", "/api/v1/users", None, Some(&body)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = format!(r#"{{"email":"{email}","password":"longenough"}}"#);
    let resp = app
        .clone()
        .oneshot(request("POST", "/api/v1/auth/login", None, Some(&body)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let token: Value = body_json(resp).await;
    assert_eq!(token["token_type"], "bearer");
    token["access_token"].as_str().unwrap().to_string()
}

async fn create_pet(app: &Router, token: &str) -> Pet {
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/pets",
            Some(token),
            Some(r#"{"name":"Rex","species":"dog"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// --- auth ---

#[tokio::test]
async fn me_without_token_is_401_with_detail() {
    let resp = app()
        .oneshot(request("GET", "/api/v1/auth/me", None, None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "Could not validate credentials");
}

#[tokio::test]
async fn login_with_wrong_password_is_401() {
    let app = app();
    signed_in(&app, "sam@example.com").await;
    let resp = app
        .oneshot(request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(r#"{"email":"sam@example.com","password":"wrong-password"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "Incorrect email or password");
}

#[tokio::test]
async fn me_returns_signed_in_user() {
    let app = app();
    let token = signed_in(&app, "sam@example.com").await;
    let resp = app
        .oneshot(request("GET", "/api/v1/auth/me", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let user: User = body_json(resp).await;
    assert_eq!(user.email, "sam@example.com");
}

// --- users ---

#[tokio::test]
async fn short_password_is_422_list_detail() {
    let resp = app()
        .oneshot(request(
            "POST",
            "/api/v1/users",
            None,
            Some(r#"{"name":"Sam","email":"sam@example.com","password":"short"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"][0]["loc"][1], "password");
    assert!(body["detail"][0]["msg"].as_str().unwrap().contains("8 characters"));
}

#[tokio::test]
async fn duplicate_email_is_400() {
    let app = app();
    signed_in(&app, "sam@example.com").await;
    let resp = app
        .oneshot(request(
            "POST",
            "/api/v1/users",
            None,
            Some(r#"{"name":"Sam","email":"sam@example.com","password":"longenough"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_me_changes_only_given_fields() {
    let app = app();
    let token = signed_in(&app, "sam@example.com").await;
    let resp = app
        .oneshot(request(
            "PATCH",
            "/api/v1/users/me",
            Some(&token),
            Some(r#"{"display_name":"Sammy"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let user: User = body_json(resp).await;
    assert_eq!(user.display_name.as_deref(), Some("Sammy"));
    assert_eq!(user.name, "Sam");
}

#[tokio::test]
async fn calendar_requires_range() {
    let app = app();
    let token = signed_in(&app, "sam@example.com").await;
    let resp = app
        .clone()
        .oneshot(request("GET", "/api/v1/users/me/calendar/events", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(request(
            "GET",
            "/api/v1/users/me/calendar/events?start=2025-01-01&end=2025-01-31&include_activity=false",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["include_activity"], false);
}

// --- pets ---

#[tokio::test]
async fn pets_are_scoped_to_owner() {
    let app = app();
    let owner = signed_in(&app, "owner@example.com").await;
    let other = signed_in(&app, "other@example.com").await;
    let pet = create_pet(&app, &owner).await;

    let resp = app
        .clone()
        .oneshot(request("GET", &format!("/api/v1/pets/{}", pet.id), Some(&other), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .oneshot(request("GET", "/api/v1/users/me/pets", Some(&owner), None))
        .await
        .unwrap();
    let pets: Vec<Pet> = body_json(resp).await;
    assert_eq!(pets, vec![pet]);
}

#[tokio::test]
async fn null_breed_clears_but_absent_breed_keeps() {
    let app = app();
    let token = signed_in(&app, "sam@example.com").await;
    let pet = create_pet(&app, &token).await;
    let uri = format!("/api/v1/pets/{}", pet.id);

    let resp = app
        .clone()
        .oneshot(request("PATCH", &uri, Some(&token), Some(r#"{"breed":"Beagle"}"#)))
        .await
        .unwrap();
    let updated: Pet = body_json(resp).await;
    assert_eq!(updated.breed.as_deref(), Some("Beagle"));

    let resp = app
        .clone()
        .oneshot(request("PATCH", &uri, Some(&token), Some(r#"{"name":"Max"}"#)))
        .await
        .unwrap();
    let renamed: Pet = body_json(resp).await;
    assert_eq!(renamed.breed.as_deref(), Some("Beagle"));

    let resp = app
        .oneshot(request("PATCH", &uri, Some(&token), Some(r#"{"breed":null}"#)))
        .await
        .unwrap();
    let cleared: Pet = body_json(resp).await;
    assert_eq!(cleared.breed, None);
    assert_eq!(cleared.name, "Max");
}

#[tokio::test]
async fn delete_pet_returns_204_with_empty_body() {
    let app = app();
    let token = signed_in(&app, "sam@example.com").await;
    let pet = create_pet(&app, &token).await;

    let resp = app
        .clone()
        .oneshot(request("DELETE", &format!("/api/v1/pets/{}", pet.id), Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = app
        .oneshot(request("GET", &format!("/api/v1/pets/{}", pet.id), Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_picture_roundtrips_bytes() {
    let app = app();
    let token = signed_in(&app, "sam@example.com").await;
    let pet = create_pet(&app, &token).await;
    let uri = format!("/api/v1/pets/{}/profile-picture", pet.id);

    let resp = app
        .clone()
        .oneshot(upload(&uri, Some(&token), "rex.png", "image/png", b"pngbytes"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(request("GET", &uri, Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "image/png");
    assert_eq!(&body_bytes(resp).await[..], b"pngbytes");
}

// --- medical records ---

#[tokio::test]
async fn medical_record_upload_and_download() {
    let app = app();
    let token = signed_in(&app, "sam@example.com").await;
    let pet = create_pet(&app, &token).await;
    let base = format!("/api/v1/pets/{}/veterinary/medical-records", pet.id);

    let resp = app
        .clone()
        .oneshot(upload(&base, Some(&token), "vax.pdf", "application/pdf", PDF_MAGIC))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let record: MedicalRecord = body_json(resp).await;
    assert_eq!(record.mime_type, "application/pdf");

    let resp = app
        .clone()
        .oneshot(request("GET", &format!("{base}/{}/file", record.id), Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/pdf");
    assert_eq!(&body_bytes(resp).await[..], PDF_MAGIC);

    let resp = app
        .clone()
        .oneshot(request("GET", &base, Some(&token), None))
        .await
        .unwrap();
    let records: Vec<MedicalRecord> = body_json(resp).await;
    assert_eq!(records.len(), 1);

    let resp = app
        .oneshot(request("DELETE", &format!("{base}/{}", record.id), Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn medical_record_rejects_non_pdf() {
    let app = app();
    let token = signed_in(&app, "sam@example.com").await;
    let pet = create_pet(&app, &token).await;
    let resp = app
        .oneshot(upload(
            &format!("/api/v1/pets/{}/veterinary/medical-records", pet.id),
            Some(&token),
            "notes.txt",
            "text/plain",
            b"hello",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["detail"], "Only PDF files are allowed");
}

#[tokio::test]
async fn missing_medical_record_file_is_404() {
    let app = app();
    let token = signed_in(&app, "sam@example.com").await;
    let pet = create_pet(&app, &token).await;
    let resp = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/pets/{}/veterinary/medical-records/999/file", pet.id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- community ---

#[tokio::test]
async fn only_author_may_delete_post() {
    let app = app();
    let author = signed_in(&app, "author@example.com").await;
    let reader = signed_in(&app, "reader@example.com").await;

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/community/posts",
            Some(&author),
            Some(r#"{"content":"Walk at noon","title":"Meetup"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: CommunityPost = body_json(resp).await;
    assert_eq!(post.user_name.as_deref(), Some("Sam"));

    let uri = format!("/api/v1/community/posts/{}", post.id);
    let resp = app
        .clone()
        .oneshot(request("DELETE", &uri, Some(&reader), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .oneshot(request("DELETE", &uri, Some(&author), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

// --- stream ---

#[tokio::test]
async fn stream_url_defaults_channel() {
    let resp = app()
        .oneshot(request("GET", "/api/v1/stream/url", None, None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["channel"], "speedingchimp");
}

#[tokio::test]
async fn current_frame_is_jpeg() {
    let resp = app()
        .oneshot(request("GET", "/api/v1/stream/current-frame", None, None))
        .await
        .unwrap();

    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(&body_bytes(resp).await[..], JPEG_FRAME);
}

#[tokio::test]
async fn offline_channel_is_404() {
    let resp = app()
        .oneshot(request("GET", "/api/v1/stream/url?channel=offline", None, None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- analysis ---

#[tokio::test]
async fn analyze_pet_returns_guesses() {
    let resp = app()
        .oneshot(upload(
            "/api/v1/gemini/analyze-pet?model=gemini",
            None,
            "rex.jpg",
            "image/jpeg",
            b"jpeg",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["species"][0]["species"], "dog");
}

#[tokio::test]
async fn analyze_pet_rejects_unknown_model_and_bad_type() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(upload("/api/v1/gemini/analyze-pet?model=gpt", None, "rex.jpg", "image/jpeg", b"x"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(upload("/api/v1/gemini/analyze-pet", None, "rex.txt", "text/plain", b"x"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn models_lists_pairs() {
    let resp = app()
        .oneshot(request("GET", "/api/v1/gemini/models", None, None))
        .await
        .unwrap();

    let models: Vec<(String, String)> = body_json(resp).await;
    assert!(models.iter().any(|(id, _)| id == "gemini"));
}

use serde::Serialize;
use serde_json::Value;

use super::{file_form, with_query};
use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::{FilePart, MedicalRecord, NewPet, Pet, PetUpdate, ProfilePictureUpload};

/// `/pets` endpoints, including veterinary medical records.
#[derive(Debug, Clone, Copy)]
pub struct Pets<'a> {
    client: &'a ApiClient,
}

/// Paging and filtering for [`Pets::list_medical_records`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MedicalRecordQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_id: Option<i64>,
    pub skip: u32,
    pub limit: u32,
}

impl Default for MedicalRecordQuery {
    fn default() -> Self {
        Self {
            visit_id: None,
            skip: 0,
            limit: 50,
        }
    }
}

#[derive(Serialize)]
struct Page {
    skip: u32,
    limit: u32,
}

#[derive(Serialize)]
struct CalendarQuery<'q> {
    start: &'q str,
    end: &'q str,
    include_activity: bool,
}

impl<'a> Pets<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Page through pets (`skip` 0, `limit` 100 by default).
    pub fn list(&self, skip: Option<u32>, limit: Option<u32>) -> Result<Vec<Pet>, ApiError> {
        let page = Page {
            skip: skip.unwrap_or(0),
            limit: limit.unwrap_or(100),
        };
        let path = with_query("/pets", &page)?;
        self.client
            .request_json(HttpMethod::Get, &path, RequestOptions::new())
    }

    pub fn create(&self, pet: &NewPet) -> Result<Pet, ApiError> {
        self.client
            .request_json(HttpMethod::Post, "/pets", RequestOptions::json(pet)?)
    }

    pub fn get(&self, id: i64) -> Result<Pet, ApiError> {
        self.client
            .request_json(HttpMethod::Get, &format!("/pets/{id}"), RequestOptions::new())
    }

    pub fn update(&self, id: i64, update: &PetUpdate) -> Result<Pet, ApiError> {
        self.client
            .request_json(HttpMethod::Patch, &format!("/pets/{id}"), RequestOptions::json(update)?)
    }

    pub fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client
            .request_ok(HttpMethod::Delete, &format!("/pets/{id}"), RequestOptions::new())?;
        Ok(())
    }

    pub fn upload_profile_picture(&self, id: i64, file: FilePart) -> Result<ProfilePictureUpload, ApiError> {
        self.client.request_json(
            HttpMethod::Post,
            &format!("/pets/{id}/profile-picture"),
            RequestOptions::form(file_form(file)),
        )
    }

    /// The pet's profile picture as image bytes.
    pub fn profile_picture(&self, id: i64) -> Result<Vec<u8>, ApiError> {
        self.client
            .request_blob(HttpMethod::Get, &format!("/pets/{id}/profile-picture"))
    }

    /// PNG QR code linking to the pet's profile.
    pub fn qr_code(&self, id: i64) -> Result<Vec<u8>, ApiError> {
        self.client
            .request_blob(HttpMethod::Get, &format!("/pets/{id}/qr-code"))
    }

    /// Activity statistics over the last `days` days (7 by default).
    pub fn activity_stats(&self, id: i64, days: Option<u32>) -> Result<Value, ApiError> {
        let path = with_query(&format!("/pets/{id}/stats/activity"), &[("days", days.unwrap_or(7))])?;
        self.client
            .request_json(HttpMethod::Get, &path, RequestOptions::new())
    }

    pub fn calendar_events(
        &self,
        id: i64,
        start: &str,
        end: &str,
        include_activity: Option<bool>,
    ) -> Result<Value, ApiError> {
        let query = CalendarQuery {
            start,
            end,
            include_activity: include_activity.unwrap_or(true),
        };
        let path = with_query(&format!("/pets/{id}/calendar/events"), &query)?;
        self.client
            .request_json(HttpMethod::Get, &path, RequestOptions::new())
    }

    pub fn list_medical_records(&self, pet_id: i64, query: MedicalRecordQuery) -> Result<Vec<MedicalRecord>, ApiError> {
        let path = with_query(&format!("/pets/{pet_id}/veterinary/medical-records"), &query)?;
        self.client
            .request_json(HttpMethod::Get, &path, RequestOptions::new())
    }

    pub fn upload_medical_record(&self, pet_id: i64, file: FilePart) -> Result<MedicalRecord, ApiError> {
        self.client.request_json(
            HttpMethod::Post,
            &format!("/pets/{pet_id}/veterinary/medical-records"),
            RequestOptions::form(file_form(file)),
        )
    }

    /// Download a medical record document (usually a PDF).
    pub fn get_medical_record_file(&self, pet_id: i64, record_id: i64) -> Result<Vec<u8>, ApiError> {
        self.client.request_blob(
            HttpMethod::Get,
            &format!("/pets/{pet_id}/veterinary/medical-records/{record_id}/file"),
        )
    }

    pub fn delete_medical_record(&self, pet_id: i64, record_id: i64) -> Result<(), ApiError> {
        self.client.request_ok(
            HttpMethod::Delete,
            &format!("/pets/{pet_id}/veterinary/medical-records/{record_id}"),
            RequestOptions::new(),
        )?;
        Ok(())
    }
}

use serde_json::Value;

use super::{file_form, with_query};
use crate::client::{ApiClient, RequestOptions, ResponseData};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::{FilePart, PetAnalysis};

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "gemini";

/// `/gemini` AI-analysis endpoints. Every analysis call uploads one file.
#[derive(Debug, Clone, Copy)]
pub struct Analysis<'a> {
    client: &'a ApiClient,
}

impl<'a> Analysis<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Available models as `(id, label)` pairs.
    pub fn models(&self) -> Result<Vec<(String, String)>, ApiError> {
        self.client
            .request_json(HttpMethod::Get, "/gemini/models", RequestOptions::new())
    }

    /// Species and breed guesses for a pet photo.
    pub fn analyze_pet(&self, file: FilePart, model: Option<&str>) -> Result<PetAnalysis, ApiError> {
        self.upload("/gemini/analyze-pet", file, model)?.into_json()
    }

    /// Interpretation of a pet audio clip (barks, meows, ...).
    pub fn analyze_audio(&self, file: FilePart, model: Option<&str>) -> Result<Value, ApiError> {
        self.upload("/gemini/analyze-audio", file, model)?.into_json()
    }

    /// Activity classification for a pet image or clip.
    pub fn analyze_activity(&self, file: FilePart, model: Option<&str>) -> Result<Value, ApiError> {
        self.upload("/gemini/analyze-activity", file, model)?.into_json()
    }

    fn upload(
        &self,
        path: &str,
        file: FilePart,
        model: Option<&str>,
    ) -> Result<ResponseData, ApiError> {
        let path = with_query(path, &[("model", model.unwrap_or(DEFAULT_MODEL))])?;
        self.client
            .request_ok(HttpMethod::Post, &path, RequestOptions::form(file_form(file)))
    }
}

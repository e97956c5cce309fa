//! Resource call groups: one thin binding per backend endpoint.
//!
//! Every binding goes through [`ApiClient::request_ok`] (or
//! [`ApiClient::request_blob`] for binary downloads), so token handling and
//! error normalization stay in one place.

mod analysis;
mod auth;
mod community;
mod pets;
mod stream;
mod users;

pub use analysis::{Analysis, DEFAULT_MODEL};
pub use auth::Auth;
pub use community::Community;
pub use pets::{MedicalRecordQuery, Pets};
pub use stream::{Stream, DEFAULT_CHANNEL};
pub use users::Users;

use serde::Serialize;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::MultipartForm;
use crate::types::FilePart;

/// Multipart field name the backend reads uploads from.
pub const FILE_FIELD: &str = "file";

impl ApiClient {
    pub fn auth(&self) -> Auth<'_> {
        Auth::new(self)
    }

    pub fn users(&self) -> Users<'_> {
        Users::new(self)
    }

    pub fn pets(&self) -> Pets<'_> {
        Pets::new(self)
    }

    pub fn community(&self) -> Community<'_> {
        Community::new(self)
    }

    pub fn stream(&self) -> Stream<'_> {
        Stream::new(self)
    }

    pub fn analysis(&self) -> Analysis<'_> {
        Analysis::new(self)
    }
}

/// Append `query` to `path` as `?k=v&...`. Fields serializing to nothing
/// (absent options) are left out.
fn with_query<Q: Serialize>(path: &str, query: &Q) -> Result<String, ApiError> {
    let encoded = serde_urlencoded::to_string(query).map_err(|e| ApiError::Serialization(e.to_string()))?;
    if encoded.is_empty() {
        Ok(path.to_string())
    } else {
        Ok(format!("{path}?{encoded}"))
    }
}

fn file_form(file: FilePart) -> MultipartForm {
    MultipartForm::new().file(FILE_FIELD, &file.file_name, &file.content_type, file.data)
}

//! DTOs for the PetPulse REST API.
//!
//! # Design
//! Only the payloads screens actually read field-by-field are typed here.
//! Calendar, stats and audio/activity analysis results pass through as
//! `serde_json::Value`. Timestamps stay strings since the backend emits both
//! naive and offset ISO-8601 forms.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Bearer token issued by `/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub slack_webhook_url: Option<String>,
    #[serde(default)]
    pub slack_channel: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Registration payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Partial profile update. Only the fields present are sent.
///
/// Nullable fields are doubly optional: `Some(None)` sends `null` and
/// clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub display_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub slack_webhook_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub slack_channel: Option<Option<String>>,
}

// ---------------------------------------------------------------------------
// Pets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pet {
    pub id: i64,
    pub name: String,
    pub species: String,
    #[serde(default)]
    pub breed: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPet {
    pub name: String,
    pub species: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
}

/// Partial pet update. Only the fields present are sent; `breed:
/// Some(None)` clears the breed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub breed: Option<Option<String>>,
}

/// Result of a profile picture upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfilePictureUpload {
    pub url: String,
    pub profile_picture_url: String,
    pub media_id: i64,
}

/// A veterinary document (PDF) attached to a pet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicalRecord {
    pub id: i64,
    pub url: String,
    pub storage_key: String,
    #[serde(default)]
    pub file_size_bytes: Option<i64>,
    pub mime_type: String,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Community
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommunityPost {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub pet_id: Option<i64>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub pet_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "::serde_with::rust::double_option")]
    pub pet_id: Option<Option<i64>>,
}

// ---------------------------------------------------------------------------
// Stream & analysis
// ---------------------------------------------------------------------------

/// Resolved HLS URL for a live channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamUrl {
    pub stream_url: String,
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeciesGuess {
    pub species: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreedGuess {
    pub breed: String,
    pub percentage: f64,
}

/// Species and breed predictions for an uploaded pet photo.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PetAnalysis {
    #[serde(default)]
    pub species: Vec<SpeciesGuess>,
    #[serde(default)]
    pub breeds: Vec<BreedGuess>,
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

/// A file handed to an upload call: raw bytes plus the name and MIME type
/// the backend validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: &str, content_type: &str, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            data,
        }
    }

    /// Read `path`, guessing the MIME type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            file_name,
            content_type,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_type_defaults_to_bearer() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(token.token_type, "bearer");
    }

    #[test]
    fn partial_updates_skip_absent_fields() {
        let update = PetUpdate {
            breed: Some(Some("Beagle".to_string())),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"breed": "Beagle"}));

        let json = serde_json::to_value(UserUpdate::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn nullable_fields_can_be_cleared() {
        let update = PetUpdate {
            breed: Some(None),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), serde_json::json!({"breed": null}));

        let update = PostUpdate {
            title: Some(None),
            pet_id: Some(Some(4)),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"title": null, "pet_id": 4})
        );

        let parsed: UserUpdate = serde_json::from_str(r#"{"slack_channel":null}"#).unwrap();
        assert_eq!(parsed.slack_channel, Some(None));
        assert_eq!(parsed.display_name, None);
    }

    #[test]
    fn post_accepts_missing_optional_fields() {
        let post: CommunityPost = serde_json::from_str(
            r#"{"id":1,"user_id":2,"content":"hi","created_at":"2025-01-01T00:00:00","updated_at":"2025-01-01T00:00:00"}"#,
        )
        .unwrap();
        assert!(post.title.is_none());
        assert!(post.pet_name.is_none());
    }

    #[test]
    fn analysis_defaults_to_empty_lists() {
        let analysis: PetAnalysis = serde_json::from_str("{}").unwrap();
        assert_eq!(analysis, PetAnalysis::default());
    }

    #[test]
    fn file_part_guesses_mime_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rex.png");
        fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let part = FilePart::from_path(&path).unwrap();
        assert_eq!(part.file_name, "rex.png");
        assert_eq!(part.content_type, "image/png");
        assert_eq!(part.data, vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn file_part_unknown_extension_is_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.zzzunknown");
        fs::write(&path, b"x").unwrap();
        assert_eq!(FilePart::from_path(&path).unwrap().content_type, "application/octet-stream");
    }
}

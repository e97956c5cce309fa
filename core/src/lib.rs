//! Blocking API client for the PetPulse backend.
//!
//! # Overview
//! `ApiClient` is the one place the application touches the network: it
//! builds URLs against the versioned API root, injects the bearer token
//! from a [`SessionStore`], encodes JSON or multipart bodies, decodes
//! responses by content type and normalizes failures into [`ApiError`].
//! Resource groups (`client.pets()`, `client.auth()`, ...) are thin
//! bindings on top.
//!
//! # Design
//! - Token state lives in an injected `SessionStore`, read on every call.
//! - `build_request` / `parse_response` keep the I/O boundary explicit;
//!   `request` runs them through a [`Transport`] (ureq by default).
//! - A `401` anywhere clears the stored token.
//! - DTOs are defined independently from the mock-server crate; the
//!   integration tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod resources;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{ApiClient, ApiResponse, Payload, RequestOptions, ResponseData};
pub use config::ClientConfig;
pub use error::{ApiError, ErrorDetail};
pub use http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore, TOKEN_KEY};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use transport::Transport;
pub use types::{
    BreedGuess, CommunityPost, FilePart, LoginRequest, MedicalRecord, NewPet, NewPost, NewUser, Pet, PetAnalysis,
    PetUpdate, PostUpdate, ProfilePictureUpload, SpeciesGuess, StreamUrl, TokenResponse, User, UserUpdate,
};

use serde::Serialize;
use serde_json::Value;

use super::with_query;
use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::{NewUser, Pet, User, UserUpdate};

/// `/users` endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Users<'a> {
    client: &'a ApiClient,
}

#[derive(Serialize)]
struct CalendarQuery<'q> {
    start: &'q str,
    end: &'q str,
    include_activity: bool,
}

impl<'a> Users<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Register a new account.
    pub fn create(&self, user: &NewUser) -> Result<User, ApiError> {
        self.client
            .request_json(HttpMethod::Post, "/users", RequestOptions::json(user)?)
    }

    pub fn update_me(&self, update: &UserUpdate) -> Result<User, ApiError> {
        self.client
            .request_json(HttpMethod::Patch, "/users/me", RequestOptions::json(update)?)
    }

    pub fn my_pets(&self) -> Result<Vec<Pet>, ApiError> {
        self.client
            .request_json(HttpMethod::Get, "/users/me/pets", RequestOptions::new())
    }

    /// Upcoming events across all of the user's pets (50 by default).
    pub fn upcoming_events(&self, limit: Option<u32>) -> Result<Value, ApiError> {
        let path = with_query("/users/me/upcoming-events", &[("limit", limit.unwrap_or(50))])?;
        self.client
            .request_json(HttpMethod::Get, &path, RequestOptions::new())
    }

    /// Calendar events between two ISO dates. Activity entries are included
    /// unless `include_activity` is `Some(false)`.
    pub fn calendar_events(&self, start: &str, end: &str, include_activity: Option<bool>) -> Result<Value, ApiError> {
        let query = CalendarQuery {
            start,
            end,
            include_activity: include_activity.unwrap_or(true),
        };
        let path = with_query("/users/me/calendar/events", &query)?;
        self.client
            .request_json(HttpMethod::Get, &path, RequestOptions::new())
    }
}

use serde::Serialize;

use super::with_query;
use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::{CommunityPost, NewPost, PostUpdate};

/// `/community` feed endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Community<'a> {
    client: &'a ApiClient,
}

#[derive(Serialize)]
struct Page {
    skip: u32,
    limit: u32,
}

impl<'a> Community<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Page through the feed (`skip` 0, `limit` 50 by default).
    pub fn posts(&self, skip: Option<u32>, limit: Option<u32>) -> Result<Vec<CommunityPost>, ApiError> {
        let page = Page {
            skip: skip.unwrap_or(0),
            limit: limit.unwrap_or(50),
        };
        let path = with_query("/community/posts", &page)?;
        self.client
            .request_json(HttpMethod::Get, &path, RequestOptions::new())
    }

    pub fn post(&self, id: i64) -> Result<CommunityPost, ApiError> {
        self.client
            .request_json(HttpMethod::Get, &format!("/community/posts/{id}"), RequestOptions::new())
    }

    pub fn create_post(&self, post: &NewPost) -> Result<CommunityPost, ApiError> {
        self.client
            .request_json(HttpMethod::Post, "/community/posts", RequestOptions::json(post)?)
    }

    pub fn update_post(&self, id: i64, update: &PostUpdate) -> Result<CommunityPost, ApiError> {
        self.client.request_json(
            HttpMethod::Patch,
            &format!("/community/posts/{id}"),
            RequestOptions::json(update)?,
        )
    }

    pub fn delete_post(&self, id: i64) -> Result<(), ApiError> {
        self.client
            .request_ok(HttpMethod::Delete, &format!("/community/posts/{id}"), RequestOptions::new())?;
        Ok(())
    }
}

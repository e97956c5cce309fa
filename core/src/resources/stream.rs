use super::with_query;
use crate::client::{ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::StreamUrl;

/// Channel watched when the caller does not name one.
pub const DEFAULT_CHANNEL: &str = "speedingchimp";

/// `/stream` live-camera endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Stream<'a> {
    client: &'a ApiClient,
}

impl<'a> Stream<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Resolve the HLS playback URL for `channel` (a channel name or a full
    /// channel URL).
    pub fn url(&self, channel: Option<&str>) -> Result<StreamUrl, ApiError> {
        let path = with_query("/stream/url", &[("channel", channel.unwrap_or(DEFAULT_CHANNEL))])?;
        self.client
            .request_json(HttpMethod::Get, &path, RequestOptions::new())
    }

    /// Grab the current frame of the live stream as JPEG bytes.
    pub fn current_frame(&self, channel: Option<&str>) -> Result<Vec<u8>, ApiError> {
        let path = with_query(
            "/stream/current-frame",
            &[("channel", channel.unwrap_or(DEFAULT_CHANNEL))],
        )?;
        self.client.request_blob(HttpMethod::Get, &path)
    }
}

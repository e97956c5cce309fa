//! The I/O seam between `ApiClient` and the network.

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
///
/// Implementations must return every response the server produced,
/// whatever its status, and reserve `Err` for failures that left no
/// response behind. They must not store or replay cookies.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[cfg(feature = "ureq")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_transport {
    use tracing::trace;
    use ureq::typestate::{WithBody, WithoutBody};
    use ureq::{Agent, RequestBuilder};

    use super::Transport;
    use crate::error::ApiError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// Blocking transport backed by a ureq agent.
    ///
    /// The agent has ureq's status-as-error behavior disabled so 4xx/5xx
    /// responses come back as data, and no cookie store.
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: Agent,
    }

    impl UreqTransport {
        pub fn new() -> Self {
            let agent = Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent }
        }

        pub fn with_agent(agent: Agent) -> Self {
            Self { agent }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for UreqTransport {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            let HttpRequest {
                method,
                url,
                headers,
                body,
            } = request;
            let encoded = body.map(|body| body.encode());

            let result = match encoded {
                None => match method {
                    HttpMethod::Get => without_body(self.agent.get(&url), &headers).call(),
                    HttpMethod::Delete => without_body(self.agent.delete(&url), &headers).call(),
                    HttpMethod::Post => with_body(self.agent.post(&url), &headers).send_empty(),
                    HttpMethod::Put => with_body(self.agent.put(&url), &headers).send_empty(),
                    HttpMethod::Patch => with_body(self.agent.patch(&url), &headers).send_empty(),
                },
                Some(encoded) => {
                    // GET and DELETE carry a body only when the caller supplied one.
                    let builder = match method {
                        HttpMethod::Get => self.agent.get(&url).force_send_body(),
                        HttpMethod::Delete => self.agent.delete(&url).force_send_body(),
                        HttpMethod::Post => self.agent.post(&url),
                        HttpMethod::Put => self.agent.put(&url),
                        HttpMethod::Patch => self.agent.patch(&url),
                    };
                    let mut builder = with_body(builder, &headers);
                    if let Some(content_type) = &encoded.content_type {
                        builder = builder.header("content-type", content_type.as_str());
                    }
                    builder.send(&encoded.bytes[..])
                }
            };
            let mut response = result?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();
            // Blob downloads may exceed ureq's default 10 MB read cap.
            let body = response.body_mut().with_config().limit(u64::MAX).read_to_vec()?;
            trace!(status, bytes = body.len(), "response received");

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }

    fn without_body(
        mut builder: RequestBuilder<WithoutBody>,
        headers: &[(String, String)],
    ) -> RequestBuilder<WithoutBody> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn with_body(
        mut builder: RequestBuilder<WithBody>,
        headers: &[(String, String)],
    ) -> RequestBuilder<WithBody> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }
}

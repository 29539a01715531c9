mod http_transport;

pub use http_transport::HttpTransport;

use crate::config::UpstreamConfig;
use crate::protocol::grok::GrokRequest;
use crate::routing::Route;

/// A fully-resolved upstream call. Built once per request, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub url: String,
    pub body: GrokRequest,
    pub api_key: String,
}

impl UpstreamRequest {
    /// `None` for routes that are not forwarded.
    #[must_use]
    pub fn for_route(
        route: Route,
        config: &UpstreamConfig,
        body: GrokRequest,
        api_key: &str,
    ) -> Option<Self> {
        let path = route.upstream_path()?;
        Some(Self {
            url: config.endpoint_url(path),
            body,
            api_key: api_key.to_string(),
        })
    }

    #[must_use]
    pub fn is_stream(&self) -> bool {
        self.body.is_stream()
    }
}

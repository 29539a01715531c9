use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::error::ProxyError;

use super::UpstreamRequest;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn build_reqwest_client(
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
    timeout: Duration,
    use_env_proxy: bool,
    proxy_url: Option<&str>,
) -> Result<reqwest::Client, ProxyError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout);

    if let Some(proxy_url) = proxy_url {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|err| ProxyError::Transport(format!("Invalid proxy URL: {err}")))?;
        builder = builder.no_proxy().proxy(proxy);
    } else if !use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| ProxyError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// Pooled HTTP client used for every upstream call.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the client from the upstream pool, timeout and proxy settings.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Transport`] when the proxy URL is rejected or the
    /// client cannot be built.
    pub fn new(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
        };
        let client = build_reqwest_client(
            config.http_pool_max_idle_per_host.max(1),
            pool_idle_timeout,
            Duration::from_secs(config.timeout),
            config.http_use_env_proxy,
            config.proxy.as_deref().map(str::trim),
        )?;
        Ok(Self { client })
    }

    /// `POST` the request body as JSON with the forwarded bearer credential.
    ///
    /// The response is returned as soon as headers arrive; the caller decides
    /// whether to buffer or stream the body. Non-success statuses are not
    /// errors here.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Translation`] when the body cannot be serialized
    /// and [`ProxyError::Transport`] when the request fails to execute.
    pub async fn send(&self, request: &UpstreamRequest) -> Result<reqwest::Response, ProxyError> {
        let body = serde_json::to_vec(&request.body)
            .map_err(|err| ProxyError::Translation(format!("failed to encode upstream body: {err}")))?;
        self.client
            .post(request.url.as_str())
            .header(http::header::CONTENT_TYPE, "application/json")
            .bearer_auth(&request.api_key)
            .body(body)
            .send()
            .await
            .map_err(|err| ProxyError::Transport(err.to_string()))
    }
}

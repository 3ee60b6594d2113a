//! proxy_fetch tool implementation.
//!
//! Offers one request to the router and reports what happened to it.

use std::time::Duration;

use reqwest::Method;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use saveit_client::fetch::fetch_within;
use saveit_client::{Disposition, FetchError, Network, Outcome, RequestDescriptor, ResponseDescriptor, Router};
use saveit_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchParams {
    /// Absolute http(s) URL to request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchOutput {
    /// Canonical URL the request was made for.
    pub url: String,
    pub method: String,
    /// One of passthrough, cached, fetched, offline, failed, no_match.
    pub disposition: String,
    /// Strategy that handled an intercepted request.
    pub strategy: Option<String>,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    /// Body length in bytes.
    pub bytes: usize,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
    /// Transport failure for failed requests.
    pub error: Option<String>,
}

impl ProxyFetchOutput {
    fn new(request: &RequestDescriptor, disposition: &str) -> Self {
        Self {
            url: request.url().to_string(),
            method: request.method().to_string(),
            disposition: disposition.to_string(),
            strategy: None,
            status: None,
            content_type: None,
            bytes: 0,
            body: None,
            error: None,
        }
    }

    fn with_response(mut self, response: &ResponseDescriptor) -> Self {
        self.status = Some(response.status.as_u16());
        self.content_type = response.content_type().map(String::from);
        self.bytes = response.body.len();
        self.body = std::str::from_utf8(&response.body).ok().map(String::from);
        self
    }

    fn with_error(mut self, error: &FetchError) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

fn parse_request(params: &ProxyFetchParams) -> Result<RequestDescriptor, Error> {
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", params.method)))?;
    RequestDescriptor::new(method, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))
}

/// Implementation of the proxy_fetch tool.
///
/// Requests the router passes through are sent straight to `network`.
pub async fn proxy_fetch_impl(
    router: &Router, network: &dyn Network, timeout: Duration, params: ProxyFetchParams,
) -> Result<CallToolResult, McpError> {
    let request = parse_request(&params)?;

    let output = match router.handle(&request).await {
        Disposition::Passthrough => {
            let output = ProxyFetchOutput::new(&request, "passthrough");
            match fetch_within(network, &request, timeout).await {
                Ok(response) => output.with_response(&response),
                Err(e) => output.with_error(&e),
            }
        }
        Disposition::Handled { tag, outcome } => {
            let mut output = ProxyFetchOutput::new(&request, outcome.kind());
            output.strategy = Some(tag.to_string());
            match &outcome {
                Outcome::Failed(e) => output.with_error(e),
                other => match other.response() {
                    Some(response) => output.with_response(response),
                    None => output,
                },
            }
        }
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

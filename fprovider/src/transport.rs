//! HTTP transport seam and the reqwest-based streaming implementation.

use std::pin::Pin;

use futures_core::Stream;
use serde_json::Value;

use crate::{ProviderError, ProviderFuture};

pub type ByteStream<'a> = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ProviderError>> + Send + 'a>>;

/// A JSON POST whose response body is consumed incrementally.
#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl HttpRequest {
    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names = self
            .headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>();
        f.debug_struct("HttpRequest")
            .field("url", &self.url)
            .field("headers", &header_names)
            .finish_non_exhaustive()
    }
}

/// Sends a request and hands back the body as raw chunks.
///
/// Implementations must map a non-2xx status to [`ProviderError::protocol`] carrying the
/// raw body, and connection failures to [`ProviderError::transport`].
pub trait HttpTransport: Send + Sync + std::fmt::Debug {
    fn post_stream<'a>(
        &'a self,
        request: HttpRequest,
    ) -> ProviderFuture<'a, Result<ByteStream<'a>, ProviderError>>;
}

#[cfg(feature = "reqwest-transport")]
pub use reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest-transport")]
mod reqwest_transport {
    use async_stream::try_stream;
    use futures_util::StreamExt;
    use reqwest::Client;

    use super::{ByteStream, HttpRequest, HttpTransport};
    use crate::{ProviderError, ProviderFuture};

    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        pub fn new(client: Client) -> Self {
            Self { client }
        }
    }

    impl HttpTransport for ReqwestTransport {
        fn post_stream<'a>(
            &'a self,
            request: HttpRequest,
        ) -> ProviderFuture<'a, Result<ByteStream<'a>, ProviderError>> {
            Box::pin(async move {
                let mut builder = self.client.post(&request.url).json(&request.body);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }

                let response = builder
                    .send()
                    .await
                    .map_err(|err| ProviderError::transport(err.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ProviderError::protocol(status.as_u16(), body));
                }

                let stream = try_stream! {
                    let mut chunks = response.bytes_stream();
                    while let Some(chunk) = chunks.next().await {
                        let bytes = chunk.map_err(|err| ProviderError::transport(err.to_string()))?;
                        yield bytes.to_vec();
                    }
                };

                Ok(Box::pin(stream) as ByteStream<'a>)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = HttpRequest::post_json("https://example.test", json!({}))
            .with_header("X-Api-Key", "secret");

        assert_eq!(request.header("x-api-key"), Some("secret"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("authorization"), None);
    }

    #[test]
    fn debug_output_omits_header_values() {
        let request = HttpRequest::post_json("https://example.test", json!({}))
            .with_header("authorization", "Bearer sk-secret");

        let rendered = format!("{request:?}");
        assert!(rendered.contains("authorization"));
        assert!(!rendered.contains("sk-secret"));
    }
}

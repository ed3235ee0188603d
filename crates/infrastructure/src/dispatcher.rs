//! Reqwest dispatcher adapter
//!
//! Implements the [`Dispatcher`] port with a pooled `reqwest::Client`.
//! Client-level settings (redirect policy, TLS verification, proxy)
//! are fixed when the adapter is built; the per-request timeout comes
//! from the dispatch options on every call.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Proxy};
use tracing::debug;

use convoy_application::dispatch::{DispatchOptions, Dispatcher, HttpResponse};
use convoy_application::error::TransportError;
use convoy_application::prepare::{MultipartValue, WireBody, WireRequest};
use convoy_domain::HttpMethod;

/// The production HTTP dispatcher.
pub struct ReqwestDispatcher {
    client: Client,
    max_redirects: u32,
}

impl ReqwestDispatcher {
    /// Builds a client from the given transport options.
    ///
    /// # Errors
    ///
    /// [`TransportError::ProtocolError`] when the client cannot be
    /// constructed, e.g. an invalid proxy URL.
    pub fn new(options: &DispatchOptions) -> Result<Self, TransportError> {
        let redirect = if options.follow_redirects {
            Policy::limited(options.max_redirects as usize)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder()
            .user_agent(concat!("convoy/", env!("CARGO_PKG_VERSION")))
            .redirect(redirect)
            .danger_accept_invalid_certs(!options.verify_tls);

        if let Some(proxy_url) = &options.proxy {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| TransportError::ProtocolError(format!("invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::ProtocolError(e.to_string()))?;

        Ok(Self {
            client,
            max_redirects: options.max_redirects,
        })
    }

    /// Wraps an existing client; redirects are whatever it was built with.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self {
            client,
            max_redirects: 0,
        }
    }

    const fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }

    /// Attaches the wire body, reading file-backed content lazily here
    /// rather than during preparation.
    async fn attach_body(
        builder: reqwest::RequestBuilder,
        body: &WireBody,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        match body {
            WireBody::Bytes(bytes) => Ok(builder.body(bytes.clone())),
            WireBody::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    TransportError::ProtocolError(format!("cannot read body file '{path}': {e}"))
                })?;
                Ok(builder.body(bytes))
            }
            WireBody::Multipart(fields) => {
                let mut form = reqwest::multipart::Form::new();
                for field in fields {
                    match &field.value {
                        MultipartValue::Text(text) => {
                            form = form.text(field.name.clone(), text.clone());
                        }
                        MultipartValue::FilePath(path) => {
                            let bytes = tokio::fs::read(path).await.map_err(|e| {
                                TransportError::ProtocolError(format!(
                                    "cannot read form file '{path}': {e}"
                                ))
                            })?;
                            let file_name = std::path::Path::new(path)
                                .file_name()
                                .map_or_else(|| path.clone(), |n| n.to_string_lossy().into_owned());
                            form = form.part(
                                field.name.clone(),
                                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
                            );
                        }
                    }
                }
                Ok(builder.multipart(form))
            }
        }
    }

    fn map_error(&self, error: &reqwest::Error, options: &DispatchOptions) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                timeout_ms: options.timeout.as_millis() as u64,
            };
        }

        let host = error
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("unknown")
            .to_string();
        let message = error.to_string();
        let lowered = message.to_lowercase();

        if error.is_connect() {
            if lowered.contains("dns") || lowered.contains("resolve") {
                return TransportError::DnsFailure { host };
            }
            if lowered.contains("refused") {
                return TransportError::ConnectionRefused { host };
            }
            if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("ssl")
            {
                return TransportError::TlsFailure(message);
            }
            return TransportError::ProtocolError(message);
        }

        if error.is_redirect() {
            return TransportError::TooManyRedirects {
                max: self.max_redirects,
            };
        }

        if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("ssl") {
            return TransportError::TlsFailure(message);
        }

        TransportError::ProtocolError(message)
    }
}

#[async_trait]
impl Dispatcher for ReqwestDispatcher {
    async fn dispatch(
        &self,
        request: &WireRequest,
        options: &DispatchOptions,
    ) -> Result<HttpResponse, TransportError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| TransportError::ProtocolError(format!("invalid URL '{}': {e}", request.url)))?;

        let mut builder = self
            .client
            .request(Self::method(request.method), url)
            .timeout(options.timeout);

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        if let Some(body) = &request.body {
            builder = Self::attach_body(builder, body).await?;
        }

        debug!(method = %request.method, url = %request.url, "sending");
        let start = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| self.map_error(&e, options))?;

        let status = response.status().as_u16();
        let reason = response
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string();
        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    v.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::ProtocolError(format!("failed to read body: {e}")))?
            .to_vec();

        Ok(HttpResponse {
            status,
            reason,
            headers,
            body,
            elapsed: start.elapsed(),
            final_url,
        })
    }
}

//! # cv-http
//!
//! `reqwest` implementation of the `ThreadApi` and `UserApi` ports against the
//! campvoiceus REST backend.
//!
//! Every authenticated call carries `Authorization: Bearer <token>`. Failures
//! are mapped onto `AppError`:
//!
//! | Failure                         | Variant           |
//! |---------------------------------|-------------------|
//! | 401 / 403                       | `Unauthorized`    |
//! | any other non-2xx               | `Server`          |
//! | connect, timeout, broken stream | `Network`         |
//! | undecodable 2xx body            | `InvalidResponse` |

mod threads;
mod users;

use std::time::Duration;

use cv_core::{AppError, Attachment, Result, Session};
use reqwest::multipart::Part;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

/// HTTP client for the campvoiceus backend.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base: Url,
    client: Client,
}

impl HttpApi {
    /// `base_url` is the API root, e.g. `http://localhost:3000/api/`.
    /// Without `timeout` requests wait as long as the transport allows.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = Client::builder().user_agent(concat!("campvoice/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base,
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolves `path` against the base, appending `segments` percent-encoded.
    fn endpoint(&self, path: &str, segments: &[&str]) -> Result<Url> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| AppError::Validation(format!("invalid endpoint {path}: {e}")))?;
        if !segments.is_empty() {
            let mut parts = url
                .path_segments_mut()
                .map_err(|_| AppError::Validation(format!("base url cannot carry a path: {}", self.base)))?;
            parts.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn authed(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder.bearer_auth(session.token())
    }

    /// Sends the request and rejects non-2xx statuses.
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(transport)?;
        check(response).await
    }

    /// Sends the request and discards any 2xx body.
    async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        self.send(builder).await.map(|_| ())
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let url = response.url().clone();
        let body = response.bytes().await.map_err(transport)?;
        serde_json::from_slice(&body).map_err(|e| {
            warn!(%url, error = %e, "undecodable response body");
            AppError::InvalidResponse(e.to_string())
        })
    }
}

fn transport(err: reqwest::Error) -> AppError {
    if err.is_decode() {
        return AppError::InvalidResponse(err.to_string());
    }
    AppError::Network(err.to_string())
}

/// Error body shapes the backend uses.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    debug!(%url, status = status.as_u16(), %message, "request rejected");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Unauthorized(message)),
        _ => Err(AppError::Server {
            status: status.as_u16(),
            message,
        }),
    }
}

fn file_part(attachment: &Attachment) -> Result<Part> {
    Part::bytes(attachment.bytes.clone())
        .file_name(attachment.file_name.clone())
        .mime_str(&attachment.mime)
        .map_err(|e| AppError::Validation(format!("invalid content type {}: {e}", attachment.mime)))
}

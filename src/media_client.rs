//! The HTTP client used to download media from the homeserver.
//!
//! Downloads are single-shot: there is no retry and no deduplication.
//! Each download runs as its own task on a Tokio runtime owned by the
//! [`HttpMediaClient`], and its result is handed to the caller's
//! completion callback on a background thread.

use std::time::Duration;

use reqwest::StatusCode;
use ruma::OwnedMxcUri;
use serde::Deserialize;
use tokio::{
    runtime::Runtime,
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
};

/// The callback invoked once a download has completed, successfully or not.
///
/// This is invoked on a background thread, never on the UI thread.
pub type DownloadCallback = Box<dyn FnOnce(Result<Vec<u8>, RequestError>) + Send + 'static>;

/// An error from a failed media request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RequestError {
    /// The HTTP status the server responded with, if we got a response at all.
    pub status: Option<StatusCode>,
    /// The server-reported error message, or a description of the transport failure.
    pub message: String,
}
impl RequestError {
    pub fn server(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status: Some(status), message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self { status: None, message: message.into() }
    }

    /// The numeric status code, which is `0` if no response was received.
    pub fn status_code(&self) -> u16 {
        self.status.map_or(0, |s| s.as_u16())
    }
}
impl From<reqwest::Error> for RequestError {
    fn from(error: reqwest::Error) -> Self {
        Self { status: error.status(), message: error.to_string() }
    }
}

/// A client that can download media given its URL.
pub trait MediaClient: Send + Sync {
    /// Starts downloading the media at `url` and returns immediately.
    ///
    /// `on_fetched` is invoked exactly once with the result.
    fn download(&self, url: &str, on_fetched: DownloadCallback);
}

/// The homeserver that `mxc://` URIs are resolved against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Homeserver {
    pub host: String,
    pub port: u16,
}

/// Converts an `mxc://` URI into an HTTP(S) download URL on the given homeserver.
///
/// Non-mxc URLs are returned unchanged.
pub fn mxc_to_http(url: &str, homeserver: &Homeserver) -> String {
    if !url.starts_with("mxc://") {
        return url.to_string();
    }
    let mxc_uri: OwnedMxcUri = url.into();
    match (mxc_uri.server_name(), mxc_uri.media_id()) {
        (Ok(origin), Ok(media_id)) => format!(
            "https://{}:{}/_matrix/media/v3/download/{origin}/{media_id}",
            homeserver.host,
            homeserver.port,
        ),
        _ => {
            tracing::warn!(target: "net", "invalid mxc uri: {url}");
            url.to_string()
        }
    }
}

/// The body of an error response from a Matrix homeserver.
#[derive(Deserialize)]
struct MatrixErrorBody {
    #[serde(default)]
    #[allow(dead_code)]
    errcode: String,
    error: String,
}

/// Extracts the server-reported error message from an error response body,
/// falling back to the status code's canonical reason.
fn error_message_from_body(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<MatrixErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Unknown error").to_string())
}


/// The set of requests that can be made to the media worker task.
enum MediaRequest {
    /// Download the media at the given (already resolved) HTTP(S) URL.
    Download {
        url: String,
        on_fetched: DownloadCallback,
    },
}

/// Settings used to construct an [`HttpMediaClient`].
#[derive(Clone, Debug)]
pub struct HttpMediaClientSettings {
    pub homeserver: Homeserver,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

/// A [`MediaClient`] that downloads media over HTTP(S) using `reqwest`.
pub struct HttpMediaClient {
    homeserver: Homeserver,
    request_sender: UnboundedSender<MediaRequest>,
    /// Kept alive for as long as this client exists.
    _runtime: Runtime,
}

impl HttpMediaClient {
    /// Creates a Tokio runtime and starts the media worker task on it.
    pub fn start(settings: HttpMediaClientSettings) -> anyhow::Result<Self> {
        let runtime = Runtime::new()?;
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        let (request_sender, receiver) = tokio::sync::mpsc::unbounded_channel::<MediaRequest>();
        let _worker = runtime.spawn(media_worker(receiver, http, settings.access_token));

        Ok(Self {
            homeserver: settings.homeserver,
            request_sender,
            _runtime: runtime,
        })
    }
}

impl MediaClient for HttpMediaClient {
    fn download(&self, url: &str, on_fetched: DownloadCallback) {
        let request = MediaRequest::Download {
            url: mxc_to_http(url, &self.homeserver),
            on_fetched,
        };
        if let Err(tokio::sync::mpsc::error::SendError(request)) = self.request_sender.send(request) {
            tracing::error!(target: "net", "BUG: media worker task receiver has died!");
            let MediaRequest::Download { on_fetched, .. } = request;
            on_fetched(Err(RequestError::transport("media worker is not running")));
        }
    }
}

/// The entry point for the media worker task.
///
/// All this task does is wait for [`MediaRequest`]s from the UI thread
/// and spawn a separate task to carry out each one.
async fn media_worker(
    mut receiver: UnboundedReceiver<MediaRequest>,
    http: reqwest::Client,
    access_token: Option<String>,
) {
    tracing::debug!(target: "net", "media worker task started");
    while let Some(request) = receiver.recv().await {
        match request {
            MediaRequest::Download { url, on_fetched } => {
                let http = http.clone();
                let access_token = access_token.clone();
                let _fetch_task = tokio::spawn(async move {
                    tracing::debug!(target: "net", "Downloading media from {url}");
                    let result = fetch_media(&http, &url, access_token.as_deref()).await;
                    deliver(&url, result, on_fetched).await;
                });
            }
        }
    }
    tracing::debug!(target: "net", "media worker task ended");
}

/// Hands a download result to its callback on the blocking thread pool,
/// since the callback may decode the image, which is CPU-bound work.
async fn deliver(url: &str, result: Result<Vec<u8>, RequestError>, on_fetched: DownloadCallback) {
    if let Err(e) = tokio::task::spawn_blocking(move || on_fetched(result)).await {
        tracing::warn!(target: "net", "Completion callback for {url} did not finish: {e}");
    }
}

async fn fetch_media(
    http: &reqwest::Client,
    url: &str,
    access_token: Option<&str>,
) -> Result<Vec<u8>, RequestError> {
    let mut request = http.get(url);
    if let Some(token) = access_token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.bytes().await.unwrap_or_default();
        return Err(RequestError::server(status, error_message_from_body(status, &body)));
    }
    Ok(response.bytes().await?.to_vec())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::WarningCounter;

    fn homeserver() -> Homeserver {
        Homeserver { host: "matrix.example.org".into(), port: 8448 }
    }

    #[test]
    fn test_mxc_to_http() {
        assert_eq!(
            mxc_to_http("mxc://example.org/abcDEF123", &homeserver()),
            "https://matrix.example.org:8448/_matrix/media/v3/download/example.org/abcDEF123",
        );
    }

    #[test]
    fn test_non_mxc_urls_pass_through() {
        assert_eq!(mxc_to_http("https://x/img.png", &homeserver()), "https://x/img.png");
        assert_eq!(mxc_to_http("ftp://x/img.png", &homeserver()), "ftp://x/img.png");
        assert_eq!(mxc_to_http("", &homeserver()), "");
    }

    #[test]
    fn test_malformed_mxc_passes_through() {
        assert_eq!(mxc_to_http("mxc://missing-media-id", &homeserver()), "mxc://missing-media-id");
    }

    #[test]
    fn test_error_message_from_body() {
        let body = br#"{"errcode":"M_NOT_FOUND","error":"Media not found"}"#;
        assert_eq!(error_message_from_body(StatusCode::NOT_FOUND, body), "Media not found");
        assert_eq!(error_message_from_body(StatusCode::BAD_GATEWAY, b"<html>"), "Bad Gateway");
    }

    #[test]
    fn test_panicking_callback_is_logged() {
        let warnings = WarningCounter::new();
        let runtime = Runtime::new().unwrap();
        warnings.run(|| runtime.block_on(deliver(
            "https://x/img.png",
            Ok(Vec::new()),
            Box::new(|_: Result<Vec<u8>, RequestError>| panic!("callback failed")),
        )));
        assert_eq!(warnings.count("net"), 1);
    }

    #[test]
    fn test_status_code() {
        assert_eq!(RequestError::server(StatusCode::FORBIDDEN, "nope").status_code(), 403);
        assert_eq!(RequestError::transport("connection refused").status_code(), 0);
    }
}

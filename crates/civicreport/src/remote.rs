//! Hosted backend speaking a Supabase-style REST API.
//!
//! One [`RestBackend`] serves as both collaborators:
//!
//! - objects: `POST {base}/storage/v1/object/{bucket}/{path}`, served from
//!   `{base}/storage/v1/object/public/{bucket}/{path}`
//! - records: `POST {base}/rest/v1/{table}` with a JSON body
//!
//! Every request carries the project's API key both as `apikey` and as a
//! bearer token. Object paths are appended segment by segment, so characters
//! such as `?` or `#` are percent-encoded instead of ending the path.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, Url};
use tracing::debug;

use crate::error::{Error, Result};
use crate::issue::{Attachment, PersistedIssueInput};
use crate::store::{validate_object_path, ObjectStore, RecordStore, StoreError, StoredObject};

/// Client for the hosted storage and database endpoints.
#[derive(Clone)]
pub struct RestBackend {
    http: Client,
    base_url: Url,
    api_key: String,
    bucket: String,
}

impl fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.base_url.as_str())
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl RestBackend {
    /// Create a backend for the project at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL or the
    /// HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        bucket: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url).map_err(|e| Error::ConfigValidation {
            message: format!("invalid remote url '{base_url}': {e}"),
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::ConfigValidation {
                message: format!("remote url must be an http(s) URL, got '{base_url}'"),
            });
        }

        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: parsed,
            api_key: api_key.into(),
            bucket: bucket.into(),
        })
    }

    /// `base_url` extended with `prefix` and then each `/`-separated part of
    /// `path`, every segment percent-encoded.
    fn endpoint(&self, prefix: &[&str], path: &str) -> Url {
        let mut url = self.base_url.clone();
        // Cannot fail: `new` only accepts URLs that can be a base.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(prefix)
                .extend(path.split('/'));
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Turn a non-2xx response into [`StoreError::Rejected`].
    async fn check(response: Response) -> std::result::Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message: if message.is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                message
            },
        })
    }
}

#[async_trait]
impl ObjectStore for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn upload(
        &self,
        path: &str,
        attachment: &Attachment,
    ) -> std::result::Result<StoredObject, StoreError> {
        validate_object_path(path)?;
        let url = self.endpoint(&["storage", "v1", "object", self.bucket.as_str()], path);
        let content_type = mime_guess::from_path(attachment.file_name()).first_or_octet_stream();

        debug!("POST {url} ({} bytes, {content_type})", attachment.len());
        let response = self
            .authorized(self.http.post(url))
            .header(CONTENT_TYPE, content_type.as_ref())
            .body(attachment.bytes().to_vec())
            .send()
            .await?;
        Self::check(response).await?;

        Ok(StoredObject {
            path: path.to_string(),
        })
    }

    fn public_url(&self, path: &str) -> String {
        self.endpoint(&["storage", "v1", "object", "public", self.bucket.as_str()], path)
            .to_string()
    }
}

#[async_trait]
impl RecordStore for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn insert(
        &self,
        table: &str,
        record: &PersistedIssueInput,
    ) -> std::result::Result<(), StoreError> {
        let url = self.endpoint(&["rest", "v1"], table);
        debug!("POST {url}");
        let response = self
            .authorized(self.http.post(url))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;
    use crate::issue::Department;
    use crate::store::ISSUES_TABLE;

    #[derive(Debug, Default)]
    struct Seen {
        uploads: Vec<(String, String, usize)>,
        inserts: Vec<serde_json::Value>,
        api_keys: Vec<String>,
    }

    type Shared = Arc<Mutex<Seen>>;

    async fn upload_handler(
        State(seen): State<Shared>,
        Path((bucket, path)): Path<(String, String)>,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        if path.contains("reject") {
            return StatusCode::PAYLOAD_TOO_LARGE;
        }
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let mut seen = seen.lock().unwrap();
        seen.uploads
            .push((format!("{bucket}/{path}"), content_type, body.len()));
        if let Some(key) = headers.get("apikey").and_then(|v| v.to_str().ok()) {
            seen.api_keys.push(key.to_string());
        }
        StatusCode::OK
    }

    async fn insert_handler(
        State(seen): State<Shared>,
        Path(table): Path<String>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, String) {
        if table != ISSUES_TABLE {
            return (StatusCode::NOT_FOUND, "relation does not exist".to_string());
        }
        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if bearer != "Bearer anon-key" {
            return (StatusCode::UNAUTHORIZED, String::new());
        }
        seen.lock().unwrap().inserts.push(body);
        (StatusCode::CREATED, String::new())
    }

    async fn spawn_server() -> (String, Shared) {
        let seen = Shared::default();
        let app = Router::new()
            .route("/storage/v1/object/:bucket/*path", post(upload_handler))
            .route("/rest/v1/:table", post(insert_handler))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    fn backend(base_url: &str) -> RestBackend {
        RestBackend::new(base_url, "anon-key", "issue-media", Duration::from_secs(5)).unwrap()
    }

    fn record() -> PersistedIssueInput {
        PersistedIssueInput {
            user_id: "user-1".to_string(),
            title: "Garbage not collected".to_string(),
            description: "Three days now".to_string(),
            department: Department::Sanitation,
            location_name: "Ward 12".to_string(),
            latitude: 22.57,
            longitude: 88.36,
            media_urls: vec!["https://x/1.jpg".to_string()],
        }
    }

    #[test]
    fn test_debug_hides_api_key() {
        let debug_str = format!("{:?}", backend("https://project.example.co"));
        assert!(debug_str.contains("project.example.co"));
        assert!(!debug_str.contains("anon-key"));
    }

    #[test]
    fn test_public_url() {
        let backend = backend("https://project.example.co/");
        assert_eq!(
            backend.public_url("user-1/1700-0.jpg"),
            "https://project.example.co/storage/v1/object/public/issue-media/user-1/1700-0.jpg"
        );
    }

    #[tokio::test]
    async fn test_upload_posts_bytes_with_content_type() {
        let (url, seen) = spawn_server().await;
        let backend = backend(&url);
        let attachment = Attachment::new("pothole.png", vec![7; 32]);

        let stored = backend
            .upload("user-1/1700-0.png", &attachment)
            .await
            .unwrap();
        assert_eq!(stored.path, "user-1/1700-0.png");

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.uploads,
            vec![(
                "issue-media/user-1/1700-0.png".to_string(),
                "image/png".to_string(),
                32
            )]
        );
        assert_eq!(seen.api_keys, vec!["anon-key".to_string()]);
    }

    #[test]
    fn test_public_url_encodes_reserved_characters() {
        let backend = backend("https://project.example.co");
        assert_eq!(
            backend.public_url("a?x/1700-0#.jpg"),
            "https://project.example.co/storage/v1/object/public/issue-media/a%3Fx/1700-0%23.jpg"
        );
        assert_ne!(
            backend.public_url("a?x/1700-0.jpg"),
            backend.public_url("a?y/1700-0.jpg")
        );
    }

    #[test]
    fn test_public_url_keeps_base_path() {
        let backend = backend("https://gateway.example.co/project/");
        assert_eq!(
            backend.public_url("u/1-0.png"),
            "https://gateway.example.co/project/storage/v1/object/public/issue-media/u/1-0.png"
        );
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let timeout = Duration::from_secs(5);
        for bad in ["not a url", "mailto:ops@example.co", "ftp://files.example.co"] {
            let err = RestBackend::new(bad, "anon-key", "issue-media", timeout).unwrap_err();
            assert!(err.is_config_error(), "{bad}: {err}");
        }
    }

    #[tokio::test]
    async fn test_upload_with_reserved_characters_keeps_whole_path() {
        let (url, seen) = spawn_server().await;
        let backend = backend(&url);
        let attachment = Attachment::new("pothole.jpg", vec![1; 4]);

        backend
            .upload("user?1/1700-0.jpg", &attachment)
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.uploads[0].0, "issue-media/user?1/1700-0.jpg");
    }

    #[tokio::test]
    async fn test_upload_rejection_carries_status() {
        let (url, _seen) = spawn_server().await;
        let backend = backend(&url);
        let attachment = Attachment::new("huge.mp4", vec![0; 8]);

        let err = backend
            .upload("user-1/reject-0.mp4", &attachment)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 413, .. }));
    }

    #[tokio::test]
    async fn test_insert_posts_json_record() {
        let (url, seen) = spawn_server().await;
        let backend = backend(&url);

        RecordStore::insert(&backend, ISSUES_TABLE, &record())
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.inserts.len(), 1);
        let body = &seen.inserts[0];
        assert_eq!(body["department"], "sanitation");
        assert_eq!(body["location_name"], "Ward 12");
        assert_eq!(body["media_urls"][0], "https://x/1.jpg");
    }

    #[tokio::test]
    async fn test_insert_unknown_table_is_rejected() {
        let (url, _seen) = spawn_server().await;
        let backend = backend(&url);

        let err = RecordStore::insert(&backend, "users", &record())
            .await
            .unwrap_err();
        match err {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("relation does not exist"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let backend = backend("http://127.0.0.1:1");
        let err = RecordStore::insert(&backend, ISSUES_TABLE, &record())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}

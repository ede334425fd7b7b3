//! HTTP client for the remote cycle store.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use cycletrack_core::cycles::CycleRecord;
use cycletrack_core::errors::RemoteStoreError;
use cycletrack_core::sync::RemoteStore;

use crate::types::CycleRow;
use crate::RemoteConfig;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

fn transport_from(err: reqwest::Error) -> RemoteStoreError {
    RemoteStoreError::transport(err.status().map(|s| s.as_u16()), err.to_string())
}

/// Client for a PostgREST-style `cycles` endpoint.
///
/// A single failed attempt is surfaced as-is; retry policy (there is none in
/// this system) belongs to the caller.
#[derive(Debug, Clone)]
pub struct RemoteCycleClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RemoteCycleClient {
    pub fn new(config: RemoteConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        }
    }

    fn cycles_url(&self) -> String {
        format!("{}/cycles", self.base_url)
    }

    fn cycles_url_for(&self, id: &str) -> String {
        format!("{}/cycles?id=eq.{}", self.base_url, urlencoding::encode(id))
    }

    /// Create headers for an API request. Inserts ask the server to return
    /// the created representation.
    fn headers(&self, returning: bool) -> Result<HeaderMap, RemoteStoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key_value = HeaderValue::from_str(&self.api_key).map_err(|_| {
            RemoteStoreError::transport(None, "API key is not a valid header value")
        })?;
        headers.insert("apikey", key_value);

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(
            |_| RemoteStoreError::transport(None, "API key is not a valid header value"),
        )?;
        headers.insert(AUTHORIZATION, auth_value);

        if returning {
            headers.insert("prefer", HeaderValue::from_static("return=representation"));
        }
        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("remote response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("remote response error ({}): {}", status, preview);
    }

    /// Parse a JSON response body, mapping non-2xx to a transport failure
    /// carrying the status and unparseable bodies to a shape failure.
    async fn parse_rows<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RemoteStoreError> {
        let status = response.status();
        let body = response.text().await.map_err(transport_from)?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(RemoteStoreError::transport(
                Some(status.as_u16()),
                format!("HTTP {}: {}", status.as_u16(), body.trim()),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| RemoteStoreError::shape(format!("failed to parse response: {}", e)))
    }

    /// Check the status of a response whose body carries nothing we need.
    async fn expect_success(response: reqwest::Response) -> Result<(), RemoteStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Self::log_response(status, &body);
        Err(RemoteStoreError::transport(
            Some(status.as_u16()),
            format!("HTTP {}: {}", status.as_u16(), body.trim()),
        ))
    }
}

#[async_trait]
impl RemoteStore for RemoteCycleClient {
    async fn fetch_all(&self) -> Result<Vec<CycleRecord>, RemoteStoreError> {
        let url = format!("{}?order=start_date.asc", self.cycles_url());
        let response = self
            .client
            .get(&url)
            .headers(self.headers(false)?)
            .send()
            .await
            .map_err(transport_from)?;

        let rows: Vec<CycleRow> = Self::parse_rows(response).await?;
        rows.into_iter().map(CycleRow::into_record).collect()
    }

    async fn create(&self, record: &CycleRecord) -> Result<CycleRecord, RemoteStoreError> {
        let response = self
            .client
            .post(self.cycles_url())
            .headers(self.headers(true)?)
            .json(&CycleRow::from_record(record))
            .send()
            .await
            .map_err(transport_from)?;

        // PostgREST wraps the created row in a one-element array.
        let mut rows: Vec<CycleRow> = Self::parse_rows(response).await?;
        if rows.is_empty() {
            return Err(RemoteStoreError::shape("insert returned no rows"));
        }
        rows.remove(0).into_record()
    }

    async fn update(&self, id: &str, record: &CycleRecord) -> Result<(), RemoteStoreError> {
        let response = self
            .client
            .patch(self.cycles_url_for(id))
            .headers(self.headers(false)?)
            .json(&CycleRow::from_record(record))
            .send()
            .await
            .map_err(transport_from)?;

        Self::expect_success(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteStoreError> {
        let response = self
            .client
            .delete(self.cycles_url_for(id))
            .headers(self.headers(false)?)
            .send()
            .await
            .map_err(transport_from)?;

        Self::expect_success(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex as TokioMutex;

    use chrono::NaiveDate;
    use cycletrack_core::cycles::{CycleId, CycleInput, Flow};

    #[derive(Debug, Clone)]
    struct CapturedRequest {
        request_line: String,
        headers: HashMap<String, String>,
        body: String,
    }

    fn header_end_offset(buffer: &[u8]) -> Option<usize> {
        buffer.windows(4).position(|window| window == b"\r\n\r\n")
    }

    async fn read_http_request(stream: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
        let mut buffer = Vec::new();
        loop {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                return None;
            }
            buffer.extend_from_slice(&chunk[..read]);
            if header_end_offset(&buffer).is_some() {
                break;
            }
        }

        let header_end = header_end_offset(&buffer)?;
        let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
        let mut lines = head.lines();
        let request_line = lines.next()?.to_string();

        let mut headers = HashMap::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let content_length = headers
            .get("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);

        let mut body = buffer[header_end + 4..].to_vec();
        while body.len() < content_length {
            let mut chunk = [0_u8; 2048];
            let read = stream.read(&mut chunk).await.ok()?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }

        Some(CapturedRequest {
            request_line,
            headers,
            body: String::from_utf8_lossy(&body).to_string(),
        })
    }

    async fn write_http_response(
        stream: &mut tokio::net::TcpStream,
        status: u16,
        body: &str,
    ) -> std::io::Result<()> {
        let response = format!(
            "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await?;
        stream.flush().await
    }

    async fn start_mock_server(
        responses: Vec<(u16, String)>,
    ) -> (
        RemoteCycleClient,
        Arc<TokioMutex<Vec<CapturedRequest>>>,
        tokio::task::JoinHandle<()>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let captured = Arc::new(TokioMutex::new(Vec::new()));
        let scripted = Arc::new(TokioMutex::new(VecDeque::from(responses)));
        let captured_clone = Arc::clone(&captured);

        let handle = tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(value) => value,
                    Err(_) => break,
                };
                let Some(request) = read_http_request(&mut stream).await else {
                    continue;
                };
                captured_clone.lock().await.push(request);
                let (status, body) = scripted
                    .lock()
                    .await
                    .pop_front()
                    .unwrap_or((500, "{}".to_string()));
                let _ = write_http_response(&mut stream, status, &body).await;
            }
        });

        let client = RemoteCycleClient::new(RemoteConfig::new(
            format!("http://{}", addr),
            "test-key",
        ));
        (client, captured, handle)
    }

    fn sample_record() -> CycleRecord {
        CycleInput {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            flow: Flow::Heavy,
            symptoms: vec!["cramps".to_string()],
            ..Default::default()
        }
        .into_record(CycleId::Local(1), true)
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_all_requests_start_date_order_and_maps_rows() {
        let body = r#"[
            {"id":1,"start_date":"2024-01-01","end_date":"2024-01-05","flow":"light",
             "symptoms":["cramps"],"pre_symptoms":[],"notes":"","length":5},
            {"id":2,"start_date":"2024-02-01","end_date":"2024-02-06"}
        ]"#;
        let (client, captured, server) = start_mock_server(vec![(200, body.to_string())]).await;

        let records = client.fetch_all().await.expect("fetch success");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, CycleId::Remote("1".to_string()));
        assert_eq!(records[0].flow, Flow::Light);
        // Row 2 has no length column; it is recomputed from the dates.
        assert_eq!(records[1].length, 6);

        let requests = captured.lock().await.clone();
        assert!(requests[0].request_line.starts_with("GET "));
        assert!(requests[0].request_line.contains("order=start_date.asc"));
        assert_eq!(requests[0].headers.get("apikey").unwrap(), "test-key");
        assert_eq!(
            requests[0].headers.get("authorization").unwrap(),
            "Bearer test-key"
        );

        server.abort();
    }

    #[tokio::test]
    async fn non_2xx_is_a_transport_failure_with_the_status() {
        let (client, _captured, server) =
            start_mock_server(vec![(503, r#"{"message":"down"}"#.to_string())]).await;

        let err = client.fetch_all().await.expect_err("failure expected");
        assert_eq!(err.status_code(), Some(503));
        assert!(matches!(err, RemoteStoreError::Transport { .. }));

        server.abort();
    }

    #[tokio::test]
    async fn unparseable_body_is_a_shape_failure() {
        let (client, _captured, server) =
            start_mock_server(vec![(200, "not json".to_string())]).await;

        let err = client.fetch_all().await.expect_err("failure expected");
        assert!(matches!(err, RemoteStoreError::Shape(_)));
        assert_eq!(err.status_code(), None);

        server.abort();
    }

    #[tokio::test]
    async fn create_unwraps_the_array_wrapped_row() {
        let body = r#"[{"id":101,"start_date":"2024-01-01","end_date":"2024-01-05",
            "flow":"heavy","symptoms":["cramps"],"pre_symptoms":[],"notes":"","length":5}]"#;
        let (client, captured, server) = start_mock_server(vec![(201, body.to_string())]).await;

        let created = client.create(&sample_record()).await.expect("create");
        assert_eq!(created.id, CycleId::Remote("101".to_string()));
        assert!(!created.pending_sync);

        let requests = captured.lock().await.clone();
        assert!(requests[0].request_line.starts_with("POST "));
        assert_eq!(
            requests[0].headers.get("prefer").unwrap(),
            "return=representation"
        );
        // The payload is the remote schema, without id or local-only state.
        let payload: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(payload["start_date"], "2024-01-01");
        assert!(payload.get("id").is_none());

        server.abort();
    }

    #[tokio::test]
    async fn create_with_empty_insert_response_is_a_shape_failure() {
        let (client, _captured, server) = start_mock_server(vec![(201, "[]".to_string())]).await;
        let err = client.create(&sample_record()).await.expect_err("failure");
        assert!(matches!(err, RemoteStoreError::Shape(_)));
        server.abort();
    }

    #[tokio::test]
    async fn update_and_delete_filter_by_encoded_id() {
        let (client, captured, server) =
            start_mock_server(vec![(204, String::new()), (204, String::new())]).await;

        client
            .update("a b", &sample_record())
            .await
            .expect("update");
        client.delete("a b").await.expect("delete");

        let requests = captured.lock().await.clone();
        assert!(requests[0].request_line.starts_with("PATCH "));
        assert!(requests[0].request_line.contains("/cycles?id=eq.a%20b"));
        assert!(requests[1].request_line.starts_with("DELETE "));
        assert!(requests[1].request_line.contains("id=eq.a%20b"));

        server.abort();
    }
}

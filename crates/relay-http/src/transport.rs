//! reqwest-backed download transport.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::Response;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use relay_actions::{DownloadRequest, DownloadTransport};
use relay_core::{DownloadConfig, DownloadReceipt, TransportError};

use crate::response::{
    fallback_file_name, file_name_from_disposition, form_fields, parse_error_envelope,
    request_token, truncate_body,
};

/// POSTs report requests as forms and saves the returned file.
pub struct HttpDownloadTransport {
    client: reqwest::Client,
    base_url: String,
    output_dir: PathBuf,
}

impl HttpDownloadTransport {
    pub fn new(config: &DownloadConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("relay/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(network)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            output_dir: config.resolved_output_dir(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Absolute URLs are used as-is, paths are joined onto the base URL.
    pub fn endpoint(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    async fn save_attachment(
        &self,
        response: Response,
        file_name: String,
    ) -> Result<DownloadReceipt, TransportError> {
        self.save_stream(Vec::new(), Box::pin(response.bytes_stream()), file_name)
            .await
    }

    /// A response without an attachment name is either the error envelope or
    /// an unnamed file.
    ///
    /// Only a body that opens with `{` and ends within [`SNIFF_LIMIT`] bytes is
    /// buffered and checked; everything else streams straight to disk.
    async fn save_unnamed(
        &self,
        response: Response,
        token: &str,
        data: &Map<String, Value>,
    ) -> Result<DownloadReceipt, TransportError> {
        let mut stream = Box::pin(response.bytes_stream());
        let mut head = Vec::new();
        let mut complete = false;

        while may_be_envelope(&head) && head.len() < SNIFF_LIMIT {
            match stream.next().await {
                Some(chunk) => head.extend_from_slice(&chunk.map_err(network)?),
                None => {
                    complete = true;
                    break;
                }
            }
        }

        if complete {
            if let Some(info) = std::str::from_utf8(&head)
                .ok()
                .and_then(parse_error_envelope)
            {
                return Err(TransportError::Server(info));
            }
        }

        self.save_stream(head, stream, fallback_file_name(token, data))
            .await
    }

    /// Write `head` and the rest of `stream` to a private `.part` file, then
    /// move it onto the first free variant of `file_name`.
    async fn save_stream<S, B>(
        &self,
        head: Vec<u8>,
        stream: S,
        file_name: String,
    ) -> Result<DownloadReceipt, TransportError>
    where
        S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
        B: AsRef<[u8]>,
    {
        tokio::fs::create_dir_all(&self.output_dir).await.map_err(io)?;
        let partial = self
            .output_dir
            .join(format!(".relay-{}.part", Uuid::new_v4()));

        let size = match write_stream(&partial, head, stream).await {
            Ok(size) => size,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        let (path, file_name) = match reserve_path(&self.output_dir, &file_name).await {
            Ok(reserved) => reserved,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            let _ = tokio::fs::remove_file(&path).await;
            return Err(io(e));
        }

        Ok(DownloadReceipt {
            file_name: Some(file_name),
            path: Some(path),
            size,
        })
    }
}

#[async_trait]
impl DownloadTransport for HttpDownloadTransport {
    async fn get_file(&self, request: DownloadRequest) -> Result<DownloadReceipt, TransportError> {
        let token = request_token(&request.data);
        let endpoint = self.endpoint(&request.url);
        tracing::debug!(endpoint = %endpoint, token = %token, "Requesting report");

        let response = self
            .client
            .post(&endpoint)
            .form(&form_fields(&request.data, &token))
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Report endpoint refused request");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(file_name_from_disposition);

        let receipt = match file_name {
            Some(name) => self.save_attachment(response, name).await?,
            None => self.save_unnamed(response, &token, &request.data).await?,
        };
        tracing::debug!(path = ?receipt.path, size = receipt.size, "Report saved");
        Ok(receipt)
    }
}

/// Bodies buffered for the error-envelope check never exceed this.
const SNIFF_LIMIT: usize = 64 * 1024;

/// Give up on `name (N).ext` after this many taken names.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// True while nothing but whitespace or a leading `{` has been seen.
fn may_be_envelope(head: &[u8]) -> bool {
    match head.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b) => *b == b'{',
        None => true,
    }
}

async fn write_stream<S, B>(path: &Path, head: Vec<u8>, mut stream: S) -> Result<u64, TransportError>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut file = tokio::fs::File::create(path).await.map_err(io)?;
    file.write_all(&head).await.map_err(io)?;
    let mut size = head.len() as u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(network)?;
        let chunk = chunk.as_ref();
        file.write_all(chunk).await.map_err(io)?;
        size += chunk.len() as u64;
    }
    file.flush().await.map_err(io)?;
    Ok(size)
}

/// Claim `file_name` in `dir`, or `stem (1).ext`, `stem (2).ext`, ... when
/// taken. The claimed file is created empty so concurrent downloads never
/// pick the same name.
async fn reserve_path(dir: &Path, file_name: &str) -> Result<(PathBuf, String), TransportError> {
    let (stem, extension) = split_extension(file_name);

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = match attempt {
            0 => file_name.to_string(),
            n => format!("{} ({}){}", stem, n, extension),
        };
        let path = dir.join(&candidate);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => return Ok((path, candidate)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(io(e)),
        }
    }
    Err(TransportError::Io(format!(
        "no free file name for {} in {}",
        file_name,
        dir.display()
    )))
}

/// `report.tar.gz` splits as (`report.tar`, `.gz`); dotfiles keep their name.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(i) if i > 0 => file_name.split_at(i),
        _ => (file_name, ""),
    }
}

fn network(e: reqwest::Error) -> TransportError {
    TransportError::Network(e.to_string())
}

fn io(e: std::io::Error) -> TransportError {
    TransportError::Io(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn http_response(status: &str, headers: &[&str], body: &str) -> String {
        let mut out = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n", status, body.len());
        for header in headers {
            out.push_str(header);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.push_str(body);
        out
    }

    fn transport(base_url: &str, dir: &Path) -> HttpDownloadTransport {
        HttpDownloadTransport::new(&DownloadConfig {
            base_url: base_url.to_string(),
            url: "/get_reports".to_string(),
            output_dir: Some(dir.to_path_buf()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn no_partial_files(dir: &Path) -> bool {
        std::fs::read_dir(dir)
            .unwrap()
            .all(|entry| !entry.unwrap().file_name().to_string_lossy().ends_with(".part"))
    }

    fn attachment(name: &str, body: &str) -> String {
        http_response(
            "200 OK",
            &[&format!("Content-Disposition: attachment; filename=\"{}\"", name)],
            body,
        )
    }

    fn request(data: serde_json::Value) -> DownloadRequest {
        DownloadRequest {
            url: "/get_reports".to_string(),
            data: data.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_endpoint_joining() {
        let dir = tempfile::tempdir().unwrap();
        let transport = transport("http://localhost:8069/", dir.path());

        assert_eq!(transport.endpoint("/get_reports"), "http://localhost:8069/get_reports");
        assert_eq!(transport.endpoint("get_reports"), "http://localhost:8069/get_reports");
        assert_eq!(
            transport.endpoint("https://reports.example.com/x"),
            "https://reports.example.com/x"
        );
    }

    #[tokio::test]
    async fn test_attachment_is_saved_under_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let body = "PK-spreadsheet-bytes";
        let (base, server) = serve_once(http_response(
            "200 OK",
            &[
                "Content-Type: application/vnd.ms-excel",
                "Content-Disposition: attachment; filename*=UTF-8''Stock%20Report.xlsx",
            ],
            body,
        ))
        .await;

        let receipt = transport(&base, dir.path())
            .get_file(request(json!({
                "model": "stock.report",
                "options": "{\"tz\":\"UTC\"}",
                "output_format": "xlsx",
                "record_id": null,
            })))
            .await
            .unwrap();

        assert_eq!(receipt.file_name.as_deref(), Some("Stock Report.xlsx"));
        assert_eq!(receipt.size, body.len() as u64);
        let path = receipt.path.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), body);
        assert!(no_partial_files(dir.path()));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /get_reports "));
        assert!(raw.contains("model=stock.report"));
        assert!(raw.contains("options=%7B%22tz%22%3A%22UTC%22%7D"));
        assert!(raw.contains("record_id=null"));
        assert!(raw.contains("token="));
    }

    #[tokio::test]
    async fn test_escaped_envelope_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let body = "{&quot;code&quot;: 400, &quot;message&quot;: &quot;Bad Request&quot;, \
                    &quot;data&quot;: {&quot;name&quot;: &quot;UserError&quot;}}";
        let (base, _server) = serve_once(http_response(
            "200 OK",
            &["Content-Type: text/html; charset=utf-8"],
            body,
        ))
        .await;

        let err = transport(&base, dir.path())
            .get_file(request(json!({ "model": "m", "output_format": "xlsx" })))
            .await
            .unwrap_err();

        match err {
            TransportError::Server(info) => {
                assert_eq!(info.code, 400);
                assert_eq!(info.message, "Bad Request");
                assert_eq!(info.data["name"], "UserError");
            }
            other => panic!("expected server error, got {:?}", other),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unnamed_file_uses_fallback_name() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _server) =
            serve_once(http_response("200 OK", &["Content-Type: application/octet-stream"], "raw"))
                .await;

        let receipt = transport(&base, dir.path())
            .get_file(request(json!({ "token": "abc", "output_format": "xlsx" })))
            .await
            .unwrap();

        assert_eq!(receipt.file_name.as_deref(), Some("report-abc.xlsx"));
        assert_eq!(std::fs::read_to_string(dir.path().join("report-abc.xlsx")).unwrap(), "raw");
    }

    #[tokio::test]
    async fn test_same_name_twice_keeps_both_files() {
        let dir = tempfile::tempdir().unwrap();

        let mut receipts = Vec::new();
        for body in ["first", "second"] {
            let (base, _server) = serve_once(attachment("Stock Report.xlsx", body)).await;
            let receipt = transport(&base, dir.path())
                .get_file(request(json!({ "model": "m" })))
                .await
                .unwrap();
            receipts.push(receipt);
        }

        assert_eq!(receipts[0].file_name.as_deref(), Some("Stock Report.xlsx"));
        assert_eq!(receipts[1].file_name.as_deref(), Some("Stock Report (1).xlsx"));
        let first = receipts[0].path.clone().unwrap();
        let second = receipts[1].path.clone().unwrap();
        assert_eq!(std::fs::read_to_string(first).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(second).unwrap(), "second");
        assert!(no_partial_files(dir.path()));
    }

    #[tokio::test]
    async fn test_concurrent_same_name_downloads_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let (base_a, _a) = serve_once(attachment("report.pdf", "aaaa")).await;
        let (base_b, _b) = serve_once(attachment("report.pdf", "bbbb")).await;
        let transport_a = transport(&base_a, dir.path());
        let transport_b = transport(&base_b, dir.path());

        let (a, b) = tokio::join!(
            transport_a.get_file(request(json!({ "model": "m" }))),
            transport_b.get_file(request(json!({ "model": "m" }))),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.path, b.path);
        let mut contents = vec![
            std::fs::read_to_string(a.path.unwrap()).unwrap(),
            std::fs::read_to_string(b.path.unwrap()).unwrap(),
        ];
        contents.sort();
        assert_eq!(contents, ["aaaa", "bbbb"]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_unnamed_json_that_is_not_an_envelope_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{"rows": [1, 2, 3]}"#;
        let (base, _server) =
            serve_once(http_response("200 OK", &["Content-Type: application/json"], body)).await;

        let receipt = transport(&base, dir.path())
            .get_file(request(json!({ "token": "t1", "output_format": "json" })))
            .await
            .unwrap();

        assert_eq!(receipt.file_name.as_deref(), Some("report-t1.json"));
        assert_eq!(receipt.size, body.len() as u64);
        assert_eq!(std::fs::read_to_string(receipt.path.unwrap()).unwrap(), body);
        assert!(no_partial_files(dir.path()));
    }

    #[test]
    fn test_envelope_sniffing_stops_at_first_byte() {
        assert!(may_be_envelope(b""));
        assert!(may_be_envelope(b"  \n"));
        assert!(may_be_envelope(b" {\"code\""));
        assert!(!may_be_envelope(b"PK\x03\x04"));
        assert!(!may_be_envelope(b"\n%PDF-1.7"));
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("Stock Report.xlsx"), ("Stock Report", ".xlsx"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let dir = tempfile::tempdir().unwrap();
        let (base, _server) =
            serve_once(http_response("500 Internal Server Error", &[], "boom")).await;

        let err = transport(&base, dir.path())
            .get_file(request(json!({ "model": "m" })))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransportError::Status { status: 500, ref body } if body == "boom"
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = transport(&format!("http://{}", addr), dir.path())
            .get_file(request(json!({ "model": "m" })))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Network(_)));
    }
}

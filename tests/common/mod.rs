/*!
 * Common test utilities for the subtrans test suite
 */

use std::path::{Path, PathBuf};
use std::fs;
use std::sync::{Arc, Mutex};
use anyhow::Result;
use tempfile::TempDir;

use subtrans::{BatchOptions, Caption, RetryPolicy, TranslationEvent};

/// Route library logs to the test output; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Three well-formed cues
pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
";

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, SAMPLE_SRT)
}

/// `count` captions with ids "1".."count", one second apart
pub fn numbered_captions(count: usize) -> Vec<Caption> {
    (1..=count)
        .map(|i| {
            Caption::new(
                i.to_string(),
                &format!("00:00:{:02},000", i % 60),
                &format!("00:00:{:02},500", i % 60),
                format!("Line {}", i),
            )
        })
        .collect()
}

/// Options that never sleep between retries
pub fn test_options(batch_size: usize, max_concurrency: usize) -> BatchOptions {
    BatchOptions {
        batch_size,
        max_concurrency,
        source_language: "en".to_string(),
        target_language: "fr".to_string(),
        retry: RetryPolicy {
            max_retries: Some(10),
            backoff_base_ms: 0,
            max_backoff_ms: 0,
        },
    }
}

/// Observer that keeps every event it sees
#[derive(Default, Clone)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<TranslationEvent>>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<TranslationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn error_ids(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                TranslationEvent::Error { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }
}

impl subtrans::ProgressObserver for RecordingObserver {
    fn on_event(&self, event: &TranslationEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Serve a single HTTP response on a local port.
///
/// Returns the base URL and a handle resolving to the raw request that was received.
pub async fn serve_once(status_line: &'static str, body: String) -> Result<(String, tokio::task::JoinHandle<String>)> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);

            let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= header_end + 4 + content_length {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;

        String::from_utf8_lossy(&request).to_string()
    });

    Ok((url, handle))
}

/// A local address nothing is listening on
pub async fn closed_port_url() -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    drop(listener);
    Ok(url)
}

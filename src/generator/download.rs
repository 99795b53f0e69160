// Streamed artifact download with bounded exponential backoff

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{info, warn};

use super::errors::GenerationError;
use super::models::DownloadResult;

/// Retry bounds for downloads
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based): base * 2^(attempt-1), capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

pub struct Downloader {
    http: reqwest::Client,
    policy: RetryPolicy,
    read_timeout: Duration,
}

impl Downloader {
    pub fn new(http: reqwest::Client, policy: RetryPolicy) -> Self {
        Self {
            http,
            policy,
            read_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Download `url` to `dest`, retrying per policy.
    ///
    /// The body is written to `<dest>.part` and renamed only once complete and non-empty.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<DownloadResult, GenerationError> {
        info!("[Download] {} -> {}", url, dest.display());

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let part = part_path(dest);
        let max = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max {
            match self.attempt(url, &part).await {
                Ok(bytes) => {
                    fs::rename(&part, dest).await?;
                    info!(
                        "[Download] ✓ Saved {} ({} bytes, attempt {}/{})",
                        dest.display(),
                        bytes,
                        attempt,
                        max
                    );
                    return Ok(DownloadResult {
                        success: true,
                        path: dest.to_path_buf(),
                        bytes,
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    let _ = fs::remove_file(&part).await;
                    warn!("[Download] ✗ Attempt {}/{} failed: {}", attempt, max, e);
                    last_error = e;
                }
            }

            if attempt < max {
                let delay = self.policy.delay_for(attempt);
                info!("[Download] Retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(GenerationError::DownloadFailed {
            attempts: max,
            last_error,
        })
    }

    async fn attempt(&self, url: &str, part: &Path) -> Result<u64, String> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }
        if let Some(len) = response.content_length() {
            info!("[Download] Content-Length: {:.2} MB", len as f64 / (1024.0 * 1024.0));
        }

        let mut file = fs::File::create(part)
            .await
            .map_err(|e| format!("cannot create {}: {}", part.display(), e))?;
        let mut written: u64 = 0;

        loop {
            let chunk = timeout(self.read_timeout, response.chunk())
                .await
                .map_err(|_| format!("read timed out after {:?}", self.read_timeout))?
                .map_err(|e| format!("read failed: {}", e))?;
            let Some(chunk) = chunk else { break };
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("write failed: {}", e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| format!("flush failed: {}", e))?;

        if written == 0 {
            return Err("empty response body".to_string());
        }
        Ok(written)
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::client::build_http_client;
    use crate::generator::models::NetworkConfig;
    use crate::generator::test_support::{scratch_dir, MockServer, Reply};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// What a bare socket server does with each accepted connection
    enum Wire {
        /// Promise 100 bytes, send 5, close
        Truncated,
        /// Send headers and 3 bytes, then hold the connection open
        Stall,
        Full(&'static [u8]),
    }

    async fn wire_server(steps: Vec<Wire>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for step in steps {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut request = [0u8; 2048];
                let _ = socket.read(&mut request).await;
                match step {
                    Wire::Truncated => {
                        let _ = socket
                            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nhello")
                            .await;
                    }
                    Wire::Stall => {
                        let _ = socket
                            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nhel")
                            .await;
                        tokio::spawn(async move {
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            drop(socket);
                        });
                    }
                    Wire::Full(body) => {
                        let head = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            body.len()
                        );
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(body).await;
                    }
                }
            }
        });
        format!("http://{}/song.mp3", addr)
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        }
    }

    fn downloader(max_attempts: u32) -> Downloader {
        let http = build_http_client(&NetworkConfig::default(), None).unwrap();
        Downloader::new(http, fast_policy(max_attempts))
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(6), Duration::from_secs(60));
        assert_eq!(policy.delay_for(40), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_recovers_on_third_attempt() {
        let server = MockServer::start().await;
        server.script(
            "GET /song.mp3",
            vec![
                Reply::text(500, "boom"),
                Reply::text(503, "busy"),
                Reply::bytes(200, b"ID3-audio-bytes".to_vec()),
            ],
        );
        let dir = scratch_dir("download");
        let dest = dir.join("nested").join("out.mp3");

        let result = downloader(5)
            .download(&server.url("/song.mp3"), &dest)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.bytes, 15);
        assert_eq!(std::fs::read(&dest).unwrap(), b"ID3-audio-bytes");
        assert!(!part_path(&dest).exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_truncated_body_is_retried() {
        let url = wire_server(vec![Wire::Truncated, Wire::Truncated, Wire::Full(b"world")]).await;
        let dir = scratch_dir("download-truncated");
        let dest = dir.join("out.mp3");

        let result = downloader(5).download(&url, &dest).await.unwrap();
        assert_eq!(result.attempts, 3);
        assert_eq!(result.bytes, 5);
        assert_eq!(std::fs::read(&dest).unwrap(), b"world");
        assert!(!part_path(&dest).exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_stalled_read_times_out_and_retries() {
        let url = wire_server(vec![Wire::Stall, Wire::Full(b"audio")]).await;
        let dir = scratch_dir("download-stall");
        let dest = dir.join("out.mp3");

        let result = downloader(3)
            .with_read_timeout(Duration::from_millis(200))
            .download(&url, &dest)
            .await
            .unwrap();
        assert_eq!(result.attempts, 2);
        assert_eq!(std::fs::read(&dest).unwrap(), b"audio");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_empty_body_is_retried() {
        let server = MockServer::start().await;
        server.script(
            "GET /video.mp4",
            vec![Reply::bytes(200, Vec::new()), Reply::bytes(200, vec![1, 2, 3])],
        );
        let dir = scratch_dir("download-empty");
        let dest = dir.join("out.mp4");

        let result = downloader(3)
            .download(&server.url("/video.mp4"), &dest)
            .await
            .unwrap();
        assert_eq!(result.attempts, 2);
        assert_eq!(result.bytes, 3);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        let dir = scratch_dir("download-fail");
        let dest = dir.join("out.mp3");

        let err = downloader(3)
            .download(&server.url("/missing.mp3"), &dest)
            .await
            .unwrap_err();
        match err {
            GenerationError::DownloadFailed { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("404"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(server.hits("GET /missing.mp3"), 3);
        assert!(!dest.exists());
        let _ = std::fs::remove_dir_all(dir);
    }
}

//! Streaming artifact download with progress events

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::config::FetchSettings;
use crate::error::FetchError;
use crate::progress::ProgressSink;

// Emit a progress line every 8 MiB
const PROGRESS_STEP: u64 = 8 * 1024 * 1024;

/// Downloads a remote artifact to a local path
pub trait Fetch {
    /// Stream `url` into `destination`, returning the number of bytes written.
    /// A non-success status or a broken connection is a `FetchError`; on
    /// failure no partial file is left behind.
    fn download(
        &self,
        url: &str,
        destination: &Path,
        sink: &ProgressSink,
    ) -> impl Future<Output = Result<u64, FetchError>>;
}

/// `reqwest`-backed fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    inactivity_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            inactivity_timeout: Duration::from_secs(settings.inactivity_timeout_secs),
        })
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        destination: &Path,
        url: &str,
        sink: &ProgressSink,
    ) -> Result<u64, FetchError> {
        let io_err = |source| FetchError::Io {
            path: destination.to_path_buf(),
            source,
        };

        let total = response.content_length();
        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(io_err)?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_report: u64 = 0;

        loop {
            let chunk = match timeout(self.inactivity_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(source))) => {
                    return Err(FetchError::Stream {
                        url: url.to_string(),
                        source,
                    });
                }
                Ok(None) => break,
                Err(_) => {
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                        secs: self.inactivity_timeout.as_secs(),
                    });
                }
            };

            file.write_all(&chunk).await.map_err(io_err)?;
            downloaded += chunk.len() as u64;

            if downloaded - last_report >= PROGRESS_STEP {
                sink.info(progress_line(downloaded, total));
                last_report = downloaded;
            }
        }

        file.flush().await.map_err(io_err)?;
        Ok(downloaded)
    }
}

impl Fetch for HttpFetcher {
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        sink: &ProgressSink,
    ) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Connect {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| FetchError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        match self.stream_to_file(response, destination, url, sink).await {
            Ok(bytes) => {
                sink.info(format!(
                    "Downloaded {:.1} MB to {}",
                    bytes as f64 / 1_048_576.0,
                    destination.display()
                ));
                Ok(bytes)
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(destination).await
                    && remove_err.kind() != std::io::ErrorKind::NotFound
                {
                    log::warn!(
                        "Failed to remove partial download {}: {remove_err}",
                        destination.display()
                    );
                }
                Err(e)
            }
        }
    }
}

fn progress_line(downloaded: u64, total: Option<u64>) -> String {
    let mb_downloaded = downloaded as f64 / 1_048_576.0;
    match total {
        Some(total) if total > 0 => format!(
            "Downloading... {:.1} MB / {:.1} MB ({}%)",
            mb_downloaded,
            total as f64 / 1_048_576.0,
            downloaded * 100 / total
        ),
        _ => format!("Downloading... {mb_downloaded:.1} MB"),
    }
}

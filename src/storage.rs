use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::video::{VideoError, VideoOutput};

/// URL prefix under which the video directory is served.
pub const PUBLIC_PREFIX: &str = "/videos";

/// Local directory of generated clips, exposed under [`PUBLIC_PREFIX`].
#[derive(Debug, Clone)]
pub struct VideoStore {
    dir: PathBuf,
}

impl VideoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), VideoError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn filename(scenario_id: i64, timestamp_ms: i64) -> String {
        format!("video-{}-{}.mp4", scenario_id, timestamp_ms)
    }

    pub fn public_path(filename: &str) -> String {
        format!("{}/{}", PUBLIC_PREFIX, filename)
    }

    /// Maps a `/videos/<file>` path back to the file on disk. Anything that
    /// is not a plain file name directly under the prefix yields `None`.
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let name = public_path.strip_prefix(PUBLIC_PREFIX)?.strip_prefix('/')?;
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return None;
        }
        Some(self.dir.join(name))
    }

    /// Normalizes any [`VideoOutput`] into a saved file and returns its public path.
    pub async fn persist(
        &self,
        http: &Client,
        scenario_id: i64,
        output: VideoOutput,
    ) -> Result<String, VideoError> {
        let payload = match output {
            VideoOutput::Url(url) => {
                debug!("Downloading video for scenario {} from {}", scenario_id, url);
                let stream = download_stream(http, &url).await?;
                drain(stream).await?
            }
            VideoOutput::Bytes(bytes) => bytes,
            VideoOutput::Stream(stream) => drain(stream).await?,
        };

        if payload.is_empty() {
            return Err(VideoError::EmptyPayload);
        }

        let filename = Self::filename(scenario_id, chrono::Utc::now().timestamp_millis());
        let full_path = self.dir.join(&filename);
        self.ensure_dir().await?;
        fs::write(&full_path, &payload).await?;
        info!(
            "Saved video for scenario {} to {} ({} bytes)",
            scenario_id,
            full_path.display(),
            payload.len()
        );

        Ok(Self::public_path(&filename))
    }
}

async fn download_stream(
    http: &Client,
    url: &str,
) -> Result<BoxStream<'static, Result<Bytes, VideoError>>, VideoError> {
    let resp = http.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(VideoError::Download {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp.bytes_stream().map_err(VideoError::from).boxed())
}

/// Reads a chunked payload to the end, keeping arrival order.
pub async fn drain(
    mut stream: BoxStream<'static, Result<Bytes, VideoError>>,
) -> Result<Bytes, VideoError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chunked(parts: &[&'static [u8]]) -> VideoOutput {
        let items: Vec<Result<Bytes, VideoError>> = parts
            .iter()
            .map(|p| Ok(Bytes::from_static(p)))
            .collect();
        VideoOutput::Stream(stream::iter(items).boxed())
    }

    #[test]
    fn filename_and_public_path() {
        let name = VideoStore::filename(4, 1_700_000_000_123);
        assert_eq!(name, "video-4-1700000000123.mp4");
        assert_eq!(VideoStore::public_path(&name), "/videos/video-4-1700000000123.mp4");
    }

    #[test]
    fn resolve_rejects_traversal() {
        let store = VideoStore::new("/srv/videos");
        assert_eq!(
            store.resolve("/videos/video-1-2.mp4"),
            Some(PathBuf::from("/srv/videos/video-1-2.mp4"))
        );
        assert_eq!(store.resolve("/videos/../secret"), None);
        assert_eq!(store.resolve("/videos/a/b.mp4"), None);
        assert_eq!(store.resolve("/other/video.mp4"), None);
        assert_eq!(store.resolve("/videos/"), None);
    }

    #[tokio::test]
    async fn saves_materialized_bytes() {
        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path().join("videos"));

        let url = store
            .persist(&Client::new(), 9, VideoOutput::Bytes(Bytes::from_static(b"mp4data")))
            .await
            .unwrap();

        assert!(url.starts_with("/videos/video-9-"));
        let saved = fs::read(store.resolve(&url).unwrap()).await.unwrap();
        assert_eq!(saved, b"mp4data");
    }

    #[tokio::test]
    async fn drains_stream_in_arrival_order() {
        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path());

        let url = store
            .persist(&Client::new(), 1, chunked(&[b"ab", b"", b"cd", b"e"]))
            .await
            .unwrap();

        let saved = fs::read(store.resolve(&url).unwrap()).await.unwrap();
        assert_eq!(saved, b"abcde");
    }

    #[tokio::test]
    async fn stream_error_aborts_save() {
        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path());
        let items: Vec<Result<Bytes, VideoError>> = vec![
            Ok(Bytes::from_static(b"ab")),
            Err(VideoError::Task("connection reset".to_string())),
        ];

        let err = store
            .persist(&Client::new(), 1, VideoOutput::Stream(stream::iter(items).boxed()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        let mut entries = fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fetches_url_output() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/out.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"remote-video".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path());
        let url = store
            .persist(
                &Client::new(),
                2,
                VideoOutput::Url(format!("{}/out.mp4", server.uri())),
            )
            .await
            .unwrap();

        let saved = fs::read(store.resolve(&url).unwrap()).await.unwrap();
        assert_eq!(saved, b"remote-video");
    }

    #[tokio::test]
    async fn download_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path());
        let err = store
            .persist(&Client::new(), 2, VideoOutput::Url(format!("{}/gone.mp4", server.uri())))
            .await
            .unwrap_err();
        assert!(matches!(err, VideoError::Download { status: 404, .. }));
    }

    #[tokio::test]
    async fn empty_payload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path());
        let err = store
            .persist(&Client::new(), 1, chunked(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, VideoError::EmptyPayload));
    }
}

use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use tokio::fs;
use tracing::warn;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::storage::VideoStore;
use crate::video::VideoResult;

const TITLE_CHARS: usize = 30;

/// Name a completed video gets inside the download-all archive.
pub fn entry_name(video: &VideoResult) -> String {
    let title: String = video
        .title
        .chars()
        .take(TITLE_CHARS)
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("scenario-{}-{}.mp4", video.id, title.trim())
}

/// Zips every completed video of a batch. Entries whose file is gone are
/// skipped with a warning.
pub async fn build_archive(store: &VideoStore, videos: &[VideoResult]) -> Result<Vec<u8>> {
    let mut entries = Vec::new();
    for video in videos.iter().filter(|v| v.is_completed()) {
        let Some(public_path) = video.video_url.as_deref() else {
            continue;
        };
        let Some(path) = store.resolve(public_path) else {
            warn!("Skipping video {} with unexpected path {}", video.id, public_path);
            continue;
        };
        match fs::read(&path).await {
            Ok(data) => entries.push((entry_name(video), data)),
            Err(err) => warn!("Skipping missing video {}: {}", path.display(), err),
        }
    }

    tokio::task::spawn_blocking(move || write_zip(entries))
        .await
        .context("archive task failed")?
}

fn write_zip(entries: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    // mp4 is already compressed
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add {name} to archive"))?;
        zip.write_all(&data)?;
    }
    let cursor = zip.finish().context("Failed to finish archive")?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn entry_name_truncates_and_sanitizes() {
        let scenario = Scenario::new(
            3,
            "A very long title: that goes on and on forever",
            "d",
        );
        let video = VideoResult::completed(&scenario, "/videos/x.mp4");
        assert_eq!(entry_name(&video), "scenario-3-A very long title_ that goes o.mp4");
    }

    #[tokio::test]
    async fn archives_only_completed_videos() {
        let dir = TempDir::new().unwrap();
        let store = VideoStore::new(dir.path());
        fs::write(dir.path().join("video-1-1.mp4"), b"one").await.unwrap();

        let videos = vec![
            VideoResult::completed(&Scenario::new(1, "One", "a"), "/videos/video-1-1.mp4"),
            VideoResult::failed(&Scenario::new(2, "Two", "b"), "nope"),
            VideoResult::completed(&Scenario::new(3, "Gone", "c"), "/videos/video-3-1.mp4"),
        ];

        let bytes = build_archive(&store, &videos).await.unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);

        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "scenario-1-One.mp4");
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"one");
    }
}

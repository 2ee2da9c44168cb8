//! Metadata extraction.
//!
//! Remote assets are pulled to a temp file and probed with ffprobe.
//! When the asset is local-only, ffprobe is missing, or the probe fails
//! for any reason, a synthetic duration and resolution stand in so the
//! run can continue. Extraction never fails a run.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use vsense_models::{Resolution, StorageRef};
use vsense_storage::BlobStore;

use crate::random::RandomSource;

/// Extracted (or synthesized) video metadata.
#[derive(Debug, Clone)]
pub struct VideoProbe {
    /// Duration in whole seconds
    pub duration_secs: u32,
    /// Frame dimensions
    pub resolution: Resolution,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

/// Paired synthetic resolutions, widths and heights at matching indexes.
const SYNTHETIC_WIDTHS: &[u32] = &[1280, 1920, 3840];
const SYNTHETIC_HEIGHTS: &[u32] = &[720, 1080, 2160];

/// Probes uploaded videos for duration and resolution.
pub struct MetadataProbe {
    blob: Arc<dyn BlobStore>,
    random: Arc<dyn RandomSource>,
}

impl MetadataProbe {
    pub fn new(blob: Arc<dyn BlobStore>, random: Arc<dyn RandomSource>) -> Self {
        Self { blob, random }
    }

    /// Probe the asset. Falls back to synthetic values on any failure.
    pub async fn probe(&self, storage: &StorageRef, original_name: &str) -> VideoProbe {
        match self.try_probe(storage).await {
            Ok(probe) => probe,
            Err(reason) => {
                debug!(
                    original_name,
                    reason = %reason,
                    "Probe unavailable, synthesizing metadata"
                );
                self.synthetic()
            }
        }
    }

    async fn try_probe(&self, storage: &StorageRef) -> Result<VideoProbe, String> {
        let key = match storage {
            StorageRef::Remote { key } => key,
            StorageRef::Local { .. } => return Err("asset not in remote storage".to_string()),
        };

        // Temp file is removed when `local` drops, on every exit path.
        let local = tempfile::NamedTempFile::new().map_err(|e| e.to_string())?;
        self.blob
            .download_to_file(key, local.path())
            .await
            .map_err(|e| e.to_string())?;

        ffprobe(local.path()).await
    }

    fn synthetic(&self) -> VideoProbe {
        let idx = self.random.range_u32(0, SYNTHETIC_WIDTHS.len() as u32) as usize;
        VideoProbe {
            duration_secs: self.random.range_u32(30, 630),
            resolution: Resolution {
                width: SYNTHETIC_WIDTHS[idx],
                height: SYNTHETIC_HEIGHTS[idx],
            },
        }
    }
}

/// Run ffprobe against a local file.
async fn ffprobe(path: &Path) -> Result<VideoProbe, String> {
    which::which("ffprobe").map_err(|_| "ffprobe not installed".to_string())?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        warn!(
            stderr = %String::from_utf8_lossy(&output.stderr),
            "ffprobe exited with non-zero status"
        );
        return Err("ffprobe failed".to_string());
    }

    let probe: FfprobeOutput =
        serde_json::from_slice(&output.stdout).map_err(|e| e.to_string())?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| "no video stream".to_string())?;

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoProbe {
        duration_secs: duration.round() as u32,
        resolution: Resolution {
            width: video_stream.width.unwrap_or(0),
            height: video_stream.height.unwrap_or(0),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FixedRandom;
    use async_trait::async_trait;
    use vsense_storage::{StorageError, StorageResult};

    use std::path::PathBuf;
    use std::sync::Mutex;

    struct NoBlobs;

    #[async_trait]
    impl BlobStore for NoBlobs {
        async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
            Err(StorageError::not_found(key))
        }
        async fn put(&self, _data: Vec<u8>, _content_type: &str) -> StorageResult<String> {
            Err(StorageError::upload_failed("unavailable"))
        }
        async fn delete(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
        async fn download_to_file(&self, key: &str, _path: &Path) -> StorageResult<()> {
            Err(StorageError::not_found(key))
        }
    }

    #[tokio::test]
    async fn test_local_asset_gets_synthetic_metadata() {
        let probe = MetadataProbe::new(Arc::new(NoBlobs), Arc::new(FixedRandom::never()));
        let storage = StorageRef::Local {
            path: "/tmp/a.mp4".to_string(),
        };

        let info = probe.probe(&storage, "a.mp4").await;
        assert_eq!(info.duration_secs, 30);
        assert_eq!(info.resolution.width, 1280);
        assert_eq!(info.resolution.height, 720);
    }

    #[tokio::test]
    async fn test_download_failure_falls_back_to_synthetic() {
        let probe = MetadataProbe::new(Arc::new(NoBlobs), Arc::new(FixedRandom::never()));
        let storage = StorageRef::Remote {
            key: "uploads/missing.mp4".to_string(),
        };

        let info = probe.probe(&storage, "missing.mp4").await;
        assert_eq!(info.duration_secs, 30);
        assert_eq!(info.resolution.width, 1280);
    }

    #[test]
    fn test_synthetic_dimension_tables_stay_paired() {
        assert_eq!(SYNTHETIC_WIDTHS.len(), SYNTHETIC_HEIGHTS.len());
    }

    /// Blob store that records the scratch path handed to it.
    struct ScratchBlobs {
        fail_download: bool,
        seen_path: Mutex<Option<PathBuf>>,
    }

    impl ScratchBlobs {
        fn new(fail_download: bool) -> Self {
            Self {
                fail_download,
                seen_path: Mutex::new(None),
            }
        }

        fn scratch_path(&self) -> PathBuf {
            self.seen_path
                .lock()
                .unwrap()
                .clone()
                .expect("no scratch file was requested")
        }
    }

    #[async_trait]
    impl BlobStore for ScratchBlobs {
        async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
            Err(StorageError::not_found(key))
        }
        async fn put(&self, _data: Vec<u8>, _content_type: &str) -> StorageResult<String> {
            Err(StorageError::upload_failed("unavailable"))
        }
        async fn delete(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
        async fn download_to_file(&self, key: &str, path: &Path) -> StorageResult<()> {
            *self.seen_path.lock().unwrap() = Some(path.to_path_buf());
            if self.fail_download {
                return Err(StorageError::not_found(key));
            }
            std::fs::write(path, b"not a video").map_err(StorageError::Io)?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_scratch_file_removed_after_failed_inspection() {
        let blobs = Arc::new(ScratchBlobs::new(false));
        let probe = MetadataProbe::new(blobs.clone(), Arc::new(FixedRandom::never()));
        let storage = StorageRef::Remote {
            key: "uploads/garbage.mp4".to_string(),
        };

        // The downloaded bytes are not a video, so inspection fails and
        // the synthetic fallback kicks in.
        let info = probe.probe(&storage, "garbage.mp4").await;
        assert_eq!(info.duration_secs, 30);

        let path = blobs.scratch_path();
        assert!(!path.exists(), "scratch file {} was left behind", path.display());
    }

    #[tokio::test]
    async fn test_scratch_file_removed_when_download_fails() {
        let blobs = Arc::new(ScratchBlobs::new(true));
        let probe = MetadataProbe::new(blobs.clone(), Arc::new(FixedRandom::never()));
        let storage = StorageRef::Remote {
            key: "uploads/missing.mp4".to_string(),
        };

        let info = probe.probe(&storage, "missing.mp4").await;
        assert_eq!(info.duration_secs, 30);

        let path = blobs.scratch_path();
        assert!(!path.exists(), "scratch file {} was left behind", path.display());
    }
}

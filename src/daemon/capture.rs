//! Beacon frame capture
//!
//! Reads raw 802.11 beacon frames from a character device or file. The
//! device is reopened on every poll so that drivers exposing one frame
//! per open are handled correctly; an empty read means no new frame.

use crate::{Result, BEACON_FRAME_MAX_LENGTH};

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Capture statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureStats {
    /// Total frames read
    pub frames_read: u64,
    /// Total bytes read
    pub bytes_read: u64,
    /// Polls that returned no frame
    pub empty_polls: u64,
}

/// Frame source backed by a device node or file.
#[derive(Debug)]
pub struct CaptureSource {
    device: PathBuf,
    max_frame_size: usize,
    stats: CaptureStats,
}

impl CaptureSource {
    /// Create a capture source for the given device path.
    pub fn new<P: AsRef<Path>>(device: P, max_frame_size: usize) -> Self {
        Self {
            device: device.as_ref().to_path_buf(),
            max_frame_size: max_frame_size.min(BEACON_FRAME_MAX_LENGTH),
            stats: CaptureStats::default(),
        }
    }

    /// Device path the source reads from.
    pub fn device(&self) -> &Path {
        &self.device
    }

    /// Capture statistics so far.
    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Read the next frame. Returns `None` when the device produced
    /// nothing this poll.
    pub async fn read_frame(&mut self) -> Result<Option<Bytes>> {
        let mut file = File::open(&self.device).await?;
        let mut buffer = vec![0u8; self.max_frame_size];

        let mut filled = 0;
        loop {
            let n = file.read(&mut buffer[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
            if filled == buffer.len() {
                break;
            }
        }

        if filled == 0 {
            self.stats.empty_polls += 1;
            return Ok(None);
        }

        buffer.truncate(filled);
        self.stats.frames_read += 1;
        self.stats.bytes_read += filled as u64;
        debug!(bytes = filled, device = %self.device.display(), "Captured frame");

        Ok(Some(Bytes::from(buffer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_frame_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x80, 0x00, 0x64, 0x00]).unwrap();
        file.flush().unwrap();

        let mut source = CaptureSource::new(file.path(), 2346);
        let frame = source.read_frame().await.unwrap().unwrap();
        assert_eq!(&frame[..], &[0x80, 0x00, 0x64, 0x00]);
        assert_eq!(source.stats().frames_read, 1);
        assert_eq!(source.stats().bytes_read, 4);
    }

    #[tokio::test]
    async fn test_empty_device_yields_none() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let mut source = CaptureSource::new(file.path(), 2346);
        assert!(source.read_frame().await.unwrap().is_none());
        assert_eq!(source.stats().empty_polls, 1);
    }

    #[tokio::test]
    async fn test_frame_truncated_to_max_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xAA; 100]).unwrap();
        file.flush().unwrap();

        let mut source = CaptureSource::new(file.path(), 16);
        let frame = source.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.len(), 16);
    }

    #[tokio::test]
    async fn test_missing_device_is_an_error() {
        let mut source = CaptureSource::new("/nonexistent/beacon-device", 2346);
        assert!(source.read_frame().await.is_err());
    }
}

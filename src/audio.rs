//! Audio segment concatenation and artifact output.
//!
//! Segments arrive as encoded MP3 from the TTS adapter. MPEG audio frames are
//! self-contained, so concatenation is a matter of stripping per-segment ID3
//! metadata and appending frame data in order. A short silent frame sequence
//! is inserted between dialogue lines.

use crate::error::{PodkastError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A minimal silent MPEG-1 Layer III frame (44.1 kHz, 128 kbps), 417 bytes.
/// Repeated to approximate the configured inter-line pause.
const SILENT_FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
const SILENT_FRAME_LEN: usize = 417;
/// Duration of one MPEG frame at 44.1 kHz (1152 samples).
const FRAME_MS: f64 = 26.12;

/// Strip a leading ID3v2 tag from an MP3 segment, if present.
fn strip_id3(segment: &[u8]) -> &[u8] {
    if segment.len() >= 10 && &segment[0..3] == b"ID3" {
        // Syncsafe 28-bit size in bytes 6..10.
        let size = ((segment[6] as usize & 0x7F) << 21)
            | ((segment[7] as usize & 0x7F) << 14)
            | ((segment[8] as usize & 0x7F) << 7)
            | (segment[9] as usize & 0x7F);
        let offset = 10 + size;
        if offset < segment.len() {
            return &segment[offset..];
        }
    }
    segment
}

/// Build the silence inserted between dialogue lines.
fn silence(pause_ms: u64) -> Vec<u8> {
    let frames = ((pause_ms as f64 / FRAME_MS).round() as usize).max(1);
    let mut frame = vec![0u8; SILENT_FRAME_LEN];
    frame[..4].copy_from_slice(&SILENT_FRAME_HEADER);

    let mut out = Vec::with_capacity(frames * SILENT_FRAME_LEN);
    for _ in 0..frames {
        out.extend_from_slice(&frame);
    }
    out
}

/// Concatenate MP3 segments in order with a fixed pause between them.
pub fn concatenate_segments(segments: &[Vec<u8>], pause_ms: u64) -> Result<Vec<u8>> {
    if segments.is_empty() {
        return Err(PodkastError::Audio(
            "No audio segments to concatenate".to_string(),
        ));
    }

    debug!("Concatenating {} audio segments", segments.len());

    let pause = silence(pause_ms);
    let mut combined = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            return Err(PodkastError::Audio(format!("Audio segment {} is empty", i)));
        }

        combined.extend_from_slice(strip_id3(segment));

        if i < segments.len() - 1 {
            combined.extend_from_slice(&pause);
        }
    }

    Ok(combined)
}

/// Path of the audio artifact for a podcast.
pub fn audio_path(podcast_dir: &Path, podcast_id: &str) -> PathBuf {
    podcast_dir.join(format!("{}.mp3", podcast_id))
}

/// Write the final podcast audio artifact.
pub fn write_audio(podcast_dir: &Path, podcast_id: &str, audio: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(podcast_dir)?;
    let path = audio_path(podcast_dir, podcast_id);
    std::fs::write(&path, audio)?;
    info!("Wrote {} bytes of audio to {:?}", audio.len(), path);
    Ok(path)
}

/// Write a standalone clip (acknowledgment, transition, answer audio).
pub fn write_clip(dir: &Path, filename: &str, audio: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    std::fs::write(&path, audio)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_preserves_order() {
        let segments = vec![vec![0xFF, 0xFB, 1, 1], vec![0xFF, 0xFB, 2, 2]];
        let combined = concatenate_segments(&segments, 500).unwrap();

        assert_eq!(&combined[..4], &[0xFF, 0xFB, 1, 1]);
        assert_eq!(&combined[combined.len() - SILENT_FRAME_LEN - 4..][..4], &[0xFF, 0xFB, 2, 2][..]);
        assert!(combined.len() > 8);
    }

    #[test]
    fn test_concat_strips_id3() {
        // 10-byte ID3 header with zero-length body followed by a frame.
        let mut tagged = vec![b'I', b'D', b'3', 4, 0, 0, 0, 0, 0, 0];
        tagged.extend_from_slice(&[0xFF, 0xFB, 9, 9]);

        let combined = concatenate_segments(&[tagged], 500).unwrap();
        assert_eq!(&combined[..4], &[0xFF, 0xFB, 9, 9]);
    }

    #[test]
    fn test_concat_rejects_empty() {
        assert!(concatenate_segments(&[], 500).is_err());
        assert!(concatenate_segments(&[vec![]], 500).is_err());
    }

    #[test]
    fn test_write_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_audio(dir.path(), "pod_1", &[1, 2, 3]).unwrap();
        assert!(path.ends_with("pod_1.mp3"));
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }
}

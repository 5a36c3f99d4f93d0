//! Encoded frame types for stream routing
//!
//! This module defines the identifiers of logical streams and the compressed
//! frames that are broadcast to their consumers.

use bytes::Bytes;

/// Identifier of a logical stream (e.g. main stream 0, sub stream 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u32);

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Audio codec identifier, part of an audio sender's key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    /// AAC-LC
    Aac,
    /// G.711 A-law
    Pcma,
    /// G.711 mu-law
    Pcmu,
    /// Opus
    Opus,
}

impl std::fmt::Display for CodecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CodecId::Aac => "aac",
            CodecId::Pcma => "pcma",
            CodecId::Pcmu => "pcmu",
            CodecId::Opus => "opus",
        };
        f.write_str(name)
    }
}

/// Type of encoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Video access unit
    Video,
    /// Audio packet
    Audio(CodecId),
}

/// A compressed frame to be broadcast to consumers
///
/// This is designed to be cheap to clone due to `Bytes` reference counting.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Type of frame
    pub kind: MediaKind,
    /// Stream the frame belongs to
    pub stream_id: StreamId,
    /// Capture timestamp in microseconds
    pub timestamp_us: u64,
    /// Frame data (zero-copy via reference counting)
    pub data: Bytes,
    /// Whether this is a keyframe (video only)
    pub is_keyframe: bool,
    /// Picture width (video only)
    pub width: u32,
    /// Picture height (video only)
    pub height: u32,
    /// Quantizer of the frame, if the encoder reported one
    pub qp: Option<u8>,
}

impl EncodedFrame {
    /// Create a video frame
    pub fn video(
        stream_id: StreamId,
        timestamp_us: u64,
        data: Bytes,
        is_keyframe: bool,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            kind: MediaKind::Video,
            stream_id,
            timestamp_us,
            data,
            is_keyframe,
            width,
            height,
            qp: None,
        }
    }

    /// Create an audio frame
    pub fn audio(stream_id: StreamId, codec: CodecId, timestamp_us: u64, data: Bytes) -> Self {
        Self {
            kind: MediaKind::Audio(codec),
            stream_id,
            timestamp_us,
            data,
            is_keyframe: false,
            width: 0,
            height: 0,
            qp: None,
        }
    }

    /// Set the quantizer
    pub fn with_qp(mut self, qp: u8) -> Self {
        self.qp = Some(qp);
        self
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_frame() {
        let frame = EncodedFrame::video(
            StreamId(0),
            33_000,
            Bytes::from_static(&[0, 0, 0, 1, 0x65]),
            true,
            1920,
            1080,
        )
        .with_qp(28);

        assert!(frame.is_video());
        assert!(frame.is_keyframe);
        assert_eq!(frame.size(), 5);
        assert_eq!(frame.qp, Some(28));
    }

    #[test]
    fn test_audio_frame() {
        let frame = EncodedFrame::audio(StreamId(1), CodecId::Aac, 0, Bytes::from_static(&[0xFF]));
        assert_eq!(frame.kind, MediaKind::Audio(CodecId::Aac));
        assert!(!frame.is_video());
        assert!(!frame.is_keyframe);
    }

    #[test]
    fn test_clone_shares_payload() {
        let frame = EncodedFrame::video(StreamId(0), 0, Bytes::from(vec![1u8; 1024]), false, 2, 2);
        let copy = frame.clone();
        assert_eq!(frame.data.as_ptr(), copy.data.as_ptr());
    }

    #[test]
    fn test_display() {
        assert_eq!(StreamId(3).to_string(), "stream-3");
        assert_eq!(CodecId::Opus.to_string(), "opus");
    }
}

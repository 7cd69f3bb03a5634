use edgewire_codec::CodecError;

/// Errors that can occur during element framing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame does not start with the `0xAA` preamble.
    #[error("malformed frame (preamble 0x{0:02x}, expected 0xaa)")]
    MalformedFrame(u8),

    /// The element type tag has no body layout.
    #[error("unsupported element type 0x{0:02x}")]
    UnsupportedElementType(u8),

    /// A field, payload or filter failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A unit's content, or a request body, exceeds the configured maximum.
    #[error("element content too large ({size} bytes, max {max})")]
    ContentTooLarge { size: usize, max: usize },

    /// The stream ended part way through a frame.
    #[error("truncated input (stream ended {buffered} bytes into a frame)")]
    Truncated { buffered: usize },

    /// An I/O error occurred while reading or writing elements.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink stopped accepting bytes.
    #[error("connection closed (write returned zero bytes)")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether the failure was caused by input ending too early.
    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            FrameError::Truncated { .. } | FrameError::Codec(CodecError::Truncated { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

use crate::data::DataType;

/// Errors that can occur while encoding or decoding fields, payloads and filters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Fewer bytes remain than a fixed field or declared length requires.
    #[error("truncated input ({needed} bytes needed, {remaining} remaining)")]
    Truncated { needed: usize, remaining: usize },

    /// The data type tag has no payload codec.
    #[error("unsupported data type 0x{0:02x}")]
    UnsupportedDataType(u8),

    /// A declared length or count disagrees with the content it describes.
    #[error("{field} length mismatch (declared {declared}, actual {actual})")]
    LengthMismatch {
        field: &'static str,
        declared: usize,
        actual: usize,
    },

    /// A value does not fit in the width chosen for it.
    #[error("{field} value {value} does not fit in {width} bytes")]
    Overflow {
        field: &'static str,
        value: u64,
        width: usize,
    },

    /// A string field is not valid UTF-8.
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    /// An elapsed time fraction is a whole second or more.
    #[error("elapsed time fraction {value} out of range (must be below {limit})")]
    FractionOutOfRange { value: u32, limit: u32 },

    /// A width indicator selects a width the field does not support.
    #[error("invalid {field} width indicator {value:#04b}")]
    InvalidWidth { field: &'static str, value: u8 },

    /// A filter id could not be parsed for its kind.
    #[error("invalid {kind} filter id {id:?}")]
    InvalidFilterId { kind: &'static str, id: String },

    /// An id or label filter without any match spec (indistinguishable from `Any` on the wire).
    #[error("{0:?} filter has no match specs")]
    EmptyFilter(DataType),
}

pub type Result<T> = std::result::Result<T, CodecError>;

//! Element framing and dispatch for the edgewire telemetry protocol.
//!
//! Every element on the wire starts with a 2-byte common header:
//! - a 1-byte preamble (`0xAA`) for stream synchronization
//! - a 1-byte element type tag selecting the body layout
//!
//! Bodies are self-delimiting, so elements are simply concatenated. Callers
//! read and write whole [`Element`] values; no partial reads leak out.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod element;
pub mod error;
pub mod raw;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::ElementCodec;
pub use codec::{
    decode_element, encode_element, ElementType, FrameConfig, DEFAULT_MAX_CONTENT, HEADER_SIZE,
    PREAMBLE,
};
pub use element::{
    DownstreamDataFilter, DownstreamFilter, DownstreamFilterRequest, DownstreamFilterResponse,
    DownstreamSpec, DownstreamSpecRequest, DownstreamSpecResponse, Element, EosMarker,
    MeasurementIdRequest, MeasurementIdResponse, ResultCode, SectionAck, SosMarker, Unit,
    UpstreamSpec, UpstreamSpecRequest, UpstreamSpecResponse,
};
pub use error::{FrameError, Result};
pub use reader::ElementReader;
pub use writer::ElementWriter;

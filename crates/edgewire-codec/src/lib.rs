//! Field, payload and filter codecs for the edgewire telemetry protocol.
//!
//! This crate holds everything below the element framing layer:
//! - [`field`]: fixed and adaptive-width little-endian primitives
//! - [`data`]: per-kind layouts of the samples carried by a `Unit`
//! - [`time`]: the adaptive-precision elapsed time of a `Unit`
//! - [`filter`]: downstream filter layouts and consumer-side matching
//!
//! Nothing here performs I/O. Decoders work on a [`bytes::Buf`], encoders
//! append to a [`bytes::BytesMut`].

pub mod data;
pub mod error;
pub mod field;
pub mod filter;
pub mod time;

pub use data::{
    Aac, Basetime, BulkSample, Can, CanBulk, CanBulkEntry, Controlpad, Data, DataType,
    GeneralSensor, GeneralSensorBulk, GeneralSensorBulkEntry, Generic, Jpeg, LabeledBytes,
    LabeledFloat, LabeledInt, LabeledString, Mavlink, Nmea, Payload, Pcm, H264,
};
pub use error::{CodecError, Result};
pub use field::{FieldReader, FieldWriter, UintWidth};
pub use filter::{Filter, IdKind, IdMatch, LabelKind};
pub use time::{FracPrecision, UnitWidths};

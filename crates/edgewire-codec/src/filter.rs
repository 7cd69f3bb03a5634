//! Downstream filter layouts and consumer-side matching.
//!
//! A filter body is keyed by the data type it applies to:
//!
//! ```text
//! id kinds     repeated { mask (W) │ result (W) │ accept (1) }   W = id width
//! label kinds  repeated { len (1) │ label (len) }
//! any          (empty)
//! ```
//!
//! An empty body always means [`Filter::Any`].

use bytes::{Buf, Bytes, BytesMut};

use crate::data::{Data, DataType};
use crate::error::{CodecError, Result};
use crate::field::{FieldReader, FieldWriter, UintWidth};

const NMEA_ID_LEN: usize = 5;

/// Payload kinds filtered by bit-matching an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// Bus frame id, 4 bytes.
    Can,
    /// Sentence id such as `GPGGA`, 5 ASCII bytes.
    Nmea,
    /// Sensor id, 2 bytes.
    GeneralSensor,
    /// Blob id, 4 bytes.
    Generic,
}

impl IdKind {
    pub const fn data_type(self) -> DataType {
        match self {
            IdKind::Can => DataType::Can,
            IdKind::Nmea => DataType::Nmea,
            IdKind::GeneralSensor => DataType::GeneralSensor,
            IdKind::Generic => DataType::Generic,
        }
    }

    pub const fn from_data_type(data_type: DataType) -> Option<Self> {
        match data_type {
            DataType::Can => Some(IdKind::Can),
            DataType::Nmea => Some(IdKind::Nmea),
            DataType::GeneralSensor => Some(IdKind::GeneralSensor),
            DataType::Generic => Some(IdKind::Generic),
            _ => None,
        }
    }

    /// Width of mask and result on the wire.
    pub const fn id_width(self) -> usize {
        match self {
            IdKind::Can | IdKind::Generic => 4,
            IdKind::Nmea => NMEA_ID_LEN,
            IdKind::GeneralSensor => 2,
        }
    }

    /// All-ones mask for this kind.
    pub const fn full_mask(self) -> u64 {
        (1u64 << (self.id_width() * 8)) - 1
    }

    /// Parse a textual id.
    ///
    /// Numeric kinds take `0x`-prefixed hex or decimal; NMEA takes up to five
    /// ASCII characters.
    pub fn parse_id(self, id: &str) -> Result<u64> {
        let invalid = || CodecError::InvalidFilterId {
            kind: self.data_type().name(),
            id: id.to_string(),
        };
        let value = match self {
            IdKind::Nmea => pack_sentence_id(id).ok_or_else(invalid)?,
            _ => {
                let parsed = match id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => id.parse::<u64>(),
                };
                parsed.map_err(|_| invalid())?
            }
        };
        if value > self.full_mask() {
            return Err(invalid());
        }
        Ok(value)
    }

    /// The id a filter of this kind compares against, if `data` is of this kind.
    pub fn candidate(self, data: &Data) -> Option<u64> {
        match (self, data) {
            (IdKind::Can, Data::Can(v)) => Some(u64::from(v.id)),
            (IdKind::Nmea, Data::Nmea(v)) => {
                let id = v.sentence_id();
                if !id.is_ascii() {
                    return None;
                }
                pack_sentence_id(&id[..id.len().min(NMEA_ID_LEN)])
            }
            (IdKind::GeneralSensor, Data::GeneralSensor(v)) => Some(u64::from(v.id)),
            (IdKind::Generic, Data::Generic(v)) => Some(u64::from(v.id)),
            _ => None,
        }
    }

    fn read_id<B: Buf>(self, rd: &mut FieldReader<B>) -> Result<u64> {
        match self {
            IdKind::Can | IdKind::Generic => rd.read_u32().map(u64::from),
            IdKind::Nmea => rd.read_u40(),
            IdKind::GeneralSensor => rd.read_u16().map(u64::from),
        }
    }

    fn write_id(self, wr: &mut FieldWriter<'_>, field: &'static str, value: u64) -> Result<()> {
        let width = self.id_width();
        if value > self.full_mask() {
            return Err(CodecError::Overflow {
                field,
                value,
                width,
            });
        }
        match self {
            IdKind::Nmea => wr.write_u40(field, value),
            _ => match UintWidth::from_bytes(width) {
                Some(width) => wr.write_uint(field, value as u32, width),
                None => Err(CodecError::Overflow {
                    field,
                    value,
                    width,
                }),
            },
        }
    }
}

/// Pack an ASCII sentence id big-endian and left-aligned into 40 bits.
fn pack_sentence_id(id: &str) -> Option<u64> {
    if id.is_empty() || id.len() > NMEA_ID_LEN || !id.is_ascii() {
        return None;
    }
    let mut packed = [0u8; 8];
    packed[3..3 + id.len()].copy_from_slice(id.as_bytes());
    Some(u64::from_be_bytes(packed))
}

/// One bit-matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMatch {
    pub mask: u64,
    pub result: u64,
    pub accept: bool,
}

impl IdMatch {
    /// Rule matching exactly `id` under `kind`'s full mask.
    pub fn exact(kind: IdKind, id: u64, accept: bool) -> Self {
        Self {
            mask: kind.full_mask(),
            result: id,
            accept,
        }
    }

    pub fn hits(&self, candidate: u64) -> bool {
        candidate & self.mask == self.result & self.mask
    }
}

/// Payload kinds filtered by label equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Float,
    Int,
    String,
    Bytes,
}

impl LabelKind {
    pub const fn data_type(self) -> DataType {
        match self {
            LabelKind::Float => DataType::Float,
            LabelKind::Int => DataType::Int,
            LabelKind::String => DataType::String,
            LabelKind::Bytes => DataType::Bytes,
        }
    }

    pub const fn from_data_type(data_type: DataType) -> Option<Self> {
        match data_type {
            DataType::Float => Some(LabelKind::Float),
            DataType::Int => Some(LabelKind::Int),
            DataType::String => Some(LabelKind::String),
            DataType::Bytes => Some(LabelKind::Bytes),
            _ => None,
        }
    }
}

/// What a downstream subscriber wants to receive on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Ordered bit-matching rules; the first hit decides.
    Id { kind: IdKind, specs: Vec<IdMatch> },
    /// Labels accepted for a labeled-primitive kind.
    Label { kind: LabelKind, labels: Vec<String> },
    /// Every sample of a data type.
    Any(DataType),
}

impl Filter {
    /// Exact-match accept rules, one per id.
    pub fn from_ids<I, S>(kind: IdKind, ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let specs = ids
            .into_iter()
            .map(|id| kind.parse_id(id.as_ref()).map(|id| IdMatch::exact(kind, id, true)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Filter::Id { kind, specs })
    }

    pub fn from_labels<I, S>(kind: LabelKind, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Label {
            kind,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Data type this filter is keyed by on the wire.
    pub fn data_type(&self) -> DataType {
        match self {
            Filter::Id { kind, .. } => kind.data_type(),
            Filter::Label { kind, .. } => kind.data_type(),
            Filter::Any(data_type) => *data_type,
        }
    }

    /// Outcome of the first rule that applies to `data`, if any.
    ///
    /// `None` when `data` is of another kind or no rule hits.
    pub fn evaluate(&self, data: &Data) -> Option<bool> {
        if data.data_type() != self.data_type() {
            return None;
        }
        match self {
            Filter::Id { kind, specs } => {
                let candidate = kind.candidate(data)?;
                specs
                    .iter()
                    .find(|spec| spec.hits(candidate))
                    .map(|spec| spec.accept)
            }
            Filter::Label { labels, .. } => {
                let label = data.label()?;
                labels.iter().any(|l| l == label).then_some(true)
            }
            Filter::Any(_) => Some(true),
        }
    }

    /// Whether `data` passes. Anything no rule accepts is rejected.
    pub fn matches(&self, data: &Data) -> bool {
        self.evaluate(data).unwrap_or(false)
    }

    /// Decode a filter body keyed by `data_type`.
    pub fn decode(data_type: u8, body: Bytes) -> Result<Self> {
        let data_type = DataType::try_from(data_type)?;
        if body.is_empty() {
            return Ok(Filter::Any(data_type));
        }
        let declared = body.len();
        let mut rd = FieldReader::new(body);
        if let Some(kind) = IdKind::from_data_type(data_type) {
            let mut specs = Vec::new();
            while rd.has_remaining() {
                let mask = kind.read_id(&mut rd)?;
                let result = kind.read_id(&mut rd)?;
                let accept = rd.read_u8()? != 0;
                specs.push(IdMatch {
                    mask,
                    result,
                    accept,
                });
            }
            return Ok(Filter::Id { kind, specs });
        }
        if let Some(kind) = LabelKind::from_data_type(data_type) {
            let mut labels = Vec::new();
            while rd.has_remaining() {
                let len = rd.read_u8()?;
                labels.push(rd.read_string(usize::from(len), "label")?);
            }
            return Ok(Filter::Label { kind, labels });
        }
        // Kinds without a filter layout only ever carry the wildcard.
        Err(CodecError::LengthMismatch {
            field: "filter",
            declared,
            actual: 0,
        })
    }

    /// Append the filter body to `dst` and return the data type it is keyed by.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<DataType> {
        let mut wr = FieldWriter::new(dst);
        match self {
            Filter::Id { kind, specs } => {
                if specs.is_empty() {
                    return Err(CodecError::EmptyFilter(kind.data_type()));
                }
                for spec in specs {
                    kind.write_id(&mut wr, "mask", spec.mask)?;
                    kind.write_id(&mut wr, "result", spec.result)?;
                    wr.write_u8(u8::from(spec.accept));
                }
            }
            Filter::Label { kind, labels } => {
                if labels.is_empty() {
                    return Err(CodecError::EmptyFilter(kind.data_type()));
                }
                for label in labels {
                    wr.write_prefixed("label", label.as_bytes(), UintWidth::One)?;
                }
            }
            Filter::Any(_) => {}
        }
        Ok(self.data_type())
    }
}

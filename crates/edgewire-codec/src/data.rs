//! Payload layouts of the samples carried by a `Unit`.
//!
//! Each kind is a plain struct implementing [`Payload`]; [`Data`] is the
//! closed set of kinds and carries its own wire tag via [`Data::data_type`].
//! A payload always spans the whole unit content: fields that run "to end"
//! consume the rest, and fixed layouts that leave bytes behind are rejected.

use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{CodecError, Result};
use crate::field::{count_u16, count_u8, FieldReader, FieldWriter, UintWidth};

/// Wire tag of a payload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DataType {
    Can = 0x01,
    Nmea = 0x02,
    GeneralSensor = 0x03,
    Controlpad = 0x04,
    Mavlink = 0x05,
    CanBulk = 0x07,
    GeneralSensorBulk = 0x08,
    Jpeg = 0x09,
    String = 0x0A,
    Float = 0x0B,
    Int = 0x0C,
    H264 = 0x0D,
    Bytes = 0x0E,
    Pcm = 0x0F,
    Aac = 0x10,
    Generic = 0x7F,
    Basetime = 0x87,
}

impl DataType {
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Human-readable name of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            DataType::Can => "CAN",
            DataType::Nmea => "NMEA",
            DataType::GeneralSensor => "GENERAL_SENSOR",
            DataType::Controlpad => "CONTROLPAD",
            DataType::Mavlink => "MAVLINK",
            DataType::CanBulk => "CAN_BULK",
            DataType::GeneralSensorBulk => "GENERAL_SENSOR_BULK",
            DataType::Jpeg => "JPEG",
            DataType::String => "STRING",
            DataType::Float => "FLOAT",
            DataType::Int => "INT",
            DataType::H264 => "H264",
            DataType::Bytes => "BYTES",
            DataType::Pcm => "PCM",
            DataType::Aac => "AAC",
            DataType::Generic => "GENERIC",
            DataType::Basetime => "BASETIME",
        }
    }
}

impl TryFrom<u8> for DataType {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self> {
        Ok(match tag {
            0x01 => DataType::Can,
            0x02 => DataType::Nmea,
            0x03 => DataType::GeneralSensor,
            0x04 => DataType::Controlpad,
            0x05 => DataType::Mavlink,
            0x07 => DataType::CanBulk,
            0x08 => DataType::GeneralSensorBulk,
            0x09 => DataType::Jpeg,
            0x0A => DataType::String,
            0x0B => DataType::Float,
            0x0C => DataType::Int,
            0x0D => DataType::H264,
            0x0E => DataType::Bytes,
            0x0F => DataType::Pcm,
            0x10 => DataType::Aac,
            0x7F => DataType::Generic,
            0x87 => DataType::Basetime,
            other => return Err(CodecError::UnsupportedDataType(other)),
        })
    }
}

/// Binary layout of one payload kind.
pub trait Payload: Sized {
    const DATA_TYPE: DataType;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self>;

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()>;
}

/// One vehicle bus frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Can {
    pub id: u32,
    pub data: Bytes,
}

impl Can {
    /// Data length code, always `data.len()`.
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

impl Payload for Can {
    const DATA_TYPE: DataType = DataType::Can;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let id = rd.read_u32()?;
        let dlc = rd.read_u8()?;
        let data = rd.read_bytes(usize::from(dlc))?;
        Ok(Self { id, data })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        wr.write_u32(self.id);
        wr.write_u8(count_u8("dlc", self.data.len())?);
        wr.write_bytes(&self.data);
        Ok(())
    }
}

/// One sample of a bulk batch: a microsecond offset and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSample {
    /// Offset from the unit's elapsed time, 24 bits on the wire.
    pub usec: u32,
    pub data: Bytes,
}

impl BulkSample {
    pub fn new(usec: u32, data: impl Into<Bytes>) -> Self {
        Self {
            usec,
            data: data.into(),
        }
    }
}

// The wire stores all offsets first, then all payloads, under one count.
fn read_samples<B: Buf>(
    rd: &mut FieldReader<B>,
    count: usize,
    size: usize,
) -> Result<Vec<BulkSample>> {
    let usecs = (0..count)
        .map(|_| rd.read_u24())
        .collect::<Result<Vec<_>>>()?;
    let mut samples = Vec::with_capacity(count);
    for usec in usecs {
        samples.push(BulkSample::new(usec, rd.read_bytes(size)?));
    }
    Ok(samples)
}

fn write_samples(
    wr: &mut FieldWriter<'_>,
    field: &'static str,
    samples: &[BulkSample],
    size: u8,
) -> Result<()> {
    wr.write_u16(count_u16("count", samples.len())?);
    for sample in samples {
        wr.write_u24("usec", sample.usec)?;
    }
    for sample in samples {
        if sample.data.len() != usize::from(size) {
            return Err(CodecError::LengthMismatch {
                field,
                declared: usize::from(size),
                actual: sample.data.len(),
            });
        }
        wr.write_bytes(&sample.data);
    }
    Ok(())
}

/// Bus frames sharing one id and dlc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanBulkEntry {
    pub id: u32,
    pub dlc: u8,
    pub samples: Vec<BulkSample>,
}

/// A batch of bus frames from one channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CanBulk {
    pub entries: Vec<CanBulkEntry>,
}

impl Payload for CanBulk {
    const DATA_TYPE: DataType = DataType::CanBulk;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let mut entries = Vec::new();
        while rd.has_remaining() {
            let id = rd.read_u32()?;
            let dlc = rd.read_u8()?;
            let count = rd.read_u16()?;
            let samples = read_samples(rd, usize::from(count), usize::from(dlc))?;
            entries.push(CanBulkEntry { id, dlc, samples });
        }
        Ok(Self { entries })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        for entry in &self.entries {
            wr.write_u32(entry.id);
            wr.write_u8(entry.dlc);
            write_samples(wr, "dlc", &entry.samples, entry.dlc)?;
        }
        Ok(())
    }
}

/// One NMEA sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nmea {
    pub sentence: String,
}

impl Nmea {
    /// Talker and sentence identifier, e.g. `GPGGA` for `$GPGGA,...`.
    pub fn sentence_id(&self) -> &str {
        let body = self
            .sentence
            .strip_prefix(['$', '!'])
            .unwrap_or(&self.sentence);
        body.split(',').next().unwrap_or_default()
    }
}

impl Payload for Nmea {
    const DATA_TYPE: DataType = DataType::Nmea;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let sentence = rd.read_remaining_string("sentence")?;
        Ok(Self { sentence })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        wr.write_bytes(self.sentence.as_bytes());
        Ok(())
    }
}

/// A generic sensor reading keyed by a 16-bit id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSensor {
    pub id: u16,
    pub data: Bytes,
}

impl Payload for GeneralSensor {
    const DATA_TYPE: DataType = DataType::GeneralSensor;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let id = rd.read_u16()?;
        let data = rd.read_remaining();
        Ok(Self { id, data })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        wr.write_u16(self.id);
        wr.write_bytes(&self.data);
        Ok(())
    }
}

/// Sensor readings sharing one id and reading length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSensorBulkEntry {
    pub id: u16,
    pub len: u8,
    pub samples: Vec<BulkSample>,
}

/// A batch of sensor readings from one channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneralSensorBulk {
    pub entries: Vec<GeneralSensorBulkEntry>,
}

impl Payload for GeneralSensorBulk {
    const DATA_TYPE: DataType = DataType::GeneralSensorBulk;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let mut entries = Vec::new();
        while rd.has_remaining() {
            let id = rd.read_u16()?;
            let len = rd.read_u8()?;
            let count = rd.read_u16()?;
            let samples = read_samples(rd, usize::from(count), usize::from(len))?;
            entries.push(GeneralSensorBulkEntry { id, len, samples });
        }
        Ok(Self { entries })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        for entry in &self.entries {
            wr.write_u16(entry.id);
            wr.write_u8(entry.len);
            write_samples(wr, "len", &entry.samples, entry.len)?;
        }
        Ok(())
    }
}

/// One JPEG image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jpeg {
    pub data: Bytes,
}

impl Payload for Jpeg {
    const DATA_TYPE: DataType = DataType::Jpeg;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        Ok(Self {
            data: rd.read_remaining(),
        })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        wr.write_bytes(&self.data);
        Ok(())
    }
}

/// One H.264 NAL unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H264 {
    pub type_id: u8,
    pub data: Bytes,
}

impl Payload for H264 {
    const DATA_TYPE: DataType = DataType::H264;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let type_id = rd.read_u8()?;
        let data = rd.read_remaining();
        Ok(Self { type_id, data })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        wr.write_u8(self.type_id);
        wr.write_bytes(&self.data);
        Ok(())
    }
}

/// One AAC frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aac {
    pub data: Bytes,
}

impl Payload for Aac {
    const DATA_TYPE: DataType = DataType::Aac;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        Ok(Self {
            data: rd.read_remaining(),
        })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        wr.write_bytes(&self.data);
        Ok(())
    }
}

/// A block of PCM audio with its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcm {
    pub format_id: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub data: Bytes,
}

impl Payload for Pcm {
    const DATA_TYPE: DataType = DataType::Pcm;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        Ok(Self {
            format_id: rd.read_u16()?,
            channels: rd.read_u16()?,
            sample_rate: rd.read_u32()?,
            bits_per_sample: rd.read_u16()?,
            data: rd.read_remaining(),
        })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        wr.write_u16(self.format_id);
        wr.write_u16(self.channels);
        wr.write_u32(self.sample_rate);
        wr.write_u16(self.bits_per_sample);
        wr.write_bytes(&self.data);
        Ok(())
    }
}

/// One control pad report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controlpad {
    pub id: u8,
    pub data: Bytes,
}

impl Payload for Controlpad {
    const DATA_TYPE: DataType = DataType::Controlpad;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let id = rd.read_u8()?;
        let data = rd.read_remaining();
        Ok(Self { id, data })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        wr.write_u8(self.id);
        wr.write_bytes(&self.data);
        Ok(())
    }
}

/// An embedded MAVLink v1 packet, carried verbatim.
///
/// The checksum is round-tripped and never verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mavlink {
    pub start: u8,
    pub seq: u8,
    pub sys_id: u8,
    pub comp_id: u8,
    pub msg_id: u8,
    pub payload: Bytes,
    pub checksum: u8,
}

impl Mavlink {
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

impl Payload for Mavlink {
    const DATA_TYPE: DataType = DataType::Mavlink;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let start = rd.read_u8()?;
        let payload_len = rd.read_u8()?;
        let seq = rd.read_u8()?;
        let sys_id = rd.read_u8()?;
        let comp_id = rd.read_u8()?;
        let msg_id = rd.read_u8()?;
        let payload = rd.read_bytes(usize::from(payload_len))?;
        let checksum = rd.read_u8()?;
        Ok(Self {
            start,
            seq,
            sys_id,
            comp_id,
            msg_id,
            payload,
            checksum,
        })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        wr.write_u8(self.start);
        wr.write_u8(count_u8("payload_len", self.payload.len())?);
        wr.write_u8(self.seq);
        wr.write_u8(self.sys_id);
        wr.write_u8(self.comp_id);
        wr.write_u8(self.msg_id);
        wr.write_bytes(&self.payload);
        wr.write_u8(self.checksum);
        Ok(())
    }
}

/// An opaque blob keyed by a 32-bit id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generic {
    pub id: u32,
    pub data: Bytes,
}

impl Payload for Generic {
    const DATA_TYPE: DataType = DataType::Generic;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let id = rd.read_u32()?;
        let data = rd.read_remaining();
        Ok(Self { id, data })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        wr.write_u32(self.id);
        wr.write_bytes(&self.data);
        Ok(())
    }
}

fn read_label<B: Buf>(rd: &mut FieldReader<B>) -> Result<String> {
    let len = rd.read_u8()?;
    rd.read_string(usize::from(len), "label")
}

fn write_label(wr: &mut FieldWriter<'_>, label: &str) -> Result<()> {
    wr.write_prefixed("label", label.as_bytes(), UintWidth::One)
}

/// A named 64-bit float sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledFloat {
    pub label: String,
    pub value: f64,
}

impl Payload for LabeledFloat {
    const DATA_TYPE: DataType = DataType::Float;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let label = read_label(rd)?;
        let value = rd.read_f64()?;
        Ok(Self { label, value })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        write_label(wr, &self.label)?;
        wr.write_f64(self.value);
        Ok(())
    }
}

/// A named 64-bit signed integer sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledInt {
    pub label: String,
    pub value: i64,
}

impl Payload for LabeledInt {
    const DATA_TYPE: DataType = DataType::Int;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let label = read_label(rd)?;
        let value = rd.read_i64()?;
        Ok(Self { label, value })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        write_label(wr, &self.label)?;
        wr.write_i64(self.value);
        Ok(())
    }
}

/// A named string sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledString {
    pub label: String,
    pub value: String,
}

impl Payload for LabeledString {
    const DATA_TYPE: DataType = DataType::String;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let label = read_label(rd)?;
        let value = rd.read_remaining_string("value")?;
        Ok(Self { label, value })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        write_label(wr, &self.label)?;
        wr.write_bytes(self.value.as_bytes());
        Ok(())
    }
}

/// A named byte-sequence sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledBytes {
    pub label: String,
    pub value: Bytes,
}

impl Payload for LabeledBytes {
    const DATA_TYPE: DataType = DataType::Bytes;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        let label = read_label(rd)?;
        let value = rd.read_remaining();
        Ok(Self { label, value })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        write_label(wr, &self.label)?;
        wr.write_bytes(&self.value);
        Ok(())
    }
}

/// Wall-clock anchor for a stream's elapsed times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Basetime {
    /// Clock source of the anchor.
    pub kind: u8,
    pub sec: u32,
    pub nsec: u32,
}

impl Basetime {
    /// Anchor as an offset from the Unix epoch.
    pub fn since_epoch(&self) -> Duration {
        Duration::from_secs(u64::from(self.sec)) + Duration::from_nanos(u64::from(self.nsec))
    }
}

impl Payload for Basetime {
    const DATA_TYPE: DataType = DataType::Basetime;

    fn decode<B: Buf>(rd: &mut FieldReader<B>) -> Result<Self> {
        Ok(Self {
            kind: rd.read_u8()?,
            sec: rd.read_u32()?,
            nsec: rd.read_u32()?,
        })
    }

    fn encode(&self, wr: &mut FieldWriter<'_>) -> Result<()> {
        wr.write_u8(self.kind);
        wr.write_u32(self.sec);
        wr.write_u32(self.nsec);
        Ok(())
    }
}

/// The sample carried by a `Unit`.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Can(Can),
    CanBulk(CanBulk),
    Nmea(Nmea),
    GeneralSensor(GeneralSensor),
    GeneralSensorBulk(GeneralSensorBulk),
    Jpeg(Jpeg),
    H264(H264),
    Aac(Aac),
    Pcm(Pcm),
    Controlpad(Controlpad),
    Mavlink(Mavlink),
    Generic(Generic),
    Float(LabeledFloat),
    Int(LabeledInt),
    String(LabeledString),
    Bytes(LabeledBytes),
    Basetime(Basetime),
}

impl Data {
    pub fn data_type(&self) -> DataType {
        match self {
            Data::Can(_) => Can::DATA_TYPE,
            Data::CanBulk(_) => CanBulk::DATA_TYPE,
            Data::Nmea(_) => Nmea::DATA_TYPE,
            Data::GeneralSensor(_) => GeneralSensor::DATA_TYPE,
            Data::GeneralSensorBulk(_) => GeneralSensorBulk::DATA_TYPE,
            Data::Jpeg(_) => Jpeg::DATA_TYPE,
            Data::H264(_) => H264::DATA_TYPE,
            Data::Aac(_) => Aac::DATA_TYPE,
            Data::Pcm(_) => Pcm::DATA_TYPE,
            Data::Controlpad(_) => Controlpad::DATA_TYPE,
            Data::Mavlink(_) => Mavlink::DATA_TYPE,
            Data::Generic(_) => Generic::DATA_TYPE,
            Data::Float(_) => LabeledFloat::DATA_TYPE,
            Data::Int(_) => LabeledInt::DATA_TYPE,
            Data::String(_) => LabeledString::DATA_TYPE,
            Data::Bytes(_) => LabeledBytes::DATA_TYPE,
            Data::Basetime(_) => Basetime::DATA_TYPE,
        }
    }

    /// Label of a labeled-primitive sample.
    pub fn label(&self) -> Option<&str> {
        match self {
            Data::Float(v) => Some(&v.label),
            Data::Int(v) => Some(&v.label),
            Data::String(v) => Some(&v.label),
            Data::Bytes(v) => Some(&v.label),
            _ => None,
        }
    }

    /// Decode unit content of the given data type.
    pub fn decode(data_type: u8, content: Bytes) -> Result<Self> {
        let data_type = DataType::try_from(data_type)?;
        let declared = content.len();
        let mut rd = FieldReader::new(content);
        let data = match data_type {
            DataType::Can => Data::Can(Can::decode(&mut rd)?),
            DataType::CanBulk => Data::CanBulk(CanBulk::decode(&mut rd)?),
            DataType::Nmea => Data::Nmea(Nmea::decode(&mut rd)?),
            DataType::GeneralSensor => Data::GeneralSensor(GeneralSensor::decode(&mut rd)?),
            DataType::GeneralSensorBulk => {
                Data::GeneralSensorBulk(GeneralSensorBulk::decode(&mut rd)?)
            }
            DataType::Jpeg => Data::Jpeg(Jpeg::decode(&mut rd)?),
            DataType::H264 => Data::H264(H264::decode(&mut rd)?),
            DataType::Aac => Data::Aac(Aac::decode(&mut rd)?),
            DataType::Pcm => Data::Pcm(Pcm::decode(&mut rd)?),
            DataType::Controlpad => Data::Controlpad(Controlpad::decode(&mut rd)?),
            DataType::Mavlink => Data::Mavlink(Mavlink::decode(&mut rd)?),
            DataType::Generic => Data::Generic(Generic::decode(&mut rd)?),
            DataType::Float => Data::Float(LabeledFloat::decode(&mut rd)?),
            DataType::Int => Data::Int(LabeledInt::decode(&mut rd)?),
            DataType::String => Data::String(LabeledString::decode(&mut rd)?),
            DataType::Bytes => Data::Bytes(LabeledBytes::decode(&mut rd)?),
            DataType::Basetime => Data::Basetime(Basetime::decode(&mut rd)?),
        };
        if rd.has_remaining() {
            return Err(CodecError::LengthMismatch {
                field: "content",
                declared,
                actual: declared - rd.remaining(),
            });
        }
        Ok(data)
    }

    /// Append the payload layout to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let mut wr = FieldWriter::new(dst);
        match self {
            Data::Can(v) => v.encode(&mut wr),
            Data::CanBulk(v) => v.encode(&mut wr),
            Data::Nmea(v) => v.encode(&mut wr),
            Data::GeneralSensor(v) => v.encode(&mut wr),
            Data::GeneralSensorBulk(v) => v.encode(&mut wr),
            Data::Jpeg(v) => v.encode(&mut wr),
            Data::H264(v) => v.encode(&mut wr),
            Data::Aac(v) => v.encode(&mut wr),
            Data::Pcm(v) => v.encode(&mut wr),
            Data::Controlpad(v) => v.encode(&mut wr),
            Data::Mavlink(v) => v.encode(&mut wr),
            Data::Generic(v) => v.encode(&mut wr),
            Data::Float(v) => v.encode(&mut wr),
            Data::Int(v) => v.encode(&mut wr),
            Data::String(v) => v.encode(&mut wr),
            Data::Bytes(v) => v.encode(&mut wr),
            Data::Basetime(v) => v.encode(&mut wr),
        }
    }
}

//! Body layouts of every element type.
//!
//! Reading a raw element only walks fixed fields and counts. Unit content and
//! filter bodies are sliced out as opaque bytes, so a short buffer surfaces as
//! [`CodecError::Truncated`] before any payload is interpreted. Declared sizes
//! are checked against the content limit before the bytes behind them are
//! needed.

use std::time::Duration;

use bytes::{Buf, Bytes};
use edgewire_codec::field::{count_u16, count_u8};
use edgewire_codec::time::{read_elapsed, write_elapsed};
use edgewire_codec::{CodecError, FieldReader, FieldWriter, UnitWidths};
use tracing::debug;

use crate::codec::ElementType;
use crate::element::{
    DownstreamFilterResponse, DownstreamSpec, DownstreamSpecRequest, DownstreamSpecResponse,
    EosMarker, MeasurementIdRequest, MeasurementIdResponse, ResultCode, SectionAck, SosMarker,
    UpstreamSpec, UpstreamSpecRequest, UpstreamSpecResponse,
};
use crate::error::{FrameError, Result};

const FLAG_STORE: u8 = 0b0000_0001;
const FLAG_RESEND: u8 = 0b0000_0010;
const FLAG_FINAL: u8 = 0b0000_0001;

const UUID_SIZE: usize = 16;
// stream_id + src + dst
const DOWNSTREAM_SPEC_SIZE: usize = 1 + 2 * UUID_SIZE;
// channel + data_type + len
const DATA_FILTER_HEADER_SIZE: usize = 4;

/// Unit with its content still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUnit {
    pub stream_id: u8,
    pub channel: u8,
    pub data_type: u8,
    pub widths: UnitWidths,
    pub elapsed_time: Duration,
    pub content: Bytes,
}

/// Channel filter with its body still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDataFilter {
    pub channel: u8,
    pub data_type: u8,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDownstreamFilter {
    pub stream_id: u8,
    pub data_filters: Vec<RawDataFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDownstreamFilterRequest {
    pub req_id: u8,
    pub filters: Vec<RawDownstreamFilter>,
}

/// An element as laid out on the wire.
///
/// Only units and filter requests differ from their typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawElement {
    UpstreamSpecRequest(UpstreamSpecRequest),
    UpstreamSpecResponse(UpstreamSpecResponse),
    DownstreamSpecRequest(DownstreamSpecRequest),
    DownstreamSpecResponse(DownstreamSpecResponse),
    DownstreamFilterRequest(RawDownstreamFilterRequest),
    DownstreamFilterResponse(DownstreamFilterResponse),
    MeasurementIdRequest(MeasurementIdRequest),
    MeasurementIdResponse(MeasurementIdResponse),
    SosMarker(SosMarker),
    EosMarker(EosMarker),
    SectionAck(SectionAck),
    Unit(RawUnit),
}

impl RawElement {
    /// Whether the whole body, not just unit content, counts against the
    /// content limit.
    pub fn has_variable_body(&self) -> bool {
        matches!(
            self,
            RawElement::UpstreamSpecRequest(_)
                | RawElement::DownstreamSpecRequest(_)
                | RawElement::DownstreamFilterRequest(_)
        )
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            RawElement::UpstreamSpecRequest(_) => ElementType::UpstreamSpecRequest,
            RawElement::UpstreamSpecResponse(_) => ElementType::UpstreamSpecResponse,
            RawElement::DownstreamSpecRequest(_) => ElementType::DownstreamSpecRequest,
            RawElement::DownstreamSpecResponse(_) => ElementType::DownstreamSpecResponse,
            RawElement::DownstreamFilterRequest(_) => ElementType::DownstreamFilterRequest,
            RawElement::DownstreamFilterResponse(_) => ElementType::DownstreamFilterResponse,
            RawElement::MeasurementIdRequest(_) => ElementType::MeasurementIdRequest,
            RawElement::MeasurementIdResponse(_) => ElementType::MeasurementIdResponse,
            RawElement::SosMarker(_) => ElementType::SosMarker,
            RawElement::EosMarker(_) => ElementType::EosMarker,
            RawElement::SectionAck(_) => ElementType::SectionAck,
            RawElement::Unit(_) => ElementType::Unit,
        }
    }

    /// Read the body of an element of type `ty`.
    ///
    /// Unit content, and the whole body of a spec or filter request, longer
    /// than `max_content_len` is rejected before it is buffered.
    pub fn read<B: Buf>(
        ty: ElementType,
        rd: &mut FieldReader<B>,
        max_content_len: usize,
    ) -> Result<Self> {
        let limit = BodyLimit::new(rd, max_content_len);
        let raw = match ty {
            ElementType::UpstreamSpecRequest => {
                let req_id = rd.read_u8()?;
                let num = rd.read_u8()?;
                let mut specs = Vec::with_capacity(usize::from(num));
                for _ in 0..num {
                    specs.push(read_upstream_spec(rd, limit)?);
                }
                RawElement::UpstreamSpecRequest(UpstreamSpecRequest { req_id, specs })
            }
            ElementType::UpstreamSpecResponse => {
                let (req_id, result_code) = read_response(rd)?;
                RawElement::UpstreamSpecResponse(UpstreamSpecResponse {
                    req_id,
                    result_code,
                })
            }
            ElementType::DownstreamSpecRequest => {
                let req_id = rd.read_u8()?;
                let num = rd.read_u8()?;
                let mut specs = Vec::with_capacity(usize::from(num));
                for _ in 0..num {
                    limit.reserve(rd, DOWNSTREAM_SPEC_SIZE)?;
                    specs.push(DownstreamSpec {
                        stream_id: rd.read_u8()?,
                        src_edge_uuid: rd.read_uuid()?,
                        dst_edge_uuid: rd.read_uuid()?,
                    });
                }
                RawElement::DownstreamSpecRequest(DownstreamSpecRequest { req_id, specs })
            }
            ElementType::DownstreamSpecResponse => {
                let (req_id, result_code) = read_response(rd)?;
                RawElement::DownstreamSpecResponse(DownstreamSpecResponse {
                    req_id,
                    result_code,
                })
            }
            ElementType::DownstreamFilterRequest => {
                RawElement::DownstreamFilterRequest(read_filter_request(rd, limit)?)
            }
            ElementType::DownstreamFilterResponse => {
                let (req_id, result_code) = read_response(rd)?;
                RawElement::DownstreamFilterResponse(DownstreamFilterResponse {
                    req_id,
                    result_code,
                })
            }
            ElementType::MeasurementIdRequest => {
                RawElement::MeasurementIdRequest(MeasurementIdRequest {
                    req_id: rd.read_u8()?,
                    edge_uuid: rd.read_uuid()?,
                })
            }
            ElementType::MeasurementIdResponse => {
                let (req_id, result_code) = read_response(rd)?;
                RawElement::MeasurementIdResponse(MeasurementIdResponse {
                    req_id,
                    result_code,
                    measurement_uuid: rd.read_uuid()?,
                })
            }
            ElementType::SosMarker => RawElement::SosMarker(SosMarker {
                stream_id: rd.read_u8()?,
                serial_number: rd.read_u32()?,
            }),
            ElementType::EosMarker => RawElement::EosMarker(EosMarker {
                stream_id: rd.read_u8()?,
                is_final: rd.read_u8()? & FLAG_FINAL != 0,
                serial_number: rd.read_u32()?,
            }),
            ElementType::SectionAck => RawElement::SectionAck(SectionAck {
                stream_id: rd.read_u8()?,
                result_code: ResultCode::from(rd.read_u8()?),
                serial_number: rd.read_u32()?,
            }),
            ElementType::Unit => RawElement::Unit(read_unit(rd, max_content_len)?),
        };
        Ok(raw)
    }

    /// Write the body, without the common header.
    pub fn write(&self, wr: &mut FieldWriter<'_>) -> std::result::Result<(), CodecError> {
        match self {
            RawElement::UpstreamSpecRequest(v) => {
                wr.write_u8(v.req_id);
                wr.write_u8(count_u8("upstream_spec_num", v.specs.len())?);
                for spec in &v.specs {
                    write_upstream_spec(wr, spec)?;
                }
            }
            RawElement::UpstreamSpecResponse(v) => write_response(wr, v.req_id, v.result_code),
            RawElement::DownstreamSpecRequest(v) => {
                wr.write_u8(v.req_id);
                wr.write_u8(count_u8("downstream_spec_num", v.specs.len())?);
                for spec in &v.specs {
                    wr.write_u8(spec.stream_id);
                    wr.write_uuid(&spec.src_edge_uuid);
                    wr.write_uuid(&spec.dst_edge_uuid);
                }
            }
            RawElement::DownstreamSpecResponse(v) => write_response(wr, v.req_id, v.result_code),
            RawElement::DownstreamFilterRequest(v) => write_filter_request(wr, v)?,
            RawElement::DownstreamFilterResponse(v) => {
                write_response(wr, v.req_id, v.result_code)
            }
            RawElement::MeasurementIdRequest(v) => {
                wr.write_u8(v.req_id);
                wr.write_uuid(&v.edge_uuid);
            }
            RawElement::MeasurementIdResponse(v) => {
                write_response(wr, v.req_id, v.result_code);
                wr.write_uuid(&v.measurement_uuid);
            }
            RawElement::SosMarker(v) => {
                wr.write_u8(v.stream_id);
                wr.write_u32(v.serial_number);
            }
            RawElement::EosMarker(v) => {
                wr.write_u8(v.stream_id);
                wr.write_u8(if v.is_final { FLAG_FINAL } else { 0 });
                wr.write_u32(v.serial_number);
            }
            RawElement::SectionAck(v) => {
                wr.write_u8(v.stream_id);
                wr.write_u8(u8::from(v.result_code));
                wr.write_u32(v.serial_number);
            }
            RawElement::Unit(v) => write_unit(wr, v)?,
        }
        Ok(())
    }
}

fn read_response<B: Buf>(
    rd: &mut FieldReader<B>,
) -> std::result::Result<(u8, ResultCode), CodecError> {
    Ok((rd.read_u8()?, ResultCode::from(rd.read_u8()?)))
}

fn write_response(wr: &mut FieldWriter<'_>, req_id: u8, result_code: ResultCode) {
    wr.write_u8(req_id);
    wr.write_u8(u8::from(result_code));
}

/// Size check for bodies whose length is only known while walking them.
#[derive(Debug, Clone, Copy)]
struct BodyLimit {
    start: usize,
    max: usize,
}

impl BodyLimit {
    fn new<B: Buf>(rd: &FieldReader<B>, max: usize) -> Self {
        Self {
            start: rd.remaining(),
            max,
        }
    }

    /// Fail if the body read so far plus `more` bytes exceeds the limit.
    fn reserve<B: Buf>(&self, rd: &FieldReader<B>, more: usize) -> Result<()> {
        let size = self.start - rd.remaining() + more;
        if size > self.max {
            debug!(size, max = self.max, "element body over limit");
            return Err(FrameError::ContentTooLarge {
                size,
                max: self.max,
            });
        }
        Ok(())
    }
}

fn read_upstream_spec<B: Buf>(
    rd: &mut FieldReader<B>,
    limit: BodyLimit,
) -> Result<UpstreamSpec> {
    let stream_id = rd.read_u8()?;
    let flags = rd.read_u8()?;
    let dst_num = rd.read_u8()?;
    limit.reserve(rd, (2 + usize::from(dst_num)) * UUID_SIZE)?;
    let measurement_uuid = rd.read_uuid()?;
    let src_edge_uuid = rd.read_uuid()?;
    let mut dst_edge_uuids = Vec::with_capacity(usize::from(dst_num));
    for _ in 0..dst_num {
        dst_edge_uuids.push(rd.read_uuid()?);
    }
    Ok(UpstreamSpec {
        stream_id,
        store: flags & FLAG_STORE != 0,
        resend: flags & FLAG_RESEND != 0,
        measurement_uuid,
        src_edge_uuid,
        dst_edge_uuids,
    })
}

fn write_upstream_spec(
    wr: &mut FieldWriter<'_>,
    spec: &UpstreamSpec,
) -> std::result::Result<(), CodecError> {
    let dst_num = count_u8("dst_num", spec.dst_edge_uuids.len())?;
    let mut flags = 0;
    if spec.store {
        flags |= FLAG_STORE;
    }
    if spec.resend {
        flags |= FLAG_RESEND;
    }
    wr.write_u8(spec.stream_id);
    wr.write_u8(flags);
    wr.write_u8(dst_num);
    wr.write_uuid(&spec.measurement_uuid);
    wr.write_uuid(&spec.src_edge_uuid);
    for dst in &spec.dst_edge_uuids {
        wr.write_uuid(dst);
    }
    Ok(())
}

fn read_filter_request<B: Buf>(
    rd: &mut FieldReader<B>,
    limit: BodyLimit,
) -> Result<RawDownstreamFilterRequest> {
    let req_id = rd.read_u8()?;
    let stream_num = rd.read_u8()?;
    let mut filters = Vec::with_capacity(usize::from(stream_num));
    for _ in 0..stream_num {
        let stream_id = rd.read_u8()?;
        let data_num = rd.read_u16()?;
        limit.reserve(rd, usize::from(data_num) * DATA_FILTER_HEADER_SIZE)?;
        let mut data_filters = Vec::with_capacity(usize::from(data_num));
        for _ in 0..data_num {
            let channel = rd.read_u8()?;
            let data_type = rd.read_u8()?;
            let len = rd.read_u16()?;
            limit.reserve(rd, usize::from(len))?;
            data_filters.push(RawDataFilter {
                channel,
                data_type,
                body: rd.read_bytes(usize::from(len))?,
            });
        }
        filters.push(RawDownstreamFilter {
            stream_id,
            data_filters,
        });
    }
    Ok(RawDownstreamFilterRequest { req_id, filters })
}

fn write_filter_request(
    wr: &mut FieldWriter<'_>,
    request: &RawDownstreamFilterRequest,
) -> std::result::Result<(), CodecError> {
    wr.write_u8(request.req_id);
    wr.write_u8(count_u8("stream_num", request.filters.len())?);
    for stream in &request.filters {
        wr.write_u8(stream.stream_id);
        wr.write_u16(count_u16("data_num", stream.data_filters.len())?);
        for df in &stream.data_filters {
            wr.write_u8(df.channel);
            wr.write_u8(df.data_type);
            wr.write_u16(count_u16("filter_len", df.body.len())?);
            wr.write_bytes(&df.body);
        }
    }
    Ok(())
}

fn read_unit<B: Buf>(rd: &mut FieldReader<B>, max_content_len: usize) -> Result<RawUnit> {
    let stream_id = rd.read_u8()?;
    let channel = rd.read_u8()?;
    let data_type = rd.read_u8()?;
    let widths = UnitWidths::from_byte(rd.read_u8()?)?;
    let elapsed_time = read_elapsed(rd, widths)?;
    let len = rd.read_uint(widths.len)? as usize;
    if len > max_content_len {
        return Err(FrameError::ContentTooLarge {
            size: len,
            max: max_content_len,
        });
    }
    let content = rd.read_bytes(len)?;
    Ok(RawUnit {
        stream_id,
        channel,
        data_type,
        widths,
        elapsed_time,
        content,
    })
}

fn write_unit(wr: &mut FieldWriter<'_>, unit: &RawUnit) -> std::result::Result<(), CodecError> {
    wr.write_u8(unit.stream_id);
    wr.write_u8(unit.channel);
    wr.write_u8(unit.data_type);
    wr.write_u8(unit.widths.to_byte());
    write_elapsed(wr, unit.elapsed_time, unit.widths)?;
    let len = u32::try_from(unit.content.len()).map_err(|_| CodecError::Overflow {
        field: "content_length",
        value: unit.content.len() as u64,
        width: unit.widths.len.bytes(),
    })?;
    wr.write_uint("content_length", len, unit.widths.len)?;
    wr.write_bytes(&unit.content);
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use edgewire_codec::UintWidth;
    use uuid::Uuid;

    use super::*;

    fn written(raw: &RawElement) -> Vec<u8> {
        let mut buf = BytesMut::new();
        raw.write(&mut FieldWriter::new(&mut buf)).unwrap();
        buf.to_vec()
    }

    fn read_back(ty: ElementType, bytes: &[u8]) -> Result<RawElement> {
        let mut rd = FieldReader::new(bytes);
        RawElement::read(ty, &mut rd, 1024)
    }

    #[test]
    fn upstream_spec_fans_out_to_every_destination() {
        let dsts: Vec<Uuid> = (1..=3u128).map(Uuid::from_u128).collect();
        let raw = RawElement::UpstreamSpecRequest(UpstreamSpecRequest {
            req_id: 7,
            specs: vec![UpstreamSpec {
                stream_id: 1,
                store: true,
                resend: false,
                measurement_uuid: Uuid::from_u128(0xAB),
                src_edge_uuid: Uuid::from_u128(0xCD),
                dst_edge_uuids: dsts,
            }],
        });
        let bytes = written(&raw);
        // req_id, num, stream_id, flags, dst_num
        assert_eq!(&bytes[..5], &[7, 1, 1, FLAG_STORE, 3]);
        assert_eq!(bytes.len(), 5 + 16 * 5);
        assert_eq!(
            read_back(ElementType::UpstreamSpecRequest, &bytes).unwrap(),
            raw
        );
    }

    #[test]
    fn eos_final_flag() {
        let raw = RawElement::EosMarker(EosMarker {
            stream_id: 2,
            is_final: true,
            serial_number: 0x0102_0304,
        });
        let bytes = written(&raw);
        assert_eq!(bytes, vec![2, 1, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(read_back(ElementType::EosMarker, &bytes).unwrap(), raw);
    }

    #[test]
    fn filter_request_layout() {
        let raw = RawElement::DownstreamFilterRequest(RawDownstreamFilterRequest {
            req_id: 3,
            filters: vec![RawDownstreamFilter {
                stream_id: 5,
                data_filters: vec![RawDataFilter {
                    channel: 9,
                    data_type: 0x0A,
                    body: Bytes::from_static(b"\x03abc"),
                }],
            }],
        });
        let bytes = written(&raw);
        assert_eq!(
            bytes,
            vec![3, 1, 5, 1, 0, 9, 0x0A, 4, 0, 3, b'a', b'b', b'c']
        );
        assert_eq!(
            read_back(ElementType::DownstreamFilterRequest, &bytes).unwrap(),
            raw
        );
    }

    #[test]
    fn unit_header_and_content() {
        let raw = RawElement::Unit(RawUnit {
            stream_id: 1,
            channel: 2,
            data_type: 0x0E,
            widths: UnitWidths::encoder_default(UintWidth::One),
            elapsed_time: Duration::from_millis(1500),
            content: Bytes::from_static(b"\x01zq"),
        });
        let bytes = written(&raw);
        assert_eq!(&bytes[..4], &[1, 2, 0x0E, 0b0000_1010]);
        // 3-byte seconds, 3-byte microseconds, 1-byte length
        assert_eq!(&bytes[4..7], &[1, 0, 0]);
        assert_eq!(&bytes[7..10], &[0x20, 0xA1, 0x07]);
        assert_eq!(bytes[10], 3);
        assert_eq!(read_back(ElementType::Unit, &bytes).unwrap(), raw);
    }

    #[test]
    fn unit_content_over_limit_rejected_before_buffering() {
        // widths: 1-byte sec, ms fraction, 4-byte length
        let header = [1, 1, 0x0E, 0b0011_0100, 0, 0, 0, 0x00, 0x10, 0, 0];
        let err = read_back(ElementType::Unit, &header).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ContentTooLarge {
                size: 0x1000,
                max: 1024
            }
        ));
    }

    #[test]
    fn short_body_is_truncated() {
        let err = read_back(ElementType::SosMarker, &[1, 0, 0]).unwrap_err();
        assert!(err.is_truncated());

        let err = read_back(ElementType::MeasurementIdRequest, &[1; 10]).unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn unknown_result_code_survives() {
        let bytes = [4, 0x7E];
        assert_eq!(
            read_back(ElementType::DownstreamSpecResponse, &bytes).unwrap(),
            RawElement::DownstreamSpecResponse(DownstreamSpecResponse {
                req_id: 4,
                result_code: ResultCode::Other(0x7E),
            })
        );
    }
}

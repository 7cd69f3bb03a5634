//! Typed elements and their conversion to and from raw wire structures.

use std::time::Duration;

use bytes::BytesMut;
use edgewire_codec::{CodecError, Data, Filter, UintWidth, UnitWidths};
use uuid::Uuid;

use crate::codec::ElementType;
use crate::raw::{RawDataFilter, RawDownstreamFilter, RawDownstreamFilterRequest, RawElement, RawUnit};

/// Outcome reported by responses and section acknowledgements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    Ng,
    /// A code this implementation has no name for, kept as-is.
    Other(u8),
}

impl ResultCode {
    pub fn is_ok(self) -> bool {
        self == ResultCode::Ok
    }
}

impl From<u8> for ResultCode {
    fn from(code: u8) -> Self {
        match code {
            0x00 => ResultCode::Ok,
            0x01 => ResultCode::Ng,
            other => ResultCode::Other(other),
        }
    }
}

impl From<ResultCode> for u8 {
    fn from(code: ResultCode) -> Self {
        match code {
            ResultCode::Ok => 0x00,
            ResultCode::Ng => 0x01,
            ResultCode::Other(other) => other,
        }
    }
}

/// Start of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SosMarker {
    pub stream_id: u8,
    pub serial_number: u32,
}

/// End of a section; `is_final` marks the last section of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EosMarker {
    pub stream_id: u8,
    pub is_final: bool,
    pub serial_number: u32,
}

/// Acknowledgement of a received section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionAck {
    pub stream_id: u8,
    pub result_code: ResultCode,
    pub serial_number: u32,
}

/// One data sample on a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub stream_id: u8,
    pub channel: u8,
    /// Time since the stream's basetime.
    pub elapsed_time: Duration,
    pub data: Data,
}

/// One upstream stream, fanned out to every destination edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamSpec {
    pub stream_id: u8,
    pub store: bool,
    pub resend: bool,
    pub measurement_uuid: Uuid,
    pub src_edge_uuid: Uuid,
    pub dst_edge_uuids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamSpecRequest {
    pub req_id: u8,
    pub specs: Vec<UpstreamSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamSpecResponse {
    pub req_id: u8,
    pub result_code: ResultCode,
}

/// Point-to-point downstream subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownstreamSpec {
    pub stream_id: u8,
    pub src_edge_uuid: Uuid,
    pub dst_edge_uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamSpecRequest {
    pub req_id: u8,
    pub specs: Vec<DownstreamSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownstreamSpecResponse {
    pub req_id: u8,
    pub result_code: ResultCode,
}

/// Filter for one channel of a downstream stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamDataFilter {
    pub channel: u8,
    pub filter: Filter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamFilter {
    pub stream_id: u8,
    pub data_filters: Vec<DownstreamDataFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamFilterRequest {
    pub req_id: u8,
    pub filters: Vec<DownstreamFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownstreamFilterResponse {
    pub req_id: u8,
    pub result_code: ResultCode,
}

/// Request for a measurement id on behalf of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementIdRequest {
    pub req_id: u8,
    pub edge_uuid: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementIdResponse {
    pub req_id: u8,
    pub result_code: ResultCode,
    pub measurement_uuid: Uuid,
}

/// Every message that can appear on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    UpstreamSpecRequest(UpstreamSpecRequest),
    UpstreamSpecResponse(UpstreamSpecResponse),
    DownstreamSpecRequest(DownstreamSpecRequest),
    DownstreamSpecResponse(DownstreamSpecResponse),
    DownstreamFilterRequest(DownstreamFilterRequest),
    DownstreamFilterResponse(DownstreamFilterResponse),
    MeasurementIdRequest(MeasurementIdRequest),
    MeasurementIdResponse(MeasurementIdResponse),
    SosMarker(SosMarker),
    EosMarker(EosMarker),
    SectionAck(SectionAck),
    Unit(Unit),
}

macro_rules! impl_from_variant {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Element {
                fn from(value: $variant) -> Self {
                    Element::$variant(value)
                }
            }
        )*
    };
}

impl_from_variant!(
    UpstreamSpecRequest,
    UpstreamSpecResponse,
    DownstreamSpecRequest,
    DownstreamSpecResponse,
    DownstreamFilterRequest,
    DownstreamFilterResponse,
    MeasurementIdRequest,
    MeasurementIdResponse,
    SosMarker,
    EosMarker,
    SectionAck,
    Unit,
);

impl Element {
    pub fn element_type(&self) -> ElementType {
        match self {
            Element::UpstreamSpecRequest(_) => ElementType::UpstreamSpecRequest,
            Element::UpstreamSpecResponse(_) => ElementType::UpstreamSpecResponse,
            Element::DownstreamSpecRequest(_) => ElementType::DownstreamSpecRequest,
            Element::DownstreamSpecResponse(_) => ElementType::DownstreamSpecResponse,
            Element::DownstreamFilterRequest(_) => ElementType::DownstreamFilterRequest,
            Element::DownstreamFilterResponse(_) => ElementType::DownstreamFilterResponse,
            Element::MeasurementIdRequest(_) => ElementType::MeasurementIdRequest,
            Element::MeasurementIdResponse(_) => ElementType::MeasurementIdResponse,
            Element::SosMarker(_) => ElementType::SosMarker,
            Element::EosMarker(_) => ElementType::EosMarker,
            Element::SectionAck(_) => ElementType::SectionAck,
            Element::Unit(_) => ElementType::Unit,
        }
    }

    /// Stream the element belongs to, for stream-scoped elements.
    pub fn stream_id(&self) -> Option<u8> {
        match self {
            Element::SosMarker(v) => Some(v.stream_id),
            Element::EosMarker(v) => Some(v.stream_id),
            Element::SectionAck(v) => Some(v.stream_id),
            Element::Unit(v) => Some(v.stream_id),
            _ => None,
        }
    }

    /// Request correlation id, for request-scoped elements.
    pub fn req_id(&self) -> Option<u8> {
        match self {
            Element::UpstreamSpecRequest(v) => Some(v.req_id),
            Element::UpstreamSpecResponse(v) => Some(v.req_id),
            Element::DownstreamSpecRequest(v) => Some(v.req_id),
            Element::DownstreamSpecResponse(v) => Some(v.req_id),
            Element::DownstreamFilterRequest(v) => Some(v.req_id),
            Element::DownstreamFilterResponse(v) => Some(v.req_id),
            Element::MeasurementIdRequest(v) => Some(v.req_id),
            Element::MeasurementIdResponse(v) => Some(v.req_id),
            _ => None,
        }
    }

    /// Decode the payloads and filters held opaquely by a raw element.
    pub fn from_raw(raw: RawElement) -> Result<Self, CodecError> {
        Ok(match raw {
            RawElement::UpstreamSpecRequest(v) => Element::UpstreamSpecRequest(v),
            RawElement::UpstreamSpecResponse(v) => Element::UpstreamSpecResponse(v),
            RawElement::DownstreamSpecRequest(v) => Element::DownstreamSpecRequest(v),
            RawElement::DownstreamSpecResponse(v) => Element::DownstreamSpecResponse(v),
            RawElement::DownstreamFilterRequest(v) => {
                Element::DownstreamFilterRequest(filter_request_from_raw(v)?)
            }
            RawElement::DownstreamFilterResponse(v) => Element::DownstreamFilterResponse(v),
            RawElement::MeasurementIdRequest(v) => Element::MeasurementIdRequest(v),
            RawElement::MeasurementIdResponse(v) => Element::MeasurementIdResponse(v),
            RawElement::SosMarker(v) => Element::SosMarker(v),
            RawElement::EosMarker(v) => Element::EosMarker(v),
            RawElement::SectionAck(v) => Element::SectionAck(v),
            RawElement::Unit(v) => Element::Unit(Unit {
                stream_id: v.stream_id,
                channel: v.channel,
                elapsed_time: v.elapsed_time,
                data: Data::decode(v.data_type, v.content)?,
            }),
        })
    }

    /// Encode payloads and filters into a raw element.
    ///
    /// Unit content lengths are written in `content_length_width` bytes.
    pub fn to_raw(&self, content_length_width: UintWidth) -> Result<RawElement, CodecError> {
        Ok(match self {
            Element::UpstreamSpecRequest(v) => RawElement::UpstreamSpecRequest(v.clone()),
            Element::UpstreamSpecResponse(v) => RawElement::UpstreamSpecResponse(*v),
            Element::DownstreamSpecRequest(v) => RawElement::DownstreamSpecRequest(v.clone()),
            Element::DownstreamSpecResponse(v) => RawElement::DownstreamSpecResponse(*v),
            Element::DownstreamFilterRequest(v) => {
                RawElement::DownstreamFilterRequest(filter_request_to_raw(v)?)
            }
            Element::DownstreamFilterResponse(v) => RawElement::DownstreamFilterResponse(*v),
            Element::MeasurementIdRequest(v) => RawElement::MeasurementIdRequest(*v),
            Element::MeasurementIdResponse(v) => RawElement::MeasurementIdResponse(*v),
            Element::SosMarker(v) => RawElement::SosMarker(*v),
            Element::EosMarker(v) => RawElement::EosMarker(*v),
            Element::SectionAck(v) => RawElement::SectionAck(*v),
            Element::Unit(v) => {
                let mut content = BytesMut::new();
                v.data.encode(&mut content)?;
                RawElement::Unit(RawUnit {
                    stream_id: v.stream_id,
                    channel: v.channel,
                    data_type: v.data.data_type().tag(),
                    widths: UnitWidths::encoder_default(content_length_width),
                    elapsed_time: v.elapsed_time,
                    content: content.freeze(),
                })
            }
        })
    }
}

fn filter_request_from_raw(
    raw: RawDownstreamFilterRequest,
) -> Result<DownstreamFilterRequest, CodecError> {
    let filters = raw
        .filters
        .into_iter()
        .map(|stream| {
            let data_filters = stream
                .data_filters
                .into_iter()
                .map(|df| {
                    Ok(DownstreamDataFilter {
                        channel: df.channel,
                        filter: Filter::decode(df.data_type, df.body)?,
                    })
                })
                .collect::<Result<Vec<_>, CodecError>>()?;
            Ok(DownstreamFilter {
                stream_id: stream.stream_id,
                data_filters,
            })
        })
        .collect::<Result<Vec<_>, CodecError>>()?;
    Ok(DownstreamFilterRequest {
        req_id: raw.req_id,
        filters,
    })
}

fn filter_request_to_raw(
    request: &DownstreamFilterRequest,
) -> Result<RawDownstreamFilterRequest, CodecError> {
    let mut filters = Vec::with_capacity(request.filters.len());
    for stream in &request.filters {
        let mut data_filters = Vec::with_capacity(stream.data_filters.len());
        for df in &stream.data_filters {
            let mut body = BytesMut::new();
            let data_type = df.filter.encode(&mut body)?;
            data_filters.push(RawDataFilter {
                channel: df.channel,
                data_type: data_type.tag(),
                body: body.freeze(),
            });
        }
        filters.push(RawDownstreamFilter {
            stream_id: stream.stream_id,
            data_filters,
        });
    }
    Ok(RawDownstreamFilterRequest {
        req_id: request.req_id,
        filters,
    })
}

use bytes::{Buf, BytesMut};
use edgewire_codec::{CodecError, FieldReader, FieldWriter, UintWidth};
use tracing::{debug, trace};

use crate::element::Element;
use crate::error::{FrameError, Result};
use crate::raw::RawElement;

/// Preamble byte that opens every element.
pub const PREAMBLE: u8 = 0xAA;

/// Common header: preamble (1) + element type (1) = 2 bytes.
pub const HEADER_SIZE: usize = 2;

/// Default maximum content size: 16 MiB.
pub const DEFAULT_MAX_CONTENT: usize = 16 * 1024 * 1024;

/// Element type tag carried in the second header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    UpstreamSpecRequest = 0x01,
    UpstreamSpecResponse = 0x02,
    DownstreamSpecRequest = 0x03,
    DownstreamSpecResponse = 0x04,
    DownstreamFilterRequest = 0x05,
    DownstreamFilterResponse = 0x06,
    MeasurementIdRequest = 0x07,
    MeasurementIdResponse = 0x08,
    SosMarker = 0x09,
    EosMarker = 0x0A,
    SectionAck = 0x0B,
    Unit = 0x0C,
}

impl ElementType {
    pub const ALL: [ElementType; 12] = [
        ElementType::UpstreamSpecRequest,
        ElementType::UpstreamSpecResponse,
        ElementType::DownstreamSpecRequest,
        ElementType::DownstreamSpecResponse,
        ElementType::DownstreamFilterRequest,
        ElementType::DownstreamFilterResponse,
        ElementType::MeasurementIdRequest,
        ElementType::MeasurementIdResponse,
        ElementType::SosMarker,
        ElementType::EosMarker,
        ElementType::SectionAck,
        ElementType::Unit,
    ];

    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            ElementType::UpstreamSpecRequest => "upstream_spec_request",
            ElementType::UpstreamSpecResponse => "upstream_spec_response",
            ElementType::DownstreamSpecRequest => "downstream_spec_request",
            ElementType::DownstreamSpecResponse => "downstream_spec_response",
            ElementType::DownstreamFilterRequest => "downstream_filter_request",
            ElementType::DownstreamFilterResponse => "downstream_filter_response",
            ElementType::MeasurementIdRequest => "measurement_id_request",
            ElementType::MeasurementIdResponse => "measurement_id_response",
            ElementType::SosMarker => "sos_marker",
            ElementType::EosMarker => "eos_marker",
            ElementType::SectionAck => "section_ack",
            ElementType::Unit => "unit",
        }
    }
}

impl TryFrom<u8> for ElementType {
    type Error = FrameError;

    fn try_from(tag: u8) -> Result<Self> {
        ElementType::ALL
            .into_iter()
            .find(|ty| ty.tag() == tag)
            .ok_or(FrameError::UnsupportedElementType(tag))
    }
}

/// Configuration for the element codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum unit content size in bytes, also applied to the whole body of
    /// spec and filter requests. Default: 16 MiB.
    pub max_content_len: usize,
    /// Width of the content length field written in unit headers. Default: 4 bytes.
    pub content_length_width: UintWidth,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_content_len: DEFAULT_MAX_CONTENT,
            content_length_width: UintWidth::Four,
        }
    }
}

/// Encode an element into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────────┬──────────────┬──────────────────────────┐
/// │ Preamble (1B) │ Type (1B)    │ Body (layout per type)   │
/// │ 0xAA          │ 0x01..=0x0C  │                          │
/// └───────────────┴──────────────┴──────────────────────────┘
/// ```
///
/// On error `dst` is left as it was.
pub fn encode_element(elem: &Element, dst: &mut BytesMut, config: &FrameConfig) -> Result<()> {
    let raw = elem.to_raw(config.content_length_width)?;
    if let RawElement::Unit(unit) = &raw {
        if unit.content.len() > config.max_content_len {
            return Err(FrameError::ContentTooLarge {
                size: unit.content.len(),
                max: config.max_content_len,
            });
        }
    }

    let start = dst.len();
    let ty = raw.element_type();
    let mut wr = FieldWriter::new(dst);
    wr.write_u8(PREAMBLE);
    wr.write_u8(ty.tag());
    if let Err(err) = raw.write(&mut wr) {
        dst.truncate(start);
        return Err(err.into());
    }
    let body = dst.len() - start - HEADER_SIZE;
    if raw.has_variable_body() && body > config.max_content_len {
        dst.truncate(start);
        return Err(FrameError::ContentTooLarge {
            size: body,
            max: config.max_content_len,
        });
    }
    trace!(
        element_type = ty.name(),
        size = dst.len() - start,
        "encoded element"
    );
    Ok(())
}

/// Decode one element from the front of a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete element yet.
/// On success, consumes the element bytes from the buffer. A payload or
/// filter that fails to decode still consumes its frame.
pub fn decode_element(src: &mut BytesMut, config: &FrameConfig) -> Result<Option<Element>> {
    match decode_partial(src, config)? {
        Decoded::Element(elem) => Ok(Some(elem)),
        Decoded::NeedMore(_) => Ok(None),
    }
}

/// Outcome of one decode attempt.
#[derive(Debug)]
pub(crate) enum Decoded {
    Element(Element),
    /// The buffer must grow by at least this many bytes before the next
    /// attempt can get further.
    NeedMore(usize),
}

pub(crate) fn decode_partial(src: &mut BytesMut, config: &FrameConfig) -> Result<Decoded> {
    let Some(&preamble) = src.first() else {
        return Ok(Decoded::NeedMore(HEADER_SIZE));
    };
    if preamble != PREAMBLE {
        debug!(preamble, "frame does not start with preamble");
        return Err(FrameError::MalformedFrame(preamble));
    }
    if src.len() < HEADER_SIZE {
        return Ok(Decoded::NeedMore(HEADER_SIZE - src.len()));
    }
    let ty = ElementType::try_from(src[1])?;

    let mut rd = FieldReader::new(&src[HEADER_SIZE..]);
    let raw = match RawElement::read(ty, &mut rd, config.max_content_len) {
        Ok(raw) => raw,
        Err(FrameError::Codec(CodecError::Truncated { needed, remaining })) => {
            return Ok(Decoded::NeedMore(needed.saturating_sub(remaining).max(1)));
        }
        Err(err) => return Err(err),
    };
    let consumed = src.len() - rd.remaining();
    src.advance(consumed);

    let elem = Element::from_raw(raw)?;
    trace!(element_type = ty.name(), size = consumed, "decoded element");
    Ok(Decoded::Element(elem))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use edgewire_codec::{Can, CodecError, Data, DataType, Filter, IdKind, LabelKind, LabeledFloat};
    use uuid::Uuid;

    use super::*;
    use crate::element::*;

    fn can_unit() -> Element {
        Element::Unit(Unit {
            stream_id: 1,
            channel: 2,
            elapsed_time: Duration::from_millis(1500),
            data: Data::Can(Can {
                id: 0x123,
                data: Bytes::from_static(&[1; 8]),
            }),
        })
    }

    fn every_element() -> Vec<Element> {
        let measurement = Uuid::from_u128(0x1111);
        let src = Uuid::from_u128(0x2222);
        let dst = Uuid::from_u128(0x3333);
        vec![
            UpstreamSpecRequest {
                req_id: 1,
                specs: vec![UpstreamSpec {
                    stream_id: 1,
                    store: true,
                    resend: true,
                    measurement_uuid: measurement,
                    src_edge_uuid: src,
                    dst_edge_uuids: vec![dst, Uuid::from_u128(0x4444)],
                }],
            }
            .into(),
            UpstreamSpecResponse {
                req_id: 1,
                result_code: ResultCode::Ok,
            }
            .into(),
            DownstreamSpecRequest {
                req_id: 2,
                specs: vec![DownstreamSpec {
                    stream_id: 3,
                    src_edge_uuid: src,
                    dst_edge_uuid: dst,
                }],
            }
            .into(),
            DownstreamSpecResponse {
                req_id: 2,
                result_code: ResultCode::Ng,
            }
            .into(),
            DownstreamFilterRequest {
                req_id: 3,
                filters: vec![DownstreamFilter {
                    stream_id: 3,
                    data_filters: vec![
                        DownstreamDataFilter {
                            channel: 1,
                            filter: Filter::from_ids(IdKind::Nmea, ["GPGGA"]).unwrap(),
                        },
                        DownstreamDataFilter {
                            channel: 2,
                            filter: Filter::from_labels(LabelKind::Float, ["speed"]),
                        },
                    ],
                }],
            }
            .into(),
            DownstreamFilterResponse {
                req_id: 3,
                result_code: ResultCode::Other(9),
            }
            .into(),
            MeasurementIdRequest {
                req_id: 4,
                edge_uuid: src,
            }
            .into(),
            MeasurementIdResponse {
                req_id: 4,
                result_code: ResultCode::Ok,
                measurement_uuid: measurement,
            }
            .into(),
            SosMarker {
                stream_id: 1,
                serial_number: 10,
            }
            .into(),
            EosMarker {
                stream_id: 1,
                is_final: true,
                serial_number: 10,
            }
            .into(),
            SectionAck {
                stream_id: 1,
                result_code: ResultCode::Ok,
                serial_number: 10,
            }
            .into(),
            can_unit(),
        ]
    }

    #[test]
    fn test_element_type_tags() {
        for ty in ElementType::ALL {
            assert_eq!(ElementType::try_from(ty.tag()).unwrap(), ty);
        }
        assert!(matches!(
            ElementType::try_from(0x00),
            Err(FrameError::UnsupportedElementType(0x00))
        ));
    }

    #[test]
    fn test_encode_decode_every_element() {
        let config = FrameConfig::default();
        for elem in every_element() {
            let mut buf = BytesMut::new();
            encode_element(&elem, &mut buf, &config).unwrap();
            assert_eq!(buf[0], PREAMBLE);
            assert_eq!(buf[1], elem.element_type().tag());

            let decoded = decode_element(&mut buf, &config).unwrap().unwrap();
            assert_eq!(decoded, elem);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_can_unit_wire_bytes() {
        let config = FrameConfig {
            content_length_width: UintWidth::One,
            ..FrameConfig::default()
        };
        let mut buf = BytesMut::new();
        encode_element(&can_unit(), &mut buf, &config).unwrap();

        let expected: &[u8] = &[
            0xAA, 0x0C, // header
            0x01, 0x02, 0x01, 0b0000_1010, // stream, channel, CAN, widths
            0x01, 0x00, 0x00, // seconds
            0x20, 0xA1, 0x07, // 500_000 us
            0x0D, // content length
            0x23, 0x01, 0x00, 0x00, 0x08, 1, 1, 1, 1, 1, 1, 1, 1,
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn test_concatenated_elements() {
        let config = FrameConfig::default();
        let mut buf = BytesMut::new();
        let elems = every_element();
        for elem in &elems {
            encode_element(elem, &mut buf, &config).unwrap();
        }
        let mut decoded = Vec::new();
        while let Some(elem) = decode_element(&mut buf, &config).unwrap() {
            decoded.push(elem);
        }
        assert_eq!(decoded, elems);
    }

    #[test]
    fn test_decode_incomplete_element() {
        let config = FrameConfig::default();
        let mut full = BytesMut::new();
        encode_element(&can_unit(), &mut full, &config).unwrap();

        for cut in 0..full.len() {
            let mut buf = BytesMut::from(&full[..cut]);
            assert!(decode_element(&mut buf, &config).unwrap().is_none());
            assert_eq!(buf.len(), cut, "incomplete decode must not consume");
        }
    }

    #[test]
    fn test_decode_bad_preamble() {
        let mut buf = BytesMut::from(&[0x55, 0x09, 0, 0, 0, 0, 0][..]);
        let err = decode_element(&mut buf, &FrameConfig::default()).unwrap_err();
        assert!(matches!(err, FrameError::MalformedFrame(0x55)));
    }

    #[test]
    fn test_decode_unknown_element_type() {
        let mut buf = BytesMut::from(&[PREAMBLE, 0x42][..]);
        let err = decode_element(&mut buf, &FrameConfig::default()).unwrap_err();
        assert!(matches!(err, FrameError::UnsupportedElementType(0x42)));
    }

    #[test]
    fn test_content_too_large() {
        let config = FrameConfig {
            max_content_len: 4,
            ..FrameConfig::default()
        };
        let mut buf = BytesMut::new();
        let err = encode_element(&can_unit(), &mut buf, &config).unwrap_err();
        assert!(matches!(err, FrameError::ContentTooLarge { size: 13, max: 4 }));
        assert!(buf.is_empty());

        encode_element(&can_unit(), &mut buf, &FrameConfig::default()).unwrap();
        let err = decode_element(&mut buf, &config).unwrap_err();
        assert!(matches!(err, FrameError::ContentTooLarge { size: 13, max: 4 }));
    }

    #[test]
    fn test_request_body_counts_against_limit() {
        let config = FrameConfig {
            max_content_len: 64,
            ..FrameConfig::default()
        };
        let request = Element::DownstreamSpecRequest(DownstreamSpecRequest {
            req_id: 3,
            specs: (0..4)
                .map(|stream_id| DownstreamSpec {
                    stream_id,
                    src_edge_uuid: Uuid::from_u128(1),
                    dst_edge_uuid: Uuid::from_u128(2),
                })
                .collect(),
        });

        let mut buf = BytesMut::from(&b"keep"[..]);
        let err = encode_element(&request, &mut buf, &config).unwrap_err();
        // req_id + num + 4 * 33
        assert!(matches!(err, FrameError::ContentTooLarge { size: 134, max: 64 }));
        assert_eq!(&buf[..], b"keep");

        let mut buf = BytesMut::new();
        encode_element(&request, &mut buf, &FrameConfig::default()).unwrap();
        let err = decode_element(&mut buf, &config).unwrap_err();
        // Rejected at the second spec: 2 + 33 + 33 > 64.
        assert!(matches!(err, FrameError::ContentTooLarge { size: 68, max: 64 }));
    }

    #[test]
    fn test_encode_failure_leaves_buffer_untouched() {
        let mut buf = BytesMut::from(&b"keep"[..]);
        let elem = Element::Unit(Unit {
            stream_id: 1,
            channel: 1,
            elapsed_time: Duration::from_secs(1 << 24),
            data: Data::Float(LabeledFloat {
                label: "x".into(),
                value: 1.0,
            }),
        });
        let err = encode_element(&elem, &mut buf, &FrameConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Codec(CodecError::Overflow { .. })
        ));
        assert_eq!(&buf[..], b"keep");
    }

    #[test]
    fn test_bad_payload_consumes_frame() {
        let config = FrameConfig::default();
        let mut buf = BytesMut::new();
        // Unit with an unknown data type, then a valid marker.
        buf.extend_from_slice(&[PREAMBLE, 0x0C, 1, 1, 0x06, 0b0000_0100, 0, 0, 0, 0]);
        encode_element(
            &SosMarker {
                stream_id: 1,
                serial_number: 1,
            }
            .into(),
            &mut buf,
            &config,
        )
        .unwrap();

        let err = decode_element(&mut buf, &config).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Codec(CodecError::UnsupportedDataType(0x06))
        ));
        let next = decode_element(&mut buf, &config).unwrap().unwrap();
        assert_eq!(next.element_type(), ElementType::SosMarker);
    }

    #[test]
    fn test_truncated_payload_inside_complete_frame_is_error() {
        let config = FrameConfig::default();
        // CAN content of 2 bytes: id needs 4.
        let mut buf = BytesMut::from(
            &[PREAMBLE, 0x0C, 1, 1, DataType::Can.tag(), 0b0000_0100, 0, 0, 0, 2, 0xAB, 0xCD][..],
        );
        let err = decode_element(&mut buf, &config).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Codec(CodecError::Truncated { .. })
        ));
        assert!(buf.is_empty());
    }
}

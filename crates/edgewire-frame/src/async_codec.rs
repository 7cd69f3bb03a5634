//! `tokio_util` codec adapter over the element framing.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_partial, encode_element, Decoded, FrameConfig};
use crate::element::Element;
use crate::error::{FrameError, Result};

/// Element codec for `FramedRead`/`FramedWrite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementCodec {
    config: FrameConfig,
}

impl ElementCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for ElementCodec {
    type Item = Element;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Element>> {
        match decode_partial(src, &self.config)? {
            Decoded::Element(elem) => Ok(Some(elem)),
            Decoded::NeedMore(more) => {
                src.reserve(more);
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Element>> {
        match self.decode(src)? {
            Some(elem) => Ok(Some(elem)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::Truncated {
                buffered: src.len(),
            }),
        }
    }
}

impl Encoder<Element> for ElementCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Element, dst: &mut BytesMut) -> Result<()> {
        encode_element(&item, dst, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::Pin;
    use std::time::Duration;

    use bytes::Bytes;
    use edgewire_codec::{Data, LabeledBytes};
    use futures_core::Stream;
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::FramedRead;

    use super::*;
    use crate::element::{EosMarker, SosMarker, Unit};

    fn section() -> Vec<Element> {
        vec![
            SosMarker {
                stream_id: 4,
                serial_number: 77,
            }
            .into(),
            Unit {
                stream_id: 4,
                channel: 1,
                elapsed_time: Duration::from_micros(1_000_001),
                data: Data::Bytes(LabeledBytes {
                    label: "blob".into(),
                    value: Bytes::from_static(b"\x00\x01\x02"),
                }),
            }
            .into(),
            EosMarker {
                stream_id: 4,
                is_final: false,
                serial_number: 77,
            }
            .into(),
        ]
    }

    fn encoded(elems: &[Element]) -> Vec<u8> {
        let mut codec = ElementCodec::default();
        let mut buf = BytesMut::new();
        for elem in elems {
            codec.encode(elem.clone(), &mut buf).unwrap();
        }
        buf.to_vec()
    }

    async fn next<S>(stream: &mut S) -> Option<S::Item>
    where
        S: Stream + Unpin,
    {
        poll_fn(|cx| Pin::new(&mut *stream).poll_next(cx)).await
    }

    #[test]
    fn decode_eof_reports_leftover_bytes() {
        let mut wire = BytesMut::from(&encoded(&section()[..1])[..3]);
        let mut codec = ElementCodec::default();
        assert!(codec.decode(&mut wire).unwrap().is_none());
        let err = codec.decode_eof(&mut wire).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { buffered: 3 }));
    }

    #[test]
    fn decode_eof_on_empty_buffer() {
        let mut codec = ElementCodec::new(FrameConfig::default());
        assert!(codec.decode_eof(&mut BytesMut::new()).unwrap().is_none());
        assert_eq!(codec.config().max_content_len, crate::DEFAULT_MAX_CONTENT);
    }

    #[tokio::test]
    async fn framed_read_yields_each_element() {
        let wire = encoded(&section());
        let mut framed = FramedRead::new(wire.as_slice(), ElementCodec::default());

        let mut read = Vec::new();
        while let Some(elem) = next(&mut framed).await {
            read.push(elem.unwrap());
        }
        assert_eq!(read, section());
    }

    #[tokio::test]
    async fn framed_read_over_duplex_stream() {
        let (mut tx, rx) = tokio::io::duplex(16);
        let wire = encoded(&section());
        let writer = tokio::spawn(async move {
            tx.write_all(&wire).await.unwrap();
        });

        let mut framed = FramedRead::new(rx, ElementCodec::default());
        let mut read = Vec::new();
        while let Some(elem) = next(&mut framed).await {
            read.push(elem.unwrap());
        }
        writer.await.unwrap();
        assert_eq!(read, section());
    }

    #[tokio::test]
    async fn framed_read_surfaces_truncation() {
        let mut wire = encoded(&section());
        wire.truncate(wire.len() - 1);
        let mut framed = FramedRead::new(wire.as_slice(), ElementCodec::default());

        assert!(next(&mut framed).await.unwrap().is_ok());
        assert!(next(&mut framed).await.unwrap().is_ok());
        let err = next(&mut framed).await.unwrap().unwrap_err();
        assert!(err.is_truncated());
    }
}

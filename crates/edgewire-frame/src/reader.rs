use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::debug;

use crate::codec::{decode_partial, Decoded, FrameConfig};
use crate::element::Element;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete elements from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete elements.
/// A raw-layer decode error from [`read_elem`](Self::read_elem) is sticky:
/// the offending bytes stay buffered. As an [`Iterator`] the reader is fused
/// after the first `Err` it yields.
pub struct ElementReader<R> {
    inner: R,
    buf: BytesMut,
    config: FrameConfig,
    failed: bool,
}

impl<R: Read> ElementReader<R> {
    /// Create a new element reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new element reader with explicit configuration.
    pub fn with_config(inner: R, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            failed: false,
        }
    }

    /// Read the next complete element (blocking).
    ///
    /// Returns `Ok(None)` when EOF falls on an element boundary and
    /// `Err(FrameError::Truncated)` when it falls inside one.
    pub fn read_elem(&mut self) -> Result<Option<Element>> {
        loop {
            let wanted = match decode_partial(&mut self.buf, &self.config)? {
                Decoded::Element(elem) => return Ok(Some(elem)),
                Decoded::NeedMore(more) => self.buf.len() + more,
            };

            // Don't re-walk the partial element until the missing bytes are in.
            while self.buf.len() < wanted {
                if self.fill(wanted)? == 0 {
                    if self.buf.is_empty() {
                        return Ok(None);
                    }
                    debug!(buffered = self.buf.len(), "stream ended inside an element");
                    return Err(FrameError::Truncated {
                        buffered: self.buf.len(),
                    });
                }
            }
        }
    }

    /// One read from the inner stream, appended to the buffer.
    ///
    /// The read size grows with the buffered prefix, so a large element is
    /// walked a logarithmic number of times.
    fn fill(&mut self, wanted: usize) -> Result<usize> {
        let start = self.buf.len();
        let size = READ_CHUNK_SIZE.max(wanted - start).max(start);
        self.buf.resize(start + size, 0);
        loop {
            match self.inner.read(&mut self.buf[start..]) {
                Ok(n) => {
                    self.buf.truncate(start + n);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(FrameError::Io(err));
                }
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Update the content limit for subsequent decoding.
    pub fn set_max_content_len(&mut self, max_content_len: usize) {
        self.config.max_content_len = max_content_len;
    }

    /// Current element reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<R: Read> Iterator for ElementReader<R> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.read_elem().transpose();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bytes::Bytes;
    use edgewire_codec::{Data, Filter, Jpeg, LabelKind, Nmea};

    use super::*;
    use crate::codec::{encode_element, PREAMBLE};
    use crate::element::{
        DownstreamDataFilter, DownstreamFilter, DownstreamFilterRequest, EosMarker, SosMarker,
        Unit,
    };

    fn sos(serial_number: u32) -> Element {
        SosMarker {
            stream_id: 1,
            serial_number,
        }
        .into()
    }

    fn nmea_unit(sentence: &str) -> Element {
        Unit {
            stream_id: 1,
            channel: 3,
            elapsed_time: Duration::from_micros(250),
            data: Data::Nmea(Nmea {
                sentence: sentence.to_string(),
            }),
        }
        .into()
    }

    fn wire(elems: &[Element]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for elem in elems {
            encode_element(elem, &mut buf, &FrameConfig::default()).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_element() {
        let elem = nmea_unit("$GPGGA,1");
        let mut reader = ElementReader::new(Cursor::new(wire(&[elem.clone()])));

        assert_eq!(reader.read_elem().unwrap(), Some(elem));
        assert_eq!(reader.read_elem().unwrap(), None);
    }

    #[test]
    fn read_section() {
        let elems = vec![
            sos(1),
            nmea_unit("$GPGGA,1"),
            nmea_unit("$GPRMC,2"),
            EosMarker {
                stream_id: 1,
                is_final: true,
                serial_number: 1,
            }
            .into(),
        ];
        let reader = ElementReader::new(Cursor::new(wire(&elems)));
        let read: Vec<Element> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(read, elems);
    }

    #[test]
    fn read_element_with_large_content() {
        let elem: Element = Unit {
            stream_id: 2,
            channel: 1,
            elapsed_time: Duration::ZERO,
            data: Data::Jpeg(Jpeg {
                data: Bytes::from(vec![0xAB; 64 * 1024]),
            }),
        }
        .into();
        let mut reader = ElementReader::new(Cursor::new(wire(&[elem.clone()])));
        assert_eq!(reader.read_elem().unwrap(), Some(elem));
    }

    #[test]
    fn partial_read_handling() {
        let elems = vec![sos(4), nmea_unit("$GPGSV,slow")];
        let byte_reader = ByteByByteReader {
            bytes: wire(&elems),
            pos: 0,
        };
        let reader = ElementReader::new(byte_reader);
        let read: Vec<Element> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(read, elems);
    }

    #[test]
    fn clean_eof_is_none() {
        let mut reader = ElementReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_elem().unwrap().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn eof_mid_element_is_truncated() {
        let mut bytes = wire(&[sos(1)]);
        bytes.truncate(bytes.len() - 2);
        let buffered = bytes.len();

        let mut reader = ElementReader::new(Cursor::new(bytes));
        let err = reader.read_elem().unwrap_err();
        assert!(matches!(err, FrameError::Truncated { buffered: b } if b == buffered));
    }

    #[test]
    fn invalid_preamble_in_stream() {
        let mut bytes = wire(&[sos(1)]);
        bytes[0] = 0x00;
        let mut reader = ElementReader::new(Cursor::new(bytes));
        let err = reader.read_elem().unwrap_err();
        assert!(matches!(err, FrameError::MalformedFrame(0x00)));
    }

    #[test]
    fn unknown_element_type_in_stream() {
        let mut reader = ElementReader::new(Cursor::new(vec![PREAMBLE, 0x7F, 0x00]));
        let err = reader.read_elem().unwrap_err();
        assert!(matches!(err, FrameError::UnsupportedElementType(0x7F)));
    }

    #[test]
    fn oversized_unit_in_stream() {
        let bytes = wire(&[nmea_unit("$GPGGA,123456.00,4807.038,N")]);
        let mut reader = ElementReader::new(Cursor::new(bytes));
        reader.set_max_content_len(8);
        assert_eq!(reader.config().max_content_len, 8);

        let err = reader.read_elem().unwrap_err();
        assert!(matches!(err, FrameError::ContentTooLarge { max: 8, .. }));
    }

    /// Filter request with `count` label filters of roughly 8 KiB each.
    fn wide_filter_request(count: u8) -> Element {
        let labels: Vec<String> = (0..40).map(|i| format!("{i:0>200}")).collect();
        DownstreamFilterRequest {
            req_id: 1,
            filters: vec![DownstreamFilter {
                stream_id: 1,
                data_filters: (0..count)
                    .map(|channel| DownstreamDataFilter {
                        channel,
                        filter: Filter::from_labels(LabelKind::String, labels.clone()),
                    })
                    .collect(),
            }],
        }
        .into()
    }

    #[test]
    fn oversized_filter_request_rejected_before_buffering() {
        let bytes = wire(&[wide_filter_request(64)]);
        let total = bytes.len();
        let mut reader = ElementReader::new(Cursor::new(bytes));
        reader.set_max_content_len(1024);

        let err = reader.read_elem().unwrap_err();
        assert!(matches!(err, FrameError::ContentTooLarge { max: 1024, size } if size > 1024));
        assert!((reader.get_ref().position() as usize) < total / 8);
    }

    #[test]
    fn large_filter_request_read_in_few_passes() {
        let elem = wide_filter_request(32);
        let source = CountingReader {
            inner: Cursor::new(wire(&[elem.clone()])),
            reads: 0,
        };
        let mut reader = ElementReader::new(source);

        assert_eq!(reader.read_elem().unwrap(), Some(elem));
        assert!(reader.get_ref().reads <= 10, "reads: {}", reader.get_ref().reads);
    }

    #[test]
    fn iterator_stops_after_first_error() {
        let mut bytes = vec![0x55, 0x09, 0, 0, 0, 0, 0];
        bytes.extend(wire(&[sos(2)]));
        let items: Vec<Result<Element>> = ElementReader::new(Cursor::new(bytes)).collect();

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(FrameError::MalformedFrame(0x55))));
    }

    #[test]
    fn read_elem_keeps_reporting_raw_errors() {
        let mut reader = ElementReader::new(Cursor::new(vec![PREAMBLE, 0x7F, 0x00]));
        assert!(reader.read_elem().is_err());
        assert!(matches!(
            reader.read_elem(),
            Err(FrameError::UnsupportedElementType(0x7F))
        ));
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        reads: usize,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads += 1;
            self.inner.read(buf)
        }
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::ElementWriter::new(left);
        let mut reader = ElementReader::new(right);

        writer.write_elem(&sos(9)).unwrap();
        assert_eq!(reader.read_elem().unwrap(), Some(sos(9)));
    }

    #[test]
    #[cfg(unix)]
    fn concurrent_reader_writer_threads() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::ElementWriter::new(left);
        let reader = Arc::new(Mutex::new(ElementReader::new(right)));

        let reader_thread = {
            let reader = Arc::clone(&reader);
            std::thread::spawn(move || {
                for expected in 0..64u32 {
                    let elem = reader.lock().unwrap().read_elem().unwrap();
                    assert_eq!(elem, Some(sos(expected)));
                }
            })
        };

        for i in 0..64u32 {
            writer.write_elem(&sos(i)).unwrap();
        }

        reader_thread.join().unwrap();
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = ElementReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire(&[sos(7)]),
            pos: 0,
        };
        let mut framed = ElementReader::new(reader);
        let err = framed.read_elem().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            bytes: wire(&[sos(8)]),
            pos: 0,
        };
        let mut framed = ElementReader::new(reader);
        assert_eq!(framed.read_elem().unwrap(), Some(sos(8)));
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}

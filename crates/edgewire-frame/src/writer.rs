use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_element, FrameConfig};
use crate::element::Element;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete elements to any `Write` stream.
pub struct ElementWriter<W> {
    inner: W,
    buf: BytesMut,
    config: FrameConfig,
}

impl<W: Write> ElementWriter<W> {
    /// Create a new element writer with default configuration.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new element writer with explicit configuration.
    pub fn with_config(inner: W, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete element and flush (blocking).
    pub fn write_elem(&mut self, elem: &Element) -> Result<()> {
        self.buf.clear();
        encode_element(elem, &mut self.buf, &self.config)?;
        self.write_buffered()
    }

    /// Encode several elements and write them with a single flush.
    ///
    /// Nothing is written if any element fails to encode.
    pub fn write_elems<'a, I>(&mut self, elems: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Element>,
    {
        self.buf.clear();
        for elem in elems {
            encode_element(elem, &mut self.buf, &self.config)?;
        }
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Update the content limit for subsequent encoding.
    pub fn set_max_content_len(&mut self, max_content_len: usize) {
        self.config.max_content_len = max_content_len;
    }

    /// Current element writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

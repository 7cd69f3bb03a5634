//! Little-endian field primitives.
//!
//! Every multi-byte integer on the wire is little-endian. UUIDs are carried as
//! 16 raw bytes. Adaptive-width integers never pick their own width: callers
//! pass a [`UintWidth`] on both the read and the write side.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::{CodecError, Result};

/// Size of a UUID on the wire.
pub const UUID_SIZE: usize = 16;

/// Byte width of an adaptive-width unsigned integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UintWidth {
    One,
    Two,
    Three,
    Four,
}

impl UintWidth {
    /// Number of bytes this width occupies on the wire.
    pub const fn bytes(self) -> usize {
        match self {
            UintWidth::One => 1,
            UintWidth::Two => 2,
            UintWidth::Three => 3,
            UintWidth::Four => 4,
        }
    }

    /// Largest value representable in this width.
    pub const fn max_value(self) -> u32 {
        match self {
            UintWidth::One => 0xFF,
            UintWidth::Two => 0xFFFF,
            UintWidth::Three => 0xFF_FFFF,
            UintWidth::Four => u32::MAX,
        }
    }

    /// Width for a byte count, if one exists.
    pub const fn from_bytes(n: usize) -> Option<Self> {
        match n {
            1 => Some(UintWidth::One),
            2 => Some(UintWidth::Two),
            3 => Some(UintWidth::Three),
            4 => Some(UintWidth::Four),
            _ => None,
        }
    }
}

/// Reads wire fields from any [`Buf`].
///
/// Every read checks the remaining length first, so a short buffer always
/// yields [`CodecError::Truncated`] and never panics.
#[derive(Debug)]
pub struct FieldReader<B> {
    inner: B,
}

impl<B: Buf> FieldReader<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.inner.has_remaining()
    }

    pub fn into_inner(self) -> B {
        self.inner
    }

    fn require(&self, needed: usize) -> Result<()> {
        let remaining = self.inner.remaining();
        if remaining < needed {
            return Err(CodecError::Truncated { needed, remaining });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.require(1)?;
        Ok(self.inner.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.require(2)?;
        Ok(self.inner.get_u16_le())
    }

    pub fn read_u24(&mut self) -> Result<u32> {
        self.require(3)?;
        Ok(self.inner.get_uint_le(3) as u32)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.require(4)?;
        Ok(self.inner.get_u32_le())
    }

    pub fn read_u40(&mut self) -> Result<u64> {
        self.require(5)?;
        Ok(self.inner.get_uint_le(5))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.require(8)?;
        Ok(self.inner.get_i64_le())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.require(8)?;
        Ok(self.inner.get_f64_le())
    }

    pub fn read_uuid(&mut self) -> Result<Uuid> {
        self.require(UUID_SIZE)?;
        let mut raw = [0u8; UUID_SIZE];
        self.inner.copy_to_slice(&mut raw);
        Ok(Uuid::from_bytes(raw))
    }

    /// Read an unsigned integer of an explicit width.
    pub fn read_uint(&mut self, width: UintWidth) -> Result<u32> {
        let n = width.bytes();
        self.require(n)?;
        Ok(self.inner.get_uint_le(n) as u32)
    }

    /// Read exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        self.require(n)?;
        Ok(self.inner.copy_to_bytes(n))
    }

    /// Read a length of `width` bytes, then that many bytes.
    pub fn read_prefixed(&mut self, width: UintWidth) -> Result<Bytes> {
        let len = self.read_uint(width)? as usize;
        self.read_bytes(len)
    }

    /// Consume everything left in the current body.
    pub fn read_remaining(&mut self) -> Bytes {
        let n = self.inner.remaining();
        self.inner.copy_to_bytes(n)
    }

    /// Read exactly `n` bytes as a UTF-8 string.
    pub fn read_string(&mut self, n: usize, field: &'static str) -> Result<String> {
        let raw = self.read_bytes(n)?;
        bytes_to_string(raw, field)
    }

    /// Consume everything left in the current body as a UTF-8 string.
    pub fn read_remaining_string(&mut self, field: &'static str) -> Result<String> {
        let raw = self.read_remaining();
        bytes_to_string(raw, field)
    }
}

fn bytes_to_string(raw: Bytes, field: &'static str) -> Result<String> {
    String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidUtf8 { field })
}

/// Appends wire fields to a [`BytesMut`].
#[derive(Debug)]
pub struct FieldWriter<'a> {
    dst: &'a mut BytesMut,
}

impl<'a> FieldWriter<'a> {
    pub fn new(dst: &'a mut BytesMut) -> Self {
        Self { dst }
    }

    /// Bytes written to the destination so far (including earlier content).
    pub fn len(&self) -> usize {
        self.dst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dst.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.dst.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.dst.put_u16_le(value);
    }

    pub fn write_u24(&mut self, field: &'static str, value: u32) -> Result<()> {
        self.write_uint(field, value, UintWidth::Three)
    }

    pub fn write_u32(&mut self, value: u32) {
        self.dst.put_u32_le(value);
    }

    pub fn write_u40(&mut self, field: &'static str, value: u64) -> Result<()> {
        if value > 0xFF_FFFF_FFFF {
            return Err(CodecError::Overflow {
                field,
                value,
                width: 5,
            });
        }
        self.dst.put_uint_le(value, 5);
        Ok(())
    }

    pub fn write_i64(&mut self, value: i64) {
        self.dst.put_i64_le(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.dst.put_f64_le(value);
    }

    pub fn write_uuid(&mut self, value: &Uuid) {
        self.dst.put_slice(value.as_bytes());
    }

    /// Write an unsigned integer in an explicit width.
    pub fn write_uint(&mut self, field: &'static str, value: u32, width: UintWidth) -> Result<()> {
        if value > width.max_value() {
            return Err(CodecError::Overflow {
                field,
                value: u64::from(value),
                width: width.bytes(),
            });
        }
        self.dst.put_uint_le(u64::from(value), width.bytes());
        Ok(())
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.dst.put_slice(value);
    }

    /// Write `value.len()` in `width` bytes followed by `value`.
    pub fn write_prefixed(
        &mut self,
        field: &'static str,
        value: &[u8],
        width: UintWidth,
    ) -> Result<()> {
        let len = u32::try_from(value.len()).map_err(|_| CodecError::Overflow {
            field,
            value: value.len() as u64,
            width: width.bytes(),
        })?;
        self.write_uint(field, len, width)?;
        self.write_bytes(value);
        Ok(())
    }
}

/// Narrow a sequence length to a `u8` count field.
pub fn count_u8(field: &'static str, len: usize) -> Result<u8> {
    u8::try_from(len).map_err(|_| CodecError::Overflow {
        field,
        value: len as u64,
        width: 1,
    })
}

/// Narrow a sequence length to a `u16` count field.
pub fn count_u16(field: &'static str, len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| CodecError::Overflow {
        field,
        value: len as u64,
        width: 2,
    })
}

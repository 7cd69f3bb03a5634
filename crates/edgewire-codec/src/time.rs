//! Adaptive-precision elapsed time of a `Unit`.
//!
//! A unit header carries one width indicator byte followed by the whole
//! seconds, the sub-second fraction and the content length, each in the width
//! the indicator selects:
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! ┌───────┬───────┬───────┬───────┐
//! │ rsvd  │ len-1 │ frac  │ sec-1 │
//! └───────┴───────┴───────┴───────┘
//! ```
//!
//! `frac` selects both the width and the unit of the fraction:
//! `01` milliseconds (2 bytes), `10` microseconds (3 bytes),
//! `11` nanoseconds (4 bytes).

use std::time::Duration;

use bytes::Buf;

use crate::error::{CodecError, Result};
use crate::field::{FieldReader, FieldWriter, UintWidth};

const SEC_MASK: u8 = 0b0000_0011;
const FRAC_SHIFT: u8 = 2;
const FRAC_MASK: u8 = 0b0000_1100;
const LEN_SHIFT: u8 = 4;
const LEN_MASK: u8 = 0b0011_0000;

/// Unit and width of the sub-second fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FracPrecision {
    /// 2-byte fraction in milliseconds.
    Millis,
    /// 3-byte fraction in microseconds.
    Micros,
    /// 4-byte fraction in nanoseconds.
    Nanos,
}

impl FracPrecision {
    pub const fn width(self) -> UintWidth {
        match self {
            FracPrecision::Millis => UintWidth::Two,
            FracPrecision::Micros => UintWidth::Three,
            FracPrecision::Nanos => UintWidth::Four,
        }
    }

    const fn bits(self) -> u8 {
        match self {
            FracPrecision::Millis => 0b01,
            FracPrecision::Micros => 0b10,
            FracPrecision::Nanos => 0b11,
        }
    }

    fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            0b01 => Ok(FracPrecision::Millis),
            0b10 => Ok(FracPrecision::Micros),
            0b11 => Ok(FracPrecision::Nanos),
            other => Err(CodecError::InvalidWidth {
                field: "elapsed_time_frac",
                value: other,
            }),
        }
    }

    fn split(self, elapsed: Duration) -> u32 {
        match self {
            FracPrecision::Millis => elapsed.subsec_millis(),
            FracPrecision::Micros => elapsed.subsec_micros(),
            FracPrecision::Nanos => elapsed.subsec_nanos(),
        }
    }

    /// Fraction units in one second.
    pub const fn per_second(self) -> u32 {
        match self {
            FracPrecision::Millis => 1_000,
            FracPrecision::Micros => 1_000_000,
            FracPrecision::Nanos => 1_000_000_000,
        }
    }

    /// A fraction of a whole second or more is rejected, so every duration
    /// has exactly one encoding per precision.
    fn join(self, sec: u32, frac: u32) -> Result<Duration> {
        let per_second = self.per_second();
        if frac >= per_second {
            return Err(CodecError::FractionOutOfRange {
                value: frac,
                limit: per_second,
            });
        }
        let nanos = frac * (1_000_000_000 / per_second);
        Ok(Duration::new(u64::from(sec), nanos))
    }
}

/// Field widths announced by a unit's width indicator byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitWidths {
    pub sec: UintWidth,
    pub frac: FracPrecision,
    pub len: UintWidth,
}

impl UnitWidths {
    /// What the encoder emits: 3-byte seconds, microsecond fraction.
    pub const fn encoder_default(len: UintWidth) -> Self {
        Self {
            sec: UintWidth::Three,
            frac: FracPrecision::Micros,
            len,
        }
    }

    pub fn to_byte(self) -> u8 {
        let sec = (self.sec.bytes() - 1) as u8;
        let len = (self.len.bytes() - 1) as u8;
        sec | (self.frac.bits() << FRAC_SHIFT) | (len << LEN_SHIFT)
    }

    /// Parse an indicator byte. Reserved bits are ignored.
    pub fn from_byte(value: u8) -> Result<Self> {
        let sec_bits = value & SEC_MASK;
        // Seconds never take more than three bytes.
        let sec = match UintWidth::from_bytes(usize::from(sec_bits) + 1) {
            Some(UintWidth::Four) | None => {
                return Err(CodecError::InvalidWidth {
                    field: "elapsed_time_sec",
                    value: sec_bits,
                })
            }
            Some(width) => width,
        };
        let frac = FracPrecision::from_bits((value & FRAC_MASK) >> FRAC_SHIFT)?;
        let len_bits = (value & LEN_MASK) >> LEN_SHIFT;
        let len = UintWidth::from_bytes(usize::from(len_bits) + 1).ok_or(
            CodecError::InvalidWidth {
                field: "content_length",
                value: len_bits,
            },
        )?;
        Ok(Self { sec, frac, len })
    }
}

/// Read seconds and fraction in the given widths and join them.
pub fn read_elapsed<B: Buf>(rd: &mut FieldReader<B>, widths: UnitWidths) -> Result<Duration> {
    let sec = rd.read_uint(widths.sec)?;
    let frac = rd.read_uint(widths.frac.width())?;
    widths.frac.join(sec, frac)
}

/// Split `elapsed` into seconds and fraction and write both.
///
/// Precision finer than `widths.frac` is truncated.
pub fn write_elapsed(wr: &mut FieldWriter<'_>, elapsed: Duration, widths: UnitWidths) -> Result<()> {
    let sec = u32::try_from(elapsed.as_secs()).map_err(|_| CodecError::Overflow {
        field: "elapsed_time_sec",
        value: elapsed.as_secs(),
        width: widths.sec.bytes(),
    })?;
    wr.write_uint("elapsed_time_sec", sec, widths.sec)?;
    wr.write_uint(
        "elapsed_time_frac",
        widths.frac.split(elapsed),
        widths.frac.width(),
    )
}

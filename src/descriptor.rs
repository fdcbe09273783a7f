//! Data descriptors (FXY codes).

use core::{fmt, str::FromStr};

use tartan_bitfield::bitfield;
use thiserror::Error;

use crate::layout::Decode;

/// A data descriptor, identifying how a part of the data section is laid out.
///
/// Whether a descriptor is known to a particular set of tables is not checked
/// here; see [`crate::expand::Tables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Decode)]
pub struct Descriptor {
    /// Class: 0 for elements (Table B), 1 for replication, 2 for operators
    /// (Table C), 3 for sequences (Table D).
    #[bufr(bits = 2)]
    pub f: u8,
    /// Category.
    #[bufr(bits = 6)]
    pub x: u8,
    /// Entry within the category.
    #[bufr(bits = 8)]
    pub y: u8,
}

/// The role a descriptor plays, derived from its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A single value described by Table B.
    Element,
    /// Repeat the next `descriptors` descriptors `count` times. A `count` of
    /// zero marks delayed replication: the count is read from the data.
    Replication { descriptors: u8, count: u8 },
    /// A Table C operator applied to subsequent descriptors.
    Operator { operator: u8, operand: u8 },
    /// A list of descriptors described by Table D.
    Sequence,
}

bitfield! {
    struct Packed(u16) {
        [0..8] y: u8,
        [8..14] x: u8,
        [14..16] f: u8,
    }
}

impl Descriptor {
    /// Compose a descriptor. `f` and `x` are truncated to 2 and 6 bits.
    pub const fn new(f: u8, x: u8, y: u8) -> Self {
        Self {
            f: f & 0b11,
            x: x & 0b11_1111,
            y,
        }
    }

    pub fn kind(&self) -> Kind {
        match self.f {
            0 => Kind::Element,
            1 => Kind::Replication {
                descriptors: self.x,
                count: self.y,
            },
            2 => Kind::Operator {
                operator: self.x,
                operand: self.y,
            },
            _ => Kind::Sequence,
        }
    }
}

impl From<u16> for Descriptor {
    fn from(code: u16) -> Self {
        let packed = Packed(code);
        Self {
            f: packed.f(),
            x: packed.x(),
            y: packed.y(),
        }
    }
}

impl From<Descriptor> for u16 {
    fn from(d: Descriptor) -> Self {
        (d.f as u16) << 14 | (d.x as u16) << 8 | d.y as u16
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}{:03}", self.f, self.x, self.y)
    }
}

/// An error parsing a descriptor from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseDescriptorError {
    /// The text is not six ASCII digits.
    #[error("Descriptor must be six digits.")]
    Format,
    /// A part exceeds its bit width.
    #[error("Descriptor part out of range.")]
    Range,
}

impl FromStr for Descriptor {
    type Err = ParseDescriptorError;

    /// Parse the six-digit form `FXXYYY`, such as `001002`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            Err(ParseDescriptorError::Format)?;
        }

        let part = |r: core::ops::Range<usize>| {
            s[r].parse::<u16>()
                .map_err(|_| ParseDescriptorError::Format)
        };
        let (f, x, y) = (part(0..1)?, part(1..3)?, part(3..6)?);

        if f > 3 || x > 63 || y > 255 {
            Err(ParseDescriptorError::Range)?;
        }

        Ok(Self {
            f: f as u8,
            x: x as u8,
            y: y as u8,
        })
    }
}

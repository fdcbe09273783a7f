//! Declarative field layouts.
//!
//! Each record is described by a static table mapping its fields, in stream
//! order, to the bits they occupy. A single routine, [`Frame::read`], reads a
//! field of any record by consulting its entry in the table. The
//! [`Decode`](macro@Decode) derive macro builds the table from field
//! attributes and emits a `decode` method that calls this routine once per
//! field.

use alloc::vec::Vec;

use crate::{
    Error,
    bits::{BitCursor, ReadError, Source},
    error::Mismatch,
};

/// Derive [`Decode`] for a struct with named fields.
///
/// Each field takes one `bufr` attribute, and fields are read in declaration
/// order:
///
/// - `#[bufr(length)]`: a 24-bit section length, in octets, counted from the
///   first octet of the record.
/// - `#[bufr(bits = N)]`: an `N`-bit unsigned integer (or `bool`). Add
///   `skip = M` to discard `M` reserved bits afterward, and `offset = K` to add
///   a fixed offset to the value read.
/// - `#[bufr(magic = b"...")]`: a `[u8; N]` literal, rejected if it differs.
/// - `#[bufr(remaining)]`: a `Vec<T>` of records filling the remainder of the
///   declared length.
///
/// ```
/// #[derive(Debug, Decode)]
/// struct Section3 {
///     #[bufr(length)]
///     length: u32,
///     #[bufr(bits = 8)]
///     reserved: u8,
///     #[bufr(bits = 16)]
///     subset_count: u16,
///     #[bufr(bits = 1)]
///     observed_data: bool,
///     #[bufr(bits = 1, skip = 6)]
///     compressed_data: bool,
///     #[bufr(remaining)]
///     descriptors: Vec<Descriptor>,
/// }
/// ```
pub use bufr_derive::Decode;

/// A record with a static field layout.
///
/// See the [`Decode`](macro@Decode) derive macro for an automatic
/// implementation of this trait.
pub trait Decode: Sized {
    /// Name of the record, reported in errors.
    const NAME: &'static str;
    /// Fields of the record, in stream order.
    const LAYOUT: &'static [Field];

    /// Read the record from the tip of a cursor.
    fn decode<S: Source>(cursor: &mut BitCursor<S>) -> Result<Self, Error>;

    /// Number of bits the fixed part of the layout occupies.
    fn fixed_bits() -> u64 {
        Self::LAYOUT.iter().map(Field::bits).sum()
    }
}

/// An entry in a record's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
}

impl Field {
    /// Number of bits this field occupies, or zero if it depends on the
    /// declared length.
    pub fn bits(&self) -> u64 {
        match self.kind {
            Kind::Length => 24,
            Kind::Bits { width, skip, .. } => width as u64 + skip as u64,
            Kind::Magic(literal) => literal.len() as u64 * 8,
            Kind::Remaining => 0,
        }
    }
}

/// How a field is laid out in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A 24-bit section length in octets.
    Length,
    /// An unsigned integer of `width` bits, followed by `skip` reserved bits.
    /// The value stored is the value read plus `offset`.
    Bits { width: u32, skip: u32, offset: u64 },
    /// A literal sequence of octets.
    Magic(&'static [u8]),
    /// Records filling the rest of the declared length.
    Remaining,
}

/// Progress through a single record.
#[derive(Debug)]
pub struct Frame {
    section: &'static str,
    start: u64,
    length: Option<u64>,
}

impl Frame {
    /// Begin reading a record at the cursor's position.
    pub fn new<S: Source>(section: &'static str, cursor: &BitCursor<S>) -> Self {
        Self {
            section,
            start: cursor.position(),
            length: None,
        }
    }

    /// Read a field described by a layout entry.
    pub fn read<T: FromField, S: Source>(
        &mut self,
        cursor: &mut BitCursor<S>,
        field: &Field,
    ) -> Result<T, Error> {
        T::from_field(self, cursor, field)
    }

    /// Octets consumed since the start of the record.
    pub fn consumed<S: Source>(&self, cursor: &BitCursor<S>) -> u64 {
        (cursor.position() - self.start).div_ceil(8)
    }

    fn integer<S: Source>(&mut self, cursor: &mut BitCursor<S>, field: &Field) -> Result<u64, Error> {
        let (section, start) = (self.section, cursor.position());
        let read = |cursor: &mut BitCursor<S>, n| {
            cursor
                .read_bits(n)
                .map_err(|e| read_error(section, field.name, start, e))
        };

        match field.kind {
            Kind::Length => {
                let length = read(cursor, 24)?;
                self.length = Some(length);
                Ok(length)
            }
            Kind::Bits {
                width,
                skip,
                offset,
            } => {
                let value = read(cursor, width)?;

                let mut skip = skip;
                while skip > 0 {
                    let n = skip.min(64);
                    read(cursor, n)?;
                    skip -= n;
                }

                value
                    .checked_add(offset)
                    .ok_or_else(|| self.mismatch(field, start, Mismatch::Overflow(value)))
            }
            Kind::Magic(_) | Kind::Remaining => Err(self.layout(field)),
        }
    }

    /// Number of `unit`-octet entries filling the rest of the declared length.
    fn remaining<S: Source>(
        &self,
        cursor: &BitCursor<S>,
        field: &Field,
        unit: u64,
    ) -> Result<u64, Error> {
        let (Kind::Remaining, Some(declared)) = (field.kind, self.length) else {
            return Err(self.layout(field));
        };

        if unit == 0 {
            return Err(self.layout(field));
        }

        let start = cursor.position();
        let consumed = self.consumed(cursor);

        let Some(remaining) = declared.checked_sub(consumed) else {
            return Err(self.mismatch(field, start, Mismatch::Length { declared, consumed }));
        };

        if remaining % unit != 0 {
            Err(self.mismatch(field, start, Mismatch::Remainder { remaining, unit }))?;
        }

        Ok(remaining / unit)
    }

    fn mismatch(&self, field: &Field, position: u64, mismatch: Mismatch) -> Error {
        Error::FormatMismatch {
            section: self.section,
            field: field.name,
            position,
            mismatch,
        }
    }

    fn layout(&self, field: &Field) -> Error {
        Error::Layout {
            section: self.section,
            field: field.name,
        }
    }
}

/// Attach record context to a cursor error.
pub(crate) fn read_error(
    section: &'static str,
    field: &'static str,
    position: u64,
    err: ReadError,
) -> Error {
    match err {
        ReadError::Exhausted { .. } => Error::Truncated {
            section,
            field,
            position,
        },
        ReadError::Width(width) => Error::Width {
            section,
            field,
            width,
        },
        ReadError::Io(err) => Error::Io(err),
    }
}

/// A value that can be stored in a record field.
pub trait FromField: Sized {
    /// Read the value for a layout entry from the tip of a cursor.
    fn from_field<S: Source>(
        frame: &mut Frame,
        cursor: &mut BitCursor<S>,
        field: &Field,
    ) -> Result<Self, Error>;
}

macro_rules! from_field_integer {
    ($($t:ty),*) => {
        $(
            impl FromField for $t {
                fn from_field<S: Source>(
                    frame: &mut Frame,
                    cursor: &mut BitCursor<S>,
                    field: &Field,
                ) -> Result<Self, Error> {
                    let start = cursor.position();
                    let value = frame.integer(cursor, field)?;

                    <$t>::try_from(value)
                        .map_err(|_| frame.mismatch(field, start, Mismatch::Overflow(value)))
                }
            }
        )*
    };
}

from_field_integer!(u8, u16, u32, u64);

impl FromField for bool {
    fn from_field<S: Source>(
        frame: &mut Frame,
        cursor: &mut BitCursor<S>,
        field: &Field,
    ) -> Result<Self, Error> {
        Ok(frame.integer(cursor, field)? != 0)
    }
}

impl<const N: usize> FromField for [u8; N] {
    fn from_field<S: Source>(
        frame: &mut Frame,
        cursor: &mut BitCursor<S>,
        field: &Field,
    ) -> Result<Self, Error> {
        let Kind::Magic(expected) = field.kind else {
            return Err(frame.layout(field));
        };

        let start = cursor.position();

        // Read octet by octet: the literal is compared as text, not a number.
        let mut found = [0; N];
        for b in &mut found {
            *b = cursor
                .read_byte()
                .map_err(|e| read_error(frame.section, field.name, start, e))?;
        }

        if found.as_slice() != expected {
            Err(frame.mismatch(
                field,
                start,
                Mismatch::Literal {
                    expected,
                    found: found.to_vec(),
                },
            ))?;
        }

        Ok(found)
    }
}

impl<T: Decode> FromField for Vec<T> {
    fn from_field<S: Source>(
        frame: &mut Frame,
        cursor: &mut BitCursor<S>,
        field: &Field,
    ) -> Result<Self, Error> {
        let count = frame.remaining(cursor, field, T::fixed_bits() / 8)?;
        let start = cursor.position();

        let mut items = Vec::with_capacity(count.min(4096) as usize);
        for _ in 0..count {
            // Report truncation against the enclosing field, not the entry.
            let item = T::decode(cursor).map_err(|e| match e {
                Error::Truncated { .. } => Error::Truncated {
                    section: frame.section,
                    field: field.name,
                    position: start,
                },
                e => e,
            })?;
            items.push(item);
        }

        Ok(items)
    }
}

/// Single octets, for fields holding opaque bytes.
impl Decode for u8 {
    const NAME: &'static str = "octet";
    const LAYOUT: &'static [Field] = &[Field {
        name: "value",
        kind: Kind::Bits {
            width: 8,
            skip: 0,
            offset: 0,
        },
    }];

    fn decode<S: Source>(cursor: &mut BitCursor<S>) -> Result<Self, Error> {
        Frame::new(Self::NAME, cursor).read(cursor, &Self::LAYOUT[0])
    }
}

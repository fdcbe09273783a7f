//! Convenience interfaces decoding a whole message.

use alloc::vec::Vec;

use either::Either::{Left, Right};

use crate::{
    Error,
    bits::{BitCursor, Source},
    error::Mismatch,
    expand::{self, Subset, Tables},
    layout::Decode,
    section::{Section0, Section1, Section2, Section3, Section4, Section5},
    state::{Decoder, Options},
};

/// A decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub section0: Section0,
    pub section1: Section1,
    /// Present if flagged by [`Section1::optional_section_exists`].
    pub section2: Option<Section2>,
    pub section3: Section3,
    pub section4: Section4,
    pub section5: Section5,
}

impl Message {
    /// Decode a message from a slice with the default options.
    pub fn decode(r: &[u8]) -> Result<Self, Error> {
        decode_slice(r, Options::default())
    }

    /// Read the raw values of each subset, describing elements with a set of
    /// tables.
    ///
    /// An [`Error::Unimplemented`] here leaves the message itself valid.
    pub fn expand(&self, tables: &impl Tables) -> Result<Vec<Subset>, Error> {
        expand::expand(&self.section3, &self.section4, tables)
    }
}

/// Decode a message from a slice holding exactly one message.
///
/// Bytes following the end section are rejected; see [`crate::scan`] to
/// locate messages in a larger buffer, or [`decode_cursor`] to leave them
/// unread.
pub fn decode_slice(r: &[u8], options: Options) -> Result<Message, Error> {
    let mut cursor = BitCursor::new(r);
    let message = decode_cursor(&mut cursor, options)?;

    let position = cursor.position();
    let remaining = cursor.into_inner().len() as u64;

    if remaining != 0 {
        Err(Error::FormatMismatch {
            section: Section5::NAME,
            field: "end",
            position,
            mismatch: Mismatch::Trailing { remaining },
        })?;
    }

    Ok(message)
}

/// Decode a message from a reader.
///
/// _Requires Cargo feature `std`._
#[cfg(feature = "std")]
pub fn decode_reader(r: &mut impl std::io::Read, options: Options) -> Result<Message, Error> {
    decode_cursor(&mut BitCursor::new(crate::bits::ReadSource(r)), options)
}

/// Decode a message starting at the tip of a cursor.
///
/// On success, the cursor is left on the octet following the end section.
pub fn decode_cursor<S: Source>(
    cursor: &mut BitCursor<S>,
    options: Options,
) -> Result<Message, Error> {
    let start = cursor.consumed();

    let (section0, state) = Decoder::new(options).advance(cursor)?;
    let (section1, successor) = state.advance(cursor)?;

    let (section2, state) = match successor {
        Left(state) => {
            let (section, state) = state.advance(cursor)?;
            (Some(section), state)
        }
        Right(state) => (None, state),
    };

    let (section3, state) = state.advance(cursor)?;
    let (section4, state) = state.advance(cursor)?;
    let section5 = state.advance(cursor)?;

    let declared = section0.total_length as u64;
    let consumed = cursor.consumed() - start;

    if consumed != declared {
        Err(Error::FormatMismatch {
            section: Section0::NAME,
            field: "total_length",
            position: cursor.position(),
            mismatch: Mismatch::TotalLength { declared, consumed },
        })?;
    }

    Ok(Message {
        section0,
        section1,
        section2,
        section3,
        section4,
        section5,
    })
}

//! Finite-state machine decoding the sections of a message in order.
//!
//! All states are represented by a non-copy token. Calling a token's `advance`
//! method decodes one section from the tip of a cursor and returns the
//! section, along with a successor state token:
//!
//! ```text
//! Indicator -> Identification -> Optional? -> DataDescription -> Data -> End
//! ```
//!
//! Whether the optional section follows is decided by the identification
//! section, so [`Identification::advance`] returns either an [`Optional`] or a
//! [`DataDescription`] token. Only the initial state, re-exported for
//! convenience as [`Decoder`], can be constructed.
//!
//! After each length-prefixed section, the octets consumed are compared with
//! the declared length according to the [`Policy`] in effect. Checking the
//! total length of the message is left to the caller, who alone knows where
//! the message started; see [`crate::message::decode_cursor`].

use either::Either::{self, Left, Right};
use tracing::{debug, warn};

use crate::{
    Error,
    bits::{BitCursor, Source},
    error::Mismatch,
    layout::{Decode, read_error},
    section::{Section0, Section1, Section2, Section3, Section4, Section5},
};

/// Entrypoint to the finite-state machine.
pub type Decoder = Indicator;

/// How to treat a section whose declared length differs from its layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Policy {
    /// Reject the message.
    #[default]
    Strict,
    /// Skip octets declared beyond the layout, logging a warning. Sections
    /// declaring fewer octets than their layout are still rejected.
    Lenient,
}

/// Options applied throughout the decoding of a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub policy: Policy,
}

impl Options {
    /// Reconcile the octets consumed by a section with its declared length.
    fn settle<T: Decode, S: Source>(
        &self,
        cursor: &mut BitCursor<S>,
        start: u64,
        declared: u32,
    ) -> Result<(), Error> {
        let declared = declared as u64;
        let consumed = cursor.consumed() - start;

        debug!(section = T::NAME, declared, consumed, "decoded section");

        if consumed == declared {
            return Ok(());
        }

        if self.policy == Policy::Lenient && consumed < declared {
            warn!(
                section = T::NAME,
                declared, consumed, "skipping octets beyond the section layout"
            );

            let position = cursor.position();
            return cursor
                .skip_octets(declared - consumed)
                .map_err(|e| read_error(T::NAME, "length", position, e));
        }

        Err(Error::FormatMismatch {
            section: T::NAME,
            field: "length",
            position: cursor.position(),
            mismatch: Mismatch::Length { declared, consumed },
        })
    }
}

/// State token to decode the indicator section.
#[derive(Debug)]
pub struct Indicator {
    options: Options,
}

impl Indicator {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Transition to another state by decoding the indicator section.
    ///
    /// Returns the section, and a successor state token.
    pub fn advance<S: Source>(
        self,
        cursor: &mut BitCursor<S>,
    ) -> Result<(Section0, Identification), Error> {
        let section = Section0::decode(cursor)?;

        debug!(
            total_length = section.total_length,
            version = section.version,
            "decoded indicator section"
        );

        let successor = Identification {
            options: self.options,
        };

        Ok((section, successor))
    }
}

/// State token to decode the identification section.
#[derive(Debug)]
pub struct Identification {
    options: Options,
}

impl Identification {
    /// Transition to another state by decoding the identification section.
    ///
    /// Returns the section, and a successor state token: [`Optional`] if the
    /// section flags an optional section, otherwise [`DataDescription`].
    pub fn advance<S: Source>(
        self,
        cursor: &mut BitCursor<S>,
    ) -> Result<(Section1, Either<Optional, DataDescription>), Error> {
        let start = cursor.consumed();
        let section = Section1::decode(cursor)?;
        self.options
            .settle::<Section1, _>(cursor, start, section.length)?;

        let options = self.options;
        let successor = if section.optional_section_exists {
            Left(Optional { options })
        } else {
            Right(DataDescription { options })
        };

        Ok((section, successor))
    }
}

/// State token to decode the optional section.
#[derive(Debug)]
pub struct Optional {
    options: Options,
}

impl Optional {
    /// Transition to another state by decoding the optional section.
    ///
    /// The application data is kept as opaque bytes; see
    /// [`Section2::interpret`].
    ///
    /// Returns the section, and a successor state token.
    pub fn advance<S: Source>(
        self,
        cursor: &mut BitCursor<S>,
    ) -> Result<(Section2, DataDescription), Error> {
        let start = cursor.consumed();
        let section = Section2::decode(cursor)?;
        self.options
            .settle::<Section2, _>(cursor, start, section.length)?;

        let successor = DataDescription {
            options: self.options,
        };

        Ok((section, successor))
    }
}

/// State token to decode the data description section.
#[derive(Debug)]
pub struct DataDescription {
    options: Options,
}

impl DataDescription {
    /// Transition to another state by decoding the data description section.
    ///
    /// Returns the section, and a successor state token.
    pub fn advance<S: Source>(self, cursor: &mut BitCursor<S>) -> Result<(Section3, Data), Error> {
        let start = cursor.consumed();
        let section = Section3::decode(cursor)?;
        self.options
            .settle::<Section3, _>(cursor, start, section.length)?;

        let successor = Data {
            options: self.options,
        };

        Ok((section, successor))
    }
}

/// State token to decode the data section.
#[derive(Debug)]
pub struct Data {
    options: Options,
}

impl Data {
    /// Transition to another state by decoding the data section.
    ///
    /// Returns the section, and a successor state token.
    pub fn advance<S: Source>(self, cursor: &mut BitCursor<S>) -> Result<(Section4, End), Error> {
        let start = cursor.consumed();
        let section = Section4::decode(cursor)?;
        self.options
            .settle::<Section4, _>(cursor, start, section.length)?;

        Ok((section, End(())))
    }
}

/// State token to decode the end section.
#[derive(Debug)]
pub struct End(());

impl End {
    /// Finish by decoding the end section.
    pub fn advance<S: Source>(self, cursor: &mut BitCursor<S>) -> Result<Section5, Error> {
        Section5::decode(cursor)
    }
}

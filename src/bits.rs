//! Bit-level cursor over a byte source.
//!
//! BUFR fields are addressed in bits, not octets: flags occupy single bits
//! within an octet, descriptors split two octets into 2, 6 and 8 bits, and
//! data values in Section 4 have arbitrary widths. [`BitCursor`] reads these
//! most-significant-bit first from any [`Source`], tracking its position so
//! that section boundaries can be checked against declared lengths.

use thiserror::Error;

/// An error reading from a [`BitCursor`].
#[derive(Debug, Error)]
pub enum ReadError {
    /// The source ran out of bytes before the read completed.
    #[error("Source exhausted reading from bit {position}.")]
    Exhausted { position: u64 },
    /// A read was requested with a width outside `1..=64`.
    #[error("Cannot read {0} bits at once.")]
    Width(u32),
    /// An error from the supplied reader.
    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors from readers. Without the `std` feature, no reader can fail.
#[cfg(feature = "std")]
pub type IoError = std::io::Error;
#[cfg(not(feature = "std"))]
pub type IoError = core::convert::Infallible;

/// A byte-oriented input consumed by a [`BitCursor`].
pub trait Source {
    /// Take the next byte, or `None` once the source is exhausted.
    fn next_byte(&mut self) -> Result<Option<u8>, ReadError>;
}

impl Source for &[u8] {
    fn next_byte(&mut self) -> Result<Option<u8>, ReadError> {
        let r: &[u8] = self;
        Ok(r.split_first().map(|(b, rest)| {
            *self = rest;
            *b
        }))
    }
}

/// Adapter taking bytes from a [`std::io::Read`].
///
/// Bytes are requested one at a time, so wrap unbuffered readers (such as
/// files) in a [`std::io::BufReader`].
///
/// _Requires Cargo feature `std`._
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct ReadSource<R>(pub R);

#[cfg(feature = "std")]
impl<R: std::io::Read> Source for ReadSource<R> {
    fn next_byte(&mut self) -> Result<Option<u8>, ReadError> {
        let mut buf = [0];
        loop {
            match self.0.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Forward-only reader of bit fields.
#[derive(Debug)]
pub struct BitCursor<S> {
    source: S,
    current: u8,
    /// Bits of `current` already consumed, in `0..8`. Zero means the next
    /// read pulls a fresh byte.
    offset: u8,
    /// Bytes pulled from the source.
    pulled: u64,
}

impl<S: Source> BitCursor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: 0,
            offset: 0,
            pulled: 0,
        }
    }

    /// Number of bits consumed so far.
    pub fn position(&self) -> u64 {
        if self.offset == 0 {
            self.pulled * 8
        } else {
            (self.pulled - 1) * 8 + self.offset as u64
        }
    }

    /// Number of octets touched so far, counting a partially read octet.
    pub fn consumed(&self) -> u64 {
        self.pulled
    }

    /// Whether the cursor sits on an octet boundary.
    pub fn is_aligned(&self) -> bool {
        self.offset == 0
    }

    /// Read the next `n` bits as an unsigned integer, most significant first.
    pub fn read_bits(&mut self, n: u32) -> Result<u64, ReadError> {
        if !(1..=64).contains(&n) {
            return Err(ReadError::Width(n));
        }

        let start = self.position();
        let mut value = 0u64;
        let mut remaining = n;

        while remaining > 0 {
            if self.offset == 0 {
                self.current = self
                    .source
                    .next_byte()?
                    .ok_or(ReadError::Exhausted { position: start })?;
                self.pulled += 1;
            }

            let available = 8 - self.offset as u32;
            let take = remaining.min(available);
            let shift = available - take;
            let bits = (self.current >> shift) & (0xFF >> (8 - take));

            value = (value << take) | bits as u64;
            remaining -= take;
            self.offset = ((self.offset as u32 + take) % 8) as u8;
        }

        Ok(value)
    }

    /// Read the next bit; any set bit is `true`.
    pub fn read_bit(&mut self) -> Result<bool, ReadError> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Read the next eight bits as a byte.
    pub fn read_byte(&mut self) -> Result<u8, ReadError> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Discard `n` octets.
    pub fn skip_octets(&mut self, n: u64) -> Result<(), ReadError> {
        for _ in 0..n {
            self.read_byte()?;
        }
        Ok(())
    }

    /// Release the underlying source.
    pub fn into_inner(self) -> S {
        self.source
    }
}

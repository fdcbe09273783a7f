//! Locating messages in a larger buffer.
//!
//! Files and bulletins often hold several messages back to back, separated
//! by padding or preceded by an abbreviated heading (such as
//! `JUVE00 EGRR 161200`). The indicator section at the start of each message
//! gives its total length, which is enough to step from one to the next
//! without decoding it.

use zerocopy::FromBytes;

const MAGIC: &[u8; 4] = b"BUFR";

#[repr(C, packed)]
#[derive(FromBytes)]
struct Indicator {
    magic: [u8; 4],
    total_length: [u8; 3],
    version: u8,
}

/// Iterate over the byte ranges of the messages in a buffer.
///
/// A range runs from a `BUFR` marker for the total length its indicator
/// section declares, clamped to the end of the buffer so that decoding an
/// incomplete message reports truncation. Markers declaring fewer octets than
/// the indicator section itself are skipped.
pub fn messages(r: &[u8]) -> Messages<'_> {
    Messages { r, i: 0 }
}

/// Iterator returned by [`messages`].
#[derive(Debug, Clone)]
pub struct Messages<'a> {
    r: &'a [u8],
    i: usize,
}

impl<'a> Iterator for Messages<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let tail = self.r.get(self.i..)?;
            let found = tail.windows(MAGIC.len()).position(|w| w == MAGIC)?;
            let start = self.i + found;

            let Some(header) = self.r.get(start..start + size_of::<Indicator>()) else {
                // Too short to hold a length: hand over what remains.
                self.i = self.r.len();
                return Some(&self.r[start..]);
            };

            let header: [u8; 8] = header.try_into().ok()?;
            let Indicator {
                magic,
                total_length,
                ..
            } = zerocopy::transmute!(header);
            debug_assert_eq!(&magic, MAGIC);

            let [a, b, c] = total_length;
            let length = u32::from_be_bytes([0, a, b, c]) as usize;

            if length < size_of::<Indicator>() {
                self.i = start + 1;
                continue;
            }

            let end = (start + length).min(self.r.len());
            self.i = end;
            return Some(&self.r[start..end]);
        }
    }
}

//! Records for the six sections of a message.
//!
//! Each record is read field by field in octet order, consuming every
//! reserved bit, so that a successful decode leaves the cursor on the first
//! bit of the following section. Lengths declared by a section are checked
//! against the octets consumed by [`crate::state`], not here.

use alloc::vec::Vec;

use crate::{Error, descriptor::Descriptor, layout::Decode};

/// Indicator section.
#[derive(Debug, Clone, PartialEq, Eq, Decode)]
pub struct Section0 {
    /// Always `BUFR`.
    #[bufr(magic = b"BUFR")]
    pub magic_string: [u8; 4],
    /// Length of the whole message in octets.
    #[bufr(bits = 24)]
    pub total_length: u32,
    /// BUFR edition number.
    #[bufr(bits = 8)]
    pub version: u8,
}

/// Identification section.
///
/// The layout is that of editions 2 and 3.
#[derive(Debug, Clone, PartialEq, Eq, Decode)]
pub struct Section1 {
    #[bufr(length)]
    pub length: u32,
    #[bufr(bits = 8)]
    pub master_table: u8,
    #[bufr(bits = 8)]
    pub sub_centre: u8,
    /// Originating centre (code table 0 01 031).
    #[bufr(bits = 8)]
    pub centre: u8,
    #[bufr(bits = 8)]
    pub update_sequence_number: u8,
    /// Whether Section 2 is present. The remaining bits of the octet are
    /// reserved.
    #[bufr(bits = 1, skip = 7)]
    pub optional_section_exists: bool,
    #[bufr(bits = 8)]
    pub data_category: u8,
    #[bufr(bits = 8)]
    pub data_sub_category: u8,
    #[bufr(bits = 8)]
    pub master_table_version: u8,
    #[bufr(bits = 8)]
    pub local_table_version: u8,
    /// Year of the data. Only the year of the century is transmitted; it is
    /// always taken to fall in the 2000s.
    #[bufr(bits = 8, offset = 2000)]
    pub year: u16,
    #[bufr(bits = 8)]
    pub month: u8,
    #[bufr(bits = 8)]
    pub day: u8,
    #[bufr(bits = 8)]
    pub hours: u8,
    #[bufr(bits = 8)]
    pub minutes: u8,
    #[bufr(bits = 8)]
    pub reserved: u8,
}

/// Optional section, holding data defined by the originating centre.
#[derive(Debug, Clone, PartialEq, Eq, Decode)]
pub struct Section2 {
    #[bufr(length)]
    pub length: u32,
    #[bufr(bits = 8)]
    pub reserved: u8,
    #[bufr(remaining)]
    pub application_data: Vec<u8>,
}

/// Data description section.
#[derive(Debug, Clone, PartialEq, Eq, Decode)]
pub struct Section3 {
    #[bufr(length)]
    pub length: u32,
    #[bufr(bits = 8)]
    pub reserved: u8,
    #[bufr(bits = 16)]
    pub subset_count: u16,
    #[bufr(bits = 1)]
    pub observed_data: bool,
    #[bufr(bits = 1, skip = 6)]
    pub compressed_data: bool,
    #[bufr(remaining)]
    pub descriptors: Vec<Descriptor>,
}

/// Data section. The payload can only be interpreted against the
/// descriptors of Section 3; see [`crate::expand`].
#[derive(Debug, Clone, PartialEq, Eq, Decode)]
pub struct Section4 {
    #[bufr(length)]
    pub length: u32,
    #[bufr(bits = 8)]
    pub reserved: u8,
    #[bufr(remaining)]
    pub data: Vec<u8>,
}

/// End section.
#[derive(Debug, Clone, PartialEq, Eq, Decode)]
pub struct Section5 {
    /// Always `7777`.
    #[bufr(magic = b"7777")]
    pub end: [u8; 4],
}

/// Interpretation of centre-specific Section 2 content.
///
/// Fixed layouts are most easily read by deriving
/// [`Decode`](macro@crate::layout::Decode) and decoding from a
/// [`BitCursor`](crate::bits::BitCursor) over the data.
pub trait ApplicationData: Sized {
    /// Whether this interpreter understands data from a centre.
    fn supports(centre: u8, sub_centre: u8) -> bool;

    /// Interpret the application data.
    fn interpret(data: &[u8]) -> Result<Self, Error>;
}

impl Section2 {
    /// Interpret the application data for the centre identified in Section 1.
    ///
    /// Returns [`Error::Unimplemented`] if the interpreter does not support
    /// the centre. The message itself is unaffected.
    pub fn interpret<T: ApplicationData>(&self, identification: &Section1) -> Result<T, Error> {
        if !T::supports(identification.centre, identification.sub_centre) {
            Err(Error::Unimplemented {
                section: <Self as Decode>::NAME,
                what: "application data",
            })?;
        }

        T::interpret(&self.application_data)
    }
}

//! Reading raw values from the data section.
//!
//! The data section is a bit stream with no structure of its own: the
//! descriptors of Section 3 are expanded against external tables to learn the
//! width of each value. Values are returned as read, without applying scale or
//! reference values, and without unit conversion.
//!
//! Only uncompressed data is supported.

use alloc::{string::String, vec::Vec};

use crate::{
    Error,
    bits::{BitCursor, Source},
    descriptor::{Descriptor, Kind},
    error::Mismatch,
    layout::{Decode, read_error},
    section::{Section3, Section4},
};

/// Nesting of sequences and replications beyond which the tables are assumed
/// to be cyclic.
const MAX_DEPTH: usize = 32;

/// A Table B entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub unit: String,
    pub scale: i32,
    pub reference: i64,
    /// Width of the value in bits.
    pub width: u32,
}

impl Element {
    /// Whether the element holds text rather than a number.
    pub fn is_character(&self) -> bool {
        self.unit.eq_ignore_ascii_case("CCITT IA5")
    }

    /// Whether the element holds a number subject to width changes: not text,
    /// nor an entry in a code or flag table.
    fn is_quantity(&self) -> bool {
        !self.is_character()
            && !self.unit.eq_ignore_ascii_case("Code table")
            && !self.unit.eq_ignore_ascii_case("Flag table")
    }
}

/// Lookup tables describing elements (Table B) and sequences (Table D).
pub trait Tables {
    fn element(&self, descriptor: Descriptor) -> Option<&Element>;
    fn sequence(&self, descriptor: Descriptor) -> Option<&[Descriptor]>;
}

/// A value as stored in the data section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Raw {
    Integer(u64),
    /// Character data, or values wider than 64 bits.
    Octets(Vec<u8>),
    /// All bits set, marking a missing value.
    Missing,
}

/// A value read for a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub descriptor: Descriptor,
    pub raw: Raw,
}

/// The values of one subset, in descriptor order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subset {
    pub values: Vec<Value>,
}

/// Read the raw values of each subset of a data section.
///
/// Returns [`Error::Unimplemented`] for compressed data, for operators other
/// than data width, scale, character, local width and increased
/// scale/reference/width changes, and for descriptors missing from the
/// tables.
pub fn expand(
    section3: &Section3,
    section4: &Section4,
    tables: &impl Tables,
) -> Result<Vec<Subset>, Error> {
    if section3.compressed_data {
        Err(unimplemented("compressed data"))?;
    }

    let mut expander = Expander {
        tables,
        cursor: BitCursor::new(section4.data.as_slice()),
        state: State::default(),
        values: Vec::new(),
    };

    let mut subsets = Vec::with_capacity(section3.subset_count as usize);
    for _ in 0..section3.subset_count {
        expander.state = State::default();
        expander.run(&section3.descriptors, 0)?;
        subsets.push(Subset {
            values: core::mem::take(&mut expander.values),
        });
    }

    Ok(subsets)
}

/// Changes applied by operators to subsequent elements.
#[derive(Debug, Default)]
struct State {
    /// Bits added to numeric widths (operator 201).
    width_change: i64,
    /// Bits added to numeric widths (operator 207).
    increased_width: i64,
    /// Width of character elements (operator 208).
    character_width: Option<u32>,
    /// Width of the next element, which is a local descriptor (operator 206).
    local_width: Option<u32>,
}

struct Expander<'a, T, S> {
    tables: &'a T,
    cursor: BitCursor<S>,
    state: State,
    values: Vec<Value>,
}

impl<T: Tables, S: Source> Expander<'_, T, S> {
    fn run(&mut self, descriptors: &[Descriptor], depth: usize) -> Result<(), Error> {
        if depth > MAX_DEPTH {
            Err(self.mismatch(Mismatch::Nesting(MAX_DEPTH)))?;
        }

        let mut i = 0;
        while let Some(&descriptor) = descriptors.get(i) {
            i += 1;

            match descriptor.kind() {
                Kind::Element => {
                    self.element(descriptor)?;
                }
                Kind::Replication {
                    descriptors: n,
                    count,
                } => {
                    let count = if count == 0 {
                        let factor = descriptors
                            .get(i)
                            .copied()
                            .filter(|d| d.f == 0 && d.x == 31)
                            .ok_or_else(|| self.mismatch(Mismatch::MissingFactor))?;
                        i += 1;

                        match self.element(factor)? {
                            Raw::Integer(count) => count,
                            _ => Err(self.mismatch(Mismatch::MissingFactor))?,
                        }
                    } else {
                        count as u64
                    };

                    let n = n as usize;
                    let body = descriptors.get(i..i + n).ok_or_else(|| {
                        self.mismatch(Mismatch::Replication {
                            wanted: n,
                            available: descriptors.len() - i,
                        })
                    })?;
                    i += n;

                    for _ in 0..count {
                        self.run(body, depth + 1)?;
                    }
                }
                Kind::Operator { operator, operand } => {
                    self.operator(descriptor, operator, operand)?;
                }
                Kind::Sequence => {
                    let tables = self.tables;
                    let sequence = tables
                        .sequence(descriptor)
                        .ok_or_else(|| unimplemented("sequence descriptor"))?;
                    self.run(sequence, depth + 1)?;
                }
            }
        }

        Ok(())
    }

    /// Read the value of an element descriptor, recording it.
    fn element(&mut self, descriptor: Descriptor) -> Result<Raw, Error> {
        let (width, character) = match self.state.local_width.take() {
            Some(width) => (width, false),
            None => {
                let element = self
                    .tables
                    .element(descriptor)
                    .ok_or_else(|| unimplemented("element descriptor"))?;

                if element.is_character() {
                    (self.state.character_width.unwrap_or(element.width), true)
                } else if element.is_quantity() {
                    let width = element.width as i64
                        + self.state.width_change
                        + self.state.increased_width;
                    let width = u32::try_from(width)
                        .map_err(|_| self.mismatch(Mismatch::Overflow(element.width as u64)))?;
                    (width, false)
                } else {
                    (element.width, false)
                }
            }
        };

        let raw = self.read(width, character)?;
        self.values.push(Value {
            descriptor,
            raw: raw.clone(),
        });

        Ok(raw)
    }

    fn operator(&mut self, descriptor: Descriptor, operator: u8, operand: u8) -> Result<(), Error> {
        let operand = operand as i64;

        match operator {
            1 => self.state.width_change = if operand == 0 { 0 } else { operand - 128 },
            // Scale affects interpretation only, not the bits read.
            2 => {}
            5 => {
                let raw = self.read(operand as u32 * 8, true)?;
                self.values.push(Value { descriptor, raw });
            }
            6 => self.state.local_width = Some(operand as u32),
            7 => {
                self.state.increased_width = if operand == 0 {
                    0
                } else {
                    (10 * operand + 2) / 3
                }
            }
            8 => {
                self.state.character_width = (operand != 0).then_some(operand as u32 * 8);
            }
            _ => Err(unimplemented("operator"))?,
        }

        Ok(())
    }

    fn read(&mut self, width: u32, character: bool) -> Result<Raw, Error> {
        let position = self.cursor.position();

        if width == 0 {
            Err(self.mismatch(Mismatch::Overflow(0)))?;
        }

        if character || width > 64 {
            if width % 8 != 0 {
                Err(self.mismatch(Mismatch::Remainder {
                    remaining: width as u64,
                    unit: 8,
                }))?;
            }

            let mut octets = Vec::with_capacity((width / 8).min(4096) as usize);
            for _ in 0..width / 8 {
                let b = self
                    .cursor
                    .read_byte()
                    .map_err(|e| read_error(Section4::NAME, "data", position, e))?;
                octets.push(b);
            }

            return Ok(Raw::Octets(octets));
        }

        let value = self
            .cursor
            .read_bits(width)
            .map_err(|e| read_error(Section4::NAME, "data", position, e))?;

        let all_ones = u64::MAX >> (64 - width);
        if width > 1 && value == all_ones {
            Ok(Raw::Missing)
        } else {
            Ok(Raw::Integer(value))
        }
    }

    fn mismatch(&self, mismatch: Mismatch) -> Error {
        Error::FormatMismatch {
            section: Section4::NAME,
            field: "data",
            position: self.cursor.position(),
            mismatch,
        }
    }
}

fn unimplemented(what: &'static str) -> Error {
    Error::Unimplemented {
        section: Section4::NAME,
        what,
    }
}

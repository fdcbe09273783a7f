#![no_std]

//! A bit-exact decoder for WMO Binary Universal Form for the Representation of
//! meteorological data (BUFR).
//!
//! A message is a sequence of six length-prefixed sections. Fields within
//! them are addressed in bits, so every field must be consumed exactly for
//! the next one to be found. This crate decodes each section into a plain
//! record and checks the lengths the message declares against the octets
//! actually consumed.
//!
//! Most users should begin with [`Message::decode`], or the functions in the
//! [`message`] module. To decode sections one at a time, drive the
//! finite-state machine in the [`state`] module. Multiple messages in a single
//! buffer can be located with [`scan::messages`].
//!
//! Decoding stops at raw values: [`Message::expand`] reads the data section
//! against caller-supplied tables, but applies no scale, reference value or
//! unit.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `std`: enable reader-based decoding (default).

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// Lets `Decode` derives within this crate name it by its public path.
extern crate self as bufr;

pub mod bits;
pub mod descriptor;
pub mod error;
pub mod expand;
pub mod layout;
pub mod message;
pub mod scan;
pub mod section;
pub mod state;

pub use error::Error;
pub use message::Message;

//! # SpaceWire RMAP packet codec
//!
//! This crate contains a wire format implementation of the SpaceWire Remote Memory Access
//! Protocol (RMAP) according to
//! [ECSS-E-ST-50-52C](https://ecss.nl/standard/ecss-e-st-50-52c-spacewire-remote-memory-access-protocol-5-february-2010/).
//! Currently, this includes the following components:
//!
//!  - Typed big-endian field views on raw packet buffers, including the 24-bit data length field.
//!    See the [field] module.
//!  - The RMAP CRC-8 used for the header and data checksums. See the [crc] module.
//!  - Field layout, construction and validation of RMAP read and write commands and their
//!    replies. See the [rmap] module.
//!
//! The crate is a pure codec. Sending packets over a SpaceWire link and tracking transactions is
//! left to the user.
//!
//! ## Features
//!
//! `spacewire-rmap` supports various runtime environments and is also suitable for `no_std`
//! environments.
//!
//! It also offers optional support for [`serde`](https://serde.rs/). This allows serializing and
//! deserializing the data types with an appropriate `serde` provider like
//! [`postcard`](https://github.com/jamesmunns/postcard).
//!
//! Default features:
//!
//!  - [`std`](https://doc.rust-lang.org/std/): Enables functionality relying on the standard library.
//!  - [`alloc`](https://doc.rust-lang.org/alloc/): Enables the builders which return an owned
//!    [`alloc::vec::Vec`](https://doc.rust-lang.org/beta/alloc/vec/struct.Vec.html).
//!    Enabled by the `std` feature.
//!
//! Optional features:
//!
//!  - [`serde`](https://serde.rs/): Adds `serde` support for most types by adding `Serialize` and
//!    `Deserialize` `derive`s
//!  - [`defmt`](https://defmt.ferrous-systems.com/): Adds `defmt` support by adding `defmt::Format`
//!    `derive`s
//!
//! ## Example
//!
//! ```rust
//! use spacewire_rmap::field::U24;
//! use spacewire_rmap::rmap::{self, PacketVariant};
//!
//! let mut request = [0; rmap::REQUEST_HEADER_LEN];
//! let len = rmap::request::build_read_request_into(
//!     &mut request,
//!     0xfe,
//!     0x02,
//!     0x20,
//!     0x8000_0000,
//!     0x1234,
//!     U24::new(32).unwrap(),
//! )
//! .unwrap();
//! assert_eq!(len, rmap::read_request_buffer_size());
//! assert!(rmap::header_crc_valid(&request, PacketVariant::ReadCommand));
//! ```
#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]
#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(any(feature = "std", test))]
extern crate std;

use num_enum::{IntoPrimitive, TryFromPrimitive};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod crc;
pub mod field;
pub mod rmap;

use field::{FieldView, FieldViewMut};

/// Length of the header fields common to all SpaceWire packets carrying a protocol identifier.
pub const SPW_HEADER_LEN: usize = 2;

pub const DESTINATION_LOGICAL_ADDRESS_OFFSET: usize = 0;
pub const PROTOCOL_IDENTIFIER_OFFSET: usize = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ByteConversionError {
    /// The passed slice is too small. Returns the passed slice length and expected minimum size
    #[error("target slice with size {found} is too small, expected size of at least {expected}")]
    ToSliceTooSmall { found: usize, expected: usize },
    /// The provider buffer is too small. Returns the passed slice length and expected minimum size
    #[error("source slice with size {found} too small, expected at least {expected} bytes")]
    FromSliceTooSmall { found: usize, expected: usize },
}

/// SpaceWire protocol identifiers as assigned by ECSS-E-ST-50-51C.
#[derive(Debug, Copy, Clone, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ProtocolId {
    /// Extended protocol identifier, the real identifier follows in the next two bytes.
    Extended = 0,
    Rmap = 1,
    Ccsds = 2,
    GoesR = 238,
    SerialTransferUniversal = 239,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("invalid SpaceWire protocol identifier {0}")]
pub struct InvalidProtocolIdError(pub u8);

/// Destination logical address, the first byte of every SpaceWire packet.
#[inline]
pub fn destination_logical_address(buf: &[u8]) -> u8 {
    FieldView::<u8>::new(buf, DESTINATION_LOGICAL_ADDRESS_OFFSET).get()
}

#[inline]
pub fn set_destination_logical_address(buf: &mut [u8], address: u8) {
    FieldViewMut::<u8>::new(buf, DESTINATION_LOGICAL_ADDRESS_OFFSET).set(address)
}

/// Raw protocol identifier, which might not be a value known to [ProtocolId].
#[inline]
pub fn raw_protocol_identifier(buf: &[u8]) -> u8 {
    FieldView::<u8>::new(buf, PROTOCOL_IDENTIFIER_OFFSET).get()
}

pub fn protocol_identifier(buf: &[u8]) -> Result<ProtocolId, InvalidProtocolIdError> {
    let raw = raw_protocol_identifier(buf);
    ProtocolId::try_from(raw).map_err(|e| InvalidProtocolIdError(e.number))
}

#[inline]
pub fn set_protocol_identifier(buf: &mut [u8], protocol_id: ProtocolId) {
    FieldViewMut::<u8>::new(buf, PROTOCOL_IDENTIFIER_OFFSET).set(protocol_id.into())
}

/// Check whether the packet carries the RMAP protocol identifier.
#[inline]
pub fn is_rmap(buf: &[u8]) -> bool {
    raw_protocol_identifier(buf) == ProtocolId::Rmap as u8
}

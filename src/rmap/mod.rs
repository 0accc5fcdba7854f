//! RMAP packet layout, validation and classification according to ECSS-E-ST-50-52C.
//!
//! The RMAP field layout depends on the [PacketVariant]: read and write commands share a 16-byte
//! header, while read and write replies use a shorter header and place the header CRC at a
//! different offset. All accessors in this module operate on raw byte buffers and resolve the
//! field offsets with [PacketVariant::offset].
//!
//! The accessors do not perform bounds checks on their own. Buffers should be sized with
//! [read_request_buffer_size], [write_request_buffer_size] or [read_reply_buffer_size] first.
//! The [reply::ReplyReader] and [request::CommandHeader::from_bytes] APIs can be used to parse
//! untrusted input with full length and checksum checks.
//!
//! ## Example
//!
//! ```rust
//! use spacewire_rmap::rmap::{self, PacketVariant};
//!
//! let data = [1, 2, 3, 4];
//! let mut request = [0; 21];
//! let len = rmap::request::build_write_request_into(
//!     &mut request,
//!     0xfe,
//!     0x02,
//!     0x20,
//!     0x4000_0000,
//!     1,
//!     &data,
//! )
//! .unwrap();
//! assert_eq!(len, rmap::write_request_buffer_size(data.len()));
//! assert!(rmap::header_crc_valid(&request, PacketVariant::WriteCommand));
//! assert!(rmap::data_crc_valid(&request, PacketVariant::WriteCommand));
//! assert_eq!(rmap::data(&request, PacketVariant::WriteCommand), &data);
//!
//! request[17] ^= 0xff;
//! assert!(!rmap::data_crc_valid(&request, PacketVariant::WriteCommand));
//! ```
use crate::crc::crc8;
use crate::field::{FieldView, FieldViewMut, U24};
use crate::ByteConversionError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod reply;
pub mod request;

/// Length of the read and write command headers including the header CRC.
pub const REQUEST_HEADER_LEN: usize = 16;
/// Length of the read reply header including the header CRC.
pub const READ_REPLY_HEADER_LEN: usize = 12;
/// Length of a complete write reply, which only consists of the header.
pub const WRITE_REPLY_LEN: usize = 8;

pub const PACKET_TYPE_OFFSET: usize = 2;
pub const DESTINATION_KEY_OFFSET: usize = 3;
pub const STATUS_OFFSET: usize = 3;
pub const SOURCE_LOGICAL_ADDRESS_OFFSET: usize = 4;
pub const TARGET_LOGICAL_ADDRESS_OFFSET: usize = 4;
pub const TRANSACTION_IDENTIFIER_OFFSET: usize = 5;
pub const EXTENDED_ADDRESS_OFFSET: usize = 7;
pub const ADDRESS_OFFSET: usize = 8;
pub const REQUEST_DATA_LENGTH_OFFSET: usize = 12;
pub const REQUEST_HEADER_CRC_OFFSET: usize = 15;
pub const READ_REPLY_DATA_LENGTH_OFFSET: usize = 8;
pub const READ_REPLY_HEADER_CRC_OFFSET: usize = 11;
pub const WRITE_REPLY_HEADER_CRC_OFFSET: usize = 7;

pub const WRITE_REPLY_MASK: u8 = 0b1110_0000;
pub const WRITE_REPLY_PATTERN: u8 = 0b0010_0000;
pub const READ_REPLY_MASK: u8 = 0b1111_1000;
pub const READ_REPLY_PATTERN: u8 = 0b0000_1000;

const RESERVED_BIT: u8 = 0b1000_0000;
const COMMAND_BIT: u8 = 0b0100_0000;
const WRITE_BIT: u8 = 0b0010_0000;
const VERIFY_DATA_BIT: u8 = 0b0001_0000;
const ACKNOWLEDGE_BIT: u8 = 0b0000_1000;
const INCREMENT_ADDRESS_BIT: u8 = 0b0000_0100;
const REPLY_ADDRESS_LEN_MASK: u8 = 0b0000_0011;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RmapError {
    #[error("byte conversion error: {0}")]
    ByteConversion(#[from] ByteConversionError),
    /// The protocol identifier is not the RMAP identifier. Contains the raw identifier.
    #[error("not an RMAP packet, protocol identifier {0}")]
    NotRmap(u8),
    /// The packet type byte matches none of the supported packet variants.
    #[error("unrecognized RMAP packet type {0:#010b}")]
    UnrecognizedPacketType(u8),
    /// The packet is a valid RMAP packet, but of a different variant than expected.
    #[error("unexpected RMAP packet variant {found:?}")]
    UnexpectedVariant { found: PacketVariant },
    #[error("header CRC mismatch, found {found:#04x}, expected {expected:#04x}")]
    HeaderCrcMismatch { found: u8, expected: u8 },
    #[error("data CRC mismatch, found {found:#04x}, expected {expected:#04x}")]
    DataCrcMismatch { found: u8, expected: u8 },
}

/// Named fields of the RMAP packet header and trailer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RmapField {
    PacketType,
    DestinationKey,
    Status,
    SourceLogicalAddress,
    TargetLogicalAddress,
    TransactionIdentifier,
    ExtendedAddress,
    Address,
    DataLength,
    HeaderCrc,
    Data,
}

/// The four RMAP packet shapes. The variant is never transmitted explicitly, it is either known
/// from the context or derived from the packet type byte with [PacketVariant::from_packet_type].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketVariant {
    ReadCommand,
    WriteCommand,
    ReadResponse,
    WriteResponse,
}

impl PacketVariant {
    /// Byte offset of the given field, or [None] if the variant does not carry the field.
    pub const fn offset(&self, field: RmapField) -> Option<usize> {
        use PacketVariant::*;
        use RmapField::*;
        match (self, field) {
            (_, PacketType) => Some(PACKET_TYPE_OFFSET),
            (_, TransactionIdentifier) => Some(TRANSACTION_IDENTIFIER_OFFSET),
            (ReadCommand | WriteCommand, DestinationKey) => Some(DESTINATION_KEY_OFFSET),
            (ReadCommand | WriteCommand, SourceLogicalAddress) => {
                Some(SOURCE_LOGICAL_ADDRESS_OFFSET)
            }
            (ReadCommand | WriteCommand, ExtendedAddress) => Some(EXTENDED_ADDRESS_OFFSET),
            (ReadCommand | WriteCommand, Address) => Some(ADDRESS_OFFSET),
            (ReadCommand | WriteCommand, DataLength) => Some(REQUEST_DATA_LENGTH_OFFSET),
            (ReadCommand | WriteCommand, HeaderCrc) => Some(REQUEST_HEADER_CRC_OFFSET),
            (WriteCommand, Data) => Some(REQUEST_HEADER_LEN),
            (ReadResponse | WriteResponse, Status) => Some(STATUS_OFFSET),
            (ReadResponse | WriteResponse, TargetLogicalAddress) => {
                Some(TARGET_LOGICAL_ADDRESS_OFFSET)
            }
            (ReadResponse, DataLength) => Some(READ_REPLY_DATA_LENGTH_OFFSET),
            (ReadResponse, HeaderCrc) => Some(READ_REPLY_HEADER_CRC_OFFSET),
            (ReadResponse, Data) => Some(READ_REPLY_HEADER_LEN),
            (WriteResponse, HeaderCrc) => Some(WRITE_REPLY_HEADER_CRC_OFFSET),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_command(&self) -> bool {
        matches!(self, PacketVariant::ReadCommand | PacketVariant::WriteCommand)
    }

    /// Every variant carries a header CRC, so this never fails.
    #[inline]
    pub const fn header_crc_offset(&self) -> usize {
        match self.offset(RmapField::HeaderCrc) {
            Some(offset) => offset,
            None => unreachable!(),
        }
    }

    /// Header length including the header CRC.
    #[inline]
    pub const fn header_len(&self) -> usize {
        self.header_crc_offset() + 1
    }

    #[inline]
    pub const fn data_length_offset(&self) -> Option<usize> {
        self.offset(RmapField::DataLength)
    }

    #[inline]
    pub const fn data_offset(&self) -> Option<usize> {
        self.offset(RmapField::Data)
    }

    /// Whether a data field and a trailing data CRC follow the header.
    #[inline]
    pub const fn has_data(&self) -> bool {
        self.data_offset().is_some()
    }

    /// Derive the packet variant from the raw packet type byte.
    ///
    /// Replies are recognized with the [WRITE_REPLY_MASK] and [READ_REPLY_MASK] patterns.
    /// Commands require the command bit and a cleared reserved bit. Read-modify-write commands
    /// are not supported and yield [None].
    pub const fn from_packet_type(raw: u8) -> Option<Self> {
        if raw & WRITE_REPLY_MASK == WRITE_REPLY_PATTERN {
            return Some(PacketVariant::WriteResponse);
        }
        if raw & READ_REPLY_MASK == READ_REPLY_PATTERN {
            return Some(PacketVariant::ReadResponse);
        }
        if raw & (RESERVED_BIT | COMMAND_BIT) != COMMAND_BIT {
            return None;
        }
        if raw & WRITE_BIT != 0 {
            return Some(PacketVariant::WriteCommand);
        }
        if raw & VERIFY_DATA_BIT != 0 {
            return None;
        }
        Some(PacketVariant::ReadCommand)
    }
}

/// Typed representation of the RMAP packet type (instruction) byte.
///
/// Bit layout, MSB first: reserved (always 0), command, write, verify data, acknowledge,
/// increment address and the two bit reply address length.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketTypeField {
    command: bool,
    write: bool,
    verify_data: bool,
    acknowledge: bool,
    increment_address: bool,
    reply_address_len: u8,
}

impl PacketTypeField {
    /// Packet type used by [request::build_read_request]: acknowledged read with address
    /// increment, raw value `0b0100_1100`.
    pub const READ_COMMAND: Self = Self::new(true, false, false, true, true);
    /// Packet type used by [request::build_write_request]: acknowledged, non-verified write with
    /// address increment, raw value `0b0110_1100`.
    pub const WRITE_COMMAND: Self = Self::new(true, true, false, true, true);

    pub const fn new(
        command: bool,
        write: bool,
        verify_data: bool,
        acknowledge: bool,
        increment_address: bool,
    ) -> Self {
        Self {
            command,
            write,
            verify_data,
            acknowledge,
            increment_address,
            reply_address_len: 0,
        }
    }

    /// Set a new reply address length. If the passed number is invalid, the length will not be
    /// set and false will be returned. The maximum allowed value for the 2-bit field is 3.
    pub fn set_reply_address_len(&mut self, len: u8) -> bool {
        if len > REPLY_ADDRESS_LEN_MASK {
            return false;
        }
        self.reply_address_len = len;
        true
    }

    #[inline]
    pub const fn is_command(&self) -> bool {
        self.command
    }

    #[inline]
    pub const fn is_write(&self) -> bool {
        self.write
    }

    #[inline]
    pub const fn is_verify_data(&self) -> bool {
        self.verify_data
    }

    #[inline]
    pub const fn is_acknowledge(&self) -> bool {
        self.acknowledge
    }

    #[inline]
    pub const fn is_increment_address(&self) -> bool {
        self.increment_address
    }

    /// Reply address length in units of 4 bytes.
    #[inline]
    pub const fn reply_address_len(&self) -> u8 {
        self.reply_address_len
    }

    pub const fn raw(&self) -> u8 {
        let mut raw = self.reply_address_len;
        if self.command {
            raw |= COMMAND_BIT;
        }
        if self.write {
            raw |= WRITE_BIT;
        }
        if self.verify_data {
            raw |= VERIFY_DATA_BIT;
        }
        if self.acknowledge {
            raw |= ACKNOWLEDGE_BIT;
        }
        if self.increment_address {
            raw |= INCREMENT_ADDRESS_BIT;
        }
        raw
    }

    #[inline]
    pub const fn variant(&self) -> Option<PacketVariant> {
        PacketVariant::from_packet_type(self.raw())
    }
}

/// The reserved bit is dropped.
impl From<u8> for PacketTypeField {
    fn from(raw: u8) -> Self {
        Self {
            command: raw & COMMAND_BIT != 0,
            write: raw & WRITE_BIT != 0,
            verify_data: raw & VERIFY_DATA_BIT != 0,
            acknowledge: raw & ACKNOWLEDGE_BIT != 0,
            increment_address: raw & INCREMENT_ADDRESS_BIT != 0,
            reply_address_len: raw & REPLY_ADDRESS_LEN_MASK,
        }
    }
}

impl From<PacketTypeField> for u8 {
    fn from(value: PacketTypeField) -> Self {
        value.raw()
    }
}

/// Total size of a read command.
#[inline]
pub const fn read_request_buffer_size() -> usize {
    REQUEST_HEADER_LEN
}

/// Total size of a write command with `data_len` bytes of payload and the data CRC.
#[inline]
pub const fn write_request_buffer_size(data_len: usize) -> usize {
    REQUEST_HEADER_LEN + data_len + 1
}

/// Total size of a read reply with `data_len` bytes of payload and the data CRC.
#[inline]
pub const fn read_reply_buffer_size(data_len: usize) -> usize {
    READ_REPLY_HEADER_LEN + data_len + 1
}

macro_rules! fixed_field {
    ($(#[$meta: meta])* $name: ident: $ty: ty = $offset: expr) => {
        paste::paste! {
            $(#[$meta])*
            #[inline]
            pub fn $name(buf: &[u8]) -> $ty {
                FieldView::<$ty>::new(buf, $offset).get()
            }

            #[doc = concat!("Set the field returned by [", stringify!($name), "].")]
            #[inline]
            pub fn [<set_ $name>](buf: &mut [u8], value: $ty) {
                FieldViewMut::<$ty>::new(buf, $offset).set(value)
            }
        }
    };
}

fixed_field!(
    /// Raw packet type byte, which is located at the same offset for all variants.
    packet_type: u8 = PACKET_TYPE_OFFSET
);
fixed_field!(
    /// Destination key of a command.
    destination_key: u8 = DESTINATION_KEY_OFFSET
);
fixed_field!(
    /// Source logical address of a command, which is the address replies are sent to.
    source_logical_address: u8 = SOURCE_LOGICAL_ADDRESS_OFFSET
);
fixed_field!(
    /// Transaction identifier, present in commands and replies.
    transaction_identifier: u16 = TRANSACTION_IDENTIFIER_OFFSET
);
fixed_field!(
    /// Extended address of a command. Zero for 32-bit addressing.
    extended_address: u8 = EXTENDED_ADDRESS_OFFSET
);
fixed_field!(
    /// Memory address of a command.
    address: u32 = ADDRESS_OFFSET
);
fixed_field!(
    /// Status of a reply.
    status: u8 = STATUS_OFFSET
);
fixed_field!(
    /// Target logical address of a reply, which is the address of the node executing the command.
    target_logical_address: u8 = TARGET_LOGICAL_ADDRESS_OFFSET
);

fn required_offset(variant: PacketVariant, field: RmapField) -> usize {
    match variant.offset(field) {
        Some(offset) => offset,
        None => panic!("{variant:?} packets do not have a {field:?} field"),
    }
}

/// # Panics
///
/// If the variant does not carry a data length field, which is the case for write replies.
#[inline]
pub fn data_length(buf: &[u8], variant: PacketVariant) -> U24 {
    FieldView::<U24>::new(buf, required_offset(variant, RmapField::DataLength)).get()
}

/// # Panics
///
/// If the variant does not carry a data length field, which is the case for write replies.
#[inline]
pub fn set_data_length(buf: &mut [u8], variant: PacketVariant, data_length: U24) {
    FieldViewMut::<U24>::new(buf, required_offset(variant, RmapField::DataLength)).set(data_length)
}

#[inline]
pub fn header_crc(buf: &[u8], variant: PacketVariant) -> u8 {
    FieldView::<u8>::new(buf, variant.header_crc_offset()).get()
}

#[inline]
pub fn set_header_crc(buf: &mut [u8], variant: PacketVariant, crc: u8) {
    FieldViewMut::<u8>::new(buf, variant.header_crc_offset()).set(crc)
}

/// Payload of a write command or read reply. The payload length is taken from the data length
/// field.
///
/// # Panics
///
/// If the variant does not carry data or the buffer is shorter than the data length field
/// implies.
pub fn data(buf: &[u8], variant: PacketVariant) -> &[u8] {
    let start = required_offset(variant, RmapField::Data);
    &buf[start..start + data_length(buf, variant).as_usize()]
}

/// Mutable version of [data].
pub fn data_mut(buf: &mut [u8], variant: PacketVariant) -> &mut [u8] {
    let start = required_offset(variant, RmapField::Data);
    let len = data_length(buf, variant).as_usize();
    &mut buf[start..start + len]
}

/// Offset of the data CRC, which directly follows the payload.
#[inline]
pub fn data_crc_offset(buf: &[u8], variant: PacketVariant) -> usize {
    required_offset(variant, RmapField::Data) + data_length(buf, variant).as_usize()
}

#[inline]
pub fn data_crc(buf: &[u8], variant: PacketVariant) -> u8 {
    FieldView::<u8>::new(buf, data_crc_offset(buf, variant)).get()
}

#[inline]
pub fn set_data_crc(buf: &mut [u8], variant: PacketVariant, crc: u8) {
    let offset = data_crc_offset(buf, variant);
    FieldViewMut::<u8>::new(buf, offset).set(crc)
}

#[inline]
pub fn is_rmap_write_response(buf: &[u8]) -> bool {
    packet_type(buf) & WRITE_REPLY_MASK == WRITE_REPLY_PATTERN
}

#[inline]
pub fn is_rmap_read_response(buf: &[u8]) -> bool {
    packet_type(buf) & READ_REPLY_MASK == READ_REPLY_PATTERN
}

/// Classify a received reply. Returns [None] if the packet type matches neither the read nor
/// the write reply pattern.
pub fn classify_response(buf: &[u8]) -> Option<PacketVariant> {
    if is_rmap_write_response(buf) {
        return Some(PacketVariant::WriteResponse);
    }
    if is_rmap_read_response(buf) {
        return Some(PacketVariant::ReadResponse);
    }
    None
}

/// Recalculate the CRC over the header bytes preceding the header CRC and compare it with the
/// stored header CRC.
pub fn header_crc_valid(buf: &[u8], variant: PacketVariant) -> bool {
    let crc_offset = variant.header_crc_offset();
    header_crc(buf, variant) == crc8(&buf[..crc_offset])
}

/// Recalculate the CRC over the payload and compare it with the data CRC following the payload.
pub fn data_crc_valid(buf: &[u8], variant: PacketVariant) -> bool {
    data_crc(buf, variant) == crc8(data(buf, variant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{destination_logical_address, protocol_identifier, ProtocolId};
    use std::string::ToString;

    const TEST_PACKET: [u8; 16] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];

    #[test]
    fn test_field_extraction() {
        let packet = TEST_PACKET;
        assert_eq!(destination_logical_address(&packet), 1);
        assert_eq!(protocol_identifier(&packet).unwrap(), ProtocolId::Ccsds);
        assert_eq!(packet_type(&packet), 3);
        assert_eq!(destination_key(&packet), 4);
        assert_eq!(source_logical_address(&packet), 5);
        assert_eq!(transaction_identifier(&packet), 0x0607);
        assert_eq!(extended_address(&packet), 8);
        assert_eq!(address(&packet), 0x090A0B0C);
        assert_eq!(
            data_length(&packet, PacketVariant::WriteCommand).value(),
            0x0D0E0F
        );
        assert_eq!(header_crc(&packet, PacketVariant::WriteCommand), 16);
    }

    #[test]
    fn test_field_setters() {
        let mut packet = TEST_PACKET;
        set_address(&mut packet, 0x11223344);
        assert_eq!(address(&packet), 0x11223344);
        set_data_length(&mut packet, PacketVariant::ReadCommand, U24::new(0x112233).unwrap());
        assert_eq!(data_length(&packet, PacketVariant::ReadCommand).value(), 0x112233);
        set_transaction_identifier(&mut packet, 0xbeef);
        set_destination_key(&mut packet, 0x20);
        set_source_logical_address(&mut packet, 0x21);
        set_extended_address(&mut packet, 0);
        set_packet_type(&mut packet, 0x4c);
        assert_eq!(
            packet,
            [1, 2, 0x4c, 0x20, 0x21, 0xbe, 0xef, 0, 0x11, 0x22, 0x33, 0x44, 0x11, 0x22, 0x33, 16]
        );
    }

    #[test]
    fn test_reply_fields() {
        let mut packet = [0; 8];
        set_status(&mut packet, 0x0a);
        set_target_logical_address(&mut packet, 0xfe);
        set_transaction_identifier(&mut packet, 0x1234);
        assert_eq!(status(&packet), 0x0a);
        assert_eq!(target_logical_address(&packet), 0xfe);
        assert_eq!(packet, [0, 0, 0, 0x0a, 0xfe, 0x12, 0x34, 0]);
    }

    #[test]
    fn test_layout_table() {
        use PacketVariant::*;
        assert_eq!(ReadCommand.header_crc_offset(), 15);
        assert_eq!(WriteCommand.header_crc_offset(), 15);
        assert_eq!(ReadResponse.header_crc_offset(), 11);
        assert_eq!(WriteResponse.header_crc_offset(), 7);

        assert_eq!(ReadCommand.data_length_offset(), Some(12));
        assert_eq!(WriteCommand.data_length_offset(), Some(12));
        assert_eq!(ReadResponse.data_length_offset(), Some(8));
        assert_eq!(WriteResponse.data_length_offset(), None);

        assert_eq!(ReadCommand.data_offset(), None);
        assert_eq!(WriteCommand.data_offset(), Some(16));
        assert_eq!(ReadResponse.data_offset(), Some(12));
        assert_eq!(WriteResponse.data_offset(), None);

        assert!(!ReadCommand.has_data());
        assert!(WriteCommand.has_data());
        assert!(ReadResponse.has_data());
        assert!(!WriteResponse.has_data());

        for variant in [ReadCommand, WriteCommand, ReadResponse, WriteResponse] {
            assert_eq!(variant.offset(RmapField::PacketType), Some(2));
            assert_eq!(
                variant.offset(RmapField::HeaderCrc),
                Some(variant.header_crc_offset())
            );
        }
        assert_eq!(ReadCommand.offset(RmapField::DestinationKey), Some(3));
        assert_eq!(WriteCommand.offset(RmapField::Address), Some(8));
        assert_eq!(ReadResponse.offset(RmapField::Address), None);
        assert_eq!(WriteResponse.offset(RmapField::Status), Some(3));
        assert_eq!(ReadCommand.offset(RmapField::Status), None);
        assert_eq!(WriteResponse.header_len(), WRITE_REPLY_LEN);
        assert_eq!(ReadResponse.header_len(), READ_REPLY_HEADER_LEN);
        assert_eq!(ReadCommand.header_len(), REQUEST_HEADER_LEN);
    }

    #[test]
    fn test_buffer_sizes() {
        assert_eq!(read_request_buffer_size(), 16);
        assert_eq!(write_request_buffer_size(0), 17);
        assert_eq!(write_request_buffer_size(4), 21);
        assert_eq!(read_reply_buffer_size(4), 17);
    }

    #[test]
    fn test_packet_type_field() {
        assert_eq!(PacketTypeField::READ_COMMAND.raw(), 0b0100_1100);
        assert_eq!(PacketTypeField::WRITE_COMMAND.raw(), 0b0110_1100);
        let field = PacketTypeField::from(0b1101_1111);
        assert!(field.is_command());
        assert!(!field.is_write());
        assert!(field.is_verify_data());
        assert!(field.is_acknowledge());
        assert!(field.is_increment_address());
        assert_eq!(field.reply_address_len(), 0b11);
        assert_eq!(u8::from(field), 0b0101_1111);

        let mut field = PacketTypeField::WRITE_COMMAND;
        assert!(field.set_reply_address_len(2));
        assert!(!field.set_reply_address_len(4));
        assert_eq!(field.reply_address_len(), 2);
        assert_eq!(field.raw(), 0b0110_1110);
        assert_eq!(field.variant(), Some(PacketVariant::WriteCommand));
        assert_eq!(
            PacketTypeField::READ_COMMAND.variant(),
            Some(PacketVariant::ReadCommand)
        );
    }

    #[test]
    fn test_variant_from_packet_type() {
        assert_eq!(
            PacketVariant::from_packet_type(0b0010_0000),
            Some(PacketVariant::WriteResponse)
        );
        assert_eq!(
            PacketVariant::from_packet_type(0b0011_1111),
            Some(PacketVariant::WriteResponse)
        );
        assert_eq!(
            PacketVariant::from_packet_type(0b0000_1011),
            Some(PacketVariant::ReadResponse)
        );
        assert_eq!(
            PacketVariant::from_packet_type(0x4c),
            Some(PacketVariant::ReadCommand)
        );
        assert_eq!(
            PacketVariant::from_packet_type(0x6c),
            Some(PacketVariant::WriteCommand)
        );
        // Read-modify-write command and reply.
        assert_eq!(PacketVariant::from_packet_type(0b0101_1100), None);
        assert_eq!(PacketVariant::from_packet_type(0b0001_1000), None);
        // Reserved bit set.
        assert_eq!(PacketVariant::from_packet_type(0b1100_1100), None);
        assert_eq!(PacketVariant::from_packet_type(0), None);
    }

    #[test]
    fn test_classification() {
        let mut packet = [0; 8];
        for low_bits in 0..=0b111 {
            set_packet_type(&mut packet, 0b0010_0000 | low_bits);
            assert!(is_rmap_write_response(&packet));
            assert!(!is_rmap_read_response(&packet));
            assert_eq!(classify_response(&packet), Some(PacketVariant::WriteResponse));

            set_packet_type(&mut packet, 0b0000_1000 | low_bits);
            assert!(is_rmap_read_response(&packet));
            assert!(!is_rmap_write_response(&packet));
            assert_eq!(classify_response(&packet), Some(PacketVariant::ReadResponse));
        }
        for raw in [0x4c, 0x6c, 0b0001_1000, 0b1010_0000, 0] {
            set_packet_type(&mut packet, raw);
            assert_eq!(classify_response(&packet), None, "packet type {raw:#010b}");
        }
    }

    #[test]
    fn test_header_crc_validation() {
        let mut packet = [
            0xfe, 0x01, 0x4c, 0x02, 0x20, 0x12, 0x34, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x20, 0x3a,
        ];
        assert!(header_crc_valid(&packet, PacketVariant::ReadCommand));
        packet[8] = 0x81;
        assert!(!header_crc_valid(&packet, PacketVariant::ReadCommand));
    }

    #[test]
    fn test_read_reply_validation() {
        let payload = [0xde, 0xad, 0xbe, 0xef];
        let variant = PacketVariant::ReadResponse;
        let mut packet = [0; read_reply_buffer_size(4)];
        crate::set_destination_logical_address(&mut packet, 0x20);
        crate::set_protocol_identifier(&mut packet, ProtocolId::Rmap);
        set_packet_type(&mut packet, 0b0000_1100);
        set_target_logical_address(&mut packet, 0xfe);
        set_transaction_identifier(&mut packet, 0x1234);
        set_data_length(&mut packet, variant, U24::from(4_u8));
        let crc = crc8(&packet[..11]);
        set_header_crc(&mut packet, variant, crc);
        data_mut(&mut packet, variant).copy_from_slice(&payload);
        set_data_crc(&mut packet, variant, crc8(&payload));

        assert!(is_rmap_read_response(&packet));
        assert!(header_crc_valid(&packet, variant));
        assert!(data_crc_valid(&packet, variant));
        assert_eq!(data(&packet, variant), &payload);
        assert_eq!(data_crc_offset(&packet, variant), 16);
        assert_eq!(data_crc(&packet, variant), 0x48);

        packet[13] ^= 0x01;
        assert!(!data_crc_valid(&packet, variant));
        assert!(header_crc_valid(&packet, variant));
    }

    #[test]
    fn test_write_reply_validation() {
        let variant = PacketVariant::WriteResponse;
        let mut packet = [0x20, 0x01, 0b0010_1100, 0x00, 0xfe, 0x12, 0x34, 0x00];
        let crc = crc8(&packet[..7]);
        set_header_crc(&mut packet, variant, crc);
        assert!(header_crc_valid(&packet, variant));
        for idx in 0..7 {
            let mut corrupted = packet;
            corrupted[idx] ^= 0x80;
            assert!(!header_crc_valid(&corrupted, variant));
        }
    }

    #[test]
    #[should_panic]
    fn test_write_reply_has_no_data_length() {
        let packet = [0; 8];
        data_length(&packet, PacketVariant::WriteResponse);
    }

    #[test]
    #[should_panic]
    fn test_read_command_has_no_data() {
        let packet = [0; 16];
        data(&packet, PacketVariant::ReadCommand);
    }

    #[test]
    fn test_error_display() {
        let err = RmapError::HeaderCrcMismatch {
            found: 0x3a,
            expected: 0x3b,
        };
        assert_eq!(
            err.to_string(),
            "header CRC mismatch, found 0x3a, expected 0x3b"
        );
        let err = RmapError::from(ByteConversionError::FromSliceTooSmall {
            found: 4,
            expected: 8,
        });
        assert!(matches!(err, RmapError::ByteConversion(_)));
        assert_eq!(
            RmapError::UnrecognizedPacketType(0x4c).to_string(),
            "unrecognized RMAP packet type 0b01001100"
        );
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_serde_packet_type() {
        let field = PacketTypeField::WRITE_COMMAND;
        let output = postcard::to_allocvec(&field).unwrap();
        let field_deser: PacketTypeField = postcard::from_bytes(&output).unwrap();
        assert_eq!(field_deser, field);
        let output = postcard::to_allocvec(&PacketVariant::ReadResponse).unwrap();
        let variant: PacketVariant = postcard::from_bytes(&output).unwrap();
        assert_eq!(variant, PacketVariant::ReadResponse);
    }
}

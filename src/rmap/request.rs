//! Construction and parsing of RMAP read and write commands.
//!
//! The `build_*` functions produce complete commands including the header CRC and, for write
//! commands, the payload and data CRC. The `*_into` variants write into a caller supplied buffer
//! and check its size before touching it. The variants returning an owned [alloc::vec::Vec]
//! require the `alloc` feature.
use super::{
    data_mut, set_address, set_data_crc, set_data_length, set_destination_key,
    set_extended_address, set_header_crc, set_packet_type, set_source_logical_address,
    set_transaction_identifier, write_request_buffer_size, PacketTypeField, PacketVariant,
    RmapError, REQUEST_HEADER_LEN,
};
use crate::crc::crc8;
use crate::field::U24;
use crate::{
    raw_protocol_identifier, set_destination_logical_address, set_protocol_identifier,
    ByteConversionError, ProtocolId,
};
#[cfg(feature = "alloc")]
use alloc::vec::Vec;
use delegate::delegate;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use zerocopy::{AsBytes, FromBytes};

/// Check that a buffer can hold the packet and zero the packet region.
fn prepare_buffer(buf: &mut [u8], packet_len: usize) -> Result<(), ByteConversionError> {
    if buf.len() < packet_len {
        return Err(ByteConversionError::ToSliceTooSmall {
            found: buf.len(),
            expected: packet_len,
        });
    }
    buf[..packet_len].fill(0);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_command_header(
    buf: &mut [u8],
    variant: PacketVariant,
    packet_type: PacketTypeField,
    destination_logical_address: u8,
    destination_key: u8,
    source_logical_address: u8,
    address: u32,
    transaction_id: u16,
    data_length: U24,
) {
    set_destination_logical_address(buf, destination_logical_address);
    set_protocol_identifier(buf, ProtocolId::Rmap);
    set_packet_type(buf, packet_type.raw());
    set_destination_key(buf, destination_key);
    set_source_logical_address(buf, source_logical_address);
    set_transaction_identifier(buf, transaction_id);
    set_extended_address(buf, 0);
    set_address(buf, address);
    set_data_length(buf, variant, data_length);
    let crc = crc8(&buf[..variant.header_crc_offset()]);
    set_header_crc(buf, variant, crc);
}

/// Write a read command into the provided buffer. Returns the written length, which is always
/// [super::read_request_buffer_size].
pub fn build_read_request_into(
    buf: &mut [u8],
    destination_logical_address: u8,
    destination_key: u8,
    source_logical_address: u8,
    read_address: u32,
    transaction_id: u16,
    data_length: U24,
) -> Result<usize, ByteConversionError> {
    prepare_buffer(buf, REQUEST_HEADER_LEN)?;
    write_command_header(
        buf,
        PacketVariant::ReadCommand,
        PacketTypeField::READ_COMMAND,
        destination_logical_address,
        destination_key,
        source_logical_address,
        read_address,
        transaction_id,
        data_length,
    );
    Ok(REQUEST_HEADER_LEN)
}

/// Write a write command carrying `data` into the provided buffer. Returns the written length,
/// which is [write_request_buffer_size] of the data length.
///
/// # Panics
///
/// If `data` does not fit into the 24-bit data length field. This check happens before the
/// buffer is modified.
pub fn build_write_request_into(
    buf: &mut [u8],
    destination_logical_address: u8,
    destination_key: u8,
    source_logical_address: u8,
    write_address: u32,
    transaction_id: u16,
    data: &[u8],
) -> Result<usize, ByteConversionError> {
    let data_length = match U24::try_from(data.len()) {
        Ok(len) => len,
        Err(e) => panic!("RMAP write command payload rejected: {e}"),
    };
    let packet_len = write_request_buffer_size(data.len());
    prepare_buffer(buf, packet_len)?;
    let variant = PacketVariant::WriteCommand;
    write_command_header(
        buf,
        variant,
        PacketTypeField::WRITE_COMMAND,
        destination_logical_address,
        destination_key,
        source_logical_address,
        write_address,
        transaction_id,
        data_length,
    );
    data_mut(buf, variant).copy_from_slice(data);
    set_data_crc(buf, variant, crc8(data));
    Ok(packet_len)
}

/// Build a read command in a newly allocated buffer of exactly
/// [super::read_request_buffer_size] bytes.
#[cfg(feature = "alloc")]
#[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
pub fn build_read_request(
    destination_logical_address: u8,
    destination_key: u8,
    source_logical_address: u8,
    read_address: u32,
    transaction_id: u16,
    data_length: U24,
) -> Vec<u8> {
    let mut buf = alloc::vec![0; REQUEST_HEADER_LEN];
    // Can not fail, the buffer is sized correctly.
    build_read_request_into(
        &mut buf,
        destination_logical_address,
        destination_key,
        source_logical_address,
        read_address,
        transaction_id,
        data_length,
    )
    .unwrap();
    buf
}

/// Build a write command in a newly allocated buffer of exactly [write_request_buffer_size]
/// bytes.
///
/// # Panics
///
/// If `data` does not fit into the 24-bit data length field.
#[cfg(feature = "alloc")]
#[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
pub fn build_write_request(
    destination_logical_address: u8,
    destination_key: u8,
    source_logical_address: u8,
    write_address: u32,
    transaction_id: u16,
    data: &[u8],
) -> Vec<u8> {
    let mut buf = alloc::vec![0; write_request_buffer_size(data.len())];
    // Can not fail, the buffer is sized correctly.
    build_write_request_into(
        &mut buf,
        destination_logical_address,
        destination_key,
        source_logical_address,
        write_address,
        transaction_id,
        data,
    )
    .unwrap();
    buf
}

/// Typed representation of the 16-byte RMAP command header.
///
/// # Arguments
///
/// * `destination_logical_address` - Logical address of the target node.
/// * `destination_key` - Key checked by the target before executing the command.
/// * `source_logical_address` - Logical address replies are sent to.
/// * `packet_type` - Packet type (instruction) field.
/// * `transaction_id` - Identifier which is echoed in the reply.
/// * `extended_address` - Upper 8 bits of a 40-bit address, zero for 32-bit addressing.
/// * `address` - Memory address to read from or write to.
/// * `data_length` - Number of bytes to read or write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandHeader {
    pub destination_logical_address: u8,
    pub destination_key: u8,
    pub source_logical_address: u8,
    pub packet_type: PacketTypeField,
    pub transaction_id: u16,
    pub extended_address: u8,
    pub address: u32,
    pub data_length: U24,
}

impl CommandHeader {
    /// Header of a read command with the packet type used by [build_read_request].
    pub fn read(
        destination_logical_address: u8,
        destination_key: u8,
        source_logical_address: u8,
        read_address: u32,
        transaction_id: u16,
        data_length: U24,
    ) -> Self {
        Self {
            destination_logical_address,
            destination_key,
            source_logical_address,
            packet_type: PacketTypeField::READ_COMMAND,
            transaction_id,
            extended_address: 0,
            address: read_address,
            data_length,
        }
    }

    /// Header of a write command with the packet type used by [build_write_request].
    pub fn write(
        destination_logical_address: u8,
        destination_key: u8,
        source_logical_address: u8,
        write_address: u32,
        transaction_id: u16,
        data_length: U24,
    ) -> Self {
        Self {
            packet_type: PacketTypeField::WRITE_COMMAND,
            ..Self::read(
                destination_logical_address,
                destination_key,
                source_logical_address,
                write_address,
                transaction_id,
                data_length,
            )
        }
    }

    delegate!(to self.packet_type {
        pub fn is_write(&self) -> bool;
        pub fn is_verify_data(&self) -> bool;
        pub fn is_acknowledge(&self) -> bool;
        pub fn is_increment_address(&self) -> bool;
        pub fn reply_address_len(&self) -> u8;
    });

    /// Variant of the command, if the packet type describes a supported command.
    pub fn variant(&self) -> Option<PacketVariant> {
        self.packet_type
            .variant()
            .filter(|variant| variant.is_command())
    }

    /// Serialize the header including the header CRC into the first
    /// [REQUEST_HEADER_LEN] bytes of the buffer.
    pub fn write_to_bytes(&self, buf: &mut [u8]) -> Result<usize, ByteConversionError> {
        if buf.len() < REQUEST_HEADER_LEN {
            return Err(ByteConversionError::ToSliceTooSmall {
                found: buf.len(),
                expected: REQUEST_HEADER_LEN,
            });
        }
        let mut zc_header = zc::CommandHeader::from(*self);
        zc_header.header_crc = crc8(&zc_header.as_bytes()[..REQUEST_HEADER_LEN - 1]);
        buf[..REQUEST_HEADER_LEN].copy_from_slice(zc_header.as_bytes());
        Ok(REQUEST_HEADER_LEN)
    }

    /// Parse a command header. The protocol identifier, packet type and header CRC are checked.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, RmapError> {
        let zc_header = zc::CommandHeader::read_from_prefix(buf).ok_or(
            ByteConversionError::FromSliceTooSmall {
                found: buf.len(),
                expected: REQUEST_HEADER_LEN,
            },
        )?;
        let protocol_id = raw_protocol_identifier(buf);
        if protocol_id != ProtocolId::Rmap as u8 {
            return Err(RmapError::NotRmap(protocol_id));
        }
        // The typed packet type field drops the reserved bit, so classify the wire byte.
        match PacketVariant::from_packet_type(zc_header.packet_type) {
            Some(variant) if variant.is_command() => (),
            Some(found) => return Err(RmapError::UnexpectedVariant { found }),
            None => return Err(RmapError::UnrecognizedPacketType(zc_header.packet_type)),
        }
        let expected = crc8(&buf[..REQUEST_HEADER_LEN - 1]);
        if zc_header.header_crc != expected {
            return Err(RmapError::HeaderCrcMismatch {
                found: zc_header.header_crc,
                expected,
            });
        }
        Ok(Self::from(zc_header))
    }
}

impl From<zc::CommandHeader> for CommandHeader {
    fn from(header: zc::CommandHeader) -> Self {
        Self {
            destination_logical_address: header.destination_logical_address,
            destination_key: header.destination_key,
            source_logical_address: header.source_logical_address,
            packet_type: PacketTypeField::from(header.packet_type),
            transaction_id: header.transaction_id.get(),
            extended_address: header.extended_address,
            address: header.address.get(),
            data_length: U24::from_be_bytes(header.data_length),
        }
    }
}

pub mod zc {
    use super::CommandHeader as TypedCommandHeader;
    use crate::ProtocolId;
    use zerocopy::byteorder::{NetworkEndian, U16, U32};
    use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

    /// Zero-copy memory layout of the RMAP command header.
    #[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Debug, Copy, Clone)]
    #[repr(C)]
    pub struct CommandHeader {
        pub(super) destination_logical_address: u8,
        pub(super) protocol_identifier: u8,
        pub(super) packet_type: u8,
        pub(super) destination_key: u8,
        pub(super) source_logical_address: u8,
        pub(super) transaction_id: U16<NetworkEndian>,
        pub(super) extended_address: u8,
        pub(super) address: U32<NetworkEndian>,
        pub(super) data_length: [u8; 3],
        pub(super) header_crc: u8,
    }

    impl CommandHeader {
        #[inline]
        pub fn header_crc(&self) -> u8 {
            self.header_crc
        }
    }

    /// The header CRC is left at zero.
    impl From<TypedCommandHeader> for CommandHeader {
        fn from(header: TypedCommandHeader) -> Self {
            Self {
                destination_logical_address: header.destination_logical_address,
                protocol_identifier: ProtocolId::Rmap as u8,
                packet_type: header.packet_type.raw(),
                destination_key: header.destination_key,
                source_logical_address: header.source_logical_address,
                transaction_id: U16::new(header.transaction_id),
                extended_address: header.extended_address,
                address: U32::new(header.address),
                data_length: header.data_length.to_be_bytes(),
                header_crc: 0,
            }
        }
    }
}

//! Checked reader for received RMAP replies.
use super::{
    classify_response, data, data_length, header_crc, packet_type, status, target_logical_address,
    transaction_identifier, PacketTypeField, PacketVariant, RmapError, READ_REPLY_HEADER_LEN,
    WRITE_REPLY_LEN,
};
use crate::crc::crc8;
use crate::field::U24;
use crate::{
    destination_logical_address, raw_protocol_identifier, ByteConversionError, ProtocolId,
    SPW_HEADER_LEN,
};

/// RMAP reply reader.
///
/// The constructor checks that the buffer is an RMAP packet, classifies it as a read or write
/// reply and verifies the header CRC. For read replies, the payload length and the data CRC are
/// verified as well. All accessors can therefore be used without further checks.
///
/// The buffer may be larger than the reply. Trailing bytes are ignored and
/// [ReplyReader::packet_len] returns the length of the reply itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReplyReader<'buf> {
    raw: &'buf [u8],
    variant: PacketVariant,
}

impl<'buf> ReplyReader<'buf> {
    pub fn new(buf: &'buf [u8]) -> Result<Self, RmapError> {
        if buf.len() < SPW_HEADER_LEN + 1 {
            return Err(ByteConversionError::FromSliceTooSmall {
                found: buf.len(),
                expected: SPW_HEADER_LEN + 1,
            }
            .into());
        }
        let protocol_id = raw_protocol_identifier(buf);
        if protocol_id != ProtocolId::Rmap as u8 {
            return Err(RmapError::NotRmap(protocol_id));
        }
        let variant =
            classify_response(buf).ok_or(RmapError::UnrecognizedPacketType(packet_type(buf)))?;
        let header_len = variant.header_len();
        if buf.len() < header_len {
            return Err(ByteConversionError::FromSliceTooSmall {
                found: buf.len(),
                expected: header_len,
            }
            .into());
        }
        let expected = crc8(&buf[..variant.header_crc_offset()]);
        let found = header_crc(buf, variant);
        if found != expected {
            return Err(RmapError::HeaderCrcMismatch { found, expected });
        }
        let reader = Self { raw: buf, variant };
        if variant.has_data() {
            let packet_len = reader.packet_len();
            if buf.len() < packet_len {
                return Err(ByteConversionError::FromSliceTooSmall {
                    found: buf.len(),
                    expected: packet_len,
                }
                .into());
            }
            let expected = crc8(data(buf, variant));
            let found = buf[packet_len - 1];
            if found != expected {
                return Err(RmapError::DataCrcMismatch { found, expected });
            }
        }
        Ok(reader)
    }

    /// Either [PacketVariant::ReadResponse] or [PacketVariant::WriteResponse].
    #[inline]
    pub fn variant(&self) -> PacketVariant {
        self.variant
    }

    /// Length of the reply including all checksums.
    pub fn packet_len(&self) -> usize {
        match self.variant {
            PacketVariant::ReadResponse => {
                READ_REPLY_HEADER_LEN + data_length(self.raw, self.variant).as_usize() + 1
            }
            _ => WRITE_REPLY_LEN,
        }
    }

    /// Address of the node which sent the original command.
    #[inline]
    pub fn initiator_logical_address(&self) -> u8 {
        destination_logical_address(self.raw)
    }

    #[inline]
    pub fn packet_type(&self) -> PacketTypeField {
        PacketTypeField::from(packet_type(self.raw))
    }

    /// Status code reported by the target. Zero signals successful command execution.
    #[inline]
    pub fn status(&self) -> u8 {
        status(self.raw)
    }

    #[inline]
    pub fn target_logical_address(&self) -> u8 {
        target_logical_address(self.raw)
    }

    #[inline]
    pub fn transaction_id(&self) -> u16 {
        transaction_identifier(self.raw)
    }

    /// Data length of a read reply, [None] for write replies.
    pub fn data_length(&self) -> Option<U24> {
        if self.variant.has_data() {
            return Some(data_length(self.raw, self.variant));
        }
        None
    }

    /// Payload of a read reply, empty for write replies.
    pub fn data(&self) -> &'buf [u8] {
        if self.variant.has_data() {
            return data(self.raw, self.variant);
        }
        &[]
    }

    /// Raw bytes of the reply, excluding trailing bytes of the buffer.
    #[inline]
    pub fn raw_data(&self) -> &'buf [u8] {
        &self.raw[..self.packet_len()]
    }
}

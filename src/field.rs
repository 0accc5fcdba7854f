//! Typed big-endian field access on raw packet buffers.
//!
//! A [FieldView] or [FieldViewMut] borrows the bytes of exactly one field inside a packet buffer.
//! Reading a field always yields the host representation of the value and writing a field always
//! produces the big-endian wire representation, independently of the host endianness.
use crate::ByteConversionError;
use core::fmt::{Display, Formatter};
use core::marker::PhantomData;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed-width unsigned integer which can be stored in big-endian order inside a packet.
pub trait BeField: Copy {
    /// Number of bytes occupied on the wire.
    const WIDTH: usize;

    /// Decode the value from exactly [Self::WIDTH] big-endian bytes.
    fn from_be_slice(raw: &[u8]) -> Self;

    /// Encode the value into exactly [Self::WIDTH] big-endian bytes.
    fn write_be_slice(&self, raw: &mut [u8]);
}

impl BeField for u8 {
    const WIDTH: usize = 1;

    #[inline]
    fn from_be_slice(raw: &[u8]) -> Self {
        raw[0]
    }

    #[inline]
    fn write_be_slice(&self, raw: &mut [u8]) {
        raw[0] = *self;
    }
}

macro_rules! be_field_impl {
    ($ty: ty) => {
        impl BeField for $ty {
            const WIDTH: usize = core::mem::size_of::<$ty>();

            #[inline]
            fn from_be_slice(raw: &[u8]) -> Self {
                let mut bytes = [0; core::mem::size_of::<$ty>()];
                bytes.copy_from_slice(raw);
                <$ty>::from_be_bytes(bytes)
            }

            #[inline]
            fn write_be_slice(&self, raw: &mut [u8]) {
                raw.copy_from_slice(&self.to_be_bytes());
            }
        }
    };
}

be_field_impl!(u16);
be_field_impl!(u32);

/// The passed value does not fit into 24 bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("value {0} too large for 24-bit field")]
pub struct ValueTooLargeError(pub u32);

/// Unsigned 24-bit integer, stored as three big-endian bytes on the wire.
///
/// The invariant `value <= U24::MAX_VALUE` is checked on construction, so every instance can be
/// written to a packet without truncation.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct U24(u32);

impl U24 {
    pub const MAX_VALUE: u32 = (1 << 24) - 1;
    pub const ZERO: U24 = U24(0);
    pub const MAX: U24 = U24(Self::MAX_VALUE);

    /// Returns [None] if the value exceeds [U24::MAX_VALUE].
    #[inline]
    pub const fn new(value: u32) -> Option<Self> {
        if value > Self::MAX_VALUE {
            return None;
        }
        Some(Self(value))
    }

    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Three big-endian bytes, the most significant byte of the underlying [u32] is dropped.
    #[inline]
    pub const fn to_be_bytes(&self) -> [u8; 3] {
        let raw = self.0.to_be_bytes();
        [raw[1], raw[2], raw[3]]
    }

    #[inline]
    pub const fn from_be_bytes(raw: [u8; 3]) -> Self {
        Self(u32::from_be_bytes([0, raw[0], raw[1], raw[2]]))
    }
}

impl TryFrom<u32> for U24 {
    type Error = ValueTooLargeError;

    #[inline]
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ValueTooLargeError(value))
    }
}

impl TryFrom<usize> for U24 {
    type Error = ValueTooLargeError;

    #[inline]
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value > Self::MAX_VALUE as usize {
            return Err(ValueTooLargeError(u32::try_from(value).unwrap_or(u32::MAX)));
        }
        Ok(Self(value as u32))
    }
}

impl From<u8> for U24 {
    #[inline]
    fn from(value: u8) -> Self {
        Self(value as u32)
    }
}

impl From<u16> for U24 {
    #[inline]
    fn from(value: u16) -> Self {
        Self(value as u32)
    }
}

impl From<U24> for u32 {
    #[inline]
    fn from(value: U24) -> Self {
        value.0
    }
}

impl PartialEq<u32> for U24 {
    fn eq(&self, other: &u32) -> bool {
        self.0 == *other
    }
}

impl Display for U24 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BeField for U24 {
    const WIDTH: usize = 3;

    #[inline]
    fn from_be_slice(raw: &[u8]) -> Self {
        Self::from_be_bytes([raw[0], raw[1], raw[2]])
    }

    #[inline]
    fn write_be_slice(&self, raw: &mut [u8]) {
        raw.copy_from_slice(&self.to_be_bytes());
    }
}

/// Read-only view on a big-endian field of type `T` inside a packet buffer.
#[derive(Debug, Copy, Clone)]
pub struct FieldView<'buf, T: BeField> {
    raw: &'buf [u8],
    phantom: PhantomData<T>,
}

impl<'buf, T: BeField> FieldView<'buf, T> {
    /// Create a view on the field starting at `offset`.
    ///
    /// # Panics
    ///
    /// If the buffer is too small to hold the field at the given offset. Use [Self::try_new] for
    /// a checked variant.
    #[inline]
    pub fn new(buf: &'buf [u8], offset: usize) -> Self {
        Self {
            raw: &buf[offset..offset + T::WIDTH],
            phantom: PhantomData,
        }
    }

    pub fn try_new(buf: &'buf [u8], offset: usize) -> Result<Self, ByteConversionError> {
        if buf.len() < offset + T::WIDTH {
            return Err(ByteConversionError::FromSliceTooSmall {
                found: buf.len(),
                expected: offset + T::WIDTH,
            });
        }
        Ok(Self::new(buf, offset))
    }

    #[inline]
    pub fn get(&self) -> T {
        T::from_be_slice(self.raw)
    }

    #[inline]
    pub fn raw(&self) -> &'buf [u8] {
        self.raw
    }
}

/// Mutable view on a big-endian field of type `T` inside a packet buffer.
///
/// Writing through the view only touches the bytes of the field itself.
#[derive(Debug)]
pub struct FieldViewMut<'buf, T: BeField> {
    raw: &'buf mut [u8],
    phantom: PhantomData<T>,
}

impl<'buf, T: BeField> FieldViewMut<'buf, T> {
    /// Create a mutable view on the field starting at `offset`.
    ///
    /// # Panics
    ///
    /// If the buffer is too small to hold the field at the given offset. Use [Self::try_new] for
    /// a checked variant.
    #[inline]
    pub fn new(buf: &'buf mut [u8], offset: usize) -> Self {
        Self {
            raw: &mut buf[offset..offset + T::WIDTH],
            phantom: PhantomData,
        }
    }

    pub fn try_new(buf: &'buf mut [u8], offset: usize) -> Result<Self, ByteConversionError> {
        if buf.len() < offset + T::WIDTH {
            return Err(ByteConversionError::ToSliceTooSmall {
                found: buf.len(),
                expected: offset + T::WIDTH,
            });
        }
        Ok(Self::new(buf, offset))
    }

    #[inline]
    pub fn get(&self) -> T {
        T::from_be_slice(self.raw)
    }

    #[inline]
    pub fn set(&mut self, value: T) {
        value.write_be_slice(self.raw);
    }
}

/// Decode the field of type `T` at `offset`.
///
/// # Panics
///
/// If the field does not fit into the buffer.
#[inline]
pub fn decode<T: BeField>(buf: &[u8], offset: usize) -> T {
    FieldView::<T>::new(buf, offset).get()
}

/// Encode `value` as the field of type `T` at `offset`.
///
/// # Panics
///
/// If the field does not fit into the buffer.
#[inline]
pub fn encode<T: BeField>(buf: &mut [u8], offset: usize, value: T) {
    FieldViewMut::<T>::new(buf, offset).set(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_view() {
        let mut buf = [1, 2, 3];
        assert_eq!(decode::<u8>(&buf, 1), 2);
        encode(&mut buf, 1, 0xffu8);
        assert_eq!(buf, [1, 0xff, 3]);
    }

    #[test]
    fn test_u16_big_endian() {
        let mut buf = [0; 4];
        encode(&mut buf, 1, 0x0607u16);
        assert_eq!(buf, [0, 0x06, 0x07, 0]);
        assert_eq!(decode::<u16>(&buf, 1), 0x0607);
    }

    #[test]
    fn test_u32_big_endian() {
        let mut buf = [0xaa; 6];
        encode(&mut buf, 1, 0x090A0B0Cu32);
        assert_eq!(buf, [0xaa, 0x09, 0x0a, 0x0b, 0x0c, 0xaa]);
        assert_eq!(decode::<u32>(&buf, 1), 0x090A0B0C);
    }

    #[test]
    fn test_u24_view() {
        let mut buf = [0xaa; 5];
        let val = U24::new(0x112233).unwrap();
        encode(&mut buf, 1, val);
        assert_eq!(buf, [0xaa, 0x11, 0x22, 0x33, 0xaa]);
        assert_eq!(decode::<U24>(&buf, 1), val);
        assert_eq!(decode::<U24>(&buf, 1).value(), 0x112233);
    }

    #[test]
    fn test_u24_zero_extension() {
        let buf = [0xff, 0xff, 0xff, 0xff];
        let val = decode::<U24>(&buf, 0);
        assert_eq!(val, U24::MAX);
        assert_eq!(u32::from(val), 0x00ff_ffff);
    }

    #[test]
    fn test_u24_bounds() {
        assert!(U24::new(U24::MAX_VALUE).is_some());
        assert!(U24::new(1 << 24).is_none());
        assert_eq!(U24::try_from(1_u32 << 24), Err(ValueTooLargeError(1 << 24)));
        assert_eq!(U24::try_from(32_usize).unwrap(), 32_u32);
        assert!(U24::try_from(usize::MAX).is_err());
        assert_eq!(U24::from(0xffff_u16).value(), 0xffff);
    }

    #[test]
    fn test_u24_bytes() {
        let val = U24::new(0x0D0E0F).unwrap();
        assert_eq!(val.to_be_bytes(), [0x0d, 0x0e, 0x0f]);
        assert_eq!(U24::from_be_bytes([0x0d, 0x0e, 0x0f]), val);
    }

    #[test]
    fn test_mut_view_leaves_neighbours() {
        let mut buf = [1, 2, 3, 4, 5, 6];
        let mut view = FieldViewMut::<u16>::new(&mut buf, 2);
        assert_eq!(view.get(), 0x0304);
        view.set(0xbeef);
        assert_eq!(view.get(), 0xbeef);
        assert_eq!(buf, [1, 2, 0xbe, 0xef, 5, 6]);
    }

    #[test]
    fn test_round_trip_all_offsets() {
        let mut buf = [0; 8];
        for offset in 0..=4 {
            encode(&mut buf, offset, 0xdeadbeef_u32);
            assert_eq!(decode::<u32>(&buf, offset), 0xdeadbeef);
            encode(&mut buf, offset, U24::MAX);
            assert_eq!(decode::<U24>(&buf, offset), U24::MAX);
        }
    }

    #[test]
    fn test_checked_view_too_small() {
        let mut buf = [0; 3];
        let res = FieldView::<u32>::try_new(&buf, 0);
        assert_eq!(
            res.unwrap_err(),
            ByteConversionError::FromSliceTooSmall {
                found: 3,
                expected: 4
            }
        );
        assert!(FieldView::<U24>::try_new(&buf, 0).is_ok());
        let res = FieldViewMut::<u16>::try_new(&mut buf, 2);
        assert_eq!(
            res.unwrap_err(),
            ByteConversionError::ToSliceTooSmall {
                found: 3,
                expected: 4
            }
        );
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds_panics() {
        let buf = [0; 2];
        decode::<u32>(&buf, 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(std::format!("{}", U24::from(42_u8)), "42");
        assert_eq!(
            std::format!("{}", ValueTooLargeError(1 << 24)),
            "value 16777216 too large for 24-bit field"
        );
    }
}

//! This module defines shared traits used across different kernels.

/// A trait that maps a signed integer type to its unsigned counterpart of the
/// same width, reinterpreting the bit pattern.
pub trait HasUnsigned: Copy {
    type Unsigned: Copy;
    const BITS: usize;

    fn to_unsigned_bits(self) -> Self::Unsigned;
}

/// A trait that maps an unsigned integer type to its signed counterpart of the
/// same width, reinterpreting the bit pattern.
pub trait HasSigned: Copy {
    type Signed: Copy;

    fn to_signed_bits(self) -> Self::Signed;
}

// Implement the traits for all primitive integer types.
macro_rules! impl_signed_unsigned_pair {
    ($S:ty, $U:ty) => {
        impl HasUnsigned for $S {
            type Unsigned = $U;
            const BITS: usize = <$S>::BITS as usize;

            #[inline]
            fn to_unsigned_bits(self) -> $U {
                self as $U
            }
        }
        impl HasSigned for $U {
            type Signed = $S;

            #[inline]
            fn to_signed_bits(self) -> $S {
                self as $S
            }
        }
    };
}

impl_signed_unsigned_pair!(i8, u8);
impl_signed_unsigned_pair!(i16, u16);
impl_signed_unsigned_pair!(i32, u32);
impl_signed_unsigned_pair!(i64, u64);

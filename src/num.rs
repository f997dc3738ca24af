/// Integer narrowing for values already masked to fit, checked in debug mode.
pub trait Truncate<To> {
    fn truncate(self) -> To;
}

macro_rules! impl_truncate {
    ($from:ty => $to:ty) => {
        const _: () = assert!(<$to>::BITS <= <$from>::BITS);

        impl Truncate<$to> for $from {
            fn truncate(self) -> $to {
                debug_assert!(self <= <$to>::MAX as $from);
                #[allow(clippy::cast_possible_truncation)]
                let truncated = self as $to;
                truncated
            }
        }
    };
}

impl_truncate!(u32 => u8);

use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::Epoch as EpochAlias;

macro_rules! impl_u64_newtype {
    ($name:ident) => {
        #[derive(
            Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const fn new(slot: u64) -> Self {
                Self(slot)
            }

            pub fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub fn saturating_sub<T: Into<$name>>(&self, other: T) -> $name {
                $name::new(self.0.saturating_sub(other.into().0))
            }

            pub fn saturating_add<T: Into<$name>>(&self, other: T) -> $name {
                $name::new(self.0.saturating_add(other.into().0))
            }
        }

        impl From<u64> for $name {
            fn from(x: u64) -> Self {
                Self(x)
            }
        }

        impl From<$name> for u64 {
            fn from(x: $name) -> Self {
                x.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl<T: Into<$name>> Add<T> for $name {
            type Output = $name;

            fn add(self, other: T) -> $name {
                $name::new(self.0.saturating_add(other.into().0))
            }
        }

        impl<T: Into<$name>> Sub<T> for $name {
            type Output = $name;

            /// Saturating subtraction, matching the teacher's `Slot`/`Epoch` semantics where
            /// time never goes negative.
            fn sub(self, other: T) -> $name {
                $name::new(self.0.saturating_sub(other.into().0))
            }
        }
    };
}

impl_u64_newtype!(Slot);
impl_u64_newtype!(Epoch);

impl Slot {
    /// Returns the epoch that `self` falls within, given `slots_per_epoch`.
    pub fn epoch(&self, slots_per_epoch: u64) -> EpochAlias {
        if slots_per_epoch == 0 {
            return Epoch::new(0);
        }
        Epoch::new(self.0 / slots_per_epoch)
    }
}

impl Epoch {
    /// Returns the first slot of `self`, given `slots_per_epoch`.
    pub fn start_slot(&self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0.saturating_mul(slots_per_epoch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_boundaries() {
        let slots_per_epoch = 32;
        assert_eq!(Slot::new(0).epoch(slots_per_epoch), Epoch::new(0));
        assert_eq!(Slot::new(31).epoch(slots_per_epoch), Epoch::new(0));
        assert_eq!(Slot::new(32).epoch(slots_per_epoch), Epoch::new(1));
        assert_eq!(Epoch::new(2).start_slot(slots_per_epoch), Slot::new(64));
    }

    #[test]
    fn saturating_sub_never_underflows() {
        assert_eq!(Slot::new(0).saturating_sub(Slot::new(5)), Slot::new(0));
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

mod buoy;
mod catalog;
mod constants;
mod gear;
mod player;

pub use buoy::{Buoy, CastRecord, ColorTaxClass};
pub use catalog::{FishCatalog, FishEntry, ProbabilityClass, COMMON_CLASS};
pub use constants::*;
pub use gear::{Rod, RodTier, WormTier};
pub use player::{CashoutAccount, Inventory, Player, Rival, Standing};


/// Violations of the entity invariants enforced by the mutators in this module.
#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum EntityError {
    #[error("insufficient funds (available={available}, requested={requested})")]
    InsufficientFunds { available: f64, requested: f64 },
    #[error("no {tier} left on rod")]
    OutOfWorms { tier: WormTier },
    #[error("unknown worm tier code {0}")]
    UnknownWormTier(u8),
    #[error("unknown rod tier code {0}")]
    UnknownRodTier(u8),
    #[error("unknown buoy color {0:?}")]
    UnknownColor(String),
    #[error("amount must be finite and non-negative (got={0})")]
    InvalidAmount(f64),
    #[error("fish catalog has no Common entry")]
    NoCommonFish,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Identifiers made only of whitespace are treated as missing.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// In-world identifier of a buoy.
    BuoyId
);
define_id!(
    /// In-world identifier of a fishing rod.
    RodId
);
define_id!(
    /// Unique username of a player. Also keys the cashout account and inventory.
    PlayerId
);

pub(crate) fn ensure_amount(amount: f64) -> Result<f64, EntityError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(EntityError::InvalidAmount(amount));
    }
    Ok(amount)
}

use fishhunt_types::{Inventory, Standing, WormTier};
use std::time::Duration;
use thiserror::Error as ThisError;

use crate::lottery::LotteryOutcome;
use crate::reward::FishCatch;

/// Faults and invalid requests. Expected business refusals are [`Rejection`]s
/// carried inside an `Ok` result instead.
#[derive(Debug, ThisError)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("unknown buoy")]
    UnknownBuoy,
    #[error("unknown rod")]
    UnknownRod,
    #[error("unknown player")]
    UnknownPlayer,
    #[error("rod is registered to another player")]
    RodNotOwned,
    /// Ledger I/O failed. No partial mutation was persisted.
    #[error("ledger store unavailable: {0:#}")]
    StoreUnavailable(#[from] anyhow::Error),
}

/// Why a cast was refused. None of these leave side effects on balances,
/// worms or experience.
#[derive(Clone, Debug, PartialEq)]
pub enum Rejection {
    /// The rod is still cooling down from its previous cast on this buoy.
    RateLimited { retry_after: Duration },
    /// The (buoy, actor) pair is inside its 24h anti-abuse lock.
    SpookCooldown { retry_after: Duration },
    /// The buoy cannot cover the drawn fish.
    InsufficientBuoyFunds { available: f64, requested: f64 },
    OutOfWorms { tier: WormTier },
}

impl Rejection {
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } | Self::SpookCooldown { retry_after } => {
                Some(*retry_after)
            }
            Self::InsufficientBuoyFunds { .. } | Self::OutOfWorms { .. } => None,
        }
    }
}

/// Everything a successful settlement changed, for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementResult {
    pub fish: FishCatch,
    /// `fish.base_value * fish.multiplier`, debited from the buoy.
    pub value: f64,
    pub fishpot_contribution: f64,
    pub buoy_balance: f64,
    pub cashout_balance: f64,
    pub xp_gained: u64,
    pub total_xp: u64,
    pub worms: [u32; 4],
    pub selected_worm: WormTier,
    pub alacrity_charges: u32,
    pub lottery: [LotteryOutcome; 2],
    pub inventory: Inventory,
    /// Settled casts on this buoy after this one.
    pub casts: u32,
    /// Overall XP ranking after the award.
    pub standing: Option<Standing>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JackpotPayout {
    /// Fishpot before tax.
    pub gross: f64,
    /// Amount credited to the actor after the buoy's color tax.
    pub amount: f64,
    pub recipient_new_balance: f64,
    pub location_name: String,
}

#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum CastOutcome {
    Settled(SettlementResult),
    JackpotPaid(JackpotPayout),
    Rejected(Rejection),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CashoutOutcome {
    /// Less than one whole unit is available.
    NoBalance { residual: f64 },
    /// Budget exhausted; the window reopens after `remaining`.
    OutOfQuota { remaining: Duration },
    Success {
        amount_taken: f64,
        remaining_balance: f64,
    },
}

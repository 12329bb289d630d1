//! Common types used throughout fishhunt: entities, identifiers, economy
//! constants and ledger addressing.

pub mod fishing;
pub mod ledger;

pub use fishing::{
    Buoy, BuoyId, CashoutAccount, CastRecord, ColorTaxClass, EntityError, FishCatalog, FishEntry,
    Inventory, Player, PlayerId, ProbabilityClass, Rival, Rod, RodId, RodTier, Standing, WormTier,
    COMMON_CLASS,
};
pub use ledger::{Key, Value};

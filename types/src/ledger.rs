//! Addressing for the authoritative ledger.
//!
//! Every entity the engine mutates lives under exactly one [`Key`]; the stored
//! [`Value`] variant always matches the key variant.

use serde::{Deserialize, Serialize};

use crate::fishing::{
    Buoy, BuoyId, CashoutAccount, CastRecord, Inventory, Player, PlayerId, Rod, RodId,
};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    Buoy(BuoyId),
    Rod(RodId),
    Player(PlayerId),
    Cashout(PlayerId),
    Inventory(PlayerId),
    CastRecord(BuoyId, PlayerId),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[allow(clippy::large_enum_variant)]
pub enum Value {
    Buoy(Buoy),
    Rod(Rod),
    Player(Player),
    Cashout(CashoutAccount),
    Inventory(Inventory),
    CastRecord(CastRecord),
}

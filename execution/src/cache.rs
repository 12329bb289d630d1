//! Fast Cache boundary.
//!
//! The cache is advisory. It only ever answers cast-cadence questions; balances
//! and ownership are never read from or written to it, so losing it degrades
//! throttling to the ledger fallback and nothing else.

use anyhow::Result;
use fishhunt_types::{BuoyId, PlayerId, RodId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

pub trait CastCache: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remaining time to live, `None` if the key is absent.
    fn ttl(&self, key: &str) -> impl Future<Output = Result<Option<Duration>>> + Send;
}

/// Cached cast counter for one (buoy, rod, actor) triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterEntry {
    pub current_buoy: BuoyId,
    /// Settled casts on the ledger when this entry was written.
    pub casts: u32,
}

/// Present while a rod is still cooling down on a buoy.
pub fn cadence_key(buoy: &BuoyId, rod: &RodId) -> String {
    format!("cadence:{buoy}:{rod}")
}

pub fn counter_key(buoy: &BuoyId, rod: &RodId, actor: &PlayerId) -> String {
    format!("casts:{buoy}:{rod}:{actor}")
}

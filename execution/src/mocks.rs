//! In-process stand-ins for the clock, the Fast Cache and a registered world.

use anyhow::{anyhow, Result};
use fishhunt_types::{
    Buoy, BuoyId, CashoutAccount, Key, Player, PlayerId, Rod, RodId, Value,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::CastCache;
use crate::clock::Clock;
use crate::state::Memory;

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// A [`CastCache`] whose entries expire against the supplied clock.
///
/// `set_failing(true)` turns every call into an error, to exercise the
/// ledger fallback. `set_stalled(true)` makes every call hang forever, like a
/// cache host that accepts connections but never answers.
pub struct MemoryCache {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, (String, u64)>>,
    failing: AtomicBool,
    stalled: AtomicBool,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    async fn stall(&self) {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("cache offline"));
        }
        Ok(())
    }

    /// Returns the live entry and its expiry, dropping it if it has lapsed.
    fn live(&self, key: &str) -> Result<Option<(String, u64)>> {
        self.check()?;
        let now = self.clock.now_ms();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("cache lock poisoned"))?;
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= now => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.clone())),
            None => Ok(None),
        }
    }
}

impl CastCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.stall().await;
        Ok(self.live(key)?.map(|(value, _)| value))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.stall().await;
        self.check()?;
        let expires_at = self.clock.now_ms() + ttl.as_millis() as u64;
        self.entries
            .lock()
            .map_err(|_| anyhow!("cache lock poisoned"))?
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.stall().await;
        let now = self.clock.now_ms();
        Ok(self
            .live(key)?
            .map(|(_, expires_at)| Duration::from_millis(expires_at - now)))
    }
}

/// One registered player with one rod, fishing at one buoy.
pub struct World {
    pub buoy: Buoy,
    pub rod: Rod,
    pub player: Player,
    pub account: CashoutAccount,
}

impl World {
    pub fn new(buoy_balance: f64, now_ms: u64) -> Self {
        let player_id = PlayerId::new("alice");
        let mut buoy = Buoy::new(BuoyId::new("buoy-1"), "Shallow Reef");
        buoy.balance = buoy_balance;
        Self {
            buoy,
            rod: Rod::new(RodId::new("rod-1"), player_id.clone()),
            player: Player::new(player_id.clone(), "Alice"),
            account: CashoutAccount::new(player_id, now_ms),
        }
    }

    pub fn values(&self) -> Vec<(Key, Value)> {
        vec![
            (Key::Buoy(self.buoy.id.clone()), Value::Buoy(self.buoy.clone())),
            (Key::Rod(self.rod.id.clone()), Value::Rod(self.rod.clone())),
            (
                Key::Player(self.player.id.clone()),
                Value::Player(self.player.clone()),
            ),
            (
                Key::Cashout(self.account.player.clone()),
                Value::Cashout(self.account.clone()),
            ),
        ]
    }

    pub fn memory(&self) -> Memory {
        Memory::with_values(self.values())
    }
}

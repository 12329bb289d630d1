//! Admission Gate.
//!
//! Two independent throttles guard a cast:
//!
//! * the cadence key, whose presence means the rod is still cooling down on
//!   this buoy (TTL derived from the worm tier and alacrity), and
//! * the cached cast counter, which lets most requests skip the ledger. When
//!   the counter is missing, stale, or exhausted the authoritative
//!   [`CastRecord`] decides instead. The counter only mirrors settled casts:
//!   admission reads it, and [`sync_counter`] rewrites it from the ledger.
//!
//! Cache faults never fail a request; they are logged and read as a miss.
//! Every cache call is bounded by `cache_timeout_ms`, so a hung cache costs
//! at most that long per call while the engine lock is held.

use anyhow::{anyhow, Result};
use fishhunt_types::{BuoyId, CastRecord, Key, PlayerId, Rod, RodId, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    cache::{cadence_key, counter_key, CastCache, CounterEntry},
    config::{EconomyConfig, SpookRearm},
    layer::Layer,
    outcome::Rejection,
    state::{load_cast_record, State},
};

/// Which tier answered the admission question.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmissionPath {
    Cache,
    Ledger,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Admission {
    Admitted(AdmissionPath),
    Rejected(Rejection),
}

/// Outcome of the spook check against the ledger record.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SpookCheck {
    Clear,
    /// Still inside the window; nothing to change.
    Cooling { remaining: Duration },
    /// Window elapsed on an exhausted record; the counter was reset and the
    /// policy decides whether this request gets through.
    Rearmed { admit: bool },
}

/// Evaluates (and, on rearm, mutates) a ledger cast record.
pub(crate) fn check_spook(
    record: &mut CastRecord,
    config: &EconomyConfig,
    now_ms: u64,
) -> SpookCheck {
    let window = config.spook_window_ms;
    if !record.is_spooked(now_ms, config.cast_limit, window) {
        return SpookCheck::Clear;
    }
    if record.within_window(now_ms, window) {
        return SpookCheck::Cooling {
            remaining: Duration::from_millis(record.remaining_ms(now_ms, window)),
        };
    }
    record.rearm();
    SpookCheck::Rearmed {
        admit: config.spook_rearm == SpookRearm::Unblock,
    }
}

/// Decides whether `actor` may cast `rod` at `buoy` right now.
pub async fn try_admit<S: State, C: CastCache>(
    state: &mut S,
    cache: &C,
    config: &EconomyConfig,
    buoy: &BuoyId,
    rod: &RodId,
    actor: &PlayerId,
    now_ms: u64,
) -> Result<Admission> {
    // Cadence
    let cadence = cadence_key(buoy, rod);
    match bounded(config, cache.ttl(&cadence)).await {
        Ok(Some(retry_after)) if !retry_after.is_zero() => {
            debug!(%buoy, %rod, retry_after_ms = retry_after.as_millis() as u64, "cast rate limited");
            return Ok(Admission::Rejected(Rejection::RateLimited { retry_after }));
        }
        Ok(_) => {}
        Err(e) => warn!(?e, key = %cadence, "cadence lookup failed"),
    }

    // Cached counter
    let key = counter_key(buoy, rod, actor);
    if let Some(entry) = read_counter(cache, config, &key).await {
        if &entry.current_buoy == buoy && entry.casts < config.cast_limit {
            debug!(%buoy, %actor, casts = entry.casts, "admitted from cache");
            return Ok(Admission::Admitted(AdmissionPath::Cache));
        }
    }

    // Ledger fallback
    let (mut record, existed) = load_cast_record(&*state, buoy, actor).await?;
    let check = check_spook(&mut record, config, now_ms);
    let (admission, changed) = match check {
        SpookCheck::Clear => (Admission::Admitted(AdmissionPath::Ledger), !existed),
        SpookCheck::Cooling { remaining } => (
            Admission::Rejected(Rejection::SpookCooldown {
                retry_after: remaining,
            }),
            !existed,
        ),
        SpookCheck::Rearmed { admit } => {
            info!(%buoy, %actor, admit, "spook window elapsed, cast record rearmed");
            let admission = if admit {
                Admission::Admitted(AdmissionPath::Ledger)
            } else {
                // Only the request that finds the window over is turned away.
                Admission::Rejected(Rejection::SpookCooldown {
                    retry_after: Duration::ZERO,
                })
            };
            (admission, true)
        }
    };
    if changed {
        let changes = {
            let mut layer = Layer::new(&*state);
            layer.stage(
                Key::CastRecord(buoy.clone(), actor.clone()),
                Value::CastRecord(record.clone()),
            );
            layer.commit()
        };
        state.apply(changes).await?;
    }

    match &admission {
        Admission::Admitted(_) => {
            debug!(%buoy, %actor, casts = record.casts, "admitted from ledger");
        }
        Admission::Rejected(rejection) => {
            debug!(%buoy, %actor, ?rejection, casts = record.casts, "spooked");
        }
    }
    Ok(admission)
}

/// Starts the cadence cooldown for `rod` on `buoy`, using the rod as it was
/// when the cast was admitted.
pub async fn refresh_cadence<C: CastCache>(
    cache: &C,
    config: &EconomyConfig,
    buoy: &BuoyId,
    rod: &Rod,
) {
    let ttl = config.cast_cooldown(rod.selected_worm, rod.has_alacrity());
    let key = cadence_key(buoy, &rod.id);
    if let Err(e) = bounded(config, cache.set_with_expiry(&key, "1", ttl)).await {
        warn!(?e, %key, "failed to refresh cadence");
    }
}

/// Mirrors the ledger's settled cast count into the cached counter.
pub async fn sync_counter<C: CastCache>(
    cache: &C,
    config: &EconomyConfig,
    buoy: &BuoyId,
    rod: &RodId,
    actor: &PlayerId,
    casts: u32,
) {
    let entry = CounterEntry {
        current_buoy: buoy.clone(),
        casts,
    };
    let key = counter_key(buoy, rod, actor);
    let raw = match serde_json::to_string(&entry) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(?e, %key, "failed to encode cast counter");
            return;
        }
    };
    if let Err(e) = bounded(config, cache.set_with_expiry(&key, &raw, config.counter_ttl())).await {
        warn!(?e, %key, "failed to store cast counter");
    }
}

/// Forces the next request for this triple onto the ledger path.
pub async fn mark_exhausted<C: CastCache>(
    cache: &C,
    config: &EconomyConfig,
    buoy: &BuoyId,
    rod: &RodId,
    actor: &PlayerId,
) {
    sync_counter(cache, config, buoy, rod, actor, config.cast_limit).await;
}

async fn read_counter<C: CastCache>(
    cache: &C,
    config: &EconomyConfig,
    key: &str,
) -> Option<CounterEntry> {
    match bounded(config, cache.get(key)).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(?e, %key, "discarding malformed cast counter");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(?e, %key, "cast counter lookup failed, falling back to ledger");
            None
        }
    }
}

/// Caps a cache call at `cache_timeout_ms`; an overrun reads as a fault.
async fn bounded<T>(config: &EconomyConfig, call: impl Future<Output = Result<T>>) -> Result<T> {
    let limit = config.cache_timeout();
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| anyhow!("cache call timed out after {}ms", limit.as_millis()))?
}

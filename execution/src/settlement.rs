//! Settlement Transaction.
//!
//! Every mutation of a settled cast is staged on one [`Layer`] and committed
//! with a single [`State::apply`]. Any refusal returns before the commit, so
//! the staged writes are simply dropped.

use chrono::{DateTime, Datelike, Utc, Weekday};
use fishhunt_types::{
    BuoyId, CashoutAccount, EntityError, Key, PlayerId, RodId, Value,
};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    config::EconomyConfig,
    layer::Layer,
    lottery::{draw_lottery, LotteryOutcome},
    outcome::{CastOutcome, EngineError, Rejection, SettlementResult},
    reward::FishCatch,
    state::{
        load_buoy, load_cashout, load_cast_record, load_inventory, load_player, load_rod, State,
    },
};

/// Saturday or Sunday in UTC.
pub fn is_weekend(now_ms: u64) -> bool {
    i64::try_from(now_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .is_some_and(|at| matches!(at.weekday(), Weekday::Sat | Weekday::Sun))
}

/// Settles `fish` for `actor` casting `rod` at `buoy`.
///
/// Returns [`CastOutcome::Settled`] or [`CastOutcome::Rejected`]; the latter
/// leaves the ledger untouched.
#[allow(clippy::too_many_arguments)]
pub async fn settle<S: State, R: Rng + ?Sized>(
    state: &mut S,
    config: &EconomyConfig,
    buoy_id: &BuoyId,
    rod_id: &RodId,
    actor: &PlayerId,
    fish: FishCatch,
    now_ms: u64,
    rng: &mut R,
) -> Result<CastOutcome, EngineError> {
    let mut layer = Layer::new(&*state);
    let mut buoy = load_buoy(&layer, buoy_id)
        .await?
        .ok_or(EngineError::UnknownBuoy)?;
    let mut rod = load_rod(&layer, rod_id)
        .await?
        .ok_or(EngineError::UnknownRod)?;
    let mut player = load_player(&layer, actor)
        .await?
        .ok_or(EngineError::UnknownPlayer)?;
    let mut account = load_cashout(&layer, actor)
        .await?
        .unwrap_or_else(|| CashoutAccount::new(actor.clone(), now_ms));
    let mut inventory = load_inventory(&layer, actor).await?;
    let (mut record, _) = load_cast_record(&layer, buoy_id, actor).await?;

    // The cache may admit a spooked pair; the ledger has the last word.
    if record.is_spooked(now_ms, config.cast_limit, config.spook_window_ms) {
        let retry_after =
            Duration::from_millis(record.remaining_ms(now_ms, config.spook_window_ms));
        return Ok(CastOutcome::Rejected(Rejection::SpookCooldown { retry_after }));
    }

    // Worms
    if let Err(e) = rod.consume_cast() {
        return match e {
            EntityError::OutOfWorms { tier } => {
                Ok(CastOutcome::Rejected(Rejection::OutOfWorms { tier }))
            }
            other => Err(EngineError::Validation(other.to_string())),
        };
    }

    // Buoy funds
    let value = fish.multiplied_value();
    if let Err(e) = buoy.withdraw(value) {
        return match e {
            EntityError::InsufficientFunds {
                available,
                requested,
            } => {
                debug!(buoy = %buoy_id, available, requested, "buoy cannot cover fish");
                Ok(CastOutcome::Rejected(Rejection::InsufficientBuoyFunds {
                    available,
                    requested,
                }))
            }
            other => Err(EngineError::Validation(other.to_string())),
        };
    }
    let fishpot_contribution = value * config.fishpot_rate;
    buoy.accrue_fishpot(fishpot_contribution);
    account
        .credit(value)
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    // Lottery
    let lottery = [
        draw_lottery(config, rod.tier, rng),
        draw_lottery(config, rod.tier, rng),
    ];
    let mut lottery_xp = 0;
    for outcome in lottery {
        match outcome {
            LotteryOutcome::None => {}
            LotteryOutcome::Worm => rod.grant_lottery_worms(),
            LotteryOutcome::Alacrity => rod.grant_lottery_alacrity(),
            LotteryOutcome::Powder => inventory.add_powder(config.lottery_powder),
            LotteryOutcome::Xp => lottery_xp += config.lottery_xp,
        }
    }
    debug!(buoy = %buoy_id, %actor, ?lottery, "lottery drawn");

    // Experience
    let mut xp_gained = rod.tier.base_xp();
    if is_weekend(now_ms) {
        xp_gained *= config.weekend_xp_multiplier;
    }
    xp_gained += lottery_xp;
    player.award_xp(xp_gained);

    inventory.record_catch();

    record.casts += 1;
    if record.casts >= config.cast_limit {
        record.last_spook_ms = Some(now_ms);
    }

    let mut result = SettlementResult {
        value,
        fishpot_contribution,
        buoy_balance: buoy.balance,
        cashout_balance: account.balance,
        xp_gained,
        total_xp: player.xp,
        worms: rod.worms,
        selected_worm: rod.selected_worm,
        alacrity_charges: rod.alacrity_charges,
        lottery,
        inventory: inventory.clone(),
        casts: record.casts,
        standing: None,
        fish,
    };

    layer.stage(Key::Buoy(buoy_id.clone()), Value::Buoy(buoy));
    layer.stage(Key::Rod(rod_id.clone()), Value::Rod(rod));
    layer.stage(Key::Player(actor.clone()), Value::Player(player));
    layer.stage(Key::Cashout(actor.clone()), Value::Cashout(account));
    layer.stage(Key::Inventory(actor.clone()), Value::Inventory(inventory));
    layer.stage(
        Key::CastRecord(buoy_id.clone(), actor.clone()),
        Value::CastRecord(record),
    );
    let changes = layer.commit();
    state.apply(changes).await?;

    // The cast is committed; a failed ranking only drops the leaderboard lines.
    match state.standing(actor).await {
        Ok(standing) => result.standing = standing,
        Err(e) => warn!(?e, %actor, "failed to rank player"),
    }
    Ok(CastOutcome::Settled(result))
}

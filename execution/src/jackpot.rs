use fishhunt_types::{BuoyId, CashoutAccount, Key, PlayerId, Value};
use rand::Rng;
use tracing::info;

use crate::{
    config::EconomyConfig,
    layer::Layer,
    outcome::{EngineError, JackpotPayout},
    state::{load_buoy, load_cashout, State},
};

/// Draws once for the buoy's jackpot and, if it fires, pays the whole fishpot
/// (after color tax) to `actor` and empties it.
///
/// Returns `None` when the draw misses or the pot is below the minimum, in
/// which case nothing is written.
pub async fn maybe_trigger_jackpot<S: State, R: Rng + ?Sized>(
    state: &mut S,
    config: &EconomyConfig,
    buoy_id: &BuoyId,
    actor: &PlayerId,
    now_ms: u64,
    rng: &mut R,
) -> Result<Option<JackpotPayout>, EngineError> {
    let draw: f64 = rng.gen();
    if draw >= config.jackpot_rate {
        return Ok(None);
    }

    let mut layer = Layer::new(&*state);
    let mut buoy = load_buoy(&layer, buoy_id)
        .await?
        .ok_or(EngineError::UnknownBuoy)?;
    if buoy.fishpot < config.fishpot_minimum {
        return Ok(None);
    }
    let mut account = load_cashout(&layer, actor)
        .await?
        .unwrap_or_else(|| CashoutAccount::new(actor.clone(), now_ms));

    let gross = buoy.take_fishpot();
    let amount = buoy.taxed(gross);
    account
        .credit(amount)
        .map_err(|e| EngineError::Validation(e.to_string()))?;
    let payout = JackpotPayout {
        gross,
        amount,
        recipient_new_balance: account.balance,
        location_name: buoy.location_name.clone(),
    };

    layer.stage(Key::Buoy(buoy_id.clone()), Value::Buoy(buoy));
    layer.stage(Key::Cashout(actor.clone()), Value::Cashout(account));
    let changes = layer.commit();
    state.apply(changes).await?;
    info!(buoy = %buoy_id, %actor, gross, amount, "jackpot paid");
    Ok(Some(payout))
}

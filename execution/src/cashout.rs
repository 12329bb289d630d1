//! Cashout Quota Manager.
//!
//! A player may withdraw at most `max_value` per rolling window. The window
//! is anchored at `last_major_cashout_ms`, which moves whenever a cashout
//! drains the budget or opens a new window.

use fishhunt_types::{CashoutAccount, EntityError, Key, PlayerId, Value};
use std::time::Duration;
use tracing::info;

use crate::{
    layer::Layer,
    outcome::{CashoutOutcome, EngineError},
    state::{load_cashout, State},
};

/// Applies one cashout request to `account` in place.
///
/// `NoBalance` and `OutOfQuota` leave the account untouched.
pub fn apply_cashout(
    account: &mut CashoutAccount,
    now_ms: u64,
    window_ms: u64,
) -> Result<CashoutOutcome, EntityError> {
    if account.balance.floor() <= 0.0 {
        return Ok(CashoutOutcome::NoBalance {
            residual: account.balance,
        });
    }
    let elapsed = now_ms.saturating_sub(account.last_major_cashout_ms);
    let within_window = elapsed < window_ms;

    let amount = if within_window {
        if account.budget <= 0.0 {
            return Ok(CashoutOutcome::OutOfQuota {
                remaining: Duration::from_millis(window_ms - elapsed),
            });
        }
        let amount = account.balance.min(account.budget);
        account.debit(amount)?;
        account.budget -= amount;
        if account.budget <= 0.0 {
            account.budget = 0.0;
            account.last_major_cashout_ms = now_ms;
        }
        amount
    } else {
        let amount = account.balance.min(account.max_value);
        account.debit(amount)?;
        account.budget = account.max_value - amount;
        account.last_major_cashout_ms = now_ms;
        amount
    };

    Ok(CashoutOutcome::Success {
        amount_taken: amount,
        remaining_balance: account.balance,
    })
}

/// Runs a cashout for `player` as one ledger commit.
pub async fn cashout<S: State>(
    state: &mut S,
    player: &PlayerId,
    now_ms: u64,
    window_ms: u64,
) -> Result<CashoutOutcome, EngineError> {
    let mut layer = Layer::new(&*state);
    let mut account = load_cashout(&layer, player)
        .await?
        .ok_or(EngineError::UnknownPlayer)?;
    let outcome = apply_cashout(&mut account, now_ms, window_ms)
        .map_err(|e| EngineError::Validation(e.to_string()))?;
    if let CashoutOutcome::Success {
        amount_taken,
        remaining_balance,
    } = &outcome
    {
        info!(%player, amount_taken, remaining_balance, budget = account.budget, "cashout");
        layer.stage(Key::Cashout(player.clone()), Value::Cashout(account));
        let changes = layer.commit();
        state.apply(changes).await?;
    }
    Ok(outcome)
}

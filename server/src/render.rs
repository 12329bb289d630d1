//! Player-facing text. Amounts are rounded to two decimals here and nowhere
//! else.

use fishhunt_execution::{
    CashoutOutcome, EconomyConfig, JackpotPayout, LotteryOutcome, Rejection, SettlementResult,
};
use fishhunt_types::{PlayerId, Standing};
use std::time::Duration;

pub fn amount(value: f64) -> String {
    format!("{value:.2}")
}

/// `HH:MM:SS`, rounding partial seconds up so a pending cooldown never shows
/// as zero.
pub fn hhmmss(duration: Duration) -> String {
    let millis = duration.as_millis();
    let secs = millis.div_ceil(1000);
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

pub fn settlement(result: &SettlementResult, config: &EconomyConfig) -> String {
    let mut lines = vec![
        format!(
            "You caught a {} worth {} L$!",
            result.fish.name,
            amount(result.value)
        ),
        format!(
            "Balance: {} L$ | XP: +{} ({} total)",
            amount(result.cashout_balance),
            result.xp_gained,
            result.total_xp
        ),
        format!(
            "Worms left: {} {}",
            result.worms[result.selected_worm.index()],
            result.selected_worm
        ),
    ];
    for outcome in result.lottery {
        if let Some(message) = outcome.message(result.selected_worm, config) {
            lines.push(message);
        }
    }
    if result.lottery.contains(&LotteryOutcome::Alacrity) {
        lines.push(format!("Alacrity charges: {}", result.alacrity_charges));
    }
    if let Some(standing) = &result.standing {
        lines.extend(self::standing(standing));
    }
    lines.join("\n")
}

pub fn standing(standing: &Standing) -> [String; 2] {
    let chase = match &standing.above {
        Some(rival) => format!(
            "{} XP to beat {} ranked {}.",
            rival.xp_gap, rival.display_name, rival.rank
        ),
        None => "You are the top fisher!".to_string(),
    };
    [format!("Rank (overall): {}", standing.rank), chase]
}

pub fn jackpot(payout: &JackpotPayout, winner: &PlayerId) -> String {
    format!(
        "FISHPOT WINNER! Congratulations to {winner}, who has won the {} L$ fishpot of this buoy in {}",
        amount(payout.amount),
        payout.location_name
    )
}

pub fn rejection(rejection: &Rejection) -> String {
    match rejection {
        Rejection::RateLimited { retry_after } => format!(
            "Wait a moment, your fishing rod is not ready yet ({})",
            hhmmss(*retry_after)
        ),
        Rejection::SpookCooldown { retry_after } if retry_after.is_zero() => {
            "This buoy has settled down, cast again to start fishing.".to_string()
        }
        Rejection::SpookCooldown { retry_after } => format!(
            "Oops, You have Spooked this buoy, you can come back in {}",
            hhmmss(*retry_after)
        ),
        Rejection::InsufficientBuoyFunds { .. } => {
            "Oops this place has run out of fishes!".to_string()
        }
        Rejection::OutOfWorms { tier } => format!("You have run out of {tier}!"),
    }
}

pub fn cashout(outcome: &CashoutOutcome) -> String {
    match outcome {
        CashoutOutcome::NoBalance { residual } => format!(
            "Not enough balance to cash out ({} L$)",
            amount(*residual)
        ),
        CashoutOutcome::OutOfQuota { remaining } => format!(
            "Daily cashout limit reached, you can cash out again in {}",
            hhmmss(*remaining)
        ),
        CashoutOutcome::Success {
            amount_taken,
            remaining_balance,
        } => format!(
            "Cashed out {} L$, remaining balance {} L$",
            amount(*amount_taken),
            amount(*remaining_balance)
        ),
    }
}

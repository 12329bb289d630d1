use fishhunt_types::{RodTier, WormTier};
use rand::Rng;

use crate::config::EconomyConfig;

/// Result of one lottery draw after eligibility has been applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LotteryOutcome {
    #[default]
    None,
    Worm,
    Alacrity,
    Powder,
    Xp,
}

impl LotteryOutcome {
    /// Player-facing line for a winning draw.
    pub fn message(self, worm: WormTier, config: &EconomyConfig) -> Option<String> {
        use fishhunt_types::fishing::{LOTTERY_ALACRITY_CHARGES, LOTTERY_WORMS};
        match self {
            Self::None => None,
            Self::Worm => Some(format!("You've won {LOTTERY_WORMS} {worm}!")),
            Self::Alacrity => Some(format!(
                "You've won {LOTTERY_ALACRITY_CHARGES} Alacrity charges (fast cast)"
            )),
            Self::Powder => Some(format!(
                "You've won {} Magic Powder (Shubbies Pet Food)!",
                config.lottery_powder
            )),
            Self::Xp => Some(format!("You've won {} Fishing Experience", config.lottery_xp)),
        }
    }
}

/// One independent lottery draw for a rod of `rod_tier`.
///
/// Below `lottery_rate` a prize is picked from the weighted table; an
/// alacrity prize on a rod under the minimum tier is void.
pub fn draw_lottery<R: Rng + ?Sized>(
    config: &EconomyConfig,
    rod_tier: RodTier,
    rng: &mut R,
) -> LotteryOutcome {
    let roll: f64 = rng.gen();
    if roll >= config.lottery_rate {
        return LotteryOutcome::None;
    }
    match pick_prize(config, rng) {
        LotteryOutcome::Alacrity if rod_tier < config.alacrity_min_rod_tier => {
            LotteryOutcome::None
        }
        prize => prize,
    }
}

fn pick_prize<R: Rng + ?Sized>(config: &EconomyConfig, rng: &mut R) -> LotteryOutcome {
    let weights = &config.lottery_weights;
    let table = [
        (LotteryOutcome::Worm, weights.worm),
        (LotteryOutcome::Alacrity, weights.alacrity),
        (LotteryOutcome::Powder, weights.powder),
        (LotteryOutcome::Xp, weights.xp),
        (LotteryOutcome::None, weights.nothing),
    ];
    let total: f64 = table.iter().map(|(_, weight)| weight.max(0.0)).sum();
    if total <= 0.0 {
        return LotteryOutcome::None;
    }
    let mut point = rng.gen::<f64>() * total;
    for (prize, weight) in table {
        let weight = weight.max(0.0);
        if point < weight {
            return prize;
        }
        point -= weight;
    }
    LotteryOutcome::None
}

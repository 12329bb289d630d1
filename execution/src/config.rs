use fishhunt_types::fishing::{
    ALACRITY_BOOST_FACTOR, CAST_LIMIT, FISHPOT_MINIMUM, FISHPOT_RATE, FISH_LOTTERY_RATE,
    JACKPOT_RATE, LOTTERY_POWDER, LOTTERY_XP, MILLISECONDS_IN_DAY, WEEKEND_XP_MULTIPLIER,
};
use fishhunt_types::{EntityError, FishCatalog, RodTier, WormTier};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the admission gate does with a request that arrives after an
/// exhausted pair's spook window has elapsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpookRearm {
    /// Reset the cast counter but reject the request that found the window
    /// elapsed; the next request is admitted.
    #[default]
    RejectThenRearm,
    /// Reset the cast counter and admit the request.
    Unblock,
}

/// Relative weights of the named lottery prizes. `nothing` is a no-op prize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LotteryWeights {
    #[serde(default = "default_worm_weight")]
    pub worm: f64,
    #[serde(default = "default_prize_weight")]
    pub alacrity: f64,
    #[serde(default = "default_prize_weight")]
    pub powder: f64,
    #[serde(default = "default_prize_weight")]
    pub xp: f64,
    #[serde(default)]
    pub nothing: f64,
}

impl Default for LotteryWeights {
    fn default() -> Self {
        Self {
            worm: default_worm_weight(),
            alacrity: default_prize_weight(),
            powder: default_prize_weight(),
            xp: default_prize_weight(),
            nothing: 0.0,
        }
    }
}

fn default_worm_weight() -> f64 {
    0.4
}

fn default_prize_weight() -> f64 {
    0.2
}

/// Tunables of the cast and cashout economy. Defaults match the live game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomyConfig {
    #[serde(default = "default_cast_limit")]
    pub cast_limit: u32,
    #[serde(default = "default_window_ms")]
    pub spook_window_ms: u64,
    #[serde(default)]
    pub spook_rearm: SpookRearm,
    #[serde(default = "default_window_ms")]
    pub cashout_window_ms: u64,
    /// Cooldown multiplier while the rod has alacrity charges.
    #[serde(default = "default_alacrity_boost")]
    pub alacrity_boost: f64,
    /// Lifetime of a cached cast counter.
    #[serde(default = "default_counter_ttl_secs")]
    pub counter_ttl_secs: u64,
    /// Upper bound on a single cache call before it is treated as a miss.
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,
    #[serde(default = "default_fishpot_rate")]
    pub fishpot_rate: f64,
    #[serde(default = "default_jackpot_rate")]
    pub jackpot_rate: f64,
    #[serde(default = "default_fishpot_minimum")]
    pub fishpot_minimum: f64,
    #[serde(default = "default_lottery_rate")]
    pub lottery_rate: f64,
    #[serde(default)]
    pub lottery_weights: LotteryWeights,
    #[serde(default = "default_alacrity_min_rod_tier")]
    pub alacrity_min_rod_tier: RodTier,
    #[serde(default = "default_lottery_powder")]
    pub lottery_powder: u64,
    #[serde(default = "default_lottery_xp")]
    pub lottery_xp: u64,
    #[serde(default = "default_weekend_xp_multiplier")]
    pub weekend_xp_multiplier: u64,
    #[serde(default)]
    pub catalog: FishCatalog,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            cast_limit: default_cast_limit(),
            spook_window_ms: default_window_ms(),
            spook_rearm: SpookRearm::default(),
            cashout_window_ms: default_window_ms(),
            alacrity_boost: default_alacrity_boost(),
            counter_ttl_secs: default_counter_ttl_secs(),
            cache_timeout_ms: default_cache_timeout_ms(),
            fishpot_rate: default_fishpot_rate(),
            jackpot_rate: default_jackpot_rate(),
            fishpot_minimum: default_fishpot_minimum(),
            lottery_rate: default_lottery_rate(),
            lottery_weights: LotteryWeights::default(),
            alacrity_min_rod_tier: default_alacrity_min_rod_tier(),
            lottery_powder: default_lottery_powder(),
            lottery_xp: default_lottery_xp(),
            weekend_xp_multiplier: default_weekend_xp_multiplier(),
            catalog: FishCatalog::default(),
        }
    }
}

impl EconomyConfig {
    /// Cast cooldown for a worm tier, shortened while alacrity is active.
    pub fn cast_cooldown(&self, worm: WormTier, alacrity: bool) -> Duration {
        let base = Duration::from_secs(worm.cooldown_secs());
        if alacrity {
            base.mul_f64(self.alacrity_boost)
        } else {
            base
        }
    }

    pub fn counter_ttl(&self) -> Duration {
        Duration::from_secs(self.counter_ttl_secs.max(1))
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.catalog.validate()?;
        for (name, rate) in [
            ("fishpot_rate", self.fishpot_rate),
            ("jackpot_rate", self.jackpot_rate),
            ("lottery_rate", self.lottery_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::RateOutOfRange { name, rate });
            }
        }
        if !(self.alacrity_boost > 0.0 && self.alacrity_boost <= 1.0) {
            return Err(ConfigError::RateOutOfRange {
                name: "alacrity_boost",
                rate: self.alacrity_boost,
            });
        }
        if self.cast_limit == 0 {
            return Err(ConfigError::ZeroCastLimit);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1] (got={rate})")]
    RateOutOfRange { name: &'static str, rate: f64 },
    #[error("cast_limit must be > 0")]
    ZeroCastLimit,
    #[error(transparent)]
    Catalog(#[from] EntityError),
}

fn default_cast_limit() -> u32 {
    CAST_LIMIT
}

fn default_window_ms() -> u64 {
    MILLISECONDS_IN_DAY
}

fn default_alacrity_boost() -> f64 {
    ALACRITY_BOOST_FACTOR
}

fn default_counter_ttl_secs() -> u64 {
    MILLISECONDS_IN_DAY / 1000
}

fn default_cache_timeout_ms() -> u64 {
    250
}

fn default_fishpot_rate() -> f64 {
    FISHPOT_RATE
}

fn default_jackpot_rate() -> f64 {
    JACKPOT_RATE
}

fn default_fishpot_minimum() -> f64 {
    FISHPOT_MINIMUM
}

fn default_lottery_rate() -> f64 {
    FISH_LOTTERY_RATE
}

fn default_alacrity_min_rod_tier() -> RodTier {
    RodTier::Enchanted
}

fn default_lottery_powder() -> u64 {
    LOTTERY_POWDER
}

fn default_lottery_xp() -> u64 {
    LOTTERY_XP
}

fn default_weekend_xp_multiplier() -> u64 {
    WEEKEND_XP_MULTIPLIER
}

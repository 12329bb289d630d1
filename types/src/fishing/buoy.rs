use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{ensure_amount, BuoyId, EntityError};

/// Buoy color. Decides how much of a deposit or jackpot is kept after tax.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTaxClass {
    Red,
    Yellow,
    #[default]
    Blue,
}

impl ColorTaxClass {
    pub fn retained_fraction(self) -> f64 {
        match self {
            Self::Red => 0.50,
            Self::Yellow => 0.75,
            Self::Blue => 0.85,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
        }
    }
}

impl FromStr for ColorTaxClass {
    type Err = EntityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "red" => Ok(Self::Red),
            "yellow" => Ok(Self::Yellow),
            "blue" => Ok(Self::Blue),
            other => Err(EntityError::UnknownColor(other.to_string())),
        }
    }
}

/// A shared, depletable pool that casts draw fish value from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Buoy {
    pub id: BuoyId,
    /// Never negative.
    pub balance: f64,
    /// Jackpot pool, fed by a fixed fraction of every settled cast.
    pub fishpot: f64,
    pub location_name: String,
    pub multiplier: f64,
    pub color: ColorTaxClass,
}

impl Buoy {
    pub fn new(id: BuoyId, location_name: impl Into<String>) -> Self {
        Self {
            id,
            balance: 0.0,
            fishpot: 0.0,
            location_name: location_name.into(),
            multiplier: 1.0,
            color: ColorTaxClass::default(),
        }
    }

    pub fn multiplied_value(&self, base_value: f64) -> f64 {
        base_value * self.multiplier
    }

    /// Applies the color tax to a gross amount.
    pub fn taxed(&self, gross: f64) -> f64 {
        gross * self.color.retained_fraction()
    }

    /// Debits `amount`, refusing (and leaving the balance untouched) if it would go negative.
    pub fn withdraw(&mut self, amount: f64) -> Result<(), EntityError> {
        let amount = ensure_amount(amount)?;
        if amount > self.balance {
            return Err(EntityError::InsufficientFunds {
                available: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Credits an external deposit after tax and returns the credited amount.
    pub fn deposit(&mut self, gross: f64) -> Result<f64, EntityError> {
        let credited = self.taxed(ensure_amount(gross)?);
        self.balance += credited;
        Ok(credited)
    }

    pub fn accrue_fishpot(&mut self, amount: f64) {
        self.fishpot += amount.max(0.0);
    }

    /// Empties the fishpot and returns what it held.
    pub fn take_fishpot(&mut self) -> f64 {
        std::mem::take(&mut self.fishpot)
    }
}

/// Authoritative rate-limit state for one (buoy, actor) pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastRecord {
    pub casts: u32,
    /// Unix milliseconds of the last spook, `None` if the pair was never spooked.
    pub last_spook_ms: Option<u64>,
}

impl CastRecord {
    /// Milliseconds since the last spook, `None` if there never was one.
    pub fn since_spook(&self, now_ms: u64) -> Option<u64> {
        self.last_spook_ms.map(|at| now_ms.saturating_sub(at))
    }

    /// True while the last spook is less than `window_ms` old.
    pub fn within_window(&self, now_ms: u64, window_ms: u64) -> bool {
        self.since_spook(now_ms)
            .is_some_and(|elapsed| elapsed < window_ms)
    }

    pub fn is_spooked(&self, now_ms: u64, limit: u32, window_ms: u64) -> bool {
        self.casts >= limit || self.within_window(now_ms, window_ms)
    }

    /// Time left before the spook window closes, zero once it has.
    pub fn remaining_ms(&self, now_ms: u64, window_ms: u64) -> u64 {
        self.since_spook(now_ms)
            .map_or(0, |elapsed| window_ms.saturating_sub(elapsed))
    }

    /// Clears the cast counter for a fresh cycle. The spook stamp is kept, so
    /// the window is still measured from when the limit was reached.
    pub fn rearm(&mut self) {
        self.casts = 0;
    }
}

use serde::{Deserialize, Serialize};

use super::{ensure_amount, EntityError, PlayerId, CASHOUT_DEFAULT_VALUE};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub display_name: String,
    /// Monotonically non-decreasing.
    pub xp: u64,
}

impl Player {
    pub fn new(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            username: id.to_string(),
            id,
            display_name: display_name.into(),
            xp: 0,
        }
    }

    pub fn award_xp(&mut self, xp: u64) {
        self.xp = self.xp.saturating_add(xp);
    }
}

/// Withdrawable balance plus the rolling daily quota that gates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashoutAccount {
    pub player: PlayerId,
    pub balance: f64,
    /// Remaining quota in the current window, within `[0, max_value]`.
    pub budget: f64,
    /// Unix milliseconds of the cashout that opened the current window.
    pub last_major_cashout_ms: u64,
    pub max_value: f64,
}

impl CashoutAccount {
    pub fn new(player: PlayerId, now_ms: u64) -> Self {
        Self {
            player,
            balance: 0.0,
            budget: CASHOUT_DEFAULT_VALUE,
            last_major_cashout_ms: now_ms,
            max_value: CASHOUT_DEFAULT_VALUE,
        }
    }

    pub fn credit(&mut self, amount: f64) -> Result<(), EntityError> {
        self.balance += ensure_amount(amount)?;
        Ok(())
    }

    pub fn debit(&mut self, amount: f64) -> Result<(), EntityError> {
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
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub player: PlayerId,
    pub gold: u64,
    pub fish: u64,
    pub powder: u64,
}

impl Inventory {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            gold: 0,
            fish: 0,
            powder: 0,
        }
    }

    pub fn record_catch(&mut self) {
        self.gold = self.gold.saturating_add(1);
        self.fish = self.fish.saturating_add(1);
    }

    pub fn add_powder(&mut self, amount: u64) {
        self.powder = self.powder.saturating_add(amount);
    }
}

/// The closest player ranked above someone on the overall XP board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rival {
    pub display_name: String,
    pub rank: u64,
    /// XP needed to draw level with the rival.
    pub xp_gap: u64,
}

/// Position on the overall XP board. Equal XP shares a rank, as in SQL `RANK()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Standing {
    pub rank: u64,
    pub xp: u64,
    /// `None` for the top fisher.
    pub above: Option<Rival>,
}

impl Standing {
    /// Ranks `player` among `players`. Returns `None` if the player is absent.
    ///
    /// When several players tie directly above, the rival is the one with the
    /// smallest id so the answer does not depend on iteration order.
    pub fn rank(players: &[Player], player: &PlayerId) -> Option<Self> {
        let me = players.iter().find(|p| &p.id == player)?;
        let rank_of = |xp: u64| 1 + players.iter().filter(|other| other.xp > xp).count() as u64;
        let above = players
            .iter()
            .filter(|other| other.xp > me.xp)
            .min_by(|a, b| a.xp.cmp(&b.xp).then_with(|| a.id.cmp(&b.id)))
            .map(|rival| Rival {
                display_name: rival.display_name.clone(),
                rank: rank_of(rival.xp),
                xp_gap: rival.xp - me.xp,
            });
        Some(Self {
            rank: rank_of(me.xp),
            xp: me.xp,
            above,
        })
    }
}

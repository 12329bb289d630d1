use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    EntityError, PlayerId, RodId, LOTTERY_ALACRITY_CHARGES, LOTTERY_WORMS, STARTING_SMALL_WORMS,
};

/// Bait tiers. Better worms shorten the cast cooldown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WormTier {
    Small = 1,
    Tasty = 2,
    Enchanted = 3,
    Magic = 4,
}

impl WormTier {
    pub const ALL: [WormTier; 4] = [
        WormTier::Small,
        WormTier::Tasty,
        WormTier::Enchanted,
        WormTier::Magic,
    ];

    pub fn from_code(code: u8) -> Result<Self, EntityError> {
        match code {
            1 => Ok(Self::Small),
            2 => Ok(Self::Tasty),
            3 => Ok(Self::Enchanted),
            4 => Ok(Self::Magic),
            other => Err(EntityError::UnknownWormTier(other)),
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Slot of this tier in [`Rod::worms`].
    pub fn index(self) -> usize {
        self as usize - 1
    }

    /// Base cast cooldown before any speed boost.
    pub fn cooldown_secs(self) -> u64 {
        match self {
            Self::Small => 75,
            Self::Tasty => 60,
            Self::Enchanted => 45,
            Self::Magic => 30,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Small => "Small Worms",
            Self::Tasty => "Tasty Worms",
            Self::Enchanted => "Enchanted Worms",
            Self::Magic => "Magic Worms",
        }
    }

    /// Parses the `small_worms` style names used by the shop endpoints.
    pub fn from_shop_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "small_worms" | "small" => Some(Self::Small),
            "tasty_worms" | "tasty" => Some(Self::Tasty),
            "enchanted_worms" | "enchanted" => Some(Self::Enchanted),
            "magic_worms" | "magic" => Some(Self::Magic),
            _ => None,
        }
    }
}

impl fmt::Display for WormTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Rod models. The tier fixes the base XP earned per cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RodTier {
    Beginner = 1,
    Pro = 2,
    Enchanted = 3,
    Magic = 4,
    Shark = 5,
    Competition1 = 6,
    Competition2 = 7,
}

impl RodTier {
    pub fn from_code(code: u8) -> Result<Self, EntityError> {
        match code {
            1 => Ok(Self::Beginner),
            2 => Ok(Self::Pro),
            3 => Ok(Self::Enchanted),
            4 => Ok(Self::Magic),
            5 => Ok(Self::Shark),
            6 => Ok(Self::Competition1),
            7 => Ok(Self::Competition2),
            other => Err(EntityError::UnknownRodTier(other)),
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn base_xp(self) -> u64 {
        match self {
            Self::Beginner => 1,
            Self::Pro => 2,
            Self::Enchanted => 4,
            Self::Magic | Self::Shark => 8,
            Self::Competition1 => 10,
            Self::Competition2 => 12,
        }
    }
}

/// A fishing rod and the consumables loaded on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rod {
    pub id: RodId,
    pub owner: PlayerId,
    /// Worm counts indexed by [`WormTier`] (small, tasty, enchanted, magic).
    pub worms: [u32; 4],
    pub alacrity_charges: u32,
    pub tier: RodTier,
    pub selected_worm: WormTier,
}

impl Rod {
    /// A freshly registered beginner rod with the starter bait pack.
    pub fn new(id: RodId, owner: PlayerId) -> Self {
        Self {
            id,
            owner,
            worms: [STARTING_SMALL_WORMS, 0, 0, 0],
            alacrity_charges: 0,
            tier: RodTier::Beginner,
            selected_worm: WormTier::Small,
        }
    }

    pub fn is_owned_by(&self, player: &PlayerId) -> bool {
        &self.owner == player
    }

    pub fn worms(&self, tier: WormTier) -> u32 {
        self.worms[tier.index()]
    }

    pub fn add_worms(&mut self, tier: WormTier, count: u32) {
        let slot = &mut self.worms[tier.index()];
        *slot = slot.saturating_add(count);
    }

    pub fn has_alacrity(&self) -> bool {
        self.alacrity_charges > 0
    }

    /// Spends one worm of the selected tier and one alacrity charge if any is left.
    pub fn consume_cast(&mut self) -> Result<(), EntityError> {
        let tier = self.selected_worm;
        let slot = &mut self.worms[tier.index()];
        if *slot == 0 {
            return Err(EntityError::OutOfWorms { tier });
        }
        *slot -= 1;
        self.alacrity_charges = self.alacrity_charges.saturating_sub(1);
        Ok(())
    }

    /// Lottery bonus: extra worms of whatever tier is currently selected.
    pub fn grant_lottery_worms(&mut self) {
        self.add_worms(self.selected_worm, LOTTERY_WORMS);
    }

    pub fn grant_lottery_alacrity(&mut self) {
        self.alacrity_charges = self.alacrity_charges.saturating_add(LOTTERY_ALACRITY_CHARGES);
    }
}

use serde::{Deserialize, Serialize};

use super::EntityError;

/// Entries in this class are eligible on every draw.
pub const COMMON_CLASS: &str = "Common";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FishEntry {
    pub name: String,
    pub base_value: f64,
    pub class: String,
}

/// A probability class. Its fish are eligible when the draw falls under `threshold`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityClass {
    pub name: String,
    pub threshold: f64,
}

/// Static reference data the reward drawer samples from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FishCatalog {
    pub fish: Vec<FishEntry>,
    pub classes: Vec<ProbabilityClass>,
}

impl FishCatalog {
    pub fn threshold(&self, class: &str) -> Option<f64> {
        self.classes
            .iter()
            .find(|candidate| candidate.name == class)
            .map(|candidate| candidate.threshold)
    }

    /// Whether `entry` may be caught for a draw of `probability`.
    pub fn is_eligible(&self, entry: &FishEntry, probability: f64) -> bool {
        if entry.class == COMMON_CLASS {
            return true;
        }
        self.threshold(&entry.class)
            .is_some_and(|threshold| probability < threshold)
    }

    /// A catalog must always have something to catch.
    pub fn validate(&self) -> Result<(), EntityError> {
        if !self.fish.iter().any(|entry| entry.class == COMMON_CLASS) {
            return Err(EntityError::NoCommonFish);
        }
        Ok(())
    }
}

impl Default for FishCatalog {
    fn default() -> Self {
        let fish = |name: &str, base_value: f64, class: &str| FishEntry {
            name: name.to_string(),
            base_value,
            class: class.to_string(),
        };
        let class = |name: &str, threshold: f64| ProbabilityClass {
            name: name.to_string(),
            threshold,
        };
        Self {
            fish: vec![
                fish("Minnow", 0.5, COMMON_CLASS),
                fish("Perch", 0.75, COMMON_CLASS),
                fish("Trout", 1.0, COMMON_CLASS),
                fish("Salmon", 2.0, "Uncommon"),
                fish("Pike", 3.0, "Uncommon"),
                fish("Sturgeon", 8.0, "Rare"),
                fish("Golden Koi", 25.0, "Legendary"),
            ],
            classes: vec![
                class(COMMON_CLASS, 1.0),
                class("Uncommon", 0.3),
                class("Rare", 0.08),
                class("Legendary", 0.01),
            ],
        }
    }
}

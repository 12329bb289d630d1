use fishhunt_types::{FishCatalog, FishEntry};
use rand::seq::SliceRandom;
use rand::Rng;

/// The fish drawn for a cast, before it is settled.
#[derive(Clone, Debug, PartialEq)]
pub struct FishCatch {
    pub name: String,
    pub base_value: f64,
    pub multiplier: f64,
}

impl FishCatch {
    pub fn multiplied_value(&self) -> f64 {
        self.base_value * self.multiplier
    }
}

/// Draws one fish for a buoy with the given multiplier.
///
/// A single uniform probability decides which classes are open: Common fish
/// always are, other classes only when the draw falls under their threshold.
/// One eligible entry is then picked uniformly. Returns `None` only for a
/// catalog without Common fish, which config validation rules out.
pub fn draw_fish<R: Rng + ?Sized>(
    catalog: &FishCatalog,
    multiplier: f64,
    rng: &mut R,
) -> Option<FishCatch> {
    let probability: f64 = rng.gen();
    let eligible: Vec<&FishEntry> = catalog
        .fish
        .iter()
        .filter(|entry| catalog.is_eligible(entry, probability))
        .collect();
    let entry = eligible.choose(rng)?;
    Some(FishCatch {
        name: entry.name.clone(),
        base_value: entry.base_value,
        multiplier,
    })
}

/// Settled casts allowed per (buoy, actor) before the pair is spooked.
pub const CAST_LIMIT: u32 = 51;

/// Length of the spook lock and of the cashout quota window.
pub const MILLISECONDS_IN_DAY: u64 = 24 * 60 * 60 * 1000;

/// Fraction of every settled fish value diverted into the buoy fishpot.
pub const FISHPOT_RATE: f64 = 0.01;

/// Probability that a cast attempt pays the buoy fishpot instead of a fish.
pub const JACKPOT_RATE: f64 = 0.01;

/// Fishpot must hold at least this much before a jackpot can fire.
pub const FISHPOT_MINIMUM: f64 = 30.0;

/// Probability that a single lottery draw awards anything.
pub const FISH_LOTTERY_RATE: f64 = 0.2;

/// Cooldown multiplier applied while a rod has alacrity charges.
pub const ALACRITY_BOOST_FACTOR: f64 = 0.85;

/// Default daily cashout cap for a new account.
pub const CASHOUT_DEFAULT_VALUE: f64 = 300.0;

/// XP multiplier applied on Saturdays and Sundays.
pub const WEEKEND_XP_MULTIPLIER: u64 = 3;

/// Worms granted to a newly registered rod.
pub const STARTING_SMALL_WORMS: u32 = 100;

// Lottery rewards
pub const LOTTERY_WORMS: u32 = 2;
pub const LOTTERY_ALACRITY_CHARGES: u32 = 5;
pub const LOTTERY_POWDER: u64 = 1;
pub const LOTTERY_XP: u64 = 2;

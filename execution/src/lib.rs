//! Fishhunt cast admission and economy settlement.
//!
//! This crate decides whether a player may cast right now, settles the fish
//! it lands across every entity a cast touches, pays buoy jackpots, and gates
//! cashouts behind a rolling daily quota.
//!
//! ## Storage model
//! - The ledger ([`State`]) is authoritative. Every multi-entity mutation is
//!   staged on a [`Layer`] and reaches the ledger as one `apply`, so a refused
//!   cast leaves nothing behind.
//! - The cache ([`CastCache`]) is advisory. It only throttles cast cadence and
//!   never holds balances; losing it forces the ledger path and nothing else.
//!
//! The primary entrypoint is [`Engine`].
//!
//! ## Casting (example)
//! ```rust,ignore
//! # #[cfg(feature = "mocks")]
//! # {
//! use fishhunt_execution::{
//!     mocks::{ManualClock, MemoryCache, World},
//!     CastOutcome, EconomyConfig, Engine,
//! };
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), fishhunt_execution::EngineError> {
//! let world = World::new(100.0, 0);
//! let clock = Arc::new(ManualClock::new(0));
//! let engine = Engine::new(
//!     world.memory(),
//!     MemoryCache::new(clock.clone()),
//!     clock,
//!     EconomyConfig::default(),
//! );
//! let mut rng = StdRng::seed_from_u64(0);
//! match engine
//!     .cast(&world.buoy.id, &world.rod.id, &world.player.id, &mut rng)
//!     .await?
//! {
//!     CastOutcome::Settled(result) => println!("caught {}", result.fish.name),
//!     CastOutcome::JackpotPaid(payout) => println!("jackpot {}", payout.amount),
//!     CastOutcome::Rejected(rejection) => println!("refused: {rejection:?}"),
//! }
//! # Ok(())
//! # }
//! # }
//! ```

pub mod admission;
pub mod cache;
pub mod cashout;
pub mod clock;
pub mod config;
pub mod engine;
pub mod jackpot;
pub mod layer;
pub mod lottery;
pub mod outcome;
pub mod reward;
pub mod settlement;
pub mod state;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use cache::{CastCache, CounterEntry};
pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, EconomyConfig, LotteryWeights, SpookRearm};
pub use engine::Engine;
pub use layer::Layer;
pub use lottery::LotteryOutcome;
pub use outcome::{
    CashoutOutcome, CastOutcome, EngineError, JackpotPayout, Rejection, SettlementResult,
};
pub use reward::FishCatch;
#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;
pub use state::{State, Status};

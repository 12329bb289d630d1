//! HTTP backend for fishhunt: wires the [`fishhunt_execution::Engine`] to a
//! SQLite ledger and a Redis cast cache behind an axum router.

pub mod api;
pub mod cache;
pub mod ledger;
pub mod render;

pub use api::{Api, Envelope};
pub use cache::RedisCache;
pub use ledger::{Fixtures, SqliteLedger};

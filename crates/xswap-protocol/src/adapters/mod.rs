//! # Adapters Layer (Hexagonal Architecture)
//!
//! Reference implementations of the outbound ports: a simulated ledger,
//! trade stores and clocks.

mod in_memory_ledger;
mod time;
mod trade_store;

pub use in_memory_ledger::InMemoryLedger;
pub use time::{ManualClock, SystemTimeSource};
pub use trade_store::{FileTradeStore, InMemoryTradeStore};

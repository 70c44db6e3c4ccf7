//! Persistence layer for the storefront checkout core.
//!
//! Exposes three narrow traits ([`InventoryStore`], [`AddressStore`], and
//! [`OrderStore`]) whose mutating operations are all conditional updates:
//! the state check and the write are one atomic step, never a read followed
//! by a separate write. Two implementations are provided:
//!
//! - [`InMemoryStore`] for tests and default wiring
//! - [`PostgresStore`] backed by sqlx, where the conditions become
//!   `UPDATE … WHERE` clauses checked via `rows_affected`

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{
    AddressStore, InventoryStore, OrderStore, ReserveOutcome, StorefrontStore, TransitionOutcome,
};

//! # Domain Module
//!
//! Core domain types for the swap engine: the trade record, statuses,
//! party keys, the preimage, errors and business rules.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod keys;
pub mod secure_secret;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use keys::{verify_signature, PartyIdentity, PartyKey};
pub use secure_secret::SecureSecret;
pub use value_objects::*;

//! # Algorithms Module
//!
//! Pure protocol logic: secrets, timelock planning and status derivation.

pub mod secret;
pub mod status;
pub mod timelocks;

pub use secret::{
    create_commitment, generate_random_secret, new_secret_pair, verify_refund, verify_secret,
};
pub use status::{derive_status, Derivation, EnvelopeObservation, LegObservation, Observation};
pub use timelocks::{calculate_timelocks, validate_swap_timelocks};

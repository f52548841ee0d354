//! Common types used across the application.

pub mod amount;
pub mod id;

pub use amount::{
    CENT_SCALE, LenientAmount, STORAGE_LIMIT, fits_storage, floor_cents, parse_lenient, round_cents,
};
pub use id::*;

//! Core business logic for budgetlock.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Domain types, validation rules and calculations live here; persistence and
//! the ledger are reached through the traits in [`budget::service`].
//!
//! # Modules
//!
//! - `budget` - Monthly distribution, hierarchy aggregation, quarter locks,
//!   actuals reconciliation and scenario metadata

pub mod budget;

//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod ledger;
pub mod scenario;

pub use ledger::LedgerActualsRepository;
pub use scenario::ScenarioRepository;

//! Pure domain rules for the ticket system: who may do what, which
//! inputs are acceptable, and how ticket status moves. No I/O lives
//! here — handlers pass an explicit [`policy::Actor`] in, so every rule
//! is testable without a running server or database.

pub mod error;
pub mod lifecycle;
pub mod policy;
pub mod validate;

pub use error::{Error, Result};

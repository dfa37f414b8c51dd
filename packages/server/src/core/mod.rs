//! Pure domain logic: no database handles, no clocks of its own.
//!
//! Handlers load rows, translate them into the plain types here, and feed in
//! `Utc::now()` explicitly. Everything in this module is deterministic and
//! unit-tested in isolation.

pub mod lifecycle;
pub mod standings;

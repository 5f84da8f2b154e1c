//! Pure business rules.
//!
//! Everything in here works on in-memory snapshots with the current time
//! passed in, so services decide what gets loaded and persisted.

pub mod approval;
pub mod lockout;
pub mod ordering;
pub mod pricing;
pub mod sequence;
pub mod subscription;

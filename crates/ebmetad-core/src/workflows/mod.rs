//! # Workflows Module
//!
//! High-level entry points that tie the [`crate::core`] records and the
//! [`crate::engine`] computations into complete EBMetaD procedures.
//!
//! - **Setup** ([`setup`]) prepares one ensemble member: derives restraint
//!   parameters, restores sampling history and persists the run configuration.
//!   [`setup::rebias`] recomputes force tables of an existing member.
//! - **Sweep** ([`sweep`]) builds force tables over a grid of `w`/`sigma` values.
//! - **Analysis** ([`analyze`]) compares replica sampling against the
//!   experimental distributions.
//!
//! Every workflow reports its phases through a
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter).

pub mod analyze;
pub mod setup;
pub mod sweep;

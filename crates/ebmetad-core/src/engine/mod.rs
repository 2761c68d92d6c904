//! # Engine Module
//!
//! Stateful layer of an EBMetaD run: the parameters of one ensemble member as
//! they evolve, the ingestion of sampled-distance histograms, and the
//! convergence analysis that compares them against experiment.
//!
//! ## Architecture
//!
//! - **Run Parameters** ([`run_data`]) - General and per-pair parameters, routed by key,
//!   with lossless dictionary (de)serialization
//! - **Restraint Window** ([`boundary`]) - Distance bounds outside which a restraint is inactive
//! - **Count Logs** ([`counts`]) - Per-replica sampling histograms read from an ensemble directory
//! - **Convergence** ([`analysis`]) - Smoothed replica distributions and Jensen-Shannon divergences
//! - **Configuration** ([`config`]) - Validated run and analysis settings
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Engine error type aggregating the lower layers
//!
//! Replicas and pairs share no mutable state; the only shared input, the
//! [`crate::core::pairs::PairRegistry`], is read-only.

pub mod analysis;
pub mod boundary;
pub mod config;
pub mod counts;
pub mod error;
pub mod progress;
pub mod run_data;

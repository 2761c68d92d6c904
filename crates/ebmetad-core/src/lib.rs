//! # EBMetaD Core Library
//!
//! Experiment-biased metadynamics (EBMetaD) support: restraint bookkeeping,
//! force-table construction and convergence analysis for ensembles of
//! molecular dynamics replicas restrained to experimental distance
//! distributions.
//!
//! ## Layout
//!
//! - **[`core`]: Records and numerics.** Schema-checked metadata records, the
//!   experimental pair registry, force-table construction and the
//!   smoothing/divergence statistics.
//!
//! - **[`engine`]: Run state.** The aggregated run parameters with their
//!   general/pair routing, restraint boundaries, replica count ingest,
//!   convergence records, configuration and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Complete procedures such as preparing
//!   an ensemble member, sweeping bias parameters and analysing convergence.

pub mod core;
pub mod engine;
pub mod workflows;

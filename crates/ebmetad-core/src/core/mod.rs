//! # Core Module
//!
//! Stateless data models and numerical primitives for EBMetaD restraints.
//!
//! ## Overview
//!
//! Everything in this module is a pure function of its inputs. The stateful
//! pieces of a run (parameters that evolve as the bias is re-tuned, analysis
//! results accumulated across replicas) live in [`crate::engine`].
//!
//! - **Records** ([`metadata`]) - Named key-value stores with declared required keys,
//!   and the [`metadata::Record`] trait that turns them into typed structs
//! - **Target Distributions** ([`pairs`]) - Restrained residue pairs and the registry that loads them
//! - **Bias Construction** ([`force_table`]) - The EBMetaD force table and effective-volume prefactor
//! - **Statistics** ([`statistics`]) - Gaussian smoothing, normalization and Jensen-Shannon divergence
//!
//! ## Usage
//!
//! ```ignore
//! use ebmetad::core::pairs::PairRegistry;
//!
//! let registry = PairRegistry::load(Path::new("pair_data.json"))?;
//! let pair = registry.by_name("052_210")?;
//! let table = pair.build_force_table(10.0, 0.2)?;
//! ```

pub mod force_table;
pub mod metadata;
pub mod pairs;
pub mod statistics;

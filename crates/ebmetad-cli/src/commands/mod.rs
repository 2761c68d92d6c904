pub mod analyze;
pub mod collect;
pub mod rebias;
pub mod setup;
pub mod sweep;

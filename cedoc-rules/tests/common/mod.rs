//! Test infrastructure for the document rules
//!
//! Provides fixture loading, stochastic document generation, and session helpers.

#![allow(dead_code)]

mod loader;
mod harness;
mod generators;

#[allow(unused_imports)]
pub use loader::{TestCase, EventSpec, load_fixtures_by_name};
#[allow(unused_imports)]
pub use harness::{run_test, run_with_variations, run_events, run_specs, error_kind, Outcome};
#[allow(unused_imports)]
pub use generators::Gen;

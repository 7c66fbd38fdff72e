//! # DA Dispersal Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/   # End-to-end dispersal scenarios
//! │   ├── dispersal_flows.rs
//! │   ├── authority_routing.rs
//! │   ├── certificates.rs
//! │   └── telemetry.rs
//! └── benches/           # Encoding and evaluation throughput
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p da-tests
//!
//! # By area
//! cargo test -p da-tests integration::dispersal_flows
//!
//! # Benchmarks
//! cargo bench -p da-tests
//! ```

pub mod fixtures;
pub mod integration;

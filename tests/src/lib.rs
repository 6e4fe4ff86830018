//! # Pulse Test Suite
//!
//! Unified test crate for cross-crate flows:
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── pipeline.rs        # bus → bridge → replay → filter chains
//!     └── manager_flows.rs   # lifecycle manager over the live bus
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pulse-tests
//! cargo test -p pulse-tests integration::
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;

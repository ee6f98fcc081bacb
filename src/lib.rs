//! idxtrack: custom equity index construction and tracking.
//!
//! Screens a universe (high volatility & valuation, six-month momentum or
//! country), cap-weights the constituents, tracks and stitches the basket
//! across rebalancing periods and reports performance against the universe
//! benchmark.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;

//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod factor;
pub mod fx;
pub mod index_config;
pub mod index_series;
pub mod market_data;
pub mod metrics;
pub mod period;
pub mod pipeline;
pub mod price_panel;
pub mod qualitative;
pub mod screen;
pub mod sheet;
pub mod weights;

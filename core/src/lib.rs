//! ROI projections for invoice-processing automation.
//!
//! `engine` is the pure calculation. `store` persists named scenarios,
//! `report` renders PDF summaries, and `service` wires the three together
//! behind explicit handles.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod report;
pub mod service;
pub mod store;
pub mod types;

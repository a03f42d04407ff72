//! JNR Core - Domain models, configuration, and ports
//!
//! This crate contains the domain types and port definitions shared by the
//! emission pipeline crates.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{JnrError, PipelineStage, Result, StageContext};

//! Recruiting core: application lifecycle, interview evaluation, and AI-assisted job matching.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

//! Controller layer: flow events, error classification, and action orchestration.

pub mod events;
pub mod orchestration;

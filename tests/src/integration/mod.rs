//! Cross-crate integration flows.

pub mod manager_flows;
pub mod pipeline;

//! Host-facing command contract and stdio bridge for the planner front end.

pub mod channel;
pub mod contract;
pub mod handler;
pub mod stdio;

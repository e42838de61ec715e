//! Port traits implemented by the adapters.

pub mod config_port;
pub mod query_port;

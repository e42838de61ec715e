//! marketpanel — typed panel data model for financial market data.
//!
//! Hexagonal architecture: the data model and its projections in [`domain`],
//! port traits in [`ports`], database/file implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;

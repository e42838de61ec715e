//! Core data model: labeled tables and the three indexed containers.

pub mod bar;
pub mod cross_section;
pub mod error;
pub mod market;
pub mod panel;
pub mod table;
pub mod time_series;

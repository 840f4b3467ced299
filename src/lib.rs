//! Display settings and viewport coordinate handling for a sequence viewer.

pub mod color;
pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod persist;
pub mod sequence_table;
pub mod settings;
pub mod tasks;
pub mod viewport;
pub mod visualization;
pub mod zoom;

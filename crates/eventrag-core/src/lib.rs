#![deny(unused_variables)]

pub mod chunker;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod traits;
pub mod types;

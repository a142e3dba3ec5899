pub mod client;
pub mod config;
pub mod emit;
pub mod metrics_server;
pub mod observability;
pub mod parsers;
pub mod resolver;
pub mod status;

pub use status::{PhaseReading, ShellyStatus};

pub mod chart;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod logging;
pub mod page;
pub mod scrap;
pub mod server;
pub mod stats;

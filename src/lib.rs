pub mod analysis;
pub mod config;
pub mod net;
pub mod options;
pub mod report;
pub mod server;
pub mod utils;

pub mod config;
pub mod logging;

pub mod downloader;
pub mod progress;
pub mod queue;
pub mod request;
pub mod transport;
pub mod worker;

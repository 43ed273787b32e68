pub mod adf;
pub mod aggregate;
pub mod audit;
pub mod cli;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod fetch;
pub mod load_config;
pub mod publish;
pub mod render;
pub mod report;
pub mod resolve;
pub mod restore;
pub mod storage;

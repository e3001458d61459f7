pub mod agent;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod workflow;

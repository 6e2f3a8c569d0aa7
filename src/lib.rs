pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod orders;
pub mod paper;
pub mod reconcile;
pub mod signals;
pub mod stops;
pub mod supervisor;
pub mod types;
pub mod venue;

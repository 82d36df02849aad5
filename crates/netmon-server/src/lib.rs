//! Server wiring: configuration, the manager that fronts every alerting
//! operation, and seed-file bootstrap for rules and channels.

pub mod config;
pub mod error;
pub mod manager;
pub mod seed;

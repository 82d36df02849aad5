//! Rule evaluation engine.
//!
//! [`engine::AlertEngine`] turns rule definitions plus the latest device
//! data into alert candidates. It owns no I/O beyond the injected
//! repositories and performs no notification; persisting and dispatching
//! what it returns is the caller's job.

pub mod engine;

#[cfg(test)]
mod tests;

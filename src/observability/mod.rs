//! # Observability
//!
//! Prometheus metrics for the controller. Tracing is initialized in
//! `main.rs`; the metrics here are served by `server.rs`.

pub mod metrics;

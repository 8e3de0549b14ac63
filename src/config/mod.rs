//! # Configuration
//!
//! Controller configuration read from environment variables, which the
//! deployment populates from a ConfigMap via `envFrom`.

pub mod controller;

pub use controller::ControllerConfig;

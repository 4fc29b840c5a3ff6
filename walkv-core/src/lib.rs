//! # walkv-core
//!
//! Durability engine for walkv.
//!
//! This crate provides:
//! - The log-before-apply write path
//! - Recovery by replaying committed transactions from the WAL
//! - A fault injection hook that stops between durable log and apply
//! - Layered configuration

pub mod config;
pub mod engine;
pub mod error;
pub mod fault;
pub mod recovery;

pub use config::{Config, ConfigError};
pub use engine::Engine;
pub use error::CoreError;
pub use fault::{CrashPoint, CrashReport, FaultInjector};
pub use recovery::RecoveryReplayer;

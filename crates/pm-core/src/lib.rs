//! # pm-core
//!
//! Core types, traits, and configuration for Project Manager RS.
//!
//! This crate provides the building blocks used across the other crates:
//! - Validation error collection
//! - Core traits (Entity, Identifiable)
//! - Application configuration

pub mod config;
pub mod error;
pub mod traits;

pub use crate::config::{AppConfig, ConfigError, StoreKind};
pub use error::*;
pub use traits::*;

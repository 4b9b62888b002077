//! services/api/src/lib.rs
//!
//! The Soul Map service: provider adapters, configuration and the web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;

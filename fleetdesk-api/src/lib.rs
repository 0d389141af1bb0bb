//! # FleetDesk API Server Library
//!
//! HTTP surface of FleetDesk: the access gate, role dashboard pages and the
//! JSON actions behind them.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Access gate
//! - `routes`: Page and API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

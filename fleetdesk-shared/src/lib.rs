//! # FleetDesk Shared Library
//!
//! This crate contains the domain types, persistence and access-control logic
//! used by the FleetDesk API server.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, session tokens, session resolution, role checks
//! - `gate`: Ordered route → role table deciding allow/redirect for every request
//! - `status`: Status machine trait shared by trips, vehicles, drivers and shipments
//! - `navigation`: Role-filtered sidebar and dashboard shell
//! - `models`: Database models and their CRUD operations
//! - `db`: Connection pool and migrations
//! - `integrations`: Email sender, image-host upload signing, identity webhooks

pub mod auth;
pub mod db;
pub mod gate;
pub mod integrations;
pub mod models;
pub mod navigation;
pub mod status;

/// Current version of the FleetDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

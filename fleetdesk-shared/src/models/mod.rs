/// Database models for FleetDesk
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: Accounts and the `Role` enum that drives access control
/// - `driver`: Driver profiles with an availability status machine
/// - `client`: Client profiles owning shipments
/// - `vehicle`: Fleet vehicles with an operational status machine
/// - `trip`: Driver + vehicle journeys with the trip status machine
/// - `shipment`: Client consignments with tracking numbers
/// - `expense`: Money spent on trips and vehicles
///
/// Status types implement [`crate::status::StatusMachine`].

pub mod client;
pub mod driver;
pub mod expense;
pub mod shipment;
pub mod trip;
pub mod user;
pub mod vehicle;

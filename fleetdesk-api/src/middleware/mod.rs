/// Middleware modules for the API server
///
/// - Access gate: role-based redirects in front of every route

pub mod access_gate;

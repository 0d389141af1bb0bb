/// Clients for services FleetDesk talks to but does not own
///
/// # Modules
///
/// - `email`: Transactional email, sent fire-and-forget
/// - `uploads`: Signed upload parameters for the image host
/// - `webhook`: Verification and payloads of identity-provider lifecycle webhooks

pub mod email;
pub mod uploads;
pub mod webhook;

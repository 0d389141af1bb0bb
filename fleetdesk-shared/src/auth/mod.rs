/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing, strength rules, temporary passwords
/// - [`jwt`]: HS256 session tokens carrying the caller's role
/// - [`session`]: Resolving the caller's session from headers or the `__session` cookie
/// - [`authorization`]: Role and ownership checks performed inside actions
///
/// # Example
///
/// ```no_run
/// use fleetdesk_shared::auth::jwt::{create_token, Claims, TokenType};
/// use fleetdesk_shared::auth::password::{hash_password, verify_password};
/// use fleetdesk_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Dispatch#2026")?;
/// assert!(verify_password("Dispatch#2026", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), Some(Role::Admin), false, TokenType::Access);
/// let token = create_token(&claims, "a-secret-key-that-is-at-least-32-bytes")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod password;
pub mod session;

/// Access gate: the ordered route table every request passes through
///
/// The table maps path patterns to an access rule. Patterns are regular
/// expressions anchored to the whole path. Evaluation walks the table in
/// declaration order and applies the FIRST rule whose pattern matches:
///
/// 1. no session → sign in (`/sign-in?redirect_url=<path>`)
/// 2. session without a role → `/onboarding`
/// 3. role not allowed → that role's home (`/admin/dashboard`, ...)
/// 4. otherwise → allow
///
/// A path no rule matches passes through untouched, whatever the session.
///
/// Onboarding routes use [`RouteAccess::Onboarding`]: they are only for
/// signed-in users that still lack a role, and send everyone else home.
///
/// # Example
///
/// ```
/// use fleetdesk_shared::auth::session::Session;
/// use fleetdesk_shared::gate::{AccessTable, GateDecision};
/// use fleetdesk_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let table = AccessTable::standard()?;
/// let driver = Session {
///     user_id: Uuid::new_v4(),
///     role: Some(Role::Driver),
///     must_change_password: false,
/// };
///
/// assert_eq!(table.evaluate("/driver/dashboard", Some(&driver)), GateDecision::Allow);
/// assert_eq!(
///     table.evaluate("/admin/users", Some(&driver)),
///     GateDecision::RedirectHome(Role::Driver)
/// );
/// assert_eq!(table.evaluate("/health", None), GateDecision::Allow);
/// # Ok(())
/// # }
/// ```

use regex::Regex;

use crate::auth::session::Session;
use crate::models::user::Role;

/// Sign-in page
pub const SIGN_IN_PATH: &str = "/sign-in";

/// Role selection page
pub const ONBOARDING_PATH: &str = "/onboarding";

/// What a matching rule requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Signed in with one of these roles
    Roles(&'static [Role]),

    /// Signed in and not yet assigned a role
    Onboarding,
}

/// Outcome of evaluating a request against the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,

    /// No session; come back to `return_to` after signing in
    RedirectToSignIn { return_to: String },

    /// Signed in but no role yet
    RedirectToOnboarding,

    /// Role not allowed here; go to the role's home
    RedirectHome(Role),
}

impl GateDecision {
    /// Redirect target, or `None` for [`GateDecision::Allow`]
    pub fn location(&self) -> Option<String> {
        match self {
            GateDecision::Allow => None,
            GateDecision::RedirectToSignIn { return_to } => Some(format!(
                "{}?redirect_url={}",
                SIGN_IN_PATH,
                urlencoding::encode(return_to)
            )),
            GateDecision::RedirectToOnboarding => Some(ONBOARDING_PATH.to_string()),
            GateDecision::RedirectHome(role) => Some(role.home_path().to_string()),
        }
    }
}

/// Error building an access table
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Invalid route pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// One row of the table
#[derive(Debug, Clone)]
pub struct AccessRule {
    pattern: Regex,
    access: RouteAccess,
}

impl AccessRule {
    /// Compiles `pattern`, anchored to the whole path
    pub fn new(pattern: &str, access: RouteAccess) -> Result<Self, GateError> {
        let anchored = format!("^(?:{})$", pattern);
        let regex = Regex::new(&anchored).map_err(|source| GateError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: regex,
            access,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    pub fn access(&self) -> RouteAccess {
        self.access
    }
}

const ADMIN: &[Role] = &[Role::Admin];
const DRIVER: &[Role] = &[Role::Driver];
const CLIENT: &[Role] = &[Role::Client];
const ADMIN_OR_DRIVER: &[Role] = &[Role::Admin, Role::Driver];

/// Declaration-ordered route table of the application
pub const STANDARD_RULES: &[(&str, RouteAccess)] = &[
    ("/onboarding(/.*)?", RouteAccess::Onboarding),
    ("/api/onboarding(/.*)?", RouteAccess::Onboarding),
    ("/dashboard", RouteAccess::Roles(Role::ALL)),
    ("/admin(/.*)?", RouteAccess::Roles(ADMIN)),
    ("/api/admin(/.*)?", RouteAccess::Roles(ADMIN)),
    ("/driver(/.*)?", RouteAccess::Roles(DRIVER)),
    ("/api/driver(/.*)?", RouteAccess::Roles(DRIVER)),
    ("/client(/.*)?", RouteAccess::Roles(CLIENT)),
    ("/api/client(/.*)?", RouteAccess::Roles(CLIENT)),
    ("/api/trips(/.*)?", RouteAccess::Roles(ADMIN_OR_DRIVER)),
    ("/api/uploads(/.*)?", RouteAccess::Roles(ADMIN_OR_DRIVER)),
    ("/api/account(/.*)?", RouteAccess::Roles(Role::ALL)),
];

/// Ordered list of access rules
#[derive(Debug, Clone)]
pub struct AccessTable {
    rules: Vec<AccessRule>,
}

impl AccessTable {
    /// Builds a table from `(pattern, access)` rows, keeping their order
    pub fn new(rules: &[(&str, RouteAccess)]) -> Result<Self, GateError> {
        let rules = rules
            .iter()
            .map(|(pattern, access)| AccessRule::new(pattern, *access))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    /// The application's route table ([`STANDARD_RULES`])
    pub fn standard() -> Result<Self, GateError> {
        Self::new(STANDARD_RULES)
    }

    /// First rule matching `path`, if any
    pub fn rule_for(&self, path: &str) -> Option<&AccessRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    /// Decides what happens to a request for `path`
    pub fn evaluate(&self, path: &str, session: Option<&Session>) -> GateDecision {
        let Some(rule) = self.rule_for(path) else {
            return GateDecision::Allow;
        };

        let Some(session) = session else {
            return GateDecision::RedirectToSignIn {
                return_to: path.to_string(),
            };
        };

        match (rule.access, session.role) {
            (RouteAccess::Onboarding, None) => GateDecision::Allow,
            (RouteAccess::Onboarding, Some(role)) => GateDecision::RedirectHome(role),
            (RouteAccess::Roles(_), None) => GateDecision::RedirectToOnboarding,
            (RouteAccess::Roles(allowed), Some(role)) if allowed.contains(&role) => {
                GateDecision::Allow
            }
            (RouteAccess::Roles(_), Some(role)) => GateDecision::RedirectHome(role),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

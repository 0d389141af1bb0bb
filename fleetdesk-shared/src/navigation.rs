/// Role dashboard shells
///
/// Every role-specific page is wrapped in the same shell: a header naming the
/// page and the signed-in user, and a sidebar built from the static
/// [`NAVIGATION`] table filtered to the entries the caller's role may see.
///
/// # Example
///
/// ```
/// use fleetdesk_shared::models::user::Role;
/// use fleetdesk_shared::navigation::sidebar_for;
///
/// let links = sidebar_for(Role::Client);
/// assert!(links.iter().all(|link| !link.href.starts_with("/admin")));
/// ```

use serde::Serialize;

use crate::models::user::{Role, User};

/// One entry of the navigation table
#[derive(Debug, Clone, Copy)]
pub struct NavEntry {
    pub label: &'static str,
    pub href: &'static str,
    pub roles: &'static [Role],
}

/// Link rendered in the sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub href: &'static str,
}

/// Header of a dashboard shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellHeader {
    pub title: String,
    pub user_name: String,
    pub email: String,
}

/// Page frame shared by all role dashboards
#[derive(Debug, Clone, Serialize)]
pub struct DashboardShell {
    pub role: Role,
    pub header: ShellHeader,
    pub sidebar: Vec<NavLink>,
}

const ADMIN: &[Role] = &[Role::Admin];
const DRIVER: &[Role] = &[Role::Driver];
const CLIENT: &[Role] = &[Role::Client];

/// Sidebar entries in display order
pub const NAVIGATION: &[NavEntry] = &[
    NavEntry { label: "Overview", href: "/admin/dashboard", roles: ADMIN },
    NavEntry { label: "Users", href: "/admin/users", roles: ADMIN },
    NavEntry { label: "Drivers", href: "/admin/drivers", roles: ADMIN },
    NavEntry { label: "Vehicles", href: "/admin/vehicles", roles: ADMIN },
    NavEntry { label: "Trips", href: "/admin/trips", roles: ADMIN },
    NavEntry { label: "Shipments", href: "/admin/shipments", roles: ADMIN },
    NavEntry { label: "Expenses", href: "/admin/expenses", roles: ADMIN },
    NavEntry { label: "Overview", href: "/driver/dashboard", roles: DRIVER },
    NavEntry { label: "My Trips", href: "/driver/trips", roles: DRIVER },
    NavEntry { label: "Overview", href: "/client/dashboard", roles: CLIENT },
    NavEntry { label: "My Shipments", href: "/client/shipments", roles: CLIENT },
    NavEntry { label: "Home", href: "/dashboard", roles: Role::ALL },
];

/// Navigation links visible to `role`
pub fn sidebar_for(role: Role) -> Vec<NavLink> {
    NAVIGATION
        .iter()
        .filter(|entry| entry.roles.contains(&role))
        .map(|entry| NavLink {
            label: entry.label,
            href: entry.href,
        })
        .collect()
}

impl DashboardShell {
    /// Builds the shell for `user` viewing a page titled `title`
    ///
    /// The header falls back to the email address when the user has no name.
    pub fn new(role: Role, title: impl Into<String>, user: &User) -> Self {
        let user_name = user
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| user.email.clone());

        Self {
            role,
            header: ShellHeader {
                title: title.into(),
                user_name,
                email: user.email.clone(),
            },
            sidebar: sidebar_for(role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(name: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ops@example.com".to_string(),
            name: name.map(str::to_string),
            role: Some(Role::Admin),
            password_hash: None,
            must_change_password: false,
            external_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_sidebar_is_filtered_by_role() {
        for role in Role::ALL {
            let links = sidebar_for(*role);
            assert!(!links.is_empty());

            for link in &links {
                let entry = NAVIGATION
                    .iter()
                    .find(|entry| entry.href == link.href)
                    .unwrap();
                assert!(entry.roles.contains(role), "{} sees {}", role, link.href);
            }
        }
    }

    #[test]
    fn test_admin_sidebar() {
        let hrefs: Vec<_> = sidebar_for(Role::Admin).iter().map(|l| l.href).collect();

        assert!(hrefs.contains(&"/admin/users"));
        assert!(hrefs.contains(&"/admin/expenses"));
        assert!(!hrefs.contains(&"/driver/trips"));
    }

    #[test]
    fn test_client_sidebar_has_no_admin_links() {
        let links = sidebar_for(Role::Client);

        assert!(links.iter().all(|l| !l.href.starts_with("/admin")));
        assert!(links.iter().any(|l| l.href == "/client/shipments"));
    }

    #[test]
    fn test_shell_header() {
        let shell = DashboardShell::new(Role::Admin, "Overview", &user(Some("Ops Team")));

        assert_eq!(shell.header.title, "Overview");
        assert_eq!(shell.header.user_name, "Ops Team");
        assert_eq!(shell.header.email, "ops@example.com");
        assert_eq!(shell.sidebar, sidebar_for(Role::Admin));
    }

    #[test]
    fn test_shell_header_falls_back_to_email() {
        let shell = DashboardShell::new(Role::Admin, "Overview", &user(None));
        assert_eq!(shell.header.user_name, "ops@example.com");

        let shell = DashboardShell::new(Role::Admin, "Overview", &user(Some("  ")));
        assert_eq!(shell.header.user_name, "ops@example.com");
    }

    #[test]
    fn test_shell_serializes_role_lowercase() {
        let shell = DashboardShell::new(Role::Admin, "Overview", &user(None));
        let json = serde_json::to_value(&shell).unwrap();

        assert_eq!(json["role"], "admin");
        assert!(json["sidebar"].is_array());
    }
}

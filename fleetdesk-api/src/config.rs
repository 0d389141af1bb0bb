/// Configuration management for the API server
///
/// Configuration comes from the process environment (after loading an optional
/// `.env` file with `dotenvy`) through the `config` crate, and is mapped onto
/// a typed [`Config`].
///
/// # Environment Variables
///
/// | Variable | Default | |
/// |----------|---------|--|
/// | `API_HOST` | `0.0.0.0` | |
/// | `API_PORT` | `8080` | |
/// | `API_CORS_ORIGINS` | empty | comma-separated; empty allows any origin unless production |
/// | `API_PRODUCTION` | `false` | |
/// | `DATABASE_URL` | required | |
/// | `DATABASE_MAX_CONNECTIONS` | `10` | |
/// | `JWT_SECRET` | required | at least 32 characters |
/// | `EMAIL_API_URL`, `EMAIL_API_KEY` | unset | both set enables the HTTP email sender |
/// | `EMAIL_FROM` | `FleetDesk <noreply@fleetdesk.local>` | |
/// | `UPLOAD_CLOUD_NAME`, `UPLOAD_API_KEY`, `UPLOAD_API_SECRET` | unset | all set enables signed uploads |
/// | `IDENTITY_WEBHOOK_SECRET` | unset | enables `/api/webhooks/identity` |
///
/// # Example
///
/// ```no_run
/// use fleetdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::Deserialize;

/// Minimum accepted JWT secret length
pub const MIN_JWT_SECRET_LEN: usize = 32;

const DEFAULT_EMAIL_FROM: &str = "FleetDesk <noreply@fleetdesk.local>";

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub uploads: Option<UploadConfig>,
    pub identity: IdentityConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin outside production
    pub cors_origins: Vec<String>,

    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 signing secret (at least 32 characters)
    pub secret: String,
}

/// Email API configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Base URL and key of the email API; `None` logs emails instead
    pub api: Option<(String, String)>,
    pub from: String,
}

/// Image-host configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Identity-provider configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Webhook signing secret; `None` disables the webhook route
    pub webhook_secret: Option<String>,
}

/// Flat view of the environment, keys lowercased by the `config` crate
#[derive(Debug, Deserialize)]
struct Environment {
    #[serde(default = "default_host")]
    api_host: String,
    #[serde(default = "default_port")]
    api_port: u16,
    #[serde(default)]
    api_cors_origins: Option<String>,
    #[serde(default)]
    api_production: bool,

    database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    database_max_connections: u32,

    jwt_secret: Option<String>,

    email_api_url: Option<String>,
    email_api_key: Option<String>,
    email_from: Option<String>,

    upload_cloud_name: Option<String>,
    upload_api_key: Option<String>,
    upload_api_secret: Option<String>,

    identity_webhook_secret: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

/// Treats empty variables as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Loads configuration from `.env` and the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value does not
    /// parse, or `JWT_SECRET` is too short.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(config::Environment::default())
    }

    /// Loads configuration from an explicit environment source
    pub fn from_source(source: config::Environment) -> anyhow::Result<Self> {
        let env: Environment = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        let database_url = non_empty(env.database_url)
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = non_empty(env.jwt_secret)
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            );
        }

        let cors_origins = env
            .api_cors_origins
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let email_api = match (non_empty(env.email_api_url), non_empty(env.email_api_key)) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        };

        let uploads = match (
            non_empty(env.upload_cloud_name),
            non_empty(env.upload_api_key),
            non_empty(env.upload_api_secret),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(UploadConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host: env.api_host,
                port: env.api_port,
                cors_origins,
                production: env.api_production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: env.database_max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            email: EmailConfig {
                api: email_api,
                from: non_empty(env.email_from).unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            },
            uploads,
            identity: IdentityConfig {
                webhook_secret: non_empty(env.identity_webhook_secret),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Minimal configuration for tests
    pub fn for_tests(database_url: &str) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: Vec::new(),
                production: false,
            },
            database: DatabaseConfig {
                url: database_url.to_string(),
                max_connections: 2,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            email: EmailConfig {
                api: None,
                from: DEFAULT_EMAIL_FROM.to_string(),
            },
            uploads: Some(UploadConfig {
                cloud_name: "fleetdesk-test".to_string(),
                api_key: "test-key".to_string(),
                api_secret: "test-secret".to_string(),
            }),
            identity: IdentityConfig {
                webhook_secret: Some("test-webhook-secret".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        config::Environment::default().source(Some(map))
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/fleetdesk"),
        ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_source(source(REQUIRED)).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert!(config.api.cors_origins.is_empty());
        assert!(!config.api.production);
        assert!(config.email.api.is_none());
        assert_eq!(config.email.from, DEFAULT_EMAIL_FROM);
        assert!(config.uploads.is_none());
        assert!(config.identity.webhook_secret.is_none());
    }

    #[test]
    fn test_full_environment() {
        let mut vars = REQUIRED.to_vec();
        vars.extend_from_slice(&[
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3000"),
            ("API_CORS_ORIGINS", "https://app.example.com, https://admin.example.com"),
            ("API_PRODUCTION", "true"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("EMAIL_API_URL", "https://mail.example.com"),
            ("EMAIL_API_KEY", "mail-key"),
            ("UPLOAD_CLOUD_NAME", "fleet"),
            ("UPLOAD_API_KEY", "k"),
            ("UPLOAD_API_SECRET", "s"),
            ("IDENTITY_WEBHOOK_SECRET", "whsec_c2VjcmV0"),
        ]);

        let config = Config::from_source(source(&vars)).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(
            config.api.cors_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        assert!(config.api.production);
        assert_eq!(config.database.max_connections, 25);
        assert_eq!(
            config.email.api,
            Some(("https://mail.example.com".to_string(), "mail-key".to_string()))
        );
        assert_eq!(config.uploads.unwrap().cloud_name, "fleet");
        assert_eq!(
            config.identity.webhook_secret.as_deref(),
            Some("whsec_c2VjcmV0")
        );
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_source(source(&[("JWT_SECRET", REQUIRED[1].1)])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_short_jwt_secret() {
        let err = Config::from_source(source(&[
            ("DATABASE_URL", "postgres://localhost/fleetdesk"),
            ("JWT_SECRET", "too-short"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn test_partial_upload_config_is_disabled() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("UPLOAD_CLOUD_NAME", "fleet"));

        let config = Config::from_source(source(&vars)).unwrap();
        assert!(config.uploads.is_none());
    }
}

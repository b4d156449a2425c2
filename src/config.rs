use std::env;

const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// One year; longer lifetimes are a misconfiguration
const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    // Environment configuration
    pub environment: Environment,

    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // Browser-visible base URL (for provider redirects)
    pub public_url: String,

    // Auth0 configuration
    pub auth0_domain: String, // Normalized to https://tenant.auth0.com (no trailing slash)
    pub auth0_client_id: String,
    pub auth0_client_secret: String,
    pub auth0_redirect_uri: String,

    // Supabase (PostgREST) configuration
    pub supabase_url: String,
    pub supabase_anon_key: String,

    // Cookie configuration (None = host-only cookie, Some = domain cookie)
    pub cookie_domain: Option<String>,

    // Session lifetime, independent of the provider's token lifetime
    pub session_ttl_secs: u64,

    // HTTP client timeout configuration (in seconds)
    pub http_connect_timeout_secs: u64,
    pub http_request_timeout_secs: u64,

    // Offset applied when formatting report timestamps
    pub display_utc_offset_minutes: i32,
}

impl Config {
    /// Load configuration from environment variables using std::env::var
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (process env in production)
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        // Parse environment type
        let environment = match lookup("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        // Required variables
        let public_url = required("PUBLIC_URL")?.trim_end_matches('/').to_string();
        let auth0_domain = normalize_issuer(&required("AUTH0_DOMAIN")?);
        let auth0_client_id = required("AUTH0_CLIENT_ID")?;
        let auth0_client_secret = required("AUTH0_CLIENT_SECRET")?;
        let supabase_url = required("SUPABASE_URL")?.trim_end_matches('/').to_string();
        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;

        // Redirect URI defaults to the provider callback route under the public URL
        let auth0_redirect_uri = lookup("AUTH0_REDIRECT_URI")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{}/auth/callback/auth0", public_url));

        // Optional variables with defaults
        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let server_port = lookup("SERVER_PORT")
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(3000);

        // Cookie domain: if not set or empty, use host-only cookies (no Domain attribute)
        let cookie_domain = lookup("COOKIE_DOMAIN").filter(|s| !s.is_empty());

        let session_ttl_secs = match lookup("SESSION_TTL_SECS").filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| (1..=MAX_SESSION_TTL_SECS).contains(secs))
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "SESSION_TTL_SECS must be between 1 and {} seconds, got {:?}",
                        MAX_SESSION_TTL_SECS,
                        raw
                    )
                })?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let http_connect_timeout_secs = lookup("HTTP_CONNECT_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);

        let http_request_timeout_secs = lookup("HTTP_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let display_utc_offset_minutes = lookup("DISPLAY_UTC_OFFSET_MINUTES")
            .and_then(|s| s.parse::<i32>().ok())
            .filter(|m| m.abs() < 24 * 60)
            .unwrap_or(0);

        Ok(Config {
            environment,
            server_host,
            server_port,
            public_url,
            auth0_domain,
            auth0_client_id,
            auth0_client_secret,
            auth0_redirect_uri,
            supabase_url,
            supabase_anon_key,
            cookie_domain,
            session_ttl_secs,
            http_connect_timeout_secs,
            http_request_timeout_secs,
            display_utc_offset_minutes,
        })
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get cookie security flags based on environment
    pub fn cookie_secure_flag(&self) -> &str {
        if self.is_production() {
            "; Secure"
        } else {
            ""
        }
    }

    /// Get cookie domain attribute string (empty if host-only cookie)
    pub fn cookie_domain_attr(&self) -> String {
        match &self.cookie_domain {
            Some(domain) => format!("; Domain={}", domain),
            None => String::new(),
        }
    }

    /// Absolute browser-visible URL for a local path
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.public_url, path)
    }

    /// Session lifetime granted at sign-in
    pub fn session_lifetime(&self) -> chrono::Duration {
        i64::try_from(self.session_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Get bind address for server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Accept either `tenant.auth0.com` or a full URL; always yield `https://host` form
fn normalize_issuer(domain: &str) -> String {
    let trimmed = domain.trim().trim_end_matches('/');
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

use anyhow::Context;
use url::Url;

/// Used when `JWT_SECRET` is unset outside production.
pub const INSECURE_DEV_SECRET: &str = "wordwise-insecure-dev-secret";

/// Upper bound for `SESSION_TTL_DAYS`.
pub const MAX_SESSION_TTL_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Anything other than `production` counts as development.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "production" || v == "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_days: i64,
}

/// Admin account created at startup when it does not exist yet.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub backend_url: String,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub simulate_upstream_success: bool,
    pub category_fallback_paths: Vec<String>,
    pub admin_seed: Option<AdminSeed>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the process environment in `from_env`).
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = Environment::parse(get("APP_ENV").or_else(|| get("NODE_ENV")).as_deref());

        let port = match get("APP_PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("invalid APP_PORT {v:?}"))?,
            None => 8080,
        };

        let backend_raw = get("BACKEND_URL").unwrap_or_else(|| "http://localhost:3001".into());
        Url::parse(&backend_raw).with_context(|| format!("invalid BACKEND_URL {backend_raw:?}"))?;
        let backend_url = backend_raw.trim_end_matches('/').to_string();

        let secret = match get("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(s) => s,
            None if environment.is_production() => {
                anyhow::bail!("JWT_SECRET must be set in production")
            }
            None => INSECURE_DEV_SECRET.to_string(),
        };

        let session_ttl_days = match get("SESSION_TTL_DAYS") {
            Some(v) => {
                let days = v
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("invalid SESSION_TTL_DAYS {v:?}"))?;
                if !(1..=MAX_SESSION_TTL_DAYS).contains(&days) {
                    anyhow::bail!("SESSION_TTL_DAYS must be between 1 and {MAX_SESSION_TTL_DAYS}, got {days}");
                }
                days
            }
            None => 7,
        };

        let jwt = JwtConfig {
            secret,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "wordwise".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "wordwise-web".into()),
            session_ttl_days,
        };

        let simulate_upstream_success = !environment.is_production()
            && get("DEV_SIMULATE_UPSTREAM_SUCCESS")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false);

        let category_fallback_paths = get("CATEGORY_FALLBACK_PATHS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|p| p.starts_with('/'))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let admin_seed = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminSeed {
                    email,
                    password,
                    name: get("ADMIN_NAME").unwrap_or_else(|| "Administrator".into()),
                })
            }
            _ => None,
        };

        Ok(Self {
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            environment,
            backend_url,
            database_url: get("DATABASE_URL").filter(|v| !v.is_empty()),
            jwt,
            simulate_upstream_success,
            category_fallback_paths,
            admin_seed,
        })
    }

    /// Session cookies carry `Secure` only in production.
    pub fn cookie_secure(&self) -> bool {
        self.environment.is_production()
    }

    /// Development config pointing at the given backend, used by tests.
    #[cfg(test)]
    pub fn for_tests(backend_url: &str) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            environment: Environment::Development,
            backend_url: backend_url.trim_end_matches('/').to_string(),
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                session_ttl_days: 7,
            },
            simulate_upstream_success: false,
            category_fallback_paths: Vec::new(),
            admin_seed: None,
        }
    }
}

use std::sync::Arc;

use tracing::warn;

use crate::{
    auth::{jwt::JwtKeys, services::ensure_admin, session::SessionResolver},
    config::AppConfig,
    db,
    forward::BackendClient,
    users::{memory::InMemoryUserRepo, pg::PgUserRepo, UserRepo},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub sessions: SessionResolver,
    pub backend: BackendClient,
    pub jwt: JwtKeys,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let users: Arc<dyn UserRepo> = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url).await?;
                db::migrate(&pool).await?;
                Arc::new(PgUserRepo::new(pool))
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                Arc::new(InMemoryUserRepo::new())
            }
        };

        if let Some(seed) = &config.admin_seed {
            ensure_admin(users.as_ref(), seed).await?;
        }

        if config.simulate_upstream_success {
            warn!("DEV_SIMULATE_UPSTREAM_SUCCESS is on; user updates may report simulated success");
        }

        Self::from_parts(config, users)
    }

    pub fn from_parts(config: Arc<AppConfig>, users: Arc<dyn UserRepo>) -> anyhow::Result<Self> {
        let jwt = JwtKeys::from_config(&config.jwt);
        let sessions = SessionResolver::for_environment(config.environment, jwt.clone(), users.clone());
        let backend = BackendClient::new(&config.backend_url)?;
        Ok(Self {
            config,
            users,
            sessions,
            backend,
            jwt,
        })
    }

    #[cfg(test)]
    pub fn fake(backend_url: &str) -> Self {
        Self::fake_with_config(AppConfig::for_tests(backend_url))
    }

    #[cfg(test)]
    pub fn fake_with_config(config: AppConfig) -> Self {
        Self::from_parts(Arc::new(config), Arc::new(InMemoryUserRepo::new()))
            .expect("fake state")
    }

    /// Fake state plus a handle on its in-memory store.
    #[cfg(test)]
    pub fn fake_with_users(backend_url: &str) -> (Self, Arc<InMemoryUserRepo>) {
        let users = Arc::new(InMemoryUserRepo::new());
        let state = Self::from_parts(Arc::new(AppConfig::for_tests(backend_url)), users.clone())
            .expect("fake state");
        (state, users)
    }
}

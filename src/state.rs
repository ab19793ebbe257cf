use std::sync::Arc;

use crate::auth::{jwt::TokenService, password::PasswordHasher, services::AuthService};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::from_config(config)
    }

    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(&config.password)?;
        let tokens = TokenService::new(&config.jwt);
        Ok(Self {
            config: Arc::new(config),
            auth: Arc::new(AuthService::new(hasher, tokens)?),
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{HashConfig, JwtConfig};

        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: "test".into(),
                ttl_minutes: 60,
            },
            password: HashConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
        };
        Self::from_config(config).expect("fake state")
    }
}

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::{
    auth::{
        jwt::TokenService,
        repo::{PgUserStore, UserStore},
    },
    config::AppConfig,
    memory::{MemoryNoteStore, MemoryUserStore},
    notes::repo::{NoteStore, PgNoteStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub notes: Arc<dyn NoteStore>,
    pub tokens: TokenService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let users: Arc<dyn UserStore>;
        let notes: Arc<dyn NoteStore>;
        match config.database_url.as_deref() {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                info!("using postgres stores");
                users = Arc::new(PgUserStore::new(db.clone()));
                notes = Arc::new(PgNoteStore::new(db));
            }
            None => {
                warn!("DATABASE_URL not set; data lives in memory and is lost on restart");
                users = Arc::new(MemoryUserStore::default());
                notes = Arc::new(MemoryNoteStore::default());
            }
        }

        Ok(Self::from_parts(config, users, notes))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        notes: Arc<dyn NoteStore>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt);
        Self {
            config,
            users,
            notes,
            tokens,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
            },
            conceal_forbidden: false,
            listen_addr: ([127, 0, 0, 1], 0).into(),
        });
        Self::from_parts(
            config,
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryNoteStore::default()),
        )
    }
}

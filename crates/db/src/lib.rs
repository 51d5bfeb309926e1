use std::{path::Path, str::FromStr};

use sqlx::{
    Error, Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub mod models;

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open (or create) the SQLite database at `path` and run pending migrations.
    pub async fn new(path: impl AsRef<Path>) -> Result<DBService, Error> {
        let database_url = format!("sqlite://{}", path.as_ref().to_string_lossy());
        let options = SqliteConnectOptions::from_str(&database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database ready at {}", path.as_ref().display());
        Ok(DBService { pool })
    }

    /// Private in-memory database, used by tests across the workspace.
    ///
    /// Every call yields an isolated database: the pool holds exactly one
    /// connection that is never recycled, so the schema lives as long as the pool.
    pub async fn new_in_memory() -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(DBService { pool })
    }
}

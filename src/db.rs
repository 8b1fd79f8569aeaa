use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::{
    pooled_connection::AsyncDieselConnectionManager, AsyncPgConnection,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde::Deserialize;

pub type DbConnection =
    deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

pub type DbConnectionPool = deadpool::managed::Pool<
    AsyncDieselConnectionManager<diesel_async::AsyncPgConnection>,
>;

fn default_db_port() -> i32 {
    5432
}

#[derive(Deserialize)]
pub struct DbConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: i32,
    pub user: String,
    pub password: String,
    pub database: String,
}

pub async fn create_pool(config: DbConfig) -> DbConnectionPool {
    let config_string = format!(
        "host={} port={} user={} password={} dbname={}",
        config.host, config.port, config.user, config.password, config.database,
    );
    let manager =
        AsyncDieselConnectionManager::<diesel_async::AsyncPgConnection>::new(
            config_string,
        );
    Pool::builder(manager).build().unwrap()
}

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub async fn run_migrations(
    conn: AsyncPgConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut wrapper: AsyncConnectionWrapper<AsyncPgConnection> = conn.into();
    tokio::task::spawn_blocking(
        move || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            wrapper.run_pending_migrations(MIGRATIONS)?;
            Ok(())
        },
    )
    .await?
}

use std::sync::Arc;

use cocher::config::Config;
use cocher::db::PgStore;
use cocher::engine::Engine;
use cocher::error::Error;
use cocher::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let store = PgStore::new(&config.database_url, config.database_max_connections).await?;
    let engine = Engine::new(
        Arc::new(store),
        config.session_ttl,
        config.feed_poll_interval,
    )?;

    if let Some(admin) = &config.admin {
        engine.seed_admin(&admin.email, &admin.password).await?;
    }

    serve(engine, config.bind_address).await
}

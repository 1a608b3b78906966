use anyhow::Result;
use newsfeed::utils::logs::{log_db_ready, log_init};
use newsfeed::{configure_connection, establish_pool, run_migrations, DieselFollowGraph, FanoutWorker};
use std::sync::Arc;
use tracing::subscriber::set_global_default;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("newsfeed=info".parse()?))
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        );
    set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "newsfeed.db".to_string());

    log_init(&database_url);

    let pool = establish_pool(&database_url);
    {
        let mut conn = pool.get().expect("Failed to get initial connection");
        configure_connection(&mut conn).expect("Failed to configure SQLite connection");
        run_migrations(&mut conn);
    }
    log_db_ready();

    let graph = Arc::new(DieselFollowGraph::new(pool.clone()));
    let _worker = FanoutWorker::spawn(pool, graph);

    tokio::signal::ctrl_c().await?;

    Ok(())
}

//! HemoLink server binary.

use hemolink_common::logging::{self, LogConfig};
use hemolink_server::{api, config::Config, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut log_config = LogConfig::from_env()?;
    if log_config.filter_directives.is_none() {
        log_config.filter_directives = Some(
            "hemolink_server=debug,tower_http=debug,axum=trace,sqlx=info".to_string(),
        );
    }
    logging::init_logging(&log_config)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting hemolink server"
    );

    let config = Config::load()?;

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("database ready");

    api::serve(config, pool).await
}

//! coupon-rs: Coupon redemption server

use clap::Parser;
use coupon_rs::api::ApiServer;
use coupon_rs::coupon::{CouponRegistry, QuotaEngine};
use coupon_rs::CouponConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "coupon-rs")]
#[command(about = "Coupon redemption server with usage quotas", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the configuration
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = CouponConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
        config.validate()?;
    }

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("coupon_rs={},tower_http=info", config.logging.level).into());
    let subscriber = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting coupon-rs v{}", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", config.server.listen_addr);
    info!("  Default limits: {:?}", config.limits);

    let registry = Arc::new(CouponRegistry::new(config.limits));

    if config.retention.interval_secs > 0 {
        registry.clone().start_retention_task(
            config.retention.weeks,
            Duration::from_secs(config.retention.interval_secs),
        );
    }

    let server = ApiServer::new(QuotaEngine::new(registry), config.server.listen_addr.clone());
    server.run().await?;

    Ok(())
}

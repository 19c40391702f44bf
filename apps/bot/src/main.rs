use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use bot::{AppContext, config::Config, daily, line::LineClient, server};
use chrono_tz::Tz;
use stock::{ChartRenderer, JsonFileStore, PriceClient, RedisStore, SubscriberStore};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Digest pushes at 11:00 and 17:30 local time
const PUSH_SCHEDULES: [&str; 2] = ["0 0 11 * * *", "0 30 17 * * *"];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(version = %config.version, "starting stock bot");

    let subscribers: Arc<dyn SubscriberStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisStore::new(url, config.redis_key_prefix.clone())
                .await
                .context("init redis subscriber store failed")?,
        ),
        None => {
            info!(path = %config.subscribers_file.display(), "using json subscriber store");
            Arc::new(JsonFileStore::new(&config.subscribers_file))
        }
    };
    let market = Arc::new(PriceClient::new(config.http_timeout).context("init price client failed")?);
    let messenger = Arc::new(
        LineClient::new(
            config.line_api_base.clone(),
            &config.channel_access_token,
            config.http_timeout,
        )
        .context("init line client failed")?,
    );

    let ctx = Arc::new(AppContext {
        charts: ChartRenderer::new(&config.chart_dir),
        config,
        market,
        subscribers,
        messenger,
    });

    let mut sched = JobScheduler::new().await?;
    schedule_pushes(&sched, Arc::clone(&ctx), ctx.config.push_timezone).await?;
    sched.shutdown_on_ctrl_c();
    sched.start().await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], ctx.config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, public = %ctx.config.public_base_url, "listening");

    axum::serve(listener, server::router(Arc::clone(&ctx)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = sched.shutdown().await {
        error!(error = ?e, "scheduler shutdown failed");
    }

    info!("Shutdown complete.");
    Ok(())
}

async fn schedule_pushes(sched: &JobScheduler, ctx: Arc<AppContext>, tz: Tz) -> Result<()> {
    for cron in PUSH_SCHEDULES {
        let ctx = Arc::clone(&ctx);

        sched
            .add(Job::new_async_tz(cron, tz, move |_uuid, _l| {
                let ctx = Arc::clone(&ctx);

                Box::pin(async move {
                    if let Err(e) = daily::run_push(&ctx).await {
                        error!(error = ?e, "run_push failed");
                    }
                })
            })?)
            .await?;

        info!(cron, timezone = %tz, "scheduled push");
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::{
            select,
            signal::unix::{SignalKind, signal},
        };
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

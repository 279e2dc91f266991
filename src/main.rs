use anyhow::Context;
use clap::Parser;
use proc_monitor::collectors::{ProcFs, SourceReader};
use proc_monitor::config::Config;
use proc_monitor::monitor::{self, Monitor};
use proc_monitor::resolver::SysinfoResolver;
use proc_monitor::server::{self, HostInfo};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("proc_monitor=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.json_logs);
    config.validate().context("invalid configuration")?;

    let names = config.process_names();
    let monitor = Arc::new(Monitor::new(&names, &config.metrics));
    let reader: Arc<dyn SourceReader> = Arc::new(ProcFs::new(&config.proc_root));

    monitor::start(
        Arc::clone(&monitor),
        SysinfoResolver::new(),
        reader,
        config.collect_interval(),
    );

    let host = HostInfo::detect();
    info!(hostname = %host.hostname, "host detected");
    let app = server::router(monitor, host);

    let listener = tokio::net::TcpListener::bind(config.listen.as_str())
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(monitoring = ?names, "listening on http://{}", config.listen);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

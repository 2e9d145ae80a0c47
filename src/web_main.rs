//! Web 服务器主程序入口

use std::sync::Arc;

use clap::Parser;
use tracing::Level;

use frameproxy::accounting::Accounting;
use frameproxy::core::{AdmissionStrategy, PageProcessor};
use frameproxy::env::EnvConfig;
use frameproxy::web::{WebConfig, WebServer};

/// Content-rewriting reverse proxy
#[derive(Parser, Debug)]
#[command(name = "frameproxy", version, about)]
struct Args {
    /// Enable request accounting, periodic statistics and /debug/stats
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Bind address [default: FRAMEPROXY_BIND_ADDRESS or 127.0.0.1]
    #[arg(short = 'b', long = "bind", value_name = "ADDRESS")]
    bind: Option<String>,

    /// Port number [default: FRAMEPROXY_PORT or 8080]
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    port: Option<u16>,

    /// Admission strategy: always-fetch or frame-gated
    #[arg(long = "strategy", value_name = "STRATEGY")]
    strategy: Option<AdmissionStrategy>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut env_config = EnvConfig::from_env()?;
    if args.debug {
        env_config.debug = true;
    }
    if let Some(strategy) = args.strategy {
        env_config.strategy = strategy;
    }

    let level: Level = env_config.effective_log_level().parse()?;
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut web_config = WebConfig::from_env()?;
    if let Some(bind) = args.bind {
        web_config.bind_addr = bind;
    }
    if let Some(port) = args.port {
        web_config.port = port;
    }
    web_config.validate()?;

    let accounting = Arc::new(Accounting::new(env_config.debug, env_config.stats_recent));
    let processor = PageProcessor::new(env_config.proxy_options())?;

    let server = WebServer::new(web_config, processor, accounting)
        .with_report_interval(env_config.stats_interval);
    server.start().await?;

    Ok(())
}

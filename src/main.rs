//! Log streamer binary
//!
//! Run with: log-streamer [LOG_DIR]
//!
//! Settings come from `LOG_STREAMER_*` environment variables; a positional
//! argument overrides the watched directory.
//!
//! Examples:
//!   log-streamer                        # watches /tmp/local on 0.0.0.0:8080
//!   log-streamer /var/log/myapp
//!   LOG_STREAMER_ADDR=127.0.0.1:9000 log-streamer
//!
//! Then open http://localhost:8080/ or stream one file:
//!   curl -N http://localhost:8080/api/logs/app.log

use log_streamer::{LogServer, ServerConfig};

fn print_usage() {
    println!("Usage: log-streamer [LOG_DIR]");
    println!();
    println!("Environment:");
    println!("  LOG_STREAMER_ADDR              bind address (default 0.0.0.0:8080)");
    println!("  LOG_STREAMER_DIR               watched directory (default /tmp/local)");
    println!("  LOG_STREAMER_SUFFIX            log file suffix (default .log)");
    println!("  LOG_STREAMER_SEND_TIMEOUT_MS   slow subscriber timeout (default 1000)");
    println!("  LOG_STREAMER_CHANNEL_CAPACITY  per-subscriber buffer (default 1)");
    println!("  LOG_STREAMER_MAX_CONNECTIONS   concurrent streams, 0 = unlimited");
    println!("  RUST_LOG                       log filter");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("log_streamer=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let mut config = ServerConfig::from_env()?;
    if let Some(dir) = args.get(1) {
        config = config.log_dir(dir);
    }

    let server = LogServer::new(config);
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}

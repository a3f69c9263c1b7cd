use std::{net::SocketAddr, path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use palisade::{
    FileAuditSink, GatewayHandler, ReqwestUpstreamClient, UpstreamClient,
    config::{GatewayConfigValidator, ResolvedConfig, load_config},
    router, tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "config.yaml")]
    config: String,

    /// Use human-readable console logs instead of JSON
    #[clap(long)]
    console_logs: bool,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Start the gateway server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "config.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let (command, config_path) = match args.command {
        Some(Commands::Validate { config }) => ("validate", config),
        Some(Commands::Serve { config }) => ("serve", config),
        None => ("serve", args.config), // Default to serve with config from args
    };

    if command == "validate" {
        return validate_config_command(&config_path).await;
    }

    if args.console_logs {
        tracing_setup::init_console_tracing()
            .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
    } else {
        tracing_setup::init_tracing().map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
    }

    tracing::info!("Loading configuration from {config_path}");

    let raw_config = load_config(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    GatewayConfigValidator::validate(&raw_config).context("Configuration validation failed")?;

    let config: Arc<ResolvedConfig> = Arc::new(
        raw_config
            .resolve()
            .context("Failed to resolve configuration")?,
    );

    let upstream_client: Arc<dyn UpstreamClient> = Arc::new(
        ReqwestUpstreamClient::new(&config).context("Failed to create upstream HTTP client")?,
    );
    let audit_sink = FileAuditSink::open(&config.unknown_paths_log).with_context(|| {
        format!(
            "Failed to open unknown-path audit log {}",
            config.unknown_paths_log
        )
    })?;

    let handler = Arc::new(GatewayHandler::new(
        config.clone(),
        upstream_client,
        Box::new(audit_sink),
    ));
    let app = router(handler);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    tracing::info!(
        "Starting Palisade gateway on {} (upstream: {}, allowed IPs: {}, routes: {}, proxy trust: {})",
        config.listen_addr,
        config.upstream_base_url,
        config.allowed_source_ips.len(),
        config.routes.len(),
        config.trust_proxy_headers,
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Palisade gateway shut down");
    Ok(())
}

/// Resolve once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match GatewayConfigValidator::validate(&config) {
        Ok(()) => {
            let resolved = config.resolve().context("Failed to resolve configuration")?;
            println!("Configuration validation: OK");
            println!();
            println!("Configuration summary:");
            println!("   - Listen address: {}", resolved.listen_addr);
            println!("   - Upstream base URL: {}", resolved.upstream_base_url);
            println!(
                "   - Allowed source IPs: {}",
                resolved.allowed_source_ips.len()
            );
            println!("   - Route rules: {}", resolved.routes.len());
            println!("   - Verify upstream TLS: {}", resolved.verify_upstream_tls);
            println!("   - Trust proxy headers: {}", resolved.trust_proxy_headers);
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration validation failed:");
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

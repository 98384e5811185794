use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use revlo::cli::{
    AdminCommands, UserCommands, run_info, run_init, run_sweep, run_user_add, run_user_remove,
};
use revlo::clock::SystemClock;
use revlo::config::ServerConfig;
use revlo::server::{AppState, create_router};
use revlo::service::SweepScheduler;
use revlo::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "revlo")]
#[command(about = "A multi-tenant versioned key-value store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database and config
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn serve(host: String, port: u16, data_dir: String) -> anyhow::Result<()> {
    let config = ServerConfig::load(host, port, data_dir.into())?;

    let token_file = config.admin_token_path();
    let db_path = config.db_path();
    if !token_file.exists() || !db_path.exists() {
        bail!(
            "Server not initialized. Run 'revlo admin init' first to create the database and admin token."
        );
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(
            "Server not initialized. Run 'revlo admin init' first to create the database and admin token."
        );
    }

    info!("Admin token available at {}", token_file.display());

    let state = Arc::new(AppState::new(
        Arc::new(store),
        Arc::new(SystemClock),
        config.sweeper.log_detailed,
    ));

    let scheduler = config.sweeper.enabled.then(|| {
        let scheduler = Arc::new(SweepScheduler::new(
            state.sweeper.clone(),
            config.sweeper.clone(),
        ));
        let handle = Arc::clone(&scheduler).start();
        (scheduler, handle)
    });
    if scheduler.is_none() {
        info!("Retention sweeper disabled");
    }

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((scheduler, handle)) = scheduler {
        scheduler.shutdown();
        if let Err(e) = handle.await {
            tracing::error!("Retention sweeper task failed: {e}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("revlo=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => run_init(data_dir, non_interactive)?,
            AdminCommands::User { command } => match command {
                UserCommands::Add {
                    data_dir,
                    username,
                    create_token,
                    non_interactive,
                } => run_user_add(data_dir, username, create_token, non_interactive)?,
                UserCommands::Remove {
                    data_dir,
                    user_id,
                    non_interactive,
                    yes,
                } => run_user_remove(data_dir, user_id, non_interactive, yes)?,
            },
            AdminCommands::Sweep { data_dir, json } => run_sweep(data_dir, json)?,
            AdminCommands::Info { data_dir, json } => run_info(data_dir, json)?,
        },
        Commands::Serve {
            host,
            port,
            data_dir,
        } => serve(host, port, data_dir).await?,
    }

    Ok(())
}

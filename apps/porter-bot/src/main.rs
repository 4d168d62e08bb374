mod config;
mod coordinator;
mod dispatcher;
mod guild;
mod metrics;
mod relay;

#[cfg(test)]
mod tests;

use clap::{Parser, Subcommand};
use porter_attribution::{AttributionResolver, InviteTracker, ResolverSettings, SystemClock};
use porter_events::EventBus;
use porter_events_memory::MemoryEventBus;
use porter_storage::{AccountId, AccountStore, CreateAccountParams, SubscriptionStatus};
use porter_store_sqlite::SqliteStore;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::BotConfig;
use coordinator::OnboardingCoordinator;
use dispatcher::{spawn_purge, Dispatcher};
use guild::HttpGuild;
use relay::RelayState;

// ────────────────────────────────────── CLI Types ──────────────────────────────────────

#[derive(Parser)]
#[command(name = "porter-bot")]
#[command(about = "Attributes community joins to invites and onboards the new member")]
struct Cli {
    /// Database URL (sqlite://path/to/db.db)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bot: relay endpoint, dispatcher and purge timer
    Serve {
        /// Relay and health check address
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },
    /// Account administration
    Account {
        #[command(subcommand)]
        account_cmd: AccountCommand,
    },
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Register an account and the invite issued to it
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        invite_code: String,
        /// inactive, trialing, active, past_due or canceled
        #[arg(long, default_value = "active")]
        status: SubscriptionStatus,
    },
    /// List accounts waiting for their member to join
    Pending {
        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Change the subscription status of an account
    SetStatus {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        status: SubscriptionStatus,
    },
}

// ────────────────────────────────────── Commands ──────────────────────────────────────

async fn cmd_serve(db_url: &str, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = BotConfig::from_env()?;
    let metrics = metrics::init_metrics()?;

    let store: Arc<SqliteStore> = Arc::new(SqliteStore::open(db_url).await?);
    let guild = Arc::new(HttpGuild::new(&config.guild)?);

    let tracker = InviteTracker::with_retention(
        Arc::new(SystemClock),
        chrono::Duration::from_std(config.attribution.retention)?,
    );
    let settings = ResolverSettings {
        pending_limit: config.attribution.pending_limit,
        claim_window: chrono::Duration::from_std(config.attribution.claim_window)?,
    };
    let resolver = AttributionResolver::new(tracker.clone(), guild.clone(), store.clone(), settings);
    let coordinator = OnboardingCoordinator::new(resolver, store, guild, config.onboarding);

    let bus = Arc::new(MemoryEventBus::new());
    let events = bus.subscribe().await?;
    let dispatcher = tokio::spawn(Dispatcher::new(coordinator).run(events));
    let purge = spawn_purge(tracker.clone(), config.attribution.purge_interval);

    let app = relay::router(RelayState::new(bus, tracker, Some(metrics)));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "porter-bot relay listening on {} for guild {}",
        listener.local_addr()?,
        config.guild.guild_id
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge.abort();
    dispatcher.abort();
    info!("porter-bot stopped");
    Ok(())
}

async fn cmd_account_add(
    db_url: &str,
    email: String,
    invite_code: String,
    status: SubscriptionStatus,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open(db_url).await?;
    let account = store
        .create_account(&CreateAccountParams {
            email,
            invite_code: Some(invite_code),
            subscription_status: status,
        })
        .await?;

    println!("Account created");
    println!("ID:     {}", account.id);
    println!("Email:  {}", account.email);
    println!("Status: {}", account.subscription_status);
    Ok(())
}

async fn cmd_account_pending(db_url: &str, limit: u32) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open(db_url).await?;
    let pending = store.query_pending_identities(limit).await?;

    if pending.is_empty() {
        println!("No accounts are waiting for a member to join.");
    } else {
        println!("Pending accounts:\n");
        for p in pending {
            println!("Account: {}", p.account_id);
            println!("Invite:  {}", p.invite_code);
            println!("Updated: {}", p.last_updated);
            println!();
        }
    }
    Ok(())
}

async fn cmd_account_set_status(
    db_url: &str,
    id: Uuid,
    status: SubscriptionStatus,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open(db_url).await?;
    store
        .set_subscription_status(&AccountId(id), status)
        .await?;
    println!("Account {} is now {}", id, status);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}

// ────────────────────────────────────── Main ──────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db_url = cli
        .database_url
        .unwrap_or_else(|| "sqlite://porter.db?mode=rwc".to_string());

    match cli.command {
        Command::Serve { addr } => {
            cmd_serve(&db_url, &addr).await?;
        }
        Command::Account { account_cmd } => match account_cmd {
            AccountCommand::Add {
                email,
                invite_code,
                status,
            } => {
                cmd_account_add(&db_url, email, invite_code, status).await?;
            }
            AccountCommand::Pending { limit } => {
                cmd_account_pending(&db_url, limit).await?;
            }
            AccountCommand::SetStatus { id, status } => {
                cmd_account_set_status(&db_url, id, status).await?;
            }
        },
    }

    Ok(())
}

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use table_finder::backend::MemoryBackend;
use table_finder::config::AppConfig;
use table_finder::error::Result;
use table_finder::web::{build_router, AppState};
use table_finder::TableFinder;

const DEMO_EMAIL: &str = "maries@demo.local";
const DEMO_PASSWORD: &str = "mariage2026";
const CONSOLE_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[clap(name = "table-finder", version)]
#[clap(about = "Wedding guest table lookup and guest list management", long_about = None)]
struct Cli {
    /// Address to listen on. Overrides BIND_ADDR.
    #[clap(long)]
    bind: Option<SocketAddr>,

    /// Use a seeded in-memory backend instead of Supabase
    #[clap(long)]
    demo: bool,
}

fn demo_backend() -> MemoryBackend {
    let backend = MemoryBackend::new().with_account(DEMO_EMAIL, DEMO_PASSWORD);
    backend.seed_guest("Dupont", "Jean", Some(3));
    backend.seed_guest("Mba", "Paul", Some(5));
    backend.seed_guest("Ondo", "Marie", None);
    backend
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .try_init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(bind) = cli.bind {
        config = config.with_bind_addr(bind);
    }

    let app = if cli.demo {
        info!(email = DEMO_EMAIL, password = DEMO_PASSWORD, "demo organizer account");
        TableFinder::with_memory_backend(config, demo_backend())?
    } else {
        TableFinder::new(config)?
    };

    let addr = app.config().bind_addr;
    let state = AppState::new(app);
    let _sweeper = state.consoles.spawn_sweeper(CONSOLE_SWEEP_PERIOD);
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("table-finder listening on {addr}");
    axum::serve(listener, router).await?;
    Ok(())
}

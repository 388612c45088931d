use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use open_media_api::{
    AppConfig, AuthConfig, DEFAULT_BIND, DatabaseConfig, SearchConfig,
    auth::{DEFAULT_CACHE_TTL_SECONDS, DEFAULT_SESSION_COOKIE, DEFAULT_SESSION_HEADER},
    create_app,
    search::DEFAULT_OPENVERSE_API_URL,
};

#[derive(Parser)]
#[command(name = "open-media-api")]
#[command(about = "Open license media search backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Initialize the database schema and exit
    Init(DbArgs),
}

#[derive(Args)]
struct DbArgs {
    #[arg(long, env = "SURREALDB_URL", default_value = "memory")]
    db_url: String,
    #[arg(long, env = "SURREALDB_NAMESPACE", default_value = "openmedia")]
    db_namespace: String,
    #[arg(long, env = "SURREALDB_DATABASE", default_value = "openlicensemediadb")]
    db_database: String,
    #[arg(long, env = "SURREALDB_USERNAME")]
    db_username: Option<String>,
    #[arg(long, env = "SURREALDB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,
}

impl DbArgs {
    fn into_config(self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.db_url,
            namespace: self.db_namespace,
            database: self.db_database,
            username: self.db_username,
            password: self.db_password,
        }
    }
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 0.0.0.0:8000
    #[arg(long, env = "BIND_ADDRESS", default_value = DEFAULT_BIND)]
    bind: String,
    #[command(flatten)]
    db: DbArgs,
    /// Expected JWT issuer
    #[arg(long, env = "CLERK_JWT_ISSUER")]
    jwt_issuer: Option<String>,
    /// JWKS endpoint URL for JWT RS256 signature verification
    #[arg(long, env = "CLERK_JWT_JWKS_URL")]
    jwks_url: Option<String>,
    #[arg(long, env = "JWKS_CACHE_SECONDS", default_value_t = DEFAULT_CACHE_TTL_SECONDS)]
    jwks_cache_seconds: u64,
    /// Serve expired signing keys (up to 24h) when the key endpoint is down
    #[arg(long, env = "JWKS_ALLOW_STALE", default_value_t = false)]
    jwks_allow_stale: bool,
    #[arg(long, env = "SESSION_HEADER", default_value = DEFAULT_SESSION_HEADER)]
    session_header: String,
    #[arg(long, env = "SESSION_COOKIE", default_value = DEFAULT_SESSION_COOKIE)]
    session_cookie: String,
    #[arg(long, env = "OPENVERSE_API_URL", default_value = DEFAULT_OPENVERSE_API_URL)]
    openverse_api_url: String,
    #[arg(long, env = "OPENVERSE_API_KEY", hide_env_values = true)]
    openverse_api_key: Option<String>,
}

impl ServeArgs {
    fn into_config(self) -> AppConfig {
        AppConfig {
            bind: self.bind,
            database: self.db.into_config(),
            auth: AuthConfig {
                jwt_issuer: self.jwt_issuer,
                jwks_url: self.jwks_url,
                jwks_cache_seconds: self.jwks_cache_seconds,
                allow_stale_jwks: self.jwks_allow_stale,
                session_header: self.session_header,
                session_cookie: self.session_cookie,
            },
            search: SearchConfig {
                api_url: self.openverse_api_url,
                api_key: self.openverse_api_key,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(env_filter()?).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let config = args.into_config();
            let bind = config.bind.clone();

            if config.auth.jwks_url.is_none() {
                info!("No JWKS URL configured; authenticated routes will reject every token");
            }

            let (app, context) = create_app(config).await?;

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Server listening on http://{}", bind);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            drop(context);
            info!("Server stopped");
        }
        Commands::Init(args) => {
            let db_config = args.into_config();
            info!("Using database url for initialization: {}", db_config.url);

            info!("Initializing database...");
            let db = open_media_api::create_connection(db_config).await?;
            open_media_api::ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
    }

    Ok(())
}

/// `RUST_LOG` plus the crate's default levels.
fn env_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("open_media_api=info".parse()?)
        .add_directive("surrealdb=warn".parse()?))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
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
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

use std::{net::SocketAddr, sync::Arc};

use anyhow::{anyhow, bail, Context};
use blog_backend::{
    config::Config,
    db,
    mail::{LogMailer, Mailer, SmtpMailer},
    routes,
    utils::{
        auth::{Role, Session},
        jwt,
    },
    AppState,
};
use jsonwebtoken::EncodingKey;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "--issue-token" {
        return issue_token(&config, &args[2..]);
    }

    info!("Opening database...");
    let pool = db::connect(&config.database_url)
        .await
        .context("failed to open database")?;
    db::prepare_db(&pool)
        .await
        .context("failed to apply schema")?;

    let repaired = db::reconcile_counters(&pool).await?;
    if repaired > 0 {
        warn!(repaired, "engagement counters disagreed with their relations and were rewritten");
    }

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp).context("invalid SMTP settings")?),
        None => Arc::new(LogMailer),
    };

    let state = AppState::new(pool, &config.jwt_secret, mailer, config.notify.clone());
    let app = routes::generate_routes(state, config.rate_limit_per_sec);

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server running on {address}");

    axum::Server::bind(&address)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

/// `--issue-token <user-id> <role>`: prints a session token signed with
/// `JWT_SECRET`.
fn issue_token(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let [user_id, role, ..] = args else {
        bail!("usage: blog-backend --issue-token <user-id> <00|01>");
    };

    let role = Role::from_code(role).ok_or_else(|| anyhow!("role must be 00 (admin) or 01 (member)"))?;
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    let token = jwt::issue_token(&Session::new(user_id.clone(), role), &key)?;

    println!("{token}");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => error!("Failed to listen for Ctrl+C: {err}"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                error!("Failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use storyloft::{
    application::error::AppError,
    config::{self, Command, SessionsCommand, UsersCommand},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiOptions, ApiState},
        memory::MemoryRepositories,
        telemetry,
    },
};
use storyloft_api_types::TokenResponse;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

/// Actor label recorded in the audit log for operator commands.
const CLI_ACTOR: &str = "cli";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        Command::Serve(_) => run_serve(settings).await,
        Command::Users(args) => match args.command {
            UsersCommand::GrantAdmin { username, .. } => run_grant_admin(settings, &username).await,
        },
        Command::Sessions(args) => match args.command {
            SessionsCommand::Issue { username, .. } => run_issue_session(settings, &username).await,
        },
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let options = ApiOptions::from_settings(&settings)?;
    let state = match &settings.database.url {
        Some(_) => {
            let db = init_database(&settings).await?;
            ApiState::assemble(db.clone(), options).with_database(db)
        }
        None => {
            warn!(
                target = "storyloft::serve",
                "no database url configured; using the in-memory store"
            );
            ApiState::assemble(Arc::new(MemoryRepositories::new()), options)
        }
    };

    serve_http(&settings, state).await
}

async fn init_database(settings: &config::Settings) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn run_grant_admin(settings: config::Settings, username: &str) -> Result<(), AppError> {
    let db = init_database(&settings).await?;
    let state = ApiState::assemble(db, ApiOptions::from_settings(&settings)?);
    let user = state.accounts.grant_admin(username, CLI_ACTOR).await?;
    info!(
        target = "storyloft::admin",
        user_id = %user.id,
        username = %user.username,
        "admin role granted"
    );
    println!("{} is now an admin", user.username);
    Ok(())
}

async fn run_issue_session(settings: config::Settings, username: &str) -> Result<(), AppError> {
    let db = init_database(&settings).await?;
    let state = ApiState::assemble(db, ApiOptions::from_settings(&settings)?);
    let pair = state.accounts.issue_for_username(username).await?;
    let body = serde_json::to_string_pretty(&TokenResponse::from(pair))
        .map_err(|err| AppError::unexpected(err.to_string()))?;
    println!("{body}");
    Ok(())
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "storyloft::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let trigger = shutdown.clone();
    let service = router.into_make_service_with_connect_info::<SocketAddr>();
    let server = axum::serve(listener, service)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            trigger.notify_one();
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        shutdown.notified().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = deadline => {
            warn!(
                target = "storyloft::serve",
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target = "storyloft::serve", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "storyloft::serve", error = %err, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "storyloft::serve", error = %err, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!(
        target = "storyloft::serve",
        "shutdown signal received; draining connections"
    );
}

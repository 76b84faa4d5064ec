use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

use service_desk::api::{self, session, AppState};
use service_desk::cli::{self, Commands, RequestCommands};
use service_desk::config::{self, Config};
use service_desk::notification::{
    Dispatcher, HttpRelayTransport, LogTransport, MailSettings, MailTransport,
};
use service_desk::store;
use service_desk::workflow::Workflow;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let args = cli::Cli::parse();

    let result = match args.command {
        // needs no configuration, so it works before .env exists
        Some(Commands::HashPassword) => hash_password_command(),
        Some(Commands::Serve { port }) => {
            let cfg = config::load()?;
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(Commands::Request { command }) => {
            let cfg = config::load()?;
            let workflow = build_workflow(&cfg).await?;
            handle_request_command(&workflow, command).await
        }
        None => {
            let cfg = config::load()?;
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "service-desk"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "service_desk=debug,tower_http=debug".into()),
        ))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(telemetry_layer)
        .init();
    Ok(())
}

/// Store, mail transport and dispatcher wired from configuration.
async fn build_workflow(cfg: &Config) -> anyhow::Result<Workflow> {
    let store = store::open(&cfg.store)
        .await
        .with_context(|| format!("failed to open request store ({})", cfg.store.describe()))?;
    tracing::info!(store = %cfg.store.describe(), "request store ready");

    let transport: Arc<dyn MailTransport> = match &cfg.mail_relay_url {
        Some(url) => {
            tracing::info!(relay = %url, "mail relay configured");
            Arc::new(HttpRelayTransport::new(url.clone(), cfg.mail_relay_api_key.clone())?)
        }
        None => {
            tracing::warn!("MAIL_RELAY_URL not set, notifications will only be logged");
            Arc::new(LogTransport)
        }
    };

    let dispatcher = Dispatcher::new(
        transport,
        cfg.directory.clone(),
        MailSettings {
            from: cfg.mail_from.clone(),
            app_url: cfg.app_url.clone(),
            it_address: cfg.it_email.clone(),
        },
    );
    tracing::info!(
        configured = dispatcher.directory().configured(),
        default_manager = %dispatcher.directory().default_manager(),
        "department directory loaded"
    );

    Ok(Workflow::new(store, dispatcher, cfg.utc_offset))
}

async fn run_server(cfg: Config, port: u16) -> anyhow::Result<()> {
    let workflow = build_workflow(&cfg).await?;

    if !cfg.admin_enabled() {
        tracing::warn!("ADMIN_USERNAME/ADMIN_PASSWORD_HASH not set, admin login disabled");
    }
    let app_url = cfg.app_url.clone();
    let state = Arc::new(AppState::new(workflow, cfg));
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%app_url, "service desk listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

fn hash_password_command() -> anyhow::Result<()> {
    eprintln!("Enter the admin password, then press Ctrl-D:");
    let mut input = Zeroizing::new(String::new());
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read password from stdin")?;
    let password = input.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    let hash = session::hash_password(password)?;
    println!("ADMIN_PASSWORD_HASH={}", hash);
    Ok(())
}

async fn handle_request_command(workflow: &Workflow, cmd: RequestCommands) -> anyhow::Result<()> {
    match cmd {
        RequestCommands::List => {
            let requests = workflow.list().await?;
            if requests.is_empty() {
                println!("No requests.");
                return Ok(());
            }

            println!(
                "{:<5} {:<6} {:<22} {:<20} {:<8} {:<12} STATUS",
                "RANK", "ID", "SUBMITTED", "NAME", "DEPT", "SERVICE"
            );
            for r in requests {
                let name = if r.requester_name.chars().count() > 20 {
                    format!("{}...", r.requester_name.chars().take(17).collect::<String>())
                } else {
                    r.requester_name.clone()
                };
                println!(
                    "{:<5} {:<6} {:<22} {:<20} {:<8} {:<12} {}",
                    r.sort_order, r.id, r.submitted_at, name, r.department, r.service_type, r.status
                );
            }
        }
        RequestCommands::Approve { token } => {
            let notified = workflow.approve(&token).await?;
            println!("Request {} approved.", notified.request.id);
            // the process exits right after, so wait for the IT mail
            if let Err(e) = notified.notification.await {
                tracing::error!("notification task failed: {}", e);
            }
        }
        RequestCommands::Disapprove { token } => {
            let request = workflow.disapprove(&token).await?;
            println!("Request {} disapproved.", request.id);
        }
        RequestCommands::Delete { id } => {
            if workflow.delete(id).await? {
                println!("Request {} deleted.", id);
            } else {
                println!("Request {} not found.", id);
            }
        }
        RequestCommands::ClearAll { yes } => {
            if !yes {
                anyhow::bail!("refusing to delete every request without --yes");
            }
            workflow.clear_all().await?;
            println!("All requests deleted.");
        }
    }
    Ok(())
}

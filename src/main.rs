use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
    service::TowerToHyperService,
};
use momentum90::cli::{Cli, Command, CommandArguments, PlanArguments};
use momentum90::error::{ServiceError, ServiceResult};
use momentum90::metadata::{PKG_NAME, PKG_VERSION};
use momentum90::planner_client::{PlanSource, PlannerClient};
use momentum90::quests::{REWARDS, reward_for_quest};
use momentum90::server::{AppState, MomentumServer};
use momentum90::storage::Storage;
use momentum90::types::Difficulty;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp::{ServiceExt, transport::stdio};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ServiceResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Start(args) => start_server(args).await,
        Command::Plan(args) => print_plan(args).await,
        Command::Tiers { tier } => {
            let shown = |d: &Difficulty| tier.is_none_or(|t| t == *d);
            for d in Difficulty::ALL.into_iter().filter(|d| shown(d)) {
                println!("{:<11} {:>5} XP", d.as_str(), d.xp());
            }
            println!();
            for number in (1..=REWARDS.len() as u32).filter(|n| shown(&Difficulty::for_position(*n))) {
                println!("{number:>2}. {}", reward_for_quest(number));
            }
            Ok(())
        }
        Command::Version => {
            println!("{PKG_NAME} {PKG_VERSION}");
            Ok(())
        }
    }
}

async fn print_plan(args: PlanArguments) -> ServiceResult<()> {
    let client = PlannerClient::new(args.planner.config())?;
    let goal = args.goal;
    let response = tokio::task::spawn_blocking(move || client.generate_plan(&goal))
        .await
        .map_err(|e| ServiceError::Other(format!("plan request task failed: {e}")))??;
    println!("{}", serde_json::to_string_pretty(&response.quests())?);
    Ok(())
}

async fn start_server(args: CommandArguments) -> ServiceResult<()> {
    args.validate().map_err(ServiceError::Config)?;
    let data_file = args.data_file().map_err(ServiceError::Config)?;

    let mut storage = Storage::new(data_file);
    storage.initialize()?;
    let planner: Arc<dyn PlanSource> = Arc::new(PlannerClient::new(args.planner.config())?);
    let state = Arc::new(AppState::new(storage, planner));

    tracing::info!("Starting {PKG_NAME} MCP server v{PKG_VERSION}");

    let mut handles = Vec::new();

    if args.enable_stdio {
        let service = MomentumServer::new(Arc::clone(&state));
        let std_service = service
            .serve(stdio())
            .await
            .map_err(|e| ServiceError::Other(format!("stdio transport failed: {e}")))?;
        handles.push(tokio::spawn(async move {
            let _ = std_service.waiting().await;
        }));
    }

    if args.enable_http {
        let addr: SocketAddr = args
            .http_addr
            .parse()
            .map_err(|e| ServiceError::Config(format!("Invalid MCP_HTTP_ADDR: {e}")))?;
        let http_state = Arc::clone(&state);
        let http_service = TowerToHyperService::new(StreamableHttpService::new(
            move || Ok(MomentumServer::new(Arc::clone(&http_state))),
            LocalSessionManager::default().into(),
            Default::default(),
        ));
        let http_listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "streamable HTTP transport listening");
        handles.push(tokio::spawn(async move {
            loop {
                let (stream, _) = match http_listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let service = http_service.clone();
                tokio::spawn(async move {
                    let _ = Builder::new(TokioExecutor::default())
                        .serve_connection(io, service)
                        .await;
                });
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}

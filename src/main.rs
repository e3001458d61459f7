use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, reload};

use cursor_rules_agent::agent::CloneRequest;
use cursor_rules_agent::agent::agent_loop::ShutdownReason;
use cursor_rules_agent::agent::definition::DEFAULT_AGENT_ID;
use cursor_rules_agent::{app, cli, config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize tracing before loading config so config warnings are visible.
    // RUST_LOG directives refine the level; the configured level replaces the
    // default once it is known.
    let (filter, filter_handle) = reload::Layer::new(env_filter(LevelFilter::INFO));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config::load_config(&cli)?;
    filter_handle.reload(env_filter(LevelFilter::from_level(config.level()?)))?;

    let app = app::bootstrap(config)?;
    let span = tracing::info_span!("app", name = %app.logger().name);

    async move {
        tracing::info!(
            model = %app.config().model,
            workdir = %app.toolbox().clone_repository.workdir().display(),
            "Config loaded"
        );

        match cli.command {
            cli::Commands::Chat { prompt, .. } => {
                let shutdown = CancellationToken::new();
                let ctrl_c_token = shutdown.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        eprintln!("\nShutting down...");
                        ctrl_c_token.cancel();
                    }
                });

                let result = app.chat(DEFAULT_AGENT_ID, &prompt, shutdown).await?;
                eprintln!(
                    "Session ended: {}. {} turns. Log: {}",
                    result.reason.as_str(),
                    result.turns_completed,
                    result.log_path.display()
                );
                if let ShutdownReason::Error(msg) = result.reason {
                    anyhow::bail!(msg);
                }
            }
            cli::Commands::Clone {
                url,
                branch,
                lfs,
                submodules,
                ..
            } => {
                let mut request = CloneRequest::new(url)
                    .with_lfs(lfs)
                    .with_submodules(submodules);
                request.branch = branch;

                let result = app.clone_repository(&request).await;
                println!("{}", serde_json::to_string_pretty(&result)?);
                if !result.success {
                    anyhow::bail!("Clone failed: {}", result.message);
                }
            }
            cli::Commands::Workflow { repository, name } => {
                let run = app
                    .run_workflow(&name, serde_json::json!({ "repository": repository }))
                    .await?;
                println!("{}", serde_json::to_string_pretty(&run)?);
            }
            cli::Commands::Tools => {
                println!("{}", serde_json::to_string_pretty(&app.tool_schemas())?);
            }
        }

        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}

fn env_filter(default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy()
}

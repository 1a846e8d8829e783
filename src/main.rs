use anyhow::Result;
use clap::Parser;
use evently::{
    cli::{Args, Commands},
    client::HttpBackend,
    config::Config,
    events::{create_event_channel, forward_input},
    formatter::TerminalRenderer,
    mode::ApiKeyAuthorizer,
    monitoring::setup_metrics,
    oneshot::OneShot,
    tracing_setup::setup_tracing,
    ui::{UIController, UIOptions},
};
use std::sync::Arc;
use tokio::io::BufReader;

use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_tracing(&args.log_level, args.json_logs, !args.no_color)?;
    info!("Starting evently v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_args(&args)?;
    info!(
        backend = %config.backend.base_url,
        user_id = config.session.user_id,
        "Configuration loaded"
    );

    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
        info!("Metrics server started on port {}", config.metrics.port);
    }

    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let authorizer = Arc::new(ApiKeyAuthorizer::new(config.admin.api_key.clone()));
    let mut renderer = TerminalRenderer::new(config.output.format, config.output.colored);

    match args.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            let (sender, receiver) = create_event_channel();
            let input_sender = sender.clone();
            tokio::spawn(async move {
                let stdin = BufReader::new(tokio::io::stdin());
                if let Err(e) = forward_input(stdin, input_sender).await {
                    error!("Failed to read input: {}", e);
                }
            });

            let mut controller = UIController::new(
                backend,
                authorizer,
                Box::new(renderer),
                (sender, receiver),
                UIOptions {
                    user_id: config.session.user_id,
                },
            );
            controller.run().await;
        }
        command => {
            let oneshot = OneShot {
                backend: backend.as_ref(),
                authorizer: authorizer.as_ref(),
                admin_key: config.admin.api_key.as_deref(),
                user_id: config.session.user_id,
            };
            if let Err(e) = oneshot.run(&command, &mut renderer).await {
                error!("Command failed: {}", e);
                return Err(e.into());
            }
        }
    }

    info!("evently stopped");
    Ok(())
}

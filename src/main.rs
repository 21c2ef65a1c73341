use std::sync::Arc;

use clap::Parser;
use log::info;

mod analyzer;
mod chat;
mod clock;
mod config;
mod event_bus;
mod intent;
mod llm_manager;
mod logger;
mod nutrition;
mod presets;
mod providers;
mod session;
mod time_estimate;
mod timer;
mod ui;

use clock::SystemClock;
use config::Config;
use event_bus::EventBus;
use llm_manager::LLMManager;
use session::CookingSession;

#[derive(Parser)]
#[command(name = "kitchen_copilot", version, about)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<String>,
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
    /// Use canned offline replies instead of a hosted model
    #[arg(long)]
    offline: bool,
    /// No colours or progress bars
    #[arg(long)]
    plain: bool,
    /// Milliseconds between timer redraws in watch mode
    #[arg(long)]
    render_interval_ms: Option<u64>,
    /// Recipe to analyze right away
    #[arg(last = true)]
    recipe: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logger::init(args.verbose);

    let mut config = Config::load(&args.config)?;
    config.merge_with_args(args.plain, args.render_interval_ms);
    let config = Arc::new(config);

    let event_bus = Arc::new(EventBus::new(100));
    let llm_manager = Arc::new(LLMManager::from_config(
        config.clone(),
        event_bus.clone(),
        args.offline,
    ));
    if let Some(provider) = llm_manager.provider() {
        info!("Using {} ({})", provider.name(), provider.model_name());
    }

    let ui = ui::TerminalUI::new(config.ui.colorful, config.ui.progress_bars);
    let mut session = CookingSession::start(
        config.clone(),
        llm_manager,
        Arc::new(SystemClock),
        event_bus,
    )
    .await;
    log::debug!("Session id {}", session.id());
    ui.banner();

    let recipe = args.recipe.join(" ");
    if !recipe.trim().is_empty() {
        if let Err(e) = ui.handle(&mut session, intent::Intent::Analyze(Some(recipe))).await {
            ui.display_error(&format!("{:#}", e));
        }
    }

    ui.run(&mut session).await?;

    let summary = session.end().await;
    ui.print_summary(&summary);
    Ok(())
}

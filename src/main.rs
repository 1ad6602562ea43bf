use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use legislator_chat::controller::{self, Submission};
use legislator_chat::{logging, Backend, Config, Conversation, HttpBackend};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "legislator-chat", version)]
#[command(about = "Chat with the Legislator Chatbot backend about current Senate legislation")]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "LEGISLATOR_CHAT_BASE_URL")]
    base_url: Option<String>,

    /// Seconds between readiness checks
    #[arg(long, global = true, env = "LEGISLATOR_CHAT_POLL_INTERVAL")]
    poll_interval: Option<u64>,

    /// Request timeout in seconds (0 disables it)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// Check whether the backend is ready
    Health,
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to the config file
    Init,
    /// Print the config file location
    Path,
}

impl Cli {
    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::get_config_path(),
        }
    }

    /// Config file values with command line and environment overrides applied.
    fn effective_config(&self) -> Result<Config> {
        let mut config = Config::load_from(&self.config_path()?)?;
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(secs) = self.poll_interval {
            config.poll_interval_secs = secs;
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = Some(secs);
        }
        config.validate()
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.effective_config()?;

    match &cli.command {
        None | Some(Commands::Chat) => {
            let _guard = logging::init_file(&config.log_dir()?)?;
            run_chat(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Ask { question }) => {
            logging::init_stderr()?;
            ask(&config, question).await
        }
        Some(Commands::Health) => {
            logging::init_stderr()?;
            health(&config).await
        }
        Some(Commands::Config { action }) => {
            run_config(&cli, &config, action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_chat(config: &Config) -> Result<()> {
    let backend = Arc::new(HttpBackend::new(&config.base_url, config.request_timeout())?);
    info!(base_url = %config.base_url, "starting chat session");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(Duration::from_millis(300));

    let mut app = App::new(backend, &config.base_url, events.sender());
    app.start_polling(config.poll_interval());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event)?,
                None => break,
            }
        }
        anyhow::Ok(())
    }
    .await;

    app.shutdown();
    tui::restore()?;
    info!("chat session ended");
    result
}

async fn ask(config: &Config, question: &str) -> Result<ExitCode> {
    let backend = HttpBackend::new(&config.base_url, config.request_timeout())?;
    let mut conv = Conversation::new();

    let healthy = backend.health().await;
    if let Err(err) = &healthy {
        tracing::warn!(error = %err, "backend health check failed");
    }
    conv.record_health(healthy.is_ok());

    let failed = match controller::submit(&mut conv, question) {
        Submission::Ignored => {
            eprintln!("Nothing to ask: the question is empty.");
            return Ok(ExitCode::FAILURE);
        }
        Submission::Deferred => true,
        Submission::Dispatch(text) => {
            let outcome = backend.chat(&text).await;
            let failed = outcome.is_err();
            controller::complete(&mut conv, outcome);
            failed
        }
    };

    let answer = conv.messages().last().map(|m| m.content.as_str()).unwrap_or_default();
    if failed {
        eprintln!("{}", answer);
        Ok(ExitCode::FAILURE)
    } else {
        println!("{}", answer);
        Ok(ExitCode::SUCCESS)
    }
}

async fn health(config: &Config) -> Result<ExitCode> {
    let backend = HttpBackend::new(&config.base_url, config.request_timeout())?;
    match backend.health().await {
        Ok(()) => {
            println!("{}: ready", config.base_url);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!("{}: not ready ({})", config.base_url, err.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_config(cli: &Cli, config: &Config, action: &ConfigAction) -> Result<()> {
    let path = cli.config_path()?;
    match action {
        ConfigAction::Show => println!("{}", serde_json::to_string_pretty(config)?),
        ConfigAction::Init => {
            config.save_to(&path)?;
            println!("Wrote {}", path.display());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

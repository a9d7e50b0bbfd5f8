use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use agent_scaffold::{
    Agent, Message, ModelResolver, ModelRouter, Runner, SessionManager, Settings,
    create_content_workflow, create_my_agent, create_parallel_analysis, example_tools,
};

#[derive(Parser)]
#[command(name = "agent-scaffold")]
#[command(about = "A conversational agent with persistent sessions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $AGENT_CONFIG, then ./agent.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message to the agent, continuing the user's session
    Run {
        /// User whose session to continue (defaults to the configured default user)
        #[arg(short, long)]
        user: Option<String>,

        /// The message to send
        message: String,
    },
    /// Resolve the user's session and show which store holds it
    Session {
        #[arg(short, long)]
        user: Option<String>,
    },
    /// List the user's sessions
    Sessions {
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Run one of the example multi-agent workflows
    Workflow {
        #[arg(value_enum)]
        kind: WorkflowKind,

        /// The request to work on
        message: String,
    },
    /// List the example tools
    Tools,
}

#[derive(Clone, Copy, ValueEnum)]
enum WorkflowKind {
    /// Research, write, then review
    Content,
    /// Technical and business analysis in parallel
    Analysis,
}

fn log_filter(verbose: bool, level: &str) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }
}

fn init_logging(verbose: bool, level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, level))
        .with_writer(std::io::stderr)
        .init();
}

/// Load settings with a temporary subscriber so config warnings are not lost
fn load_settings(cli: &Cli) -> Result<Settings> {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, &level.to_lowercase()))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::with_default(bootstrap, || Settings::load(cli.config.as_deref()))
        .context("failed to load settings")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    init_logging(cli.verbose, &settings.logging.level);

    match cli.command {
        Commands::Run { user, message } => {
            let sessions = Arc::new(SessionManager::connect(&settings).await);
            let user = user.unwrap_or_else(|| sessions.default_user_id().to_string());
            let models: Arc<dyn ModelResolver> =
                Arc::new(ModelRouter::new(settings.api_keys.clone()));
            let agent = create_my_agent(&settings.agent, &settings.app);

            let runner = Runner::new(Arc::new(agent), sessions, models);
            let output = runner.run(&user, &message).await.inspect_err(|e| {
                error!(error = %e, "run failed");
            })?;

            info!(session_id = %output.session_id, "run completed");
            println!("{}", output.reply);
        }
        Commands::Session { user } => {
            let sessions = SessionManager::connect(&settings).await;
            let session_id = match user {
                Some(user) => sessions.get_or_create_session(&user).await?,
                None => sessions.get_or_create_default_session().await?,
            };
            println!("session: {}", session_id);
            println!("backend: {}", sessions.backend());
        }
        Commands::Sessions { user } => {
            let sessions = SessionManager::connect(&settings).await;
            let user = user.unwrap_or_else(|| sessions.default_user_id().to_string());
            let list = sessions.list_sessions(&user).await?;
            if list.is_empty() {
                println!("No sessions for {}", user);
            }
            for session in list {
                println!("{}", session);
            }
        }
        Commands::Workflow { kind, message } => {
            let models: Arc<dyn ModelResolver> =
                Arc::new(ModelRouter::new(settings.api_keys.clone()));
            let workflow: Box<dyn Agent> = match kind {
                WorkflowKind::Content => Box::new(create_content_workflow()),
                WorkflowKind::Analysis => Box::new(create_parallel_analysis()),
            };

            info!(workflow = workflow.name(), "starting workflow");
            let output = workflow
                .run(&[Message::user(message)], &models)
                .await
                .inspect_err(|e| error!(error = %e, "workflow failed"))?;
            println!("{}", output);
        }
        Commands::Tools => {
            let tools = example_tools();
            for tool in tools.all() {
                println!("{:<16} {}", tool.name(), tool.description());
            }
        }
    }

    Ok(())
}

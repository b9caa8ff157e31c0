use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use mimic_engine::{ReqwestBackend, Session, SessionProvider, SessionStore};
use mimic_logging::{mimic_debug, mimic_warn, LogDestination};

mod commands;
mod config;

use commands::{parse_credential, CredentialArg};

#[derive(Parser)]
#[command(name = "mimic")]
#[command(about = "Turn screen recordings into browser automation scripts")]
#[command(version)]
struct Cli {
    /// Path to the RON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend API base URL, e.g. http://localhost:8000/api
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token from a previous login
    #[arg(long, global = true, env = "MIMIC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log destination: terminal, file or both
    #[arg(long, global = true)]
    log: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account and print the session token
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// List uploaded videos
    Videos,

    /// Show backend automation health
    Health,

    /// Show analysis and execution status of an uploaded video
    Status {
        video_id: String,

        /// Also fetch the extracted steps and the last execution log
        #[arg(long)]
        results: bool,
    },

    /// Print the effective configuration as RON
    Config,

    /// Upload a recording, analyze it and write the automation script
    Run {
        /// Video file to upload
        video: PathBuf,

        /// Site credentials as label:username:password (repeatable)
        #[arg(long = "credential", value_parser = parse_credential)]
        credentials: Vec<CredentialArg>,

        /// Directory for the generated script
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_FILE));
    let (mut app_config, mut warnings) = config::load_config(&config_path);
    if let Some(base_url) = cli.base_url {
        app_config.base_url = base_url;
    }
    if let Some(log) = cli.log {
        app_config.log = log;
    }

    let destination = LogDestination::parse(&app_config.log).unwrap_or_else(|| {
        warnings.push(format!(
            "Unknown log destination {:?}, using terminal",
            app_config.log
        ));
        LogDestination::default()
    });
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    mimic_logging::initialize(destination, level, &app_config.log_file);
    for warning in warnings {
        mimic_warn!("{}", warning);
    }

    let session = match cli.token {
        Some(token) => SessionStore::with_token(token),
        None => SessionStore::new(),
    };
    session.on_change(Box::new(|session: Option<&Session>| match session {
        Some(_) => mimic_debug!("session established"),
        None => mimic_debug!("session cleared"),
    }));

    let ctx = commands::AppContext {
        backend: Arc::new(ReqwestBackend::new(app_config.api_settings())?),
        session: Arc::new(session),
        workflow: app_config.workflow_settings(),
    };

    match cli.command {
        Commands::Login { email, password } => commands::login(&ctx, &email, &password).await?,
        Commands::Signup {
            name,
            email,
            password,
        } => commands::signup(&ctx, &name, &email, &password).await?,
        Commands::Videos => commands::videos(&ctx).await?,
        Commands::Health => commands::health(&ctx).await?,
        Commands::Status { video_id, results } => {
            commands::status(&ctx, &video_id, results).await?
        }
        Commands::Config => println!("{}", app_config.to_ron()?),
        Commands::Run {
            video,
            credentials,
            output,
        } => {
            let output_dir = output.unwrap_or_else(|| app_config.output_dir.clone());
            commands::run(&ctx, &video, &credentials, &output_dir).await?
        }
    }

    Ok(())
}

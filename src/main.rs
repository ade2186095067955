use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vizzy::config::{ServerOverrides, VizzyConfig, user_project_dir};

mod cmd;

#[derive(Parser)]
#[command(name = "vizzy")]
#[command(version, about = "Project and image gallery manager")]
pub struct Cli {
    /// Log filter, e.g. "info" or "vizzy=debug"
    #[arg(long, global = true, env = "VIZZY_LOG", default_value = "warn")]
    pub log_level: String,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Gallery server URL for client commands (overrides [client] server_url)
    #[arg(long, global = true)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the gallery server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Write a default vizzy.toml and create the database
    Init {
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Overwrite an existing vizzy.toml
        #[arg(long)]
        force: bool,
    },
    /// Create a project with the naming wizard
    New {
        /// City code (DAL, AUS, HOU, SA, CC); skips the prompt
        #[arg(long)]
        city: Option<String>,

        /// Project type code (ES, MS, HS, HE, BP, UQ); skips the prompt
        #[arg(long = "type")]
        project_type: Option<String>,

        /// Project number, NN-NNN
        #[arg(long)]
        number: Option<String>,

        /// Short project name
        #[arg(long)]
        name: Option<String>,
    },
    /// List projects, optionally filtered
    List {
        /// Only these cities (repeatable)
        #[arg(long)]
        city: Vec<String>,

        /// Only these project types (repeatable)
        #[arg(long = "type")]
        project_type: Vec<String>,

        /// Case-insensitive search over names
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Rename a project, keeping its CITY-TYPE-NUMBER prefix
    Rename {
        id: i64,

        /// New short name; prompts when omitted
        #[arg(long)]
        name: Option<String>,
    },
    /// Project ordering
    Projects {
        #[command(subcommand)]
        command: ProjectsCommands,
    },
    /// Image metadata and ordering
    Images {
        #[command(subcommand)]
        command: ImagesCommands,
    },
    /// Show storage usage against the quota
    Storage,
}

#[derive(Subcommand, Clone)]
pub enum ProjectsCommands {
    /// Move a project onto another project's position
    Move { id: i64, onto: i64 },
}

#[derive(Subcommand, Clone)]
pub enum ImagesCommands {
    /// List a project's images in display order
    List {
        project_id: i64,

        /// Comma-separated phases, e.g. SD,DD
        #[arg(long)]
        phase: Option<String>,
    },
    /// Register an image with a project
    Add {
        project_id: i64,
        filename: String,

        /// Size in bytes; read from the file when omitted
        #[arg(long)]
        size: Option<i64>,

        #[arg(long)]
        phase: Option<String>,
    },
    /// Move an image onto another image's position
    Move { project_id: i64, id: i64, onto: i64 },
    /// Replace the whole order with the given ids
    Reorder {
        project_id: i64,
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().unwrap_or_else(|_| user_project_dir()),
    };
    let config = VizzyConfig::new(project_dir)?;
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }
    let server_url = config.server_url(cli.server.as_deref());

    match cli.command {
        Commands::Serve {
            host,
            port,
            db_path,
        } => {
            cmd::cmd_serve(
                &config,
                ServerOverrides {
                    host,
                    port,
                    db_path,
                },
            )
            .await?
        }
        Commands::Init { db_path, force } => cmd::cmd_init(&config, db_path.as_deref(), force)?,
        Commands::New {
            city,
            project_type,
            number,
            name,
        } => {
            let answers = cmd::WizardAnswers {
                city,
                project_type,
                number,
                name,
            };
            cmd::cmd_new(&server_url, answers).await?
        }
        Commands::List {
            city,
            project_type,
            search,
        } => cmd::cmd_list(&server_url, city, project_type, search).await?,
        Commands::Rename { id, name } => cmd::cmd_rename(&server_url, id, name).await?,
        Commands::Projects { command } => cmd::cmd_projects(&server_url, command).await?,
        Commands::Images { command } => cmd::cmd_images(&server_url, command).await?,
        Commands::Storage => cmd::cmd_storage(&server_url).await?,
    }

    Ok(())
}

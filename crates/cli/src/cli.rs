use crate::tracing::{LogLevel, TracingFormat};
use ciartifact_core::RepositoryRef;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG: &str = "ciartifact.toml";

#[derive(Parser, Debug)]
#[command(name = "ciartifact")]
#[command(about = "Resolve prebuilt CI artifacts through a local cache")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'c',
        long,
        global = true,
        help = "Configuration file",
        default_value = DEFAULT_CONFIG
    )]
    pub config: PathBuf,

    #[arg(
        long,
        global = true,
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "GitHub API token"
    )]
    pub token: Option<String>,

    #[arg(long, global = true, help = "GitHub API base URL")]
    pub api_url: Option<String>,

    #[arg(long, global = true, help = "Workflow file whose runs publish artifacts")]
    pub workflow: Option<String>,

    #[arg(long, global = true, help = "Local cache directory")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Runner operating system label")]
    pub os: Option<String>,

    #[arg(long, global = true, help = "Compiler family label")]
    pub compiler: Option<String>,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "info",
        value_enum
    )]
    pub log_level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,
}

/// Repository and branch a command operates on.
#[derive(Args, Debug, Clone)]
pub struct Target {
    #[arg(help = "Repository as owner/name")]
    pub repository: RepositoryRef,

    #[arg(
        short,
        long,
        default_value = "main",
        help = "Branch name or refs/heads/<branch>"
    )]
    pub branch: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Print the cache key for the branch head")]
    Key {
        #[command(flatten)]
        target: Target,
    },
    #[command(about = "Restore an install tree from the cache")]
    Restore {
        #[command(flatten)]
        target: Target,
        #[arg(long, help = "Directory to restore into")]
        install_dir: PathBuf,
    },
    #[command(about = "Save an install tree to the cache")]
    Save {
        #[command(flatten)]
        target: Target,
        #[arg(long, help = "Directory to save")]
        target_dir: PathBuf,
    },
    #[command(about = "Download and install the artifact built from the branch head")]
    Download {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value = "download", help = "Scratch directory for the outer archive")]
        download_dir: PathBuf,
        #[arg(long, help = "Directory to install into")]
        install_dir: PathBuf,
    },
    #[command(about = "Restore from the cache, falling back to a CI download")]
    Resolve {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value = "download", help = "Scratch directory for the outer archive")]
        download_dir: PathBuf,
        #[arg(long, help = "Directory to install into")]
        install_dir: PathBuf,
        #[arg(long, help = "Do not save a downloaded artifact to the cache")]
        no_save: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use toolwatch::config::{
    DEFAULT_BACKUP_FILE, DEFAULT_CATALOG_FILE, DEFAULT_MAX_DOWNLOAD_BYTES, DEFAULT_SITE_URL,
    DEFAULT_TOOLS_ROOT, Settings,
};

/// toolwatch - keep a local archive of tools listed on filehorse.com
///
/// Reads a YAML catalog of tool pages, checks each page for a newer
/// version, downloads it into the tools directory and records the result
/// back into the catalog.
///
/// Examples:
///   toolwatch update            # Check every tool in toollist.yml
///   toolwatch -f mine.yml sort  # Rewrite mine.yml in name order
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog file
    #[arg(
        long = "file",
        short = 'f',
        value_name = "PATH",
        default_value = DEFAULT_CATALOG_FILE,
        global = true
    )]
    pub catalog: PathBuf,

    /// Backup copy of the catalog
    #[arg(
        long = "backup",
        short = 'b',
        value_name = "PATH",
        default_value = DEFAULT_BACKUP_FILE,
        global = true
    )]
    pub backup: PathBuf,

    /// Directory downloaded tools are stored under (also via TOOLWATCH_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "TOOLWATCH_ROOT",
        value_name = "PATH",
        default_value = DEFAULT_TOOLS_ROOT,
        global = true
    )]
    pub tools_root: PathBuf,

    /// Site checked for connectivity before a pass
    #[arg(
        long = "site-url",
        env = "TOOLWATCH_SITE_URL",
        value_name = "URL",
        default_value = DEFAULT_SITE_URL,
        global = true
    )]
    pub site_url: String,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Check every tool for a new version and download it
    Update(UpdateArgs),

    /// Rewrite the catalog sorted by tool name
    Sort,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Re-download up-to-date tools whose file is missing
    #[arg(long)]
    pub verify: bool,

    /// Do not offer to remove failing tools after the pass
    #[arg(long)]
    pub skip_remove: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Refuse downloads larger than this
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_DOWNLOAD_BYTES)]
    pub max_size: u64,
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = Settings {
            catalog_path: self.catalog.clone(),
            backup_path: self.backup.clone(),
            tools_root: self.tools_root.clone(),
            site_url: self.site_url.clone(),
            ..Settings::default()
        };
        if let Commands::Update(args) = &self.command {
            settings.verify = args.verify;
            settings.skip_remove = args.skip_remove;
            settings.timeout = args.timeout.map(Duration::from_secs);
            settings.max_download_bytes = args.max_size;
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = toolwatch::runtime::RealRuntime;
    let settings = cli.settings();

    match cli.command {
        Commands::Update(_) => toolwatch::commands::update(runtime, settings).await?,
        Commands::Sort => toolwatch::commands::sort(runtime, settings)?,
    }
    Ok(())
}

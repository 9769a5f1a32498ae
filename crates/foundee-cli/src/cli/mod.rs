//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use foundee_core::config;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod router;

use commands::App;

#[derive(Parser)]
#[command(name = "foundee")]
#[command(version)]
#[command(about = "Foundee: QR-based lost and found")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FOUNDEE_LOG", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in (Google ID token or email and password)
    Login {
        /// Google ID token to exchange for a session
        #[arg(long, value_name = "TOKEN", conflicts_with = "email")]
        id_token: Option<String>,

        /// Email for password sign-in; the password is read from stdin
        #[arg(long)]
        email: Option<String>,

        /// Sign in again even if a session exists
        #[arg(long)]
        force: bool,
    },

    /// Sign out (clear the stored session)
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Manage your QR codes
    Codes {
        #[command(subcommand)]
        command: CodesCommands,
    },

    /// Scan a code from an image, a scanned URL, or a typed id
    Scan(ScanArgs),

    /// Look up a code as a finder
    View {
        /// Code id
        #[arg(value_name = "ID")]
        id: String,

        #[command(flatten)]
        location: LocationArgs,

        /// Claim the code if it is unclaimed
        #[arg(long)]
        claim: bool,
    },

    /// Edit your details and a code's visibility settings
    Edit(EditArgs),

    /// Show a client route (e.g. /qr/<id>, /update/<id>?bind=true)
    Open {
        #[arg(value_name = "ROUTE")]
        route: String,

        /// Open the route in the web client instead
        #[arg(long)]
        browser: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum CodesCommands {
    /// List your codes
    List,
    /// Create a new unbound code
    Create,
    /// Save a code's QR image as PNG
    Download {
        #[arg(value_name = "ID")]
        id: String,

        /// Output file or directory (default: current directory)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Show the effective configuration
    Show,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct LocationArgs {
    /// Latitude to report with the scan
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude to report with the scan
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,
}

#[derive(clap::Args, Debug, Clone)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["image", "payload", "id"])))]
pub struct ScanArgs {
    /// Image file(s) to read a QR code from, tried in order
    #[arg(long, value_name = "FILE", num_args = 1..)]
    pub image: Vec<PathBuf>,

    /// A scanned payload (the URL encoded in the code)
    #[arg(long, value_name = "TEXT")]
    pub payload: Option<String>,

    /// Enter a code id manually (no location is sent)
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,

    #[command(flatten)]
    pub location: LocationArgs,

    /// Do not report a location
    #[arg(long, conflicts_with_all = ["lat", "lng"])]
    pub no_location: bool,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Code id
    #[arg(value_name = "ID")]
    pub id: String,

    /// Claim the code before editing
    #[arg(long)]
    pub bind: bool,

    /// Set a field (e.g. --set mobile=555-0100)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub set: Vec<String>,

    /// Show a field to finders
    #[arg(long, value_name = "FIELD")]
    pub show: Vec<String>,

    /// Hide a field from finders
    #[arg(long, value_name = "FIELD")]
    pub hide: Vec<String>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    // Config commands work even when the config file is broken.
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Show => commands::config::show(),
        };
    }

    let config = config::Config::load().context("load config")?;
    let app = App::new(config)?;

    let next = match cli.command {
        Commands::Login {
            id_token,
            email,
            force,
        } => commands::auth::login(&app, id_token.as_deref(), email.as_deref(), force).await?,
        Commands::Logout => commands::auth::logout(&app)?,
        Commands::Whoami => commands::auth::whoami(&app).await?,
        Commands::Codes { command } => match command {
            CodesCommands::List => commands::codes::list(&app).await?,
            CodesCommands::Create => commands::codes::create(&app).await?,
            CodesCommands::Download { id, out } => {
                commands::codes::download(&app, &id, out.as_deref())?
            }
        },
        Commands::Scan(args) => commands::scan::run(&app, &args).await?,
        Commands::View {
            id,
            location,
            claim,
        } => commands::view::run(&app, &id, location.coordinates(), claim).await?,
        Commands::Edit(args) => commands::edit::run(&app, &args).await?,
        Commands::Open { route, browser } => commands::open::run(&app, &route, browser)?,
        Commands::Config { .. } => None,
    };

    match next {
        Some(route) => router::follow(&app, route).await,
        None => Ok(()),
    }
}

impl LocationArgs {
    pub fn coordinates(&self) -> Option<foundee_types::Coordinates> {
        match (self.lat, self.lng) {
            (Some(latitude), Some(longitude)) => Some(foundee_types::Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

//! Keygate admin CLI.
//!
//! Operates on the SQLite database named by `KEYGATE_DATABASE`, with the
//! administrator and signing secret taken from `KEYGATE_ADMIN_ID` and
//! `KEYGATE_SECRET`. Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use keygate::core::SubjectId;
use keygate::store::SqliteStore;
use keygate::{CallbackAction, Keygate, KeygateConfig, Template};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keygate")]
#[command(about = "Issue and redeem premium keys, and inspect entitlements")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a new key as the configured administrator
    Issue {
        /// Validity in days (1-365, default from KEYGATE_DEFAULT_VALID_DAYS or 30)
        days: Option<String>,
        /// Issue on behalf of this subject instead of the administrator
        #[arg(long)]
        requester: Option<String>,
    },
    /// Redeem a key for a subject
    Redeem {
        /// Subject receiving the grant
        subject: String,
        /// The key token
        token: String,
    },
    /// Show a subject's entitlement
    Status {
        /// Subject to inspect
        subject: String,
    },
    /// Resolve a front-end callback tag for a subject
    Route {
        /// Subject pressing the button
        subject: String,
        /// Callback tag, e.g. `template_MODERN`
        tag: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (config, secret) = KeygateConfig::from_env().context("loading configuration")?;
    let store = SqliteStore::open(&config.database)
        .with_context(|| format!("opening {}", config.database.display()))?;
    let admin = config.admin.clone();
    let gate = Keygate::new(store, secret, config);

    match cli.command {
        Commands::Issue { days, requester } => {
            let requester = match (requester, admin) {
                (Some(r), _) => SubjectId::new(r),
                (None, Some(a)) => a,
                (None, None) => bail!("no administrator configured"),
            };
            let args: Vec<&str> = days.as_deref().into_iter().collect();

            match gate.issue_args(&requester, &args).await {
                Ok(issued) => {
                    println!("Key:      {}", issued.key.token);
                    println!("Duration: {} days", issued.valid_days);
                    println!("Expires:  {}", issued.key.expires_on);
                }
                Err(e) => bail!("{} ({})", e.user_message(), e),
            }
        }
        Commands::Redeem { subject, token } => {
            let subject = SubjectId::new(subject);
            match gate.redeem(&subject, &token).await {
                Ok(redemption) => {
                    println!("Premium activated, valid until {}", redemption.expires_on);
                }
                Err(e) => bail!("{}", e.user_message()),
            }
        }
        Commands::Status { subject } => {
            let subject = SubjectId::new(subject);
            let entitled = gate.is_entitled(&subject).await;
            let expiry = gate.grant_expiry(&subject).await?;

            match (entitled, expiry) {
                (true, Some(date)) => println!("{subject}: premium until {date}"),
                (false, Some(date)) => println!("{subject}: premium expired on {date}"),
                (_, None) => println!("{subject}: no premium grant"),
            }
        }
        Commands::Route { subject, tag } => {
            let subject = SubjectId::new(subject);
            let action: CallbackAction = tag.parse()?;

            match action {
                CallbackAction::SelectTemplate(requested) => {
                    let template: Template = gate.resolve_template(&subject, requested).await;
                    println!("{action} -> render with {template}");
                }
                other => println!("{other}"),
            }
        }
    }

    Ok(())
}

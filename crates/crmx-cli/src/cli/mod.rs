//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crmx_core::config;

mod commands;

#[derive(Parser)]
#[command(name = "crmx")]
#[command(version = "1.0")]
#[command(about = "CRM session and sales pipeline CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in to the CRM backend
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Register a new account
    Register {
        #[arg(long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// Password (prompted twice when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Profile image to upload
        #[arg(long, value_name = "PATH")]
        profile_image: Option<PathBuf>,
    },

    /// Log out (blacklist the refresh token, clear the local session)
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Manage the user profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Bitrix24 contacts (via the CRM backend proxy)
    Contacts {
        #[command(subcommand)]
        command: ContactsCommands,
    },

    /// Bitrix24 deals and tasks (direct webhook)
    Deals {
        #[command(subcommand)]
        command: DealsCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ProfileCommands {
    /// Show the cached profile
    Show,
    /// Re-fetch the profile from the backend
    Refresh,
    /// Update profile fields (only the given fields are sent)
    Update {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Birth date, YYYY-MM-DD
        #[arg(long, value_name = "DATE")]
        birth_date: Option<String>,

        /// Replacement profile image
        #[arg(long, value_name = "PATH")]
        profile_image: Option<PathBuf>,
    },
    /// Change the account password
    ChangePassword {
        /// Current password (prompted when omitted)
        #[arg(long)]
        old_password: Option<String>,

        /// New password (prompted twice when omitted)
        #[arg(long)]
        new_password: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum ContactsCommands {
    /// List synced Bitrix24 contacts
    List,
}

#[derive(clap::Subcommand)]
enum DealsCommands {
    /// List deals by stage (waiting stage by default)
    List {
        /// Stage to filter by, e.g. WON
        #[arg(long, value_name = "STAGE_ID")]
        stage: Option<String>,
    },
    /// Create a deal (paid deals land in the won stage)
    Create {
        #[arg(long)]
        title: String,

        #[arg(long)]
        amount: f64,

        /// ISO currency code (default USD)
        #[arg(long)]
        currency: Option<String>,

        /// Mark the deal as already paid
        #[arg(long)]
        paid: bool,

        #[arg(long)]
        contact_id: Option<i64>,

        #[arg(long)]
        company_id: Option<i64>,

        /// Tax registration number
        #[arg(long, value_name = "TAX_ID")]
        tax: Option<String>,

        /// A contract has been signed
        #[arg(long)]
        contract: bool,

        #[arg(long)]
        comments: Option<String>,
    },
    /// Move a deal to the won stage
    Paid {
        #[arg(value_name = "DEAL_ID")]
        id: String,
    },
    /// Create a task bound to a deal
    Task {
        #[arg(value_name = "DEAL_ID")]
        deal_id: String,

        #[arg(long)]
        title: String,

        /// Tax registration number
        #[arg(long, value_name = "TAX_ID")]
        tax: Option<String>,

        /// A contract has been signed
        #[arg(long)]
        contract: bool,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Store the Bitrix24 inbound webhook URL
    SetWebhook {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;
    tracing::debug!(path = %config::paths::config_path().display(), "config loaded");

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&config, &email, password).await
        }
        Commands::Register {
            email,
            first_name,
            last_name,
            password,
            profile_image,
        } => {
            commands::auth::register(
                &config,
                commands::auth::RegisterArgs {
                    email,
                    first_name,
                    last_name,
                    password,
                    profile_image,
                },
            )
            .await
        }
        Commands::Logout => commands::auth::logout(&config).await,
        Commands::Whoami => commands::auth::whoami(&config),

        Commands::Profile { command } => match command {
            ProfileCommands::Show => commands::profile::show(&config),
            ProfileCommands::Refresh => commands::profile::refresh(&config).await,
            ProfileCommands::Update {
                first_name,
                last_name,
                bio,
                phone,
                birth_date,
                profile_image,
            } => {
                commands::profile::update(
                    &config,
                    commands::profile::UpdateArgs {
                        first_name,
                        last_name,
                        bio,
                        phone,
                        birth_date,
                        profile_image,
                    },
                )
                .await
            }
            ProfileCommands::ChangePassword {
                old_password,
                new_password,
            } => commands::profile::change_password(&config, old_password, new_password).await,
        },

        Commands::Contacts { command } => match command {
            ContactsCommands::List => commands::contacts::list(&config).await,
        },

        Commands::Deals { command } => match command {
            DealsCommands::List { stage } => {
                commands::deals::list(&config, stage.as_deref()).await
            }
            DealsCommands::Create {
                title,
                amount,
                currency,
                paid,
                contact_id,
                company_id,
                tax,
                contract,
                comments,
            } => {
                commands::deals::create(
                    &config,
                    crmx_core::types::NewDeal {
                        title,
                        amount,
                        currency,
                        paid,
                        responsible_id: None,
                        contact_id,
                        company_id,
                        category_id: None,
                        tax_registration: tax,
                        contract,
                        comments,
                    },
                )
                .await
            }
            DealsCommands::Paid { id } => commands::deals::paid(&config, &id).await,
            DealsCommands::Task {
                deal_id,
                title,
                tax,
                contract,
            } => {
                commands::deals::task(
                    &config,
                    crmx_core::types::NewTask {
                        title,
                        deal_id,
                        tax_registration: tax,
                        contract,
                    },
                )
                .await
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetWebhook { url } => commands::config::set_webhook(&url),
        },
    }
}

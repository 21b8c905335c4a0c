//! CLI entry and dispatch.

use airdash_core::config;
use anyhow::{Context, Result};
use clap::Parser;

use crate::logging;

mod commands;

#[derive(Parser)]
#[command(name = "airdash")]
#[command(version)]
#[command(about = "Air-quality dashboard client: session, favorites and account status")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in with email and password, or with Google
    Login {
        /// Account email
        #[arg(long, required_unless_present = "google")]
        email: Option<String>,

        /// Account password (read from stdin when omitted)
        #[arg(long, env = "AIRDASH_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Sign in through Google in the browser
        #[arg(long, conflicts_with = "email")]
        google: bool,

        /// Token from the Google callback URL (completes a Google sign-in)
        #[arg(long, requires = "google", value_name = "TOKEN")]
        token: Option<String>,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show the signed-in account (refreshed from the server)
    Whoami,

    /// Watch the session and account status until interrupted
    Watch {
        /// Screen to report to the status monitor
        #[arg(long, value_enum, default_value_t = WatchScreen::Dashboard)]
        screen: WatchScreen,
    },

    /// Manage favorite cities
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommands,
    },

    /// Manage recently viewed cities
    Recent {
        #[command(subcommand)]
        command: RecentCommands,
    },

    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Account password (read from stdin when omitted)
        #[arg(long, env = "AIRDASH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Confirm an email address with the token from the verification mail
    VerifyEmail {
        #[arg(value_name = "TOKEN")]
        token: String,
    },

    /// Send the verification mail again
    ResendVerification {
        #[arg(value_name = "EMAIL")]
        email: String,
    },

    /// Request a password reset mail
    ForgotPassword {
        #[arg(value_name = "EMAIL")]
        email: String,
    },

    /// Set a new password with the token from the reset mail
    ResetPassword {
        #[arg(value_name = "TOKEN")]
        token: String,
        /// New password (read from stdin when omitted)
        #[arg(long, env = "AIRDASH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Only check whether the token is still valid
        #[arg(long)]
        check: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum WatchScreen {
    Public,
    Dashboard,
    Admin,
}

#[derive(clap::Subcommand)]
enum FavoritesCommands {
    /// Lists favorite cities
    List,
    /// Adds a city to the favorites
    Add {
        #[arg(value_name = "CITY_ID")]
        city_id: String,
    },
    /// Removes a city from the favorites
    Remove {
        #[arg(value_name = "CITY_ID")]
        city_id: String,
    },
}

#[derive(clap::Subcommand)]
enum RecentCommands {
    /// Lists recently viewed cities, most recent first
    List,
    /// Records a city view
    Add {
        #[arg(value_name = "CITY_ID")]
        id: String,
        /// Display name
        #[arg(value_name = "NAME")]
        name: String,
        /// URL slug (defaults to the id)
        #[arg(long)]
        slug: Option<String>,
    },
    /// Clears the list
    Clear,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even when the config file is broken.
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let config = config::Config::load().context("load config")?;
    logging::init(&config.logging);

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli.command, &config).await })
}

async fn dispatch(command: Commands, config: &config::Config) -> Result<()> {
    match command {
        Commands::Login {
            email,
            password,
            google,
            token,
        } => {
            if google {
                commands::auth::login_google(config, token.as_deref()).await
            } else {
                let email = email.context("--email is required")?;
                commands::auth::login(config, &email, password).await
            }
        }
        Commands::Logout => commands::auth::logout(config).await,
        Commands::Whoami => commands::auth::whoami(config).await,
        Commands::Watch { screen } => commands::watch::run(config, screen).await,

        Commands::Favorites { command } => match command {
            FavoritesCommands::List => commands::favorites::list(config).await,
            FavoritesCommands::Add { city_id } => commands::favorites::add(config, &city_id).await,
            FavoritesCommands::Remove { city_id } => {
                commands::favorites::remove(config, &city_id).await
            }
        },

        Commands::Recent { command } => match command {
            RecentCommands::List => commands::recent::list(config).await,
            RecentCommands::Add { id, name, slug } => {
                commands::recent::add(config, id, name, slug).await
            }
            RecentCommands::Clear => commands::recent::clear(config).await,
        },

        Commands::Register {
            email,
            first_name,
            last_name,
            password,
        } => commands::account::register(config, email, first_name, last_name, password).await,
        Commands::VerifyEmail { token } => commands::account::verify_email(config, &token).await,
        Commands::ResendVerification { email } => {
            commands::account::resend_verification(config, &email).await
        }
        Commands::ForgotPassword { email } => {
            commands::account::forgot_password(config, &email).await
        }
        Commands::ResetPassword {
            token,
            password,
            check,
        } => commands::account::reset_password(config, &token, password, check).await,

        Commands::Config { .. } => Ok(()),
    }
}

/*
[INPUT]:  CLI arguments, YAML configuration file
[OUTPUT]: Wallet sign-in, registration and session management commands
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or startup flow
*/

mod cli;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use console::style;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use marketplace_auth::{
    CreateProductRequest, LoginOutcome, RegistrationDetails, Role, UpdateUserRequest,
};
use rust_decimal::Decimal;
use marketplace_cli::{App, CliConfig, app};

use cli::output::{
    print_order, print_orders, print_product, print_products, print_snapshot, print_stats,
    print_user, spawn_notice_printer,
};
use cli::prompt::prompt_registration;

const NOTICE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "marketplace", version, about = "Wallet sign-in client for the marketplace backend")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: String,
    /// Override the API base URL from the config file
    #[arg(long = "api-url", value_name = "URL", global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create (or show) the local wallet key
    Keygen {
        #[arg(long)]
        label: Option<String>,
    },
    /// Sign in with the wallet, registering it when needed
    Login {
        /// Stop instead of prompting when the wallet has no account
        #[arg(long = "no-register")]
        no_register: bool,
    },
    /// Register the wallet without prompts
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        country: String,
        #[arg(long, default_value = "buyer")]
        role: Role,
    },
    /// Sign out and forget the local session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show the locally stored session without contacting the backend
    Status,
    /// Update the profile of the signed-in user
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        country: Option<String>,
    },
    /// List marketplace products
    Products {
        /// Only the signed-in seller's listings
        #[arg(long)]
        mine: bool,
    },
    /// Show one product
    Product { id: String },
    /// Publish a new listing
    Sell {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        category: String,
        /// Image URL, repeatable
        #[arg(long = "image")]
        images: Vec<String>,
    },
    /// List orders of the signed-in user
    Orders,
    /// Show one order
    Order { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let mut config = CliConfig::load(args.config_path.as_deref()).context("load config")?;
    if let Some(api_url) = args.api_url {
        config.api_base_url = api_url;
    }
    info!(api = %config.api_base_url, "configuration loaded");

    let app = App::open(&config).await?;
    let printer = spawn_notice_printer(app.session().subscribe_notices());
    let result = run(&app, &config, args.command).await;

    // Dropping the app closes the notice channel; the printer drains what is queued.
    drop(app);
    match tokio::time::timeout(NOTICE_DRAIN_TIMEOUT, printer).await {
        Ok(Ok(printed)) => debug!(printed, "notices flushed"),
        Ok(Err(err)) => warn!(error = %err, "notice printer failed"),
        Err(_) => warn!("notice printer did not finish"),
    }
    result
}

async fn run(app: &App, config: &CliConfig, command: Command) -> Result<()> {
    match command {
        Command::Keygen { label } => {
            let label = label.as_deref().unwrap_or(&config.wallet_label);
            let wallet = app::keygen(config, label)?;
            println!("{} {}", style("address").dim(), wallet.address());
            println!("{} {}", style("public key").dim(), wallet.public_key_hex());
        }
        Command::Login { no_register } => match app.login().await? {
            LoginOutcome::Authenticated(user) => print_user(&user),
            LoginOutcome::NeedsRegistration { wallet } => {
                if no_register {
                    return Err(anyhow!("wallet {wallet} is not registered"));
                }
                let Some(details) = prompt_registration(&wallet)? else {
                    println!("{}", style("Registration skipped").yellow());
                    return Ok(());
                };
                print_user(&app.register(details).await?);
            }
        },
        Command::Register {
            email,
            name,
            country,
            role,
        } => {
            let details = RegistrationDetails {
                email,
                name,
                country,
                role,
            };
            print_user(&app.login_or_register(details).await?);
        }
        Command::Logout => app.logout().await,
        Command::Whoami => {
            let (user, stats) = app.whoami().await?;
            print_user(&user);
            if let Some(stats) = stats {
                print_stats(&stats);
            }
        }
        Command::Status => print_snapshot(&app.status()),
        Command::Profile { name, country } => {
            let user = app
                .update_profile(UpdateUserRequest { name, country })
                .await?;
            print_user(&user);
        }
        Command::Products { mine } => print_products(&app.products(mine).await?),
        Command::Product { id } => print_product(&app.product(&id).await?),
        Command::Sell {
            name,
            price,
            description,
            quantity,
            category,
            images,
        } => {
            let listing = CreateProductRequest {
                name,
                price,
                description,
                quantity,
                category,
                images,
            };
            print_product(&app.create_product(listing).await?);
        }
        Command::Orders => print_orders(&app.orders().await?),
        Command::Order { id } => print_order(&app.order(&id).await?),
    }
    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

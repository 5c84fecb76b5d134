//! VIP CLI - user record and reference collection tools.
//!
//! # Usage
//!
//! ```bash
//! # List users, filtered and paged like the admin list
//! vip-cli users list --search ana --role admin --status active --page 2 --per-page 20
//!
//! # Show one user record
//! vip-cli users show 5e1c0b9a-...
//!
//! # Deactivate a user (users are never deleted)
//! vip-cli users set-active 5e1c0b9a-... false
//!
//! # Dump a reference collection
//! vip-cli references product-selections
//! ```
//!
//! Reads the same environment as the admin binary (`CTP_*`, `ADMIN_*`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use vip_admin_core::ReferenceKind;

mod commands;

#[derive(Parser)]
#[command(name = "vip-cli")]
#[command(author, version, about = "VIP Admin CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage application users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Print a reference collection (channels, categories, product-selections, stores)
    References {
        /// Collection to print
        kind: ReferenceKind,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List one page of users
    List {
        /// Case-insensitive email or name search
        #[arg(short, long)]
        search: Option<String>,

        /// Role filter (`all`, `admin`, `user`)
        #[arg(short, long)]
        role: Option<String>,

        /// Status filter (`all`, `active`, `inactive`)
        #[arg(long)]
        status: Option<String>,

        /// 1-based page
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Page size (10, 20, 50 or 100)
        #[arg(long, default_value_t = 10)]
        per_page: u32,
    },
    /// Show a user by custom object id
    Show {
        /// Custom object id
        id: String,
    },
    /// Activate or deactivate a user
    SetActive {
        /// Custom object id
        id: String,

        /// `true` to activate, `false` to deactivate
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Users { action } => match action {
            UsersAction::List {
                search,
                role,
                status,
                page,
                per_page,
            } => {
                let filters = commands::users::ListFilters {
                    search,
                    role,
                    status,
                    page,
                    per_page,
                };
                commands::users::list(&filters).await?;
            }
            UsersAction::Show { id } => commands::users::show(&id).await?,
            UsersAction::SetActive { id, active } => {
                commands::users::set_active(&id, active).await?;
            }
        },
        Commands::References { kind } => commands::references::print(kind).await?,
    }
    Ok(())
}

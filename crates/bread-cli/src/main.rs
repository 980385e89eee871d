use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod config;
mod update_checker;

#[derive(Parser)]
#[command(name = "bread")]
#[command(about = "Bread package manager for the Roblox ecosystem 🥖", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Bread project
    Init {
        /// Project name in the form user/project
        #[arg(long, default_value = "user/test")]
        name: String,
    },
    /// Install project dependencies
    #[command(alias = "i")]
    Install,
    /// Add a dependency to the manifest and install it
    Add {
        /// Package spec, e.g. scope/name@^1.2.0
        spec: String,
        /// Realm to add the dependency to (shared, server, dev)
        #[arg(long, default_value = "shared")]
        realm: String,
        /// Alias to register the dependency under
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove a dependency and reinstall remaining packages
    #[command(aliases = ["rm", "uninstall"])]
    Remove {
        /// Dependency alias to remove
        alias: String,
    },
    /// Check for outdated dependencies
    Outdated,
    /// Create wally.toml from bread.toml
    Convert,
    /// Print the bread version
    Version,
    /// Update bread itself to the latest release
    SelfUpdate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::SelfUpdate | Commands::Version) {
        update_checker::UpdateChecker::new().check_for_updates().await;
    }

    let result = match cli.command {
        Commands::Init { name } => commands::init::run(&name),
        Commands::Install => commands::install::run().await,
        Commands::Add { spec, realm, name } => {
            commands::add::run(&spec, &realm, name.as_deref()).await
        }
        Commands::Remove { alias } => commands::remove::run(&alias).await,
        Commands::Outdated => commands::outdated::run().await,
        Commands::Convert => commands::convert::run(),
        Commands::Version => {
            println!("bread {}", config::APP_VERSION);
            Ok(())
        }
        Commands::SelfUpdate => commands::self_update::run().await,
    };

    if let Err(err) = result {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

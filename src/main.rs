mod access;
mod categorizer;
mod cli;
mod db;
mod error;
mod fmt;
mod models;
mod settings;
mod simplefin;
mod sync;
#[cfg(test)]
mod test_support;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{AccountsCommands, Cli, Commands, RulesCommands, SimplefinCommands};
use error::Result;
use settings::{load_settings, Settings};
use simplefin::SimpleFinClient;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Init { data_dir } => cli::init::run(settings, data_dir),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add {
                name,
                account_type,
                institution,
                currency,
            } => cli::accounts::add(settings, &name, &account_type, institution.as_deref(), &currency),
            AccountsCommands::List => cli::accounts::list(settings),
        },
        Commands::Rules { command } => match command {
            RulesCommands::Add {
                pattern,
                category,
                vendor,
                match_type,
                priority,
            } => cli::rules::add(settings, &pattern, &category, vendor.as_deref(), &match_type, priority),
            RulesCommands::List => cli::rules::list(settings),
        },
        Commands::Categorize => cli::categorize::run(settings),
        Commands::Simplefin { command } => {
            let client = SimpleFinClient::new(settings.http_timeout())?;
            match command {
                SimplefinCommands::Claim { token } => cli::simplefin::claim(settings, &client, &token),
                SimplefinCommands::Fetch {
                    days,
                    balances_only,
                    output,
                } => cli::simplefin::fetch(settings, &client, days, balances_only, output.as_deref()),
                SimplefinCommands::Sync { days, balances_only } => {
                    cli::simplefin::sync(settings, &client, days, balances_only)
                }
            }
        }
        Commands::Access {
            path,
            user,
            token,
            api,
        } => cli::access::run(settings, &path, user.as_deref(), token.as_deref(), api),
        Commands::Status => cli::status::run(settings),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = load_settings();
    if let Err(e) = run(cli.command, &settings) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

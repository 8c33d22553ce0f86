pub mod access;
pub mod accounts;
pub mod categorize;
pub mod init;
pub mod rules;
pub mod simplefin;
pub mod status;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dollardollar", about = "Personal-finance ledger with SimpleFin account sync.")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the ledger database.
    Init {
        /// Path for ledger data (default: ~/Documents/dollardollar)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Manage categorization rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Re-run categorization rules on uncategorized transactions.
    Categorize,
    /// Connect to and pull data from a SimpleFin bridge.
    Simplefin {
        #[command(subcommand)]
        command: SimplefinCommands,
    },
    /// Check what the access policy decides for a request.
    Access {
        /// Request path, e.g. /simplefin/connect
        path: String,
        /// Logged-in session user
        #[arg(long)]
        user: Option<String>,
        /// Bearer token (API requests)
        #[arg(long)]
        token: Option<String>,
        /// Treat as a JSON API request
        #[arg(long)]
        api: bool,
    },
    /// Show configuration and ledger summary.
    Status,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a manual account.
    Add {
        /// Account name, e.g. 'Joint Checking'
        name: String,
        /// Account type: checking, savings, credit, investment, loan
        #[arg(long = "type", default_value = "checking")]
        account_type: String,
        /// Institution name
        #[arg(long)]
        institution: Option<String>,
        /// ISO currency code
        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// List all accounts.
    List,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a categorization rule.
    Add {
        /// Pattern to match against description or payee
        pattern: String,
        /// Category name to assign
        #[arg(long)]
        category: String,
        /// Vendor name to record
        #[arg(long)]
        vendor: Option<String>,
        /// Match type: contains, starts_with, regex
        #[arg(long = "match-type", default_value = "contains")]
        match_type: String,
        /// Higher priority rules are tried first
        #[arg(long, default_value_t = 0)]
        priority: i64,
    },
    /// List active rules.
    List,
}

#[derive(Subcommand)]
pub enum SimplefinCommands {
    /// Claim a setup token and store the resulting access URL.
    Claim {
        /// Base64 setup token from the SimpleFin bridge
        token: String,
    },
    /// Fetch and normalize accounts without touching the ledger.
    Fetch {
        /// Days of transaction history (default: settings lookback_days)
        #[arg(long)]
        days: Option<u32>,
        /// Fetch balances only, no transactions
        #[arg(long = "balances-only", conflicts_with = "days")]
        balances_only: bool,
        /// Write the normalized result as pretty JSON
        #[arg(long)]
        output: Option<String>,
    },
    /// Fetch, normalize, store in the ledger, and categorize.
    Sync {
        /// Days of transaction history (default: settings lookback_days)
        #[arg(long)]
        days: Option<u32>,
        /// Fetch balances only, no transactions
        #[arg(long = "balances-only", conflicts_with = "days")]
        balances_only: bool,
    },
}

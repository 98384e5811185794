use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database and config
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Permanently remove soft-deleted rows now
    Sweep {
        /// Data directory for the database and config
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show server status information
    Info {
        /// Data directory for the database and config
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a new user with an optional session token
    Add {
        /// Data directory for the database and config
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Username for the new user
        #[arg(long)]
        username: Option<String>,

        /// Create a session token for the new user
        #[arg(long)]
        create_token: bool,

        /// Skip interactive prompts (requires --username)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Soft-delete a user, revoking their tokens and API keys
    Remove {
        /// Data directory for the database and config
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// User ID to remove
        #[arg(long)]
        user_id: Option<i64>,

        /// Skip interactive prompts (requires --user-id)
        #[arg(long)]
        non_interactive: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

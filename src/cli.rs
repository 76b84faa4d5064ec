use clap::{Parser, Subcommand};

/// Service desk: IT service requests with emailed manager approval
#[derive(Parser)]
#[command(name = "service-desk", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to bind (defaults to PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Hash an admin password for ADMIN_PASSWORD_HASH (reads stdin)
    HashPassword,

    /// Inspect and manage stored requests
    Request {
        #[command(subcommand)]
        command: RequestCommands,
    },
}

#[derive(Subcommand)]
pub enum RequestCommands {
    /// List requests in display order
    List,
    /// Approve the request holding this token (notifies IT)
    Approve { token: String },
    /// Disapprove the request holding this token
    Disapprove { token: String },
    /// Delete a request and renumber the rest
    Delete { id: i64 },
    /// Delete every request
    ClearAll {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

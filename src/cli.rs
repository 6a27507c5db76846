use clap::{Parser, Subcommand};

/// groupsync — security group sync service
#[derive(Parser)]
#[command(name = "groupsync", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP service
    Serve {
        /// Port to bind (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one reconciliation pass and exit
    Sync,
}

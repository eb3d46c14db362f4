use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Topic whose replies are loaded.
    #[arg(long)]
    pub topic: String,
    /// Acts as this user instead of REPLYTREE_USER_ID.
    #[arg(long)]
    pub as_user: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Show {
        #[arg(long, default_value_t = false)]
        json: bool,
        #[arg(long)]
        collapse: Vec<String>,
    },
    Reply {
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        content: String,
    },
    Edit {
        #[arg(long)]
        id: String,
        #[arg(long)]
        content: String,
    },
    Delete {
        #[arg(long)]
        id: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    Like {
        #[arg(long)]
        id: String,
    },
}

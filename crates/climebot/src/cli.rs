use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "climebot")]
#[command(author, version, about = "Point-of-sale and inventory bot for the Clime record store", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Write a day's sales report without the bot
    Report {
        /// Day to report, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Bulk-add records from a CSV of `query,price[,quantity][,condition]`
    Import {
        /// Path to the CSV file
        file: PathBuf,
    },

    /// Copy the database into the backups directory
    Backup,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

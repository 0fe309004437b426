use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::job::Operation;

#[derive(Parser)]
#[command(name = "forcedata")]
#[command(about = "Data loads for the Salesforce Bulk API from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store connected-app credentials in the OS keyring
    Auth {
        /// Username (credential flow only)
        #[arg(short, long, default_value = "")]
        username: String,

        /// Password plus security token (credential flow only)
        #[arg(short, long, default_value = "")]
        password: String,

        /// Client ID, the Consumer Key of the connected app
        #[arg(long)]
        client_id: String,

        /// Client Secret, the Consumer Secret of the connected app
        /// (credential flow only)
        #[arg(long, default_value = "")]
        client_secret: String,

        /// Login URL (e.g. https://login.salesforce.com)
        #[arg(long)]
        url: String,
    },

    /// Authenticate and write the session info as JSON
    Login {
        /// Load credentials from a JSON file instead of keyring/env
        #[arg(long)]
        file: Option<PathBuf>,

        /// Write session info to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Load data from a CSV file (or stdin) into an object
    Load {
        /// File to upload; omit to read CSV content from stdin
        path: Option<PathBuf>,

        /// Object being loaded
        #[arg(long)]
        object: String,

        /// Operation to perform on the object
        #[arg(short, long, value_enum)]
        operation: Operation,

        /// Delimiter used in the file
        #[arg(long, default_value = ",")]
        delim: String,

        /// Session file written by `forcedata login`
        #[arg(long)]
        session: Option<PathBuf>,

        /// Poll the server for job progress every SECS seconds
        #[arg(long, value_name = "SECS", num_args = 0..=1, default_missing_value = "5")]
        watch: Option<u64>,
    },
}

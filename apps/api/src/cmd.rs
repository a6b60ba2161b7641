use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "careerhub-api", version, about = "Job catalog HTTP API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Load a JSON array of job documents into the job collection
    Seed {
        /// Path to the converted job documents
        #[arg(short, long)]
        file: PathBuf,
        /// Delete existing jobs before loading
        #[arg(long)]
        replace: bool,
    },
}

//! Clap-derived command surface for the `art` binary.

use clap::{Parser, Subcommand};

/// art — a demo harness for the agent runtime core.
#[derive(Debug, Parser)]
#[command(name = "art", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a single turn against a session and print the final output.
    Run {
        /// The message to send.
        message: String,
        /// Session id (a fresh one is generated if omitted).
        #[arg(long)]
        session: Option<String>,
        /// Output the full outcome as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Run a single turn, printing each event as an NDJSON line as it
    /// arrives rather than waiting for the final outcome.
    Stream {
        /// The message to send.
        message: String,
        /// Session id (a fresh one is generated if omitted).
        #[arg(long)]
        session: Option<String>,
    },
    /// Delete all steps at or after a sequence number, then resume.
    Retry {
        /// Session to retry.
        session: String,
        /// Sequence number to retry from (inclusive).
        #[arg(long)]
        from: u64,
    },
    /// Copy a session's prefix up to and including a sequence number into
    /// a new session.
    Fork {
        /// Session to fork.
        session: String,
        /// Sequence number to fork at (inclusive).
        #[arg(long)]
        at: u64,
    },
    /// Session inspection utilities.
    #[command(subcommand)]
    Sessions(SessionsCommand),
}

#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    /// List the session ids known to the store.
    List,
    /// Print every step recorded in a session.
    Show {
        /// Session to show.
        session: String,
    },
}

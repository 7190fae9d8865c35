//! Command line parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cv_core::VoteDirection;

/// Client for the campvoiceus campus forum.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Settings file layered over the built-in defaults.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in; the password comes from config or stdin.
    Login { identifier: Option<String> },
    /// Create an account; the password is read from stdin.
    Register { name: String, username: String, email: String },
    Logout,
    /// Home feed.
    Feed,
    /// Threads written by the logged-in user.
    Mine,
    Tag { tag: String },
    /// Another user's profile and threads.
    Author { user_id: String },
    Thread { id: String },
    /// Vote on a thread (up|down).
    Vote { thread_id: String, direction: VoteDirection },
    /// Vote on a comment (up|down).
    VoteComment { thread_id: String, comment_id: String, direction: VoteDirection },
    /// Who voted on a thread.
    Voters { thread_id: String },
    /// Reply to a thread; remaining words form the text.
    Comment {
        thread_id: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    Post {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Comma or space separated.
        #[arg(long)]
        tags: Option<String>,
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Show the profile, or update the fields given.
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long, value_name = "PATH")]
        avatar: Option<PathBuf>,
    },
    Notifications,
    PushToken { token: String },
}

impl Command {
    /// Whether the stored session has to be restored before running.
    /// Logging in, registering and logging out work without one.
    pub fn needs_session(&self) -> bool {
        !matches!(self, Command::Login { .. } | Command::Register { .. } | Command::Logout)
    }
}

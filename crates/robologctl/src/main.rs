//! Robolog Control - admin CLI for the robolog daemon.
//!
//! Everything the classroom admin panel does, from a terminal: students,
//! level locks, resets, manual awards and the XP audit trail.

mod client;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::ApiClient;

#[derive(Parser)]
#[command(name = "robologctl")]
#[command(about = "Robolog - classroom robotics progress tracker", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the robolog daemon
    #[arg(long, default_value = "http://127.0.0.1:7878")]
    url: String,

    /// Admin PIN (defaults to the ROBOLOG_ADMIN_PIN environment variable)
    #[arg(long)]
    pin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon health
    Status,

    /// Show a student's XP standing
    Stats {
        /// Student id
        student: String,
    },

    /// Manage students
    Students {
        #[command(subcommand)]
        command: StudentsCommand,
    },

    /// Manage per-level unlock gates
    Locks {
        #[command(subcommand)]
        command: LocksCommand,
    },

    /// Reset a student's progress or XP
    Reset {
        #[command(subcommand)]
        command: ResetCommand,
    },

    /// Grant a manual XP award
    Award {
        student: String,
        robot: String,
        amount: i64,

        /// Note recorded on the ledger row
        #[arg(long)]
        note: Option<String>,
    },

    /// Show a student's XP ledger
    Events {
        student: String,

        /// Restrict to one robot
        #[arg(long)]
        robot: Option<String>,
    },
}

#[derive(Subcommand)]
enum StudentsCommand {
    /// List all students
    List,

    /// Add a student
    Add {
        name: String,

        /// Course cohort, e.g. "7b"
        #[arg(long, default_value = "")]
        course: String,
    },

    /// Rename a student (and optionally move them to another course)
    Rename {
        id: String,
        name: String,

        #[arg(long, default_value = "")]
        course: String,
    },

    /// Remove students and everything they own
    Remove {
        /// One or more student ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum LocksCommand {
    /// Show lock state for a robot
    List {
        robot: String,

        #[arg(long, default_value = "")]
        course: String,
    },

    /// Open a level for a cohort
    Unlock {
        robot: String,
        level: String,

        #[arg(long, default_value = "")]
        course: String,
    },

    /// Close a level for a cohort
    Lock {
        robot: String,
        level: String,

        #[arg(long, default_value = "")]
        course: String,
    },
}

#[derive(Subcommand)]
enum ResetCommand {
    /// Wipe checklist progress (and its XP) for one robot
    Progress {
        student: String,
        robot: String,

        /// Only reset levels 0..=N instead of everything
        #[arg(long)]
        up_to: Option<usize>,
    },

    /// Wipe scoring while keeping checklist completion
    Xp {
        student: String,

        /// Restrict to one robot; omitting resets the whole student
        #[arg(long)]
        robot: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let pin = cli
        .pin
        .or_else(|| std::env::var("ROBOLOG_ADMIN_PIN").ok());
    let client = ApiClient::new(cli.url, pin);

    match cli.command {
        Commands::Status => commands::status(&client).await,
        Commands::Stats { student } => commands::stats(&client, &student).await,
        Commands::Students { command } => match command {
            StudentsCommand::List => commands::students_list(&client).await,
            StudentsCommand::Add { name, course } => {
                commands::students_add(&client, &name, &course).await
            }
            StudentsCommand::Rename { id, name, course } => {
                commands::students_rename(&client, &id, &name, &course).await
            }
            StudentsCommand::Remove { ids } => commands::students_remove(&client, &ids).await,
        },
        Commands::Locks { command } => match command {
            LocksCommand::List { robot, course } => {
                commands::locks_list(&client, &robot, &course).await
            }
            LocksCommand::Unlock { robot, level, course } => {
                commands::locks_set(&client, &robot, &level, &course, true).await
            }
            LocksCommand::Lock { robot, level, course } => {
                commands::locks_set(&client, &robot, &level, &course, false).await
            }
        },
        Commands::Reset { command } => match command {
            ResetCommand::Progress { student, robot, up_to } => {
                commands::reset_progress(&client, &student, &robot, up_to).await
            }
            ResetCommand::Xp { student, robot } => {
                commands::reset_xp(&client, &student, robot.as_deref()).await
            }
        },
        Commands::Award { student, robot, amount, note } => {
            commands::award(&client, &student, &robot, amount, note.as_deref()).await
        }
        Commands::Events { student, robot } => {
            commands::events(&client, &student, robot.as_deref()).await
        }
    }
}

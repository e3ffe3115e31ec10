use chores_core::model::{Frequency, Priority};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Shared household chores with reminders", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage households
    Group {
        #[command(subcommand)]
        group: GroupCommand,
    },
    /// Add a chore to a household
    ///
    /// Example: chores add "Take out the bins" --group home --priority urgent --frequency weekly
    Add {
        name: String,
        #[arg(long)]
        group: Option<String>,
        #[arg(long, default_value = "normal")]
        priority: Priority,
        #[arg(long, default_value = "none")]
        frequency: Frequency,
        #[arg(long, default_value_t = 1)]
        points: u32,
        #[arg(long = "assign", value_name = "USER")]
        assign: Option<String>,
    },
    /// Mark a chore as done
    ///
    /// Example: chores done task-1 --as ana
    Done {
        id: String,
        #[arg(long = "as", value_name = "USER")]
        user: String,
    },
    /// List chores
    ///
    /// Example: chores list --group home --pending
    List {
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        pending: bool,
    },
    /// Show the points table of a household
    Scores { group: String },
    /// Send reminders that are due now
    ///
    /// Example: chores remind --at 2025-06-16T14:00:00+02:00
    Remind {
        #[arg(long)]
        group: Option<String>,
        /// Evaluate as if the current time were this RFC3339 instant
        #[arg(long, value_name = "RFC3339")]
        at: Option<String>,
    },
    /// Clear completion of recurring chores whose period ended
    ///
    /// Example: chores reset --group home --as ana
    Reset {
        #[arg(long)]
        group: Option<String>,
        /// Reset on behalf of a member; only the group admin has effect
        #[arg(long = "as", value_name = "USER")]
        caller: Option<String>,
        #[arg(long, value_name = "RFC3339")]
        at: Option<String>,
    },
    /// Run the reminder and reset jobs until interrupted
    Daemon {
        #[arg(long)]
        group: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Create a household with yourself as admin
    ///
    /// Example: chores group create Home --admin ana
    Create {
        name: String,
        #[arg(long)]
        admin: String,
    },
    /// Add a member to a household
    ///
    /// Example: chores group join group-1 ben
    Join { group_id: String, user: String },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use chores_core::model::{Frequency, Priority};
    use clap::Parser;

    #[test]
    fn add_parses_priority_and_frequency() {
        let cli = Cli::try_parse_from([
            "chores",
            "add",
            "Hoover",
            "--priority",
            "urgent",
            "--frequency",
            "monthly",
        ])
        .unwrap();

        match cli.command {
            Command::Add {
                priority,
                frequency,
                points,
                ..
            } => {
                assert_eq!(priority, Priority::Urgent);
                assert_eq!(frequency, Frequency::Monthly);
                assert_eq!(points, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_rejects_unknown_priority() {
        let err = Cli::try_parse_from(["chores", "add", "Hoover", "--priority", "someday"])
            .unwrap_err();
        assert!(err.to_string().contains("unknown priority"));
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "chores",
            "remind",
            "--json",
            "--config-override",
            "group=home",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.config_override, vec!["group=home".to_string()]);
    }
}

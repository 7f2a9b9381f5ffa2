use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "paceboard",
    version,
    about = "Terminal dashboard for habits, journal and ideal self"
)]
pub struct Cli {
    /// Habit service base URL (overrides config and PACEBOARD_SERVER)
    #[arg(long, global = true)]
    pub server: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch the interactive TUI
    Tui,
    /// List habits with their targets, streaks and scores
    Habits,
    /// Add a new habit
    AddHabit {
        /// Habit name
        name: String,
        /// Display color as #rrggbb
        #[arg(long)]
        color: Option<String>,
        /// Target completions per week (1-7)
        #[arg(long)]
        target: Option<String>,
    },
    /// Flip today's completion for a habit
    Toggle {
        /// Habit id
        id: String,
    },
    /// Change a habit's color or weekly target
    EditHabit {
        /// Habit id
        id: String,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        target: Option<String>,
    },
    /// Print ideal vs actual progress for a habit
    Progress {
        /// Habit id
        id: String,
        /// Range in days: 7, 14, 30 or 90
        #[arg(long)]
        days: Option<u32>,
    },
    /// List journal entries, newest first
    Journal,
    /// Add a journal entry
    Write {
        /// Entry text
        content: String,
    },
    /// Show the ideal self, or save it when flags are given
    Vision {
        #[arg(long)]
        vision: Option<String>,
        /// Comma separated focus areas
        #[arg(long)]
        focus: Option<String>,
    },
    /// Ask the service to load its demo habits
    Seed,
    /// Print the plain-text habit and journal timeline
    Timeline,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["paceboard"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.server.is_none());
    }

    #[test]
    fn server_flag_is_global() {
        let cli =
            Cli::try_parse_from(["paceboard", "progress", "3", "--days", "14", "--server", "http://h:1"])
                .unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://h:1"));
        match cli.command {
            Some(Command::Progress { id, days }) => {
                assert_eq!(id, "3");
                assert_eq!(days, Some(14));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

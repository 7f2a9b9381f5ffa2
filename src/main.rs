mod chart;
mod cli;
mod commands;
mod config;
mod dispatch;
mod gateway;
mod habits;
mod ideal_self;
mod journal;
mod logging;
mod model;
mod progress;
mod selection;
mod session;
mod storage;
mod toast;
mod ui;
mod visibility;

use anyhow::Result;
use clap::Parser;
use gateway::HttpGateway;
use std::io;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let config = config::Config::load(args.server.as_deref())?;
    let _log_guard = logging::init_logging(&config.log_level);
    tracing::info!(server = %config.server_url, "paceboard starting");

    let command = args.command.unwrap_or(cli::Command::Tui);
    let gateway = HttpGateway::new(&config.server_url);
    let out = &mut io::stdout();
    match command {
        cli::Command::Tui => commands::tui(config),
        cli::Command::Habits => commands::habits(&gateway, out),
        cli::Command::AddHabit {
            name,
            color,
            target,
        } => commands::add_habit(&gateway, out, name, color, target),
        cli::Command::Toggle { id } => commands::toggle(&gateway, out, id),
        cli::Command::EditHabit { id, color, target } => {
            commands::edit_habit(&gateway, out, id, color, target)
        }
        cli::Command::Progress { id, days } => commands::progress(&gateway, out, id, days),
        cli::Command::Journal => commands::journal(&gateway, out),
        cli::Command::Write { content } => commands::write(&gateway, out, content),
        cli::Command::Vision { vision, focus } => commands::vision(&gateway, out, vision, focus),
        cli::Command::Seed => commands::seed(&gateway, out),
        cli::Command::Timeline => commands::timeline(&gateway, out),
    }
}

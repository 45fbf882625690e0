mod cli;
mod commands;
mod logging;
mod model;
mod storage;
mod timer;
mod ui;

use anyhow::Result;
use clap::Parser;
use directories::ProjectDirs;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    if let Some(dirs) = ProjectDirs::from("", "", "daybook") {
        logging::init(&dirs.data_dir().join("logs"));
    }
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Todo { action } => match action {
            cli::TodoAction::Add { text } => commands::todo_add(text),
            cli::TodoAction::Rm { index } => commands::todo_rm(index),
            cli::TodoAction::List => commands::todo_list(),
        },
        cli::Command::Deck { action } => match action {
            cli::DeckAction::Create { name } => commands::deck_create(name),
            cli::DeckAction::List => commands::deck_list(),
        },
        cli::Command::Card { deck, front, back } => commands::card_add(deck, front, back),
        cli::Command::Notes { query } => commands::notes_list(query),
        cli::Command::Profile {
            name,
            age,
            purposes,
        } => commands::profile(name, age, purposes),
        cli::Command::Stats => commands::stats(),
        cli::Command::Reset { yes } => commands::reset(yes),
        cli::Command::Tui => commands::tui(),
    }
}

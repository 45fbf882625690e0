use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "daybook",
    version,
    about = "Terminal companion for todos, flashcards, notes, and focus sessions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the todo list
    Todo {
        #[command(subcommand)]
        action: TodoAction,
    },
    /// Manage flashcard decks
    Deck {
        #[command(subcommand)]
        action: DeckAction,
    },
    /// Add a flashcard to a deck
    Card {
        /// Deck the card belongs to
        deck: String,
        /// Front side text
        front: String,
        /// Back side text
        back: String,
    },
    /// List notes, pinned first, most recently updated first
    Notes {
        /// Filter by substring of title, content, or tags
        #[arg(long, short)]
        query: Option<String>,
    },
    /// Set profile fields without the onboarding flow
    Profile {
        /// Display name used in the greeting
        #[arg(long)]
        name: Option<String>,
        /// Age, stored as entered
        #[arg(long)]
        age: Option<String>,
        /// Purpose tags (repeatable); replaces the stored set
        #[arg(long = "purpose", short = 'p')]
        purposes: Vec<String>,
    },
    /// Show focus-session statistics
    Stats,
    /// Delete all persisted data and start over
    Reset {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Launch the interactive TUI
    Tui,
}

#[derive(Subcommand, Debug)]
pub enum TodoAction {
    /// Append a task
    Add {
        /// Task text
        text: String,
    },
    /// Remove a task by its position (1-based, as shown by list)
    Rm {
        /// Position from `todo list`
        index: usize,
    },
    /// Print all tasks
    List,
}

#[derive(Subcommand, Debug)]
pub enum DeckAction {
    /// Create an empty deck
    Create {
        /// Deck name; must not already exist
        name: String,
    },
    /// Print all decks with their card counts
    List,
}

use crate::model::{DeckSet, NoteBook, PomodoroStats, Profile, TodoList};
use crate::storage::{self, FileStore, Store};
use crate::ui;
use anyhow::{bail, Context, Result};

fn open_store() -> Result<FileStore> {
    FileStore::open().context("opening the data directory")
}

pub fn todo_add(text: String) -> Result<()> {
    let mut store = open_store()?;
    let mut todos: TodoList = storage::load(&store, storage::KEY_TODOS, TodoList::default());
    todos.add(&text)?;
    storage::save_todos(&mut store, &todos).context("saving todos")?;
    println!("Added task #{}", todos.len());
    Ok(())
}

pub fn todo_rm(index: usize) -> Result<()> {
    let mut store = open_store()?;
    let mut todos: TodoList = storage::load(&store, storage::KEY_TODOS, TodoList::default());
    if index == 0 || !todos.remove(index - 1) {
        bail!("no task at position {index}");
    }
    storage::save_todos(&mut store, &todos).context("saving todos")?;
    println!("Removed task #{index}");
    Ok(())
}

pub fn todo_list() -> Result<()> {
    let store = open_store()?;
    let todos: TodoList = storage::load(&store, storage::KEY_TODOS, TodoList::default());
    if todos.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    for (i, task) in todos.iter().enumerate() {
        println!("{:>3}. {}", i + 1, task);
    }
    Ok(())
}

pub fn deck_create(name: String) -> Result<()> {
    let mut store = open_store()?;
    let mut decks: DeckSet = storage::load(&store, storage::KEY_DECKS, DeckSet::default());
    let created = decks.create(&name)?;
    storage::save_decks(&mut store, &decks).context("saving decks")?;
    println!("Created deck \"{created}\"");
    Ok(())
}

pub fn deck_list() -> Result<()> {
    let store = open_store()?;
    let decks: DeckSet = storage::load(&store, storage::KEY_DECKS, DeckSet::default());
    if decks.is_empty() {
        println!("No decks.");
        return Ok(());
    }
    for (name, cards) in decks.iter() {
        println!("{} ({} cards)", name, cards.len());
    }
    Ok(())
}

pub fn card_add(deck: String, front: String, back: String) -> Result<()> {
    let mut store = open_store()?;
    let mut decks: DeckSet = storage::load(&store, storage::KEY_DECKS, DeckSet::default());
    decks
        .add_card(&deck, &front, &back)
        .with_context(|| format!("adding a card to \"{deck}\""))?;
    storage::save_decks(&mut store, &decks).context("saving decks")?;
    println!(
        "Added card #{} to \"{}\"",
        decks.cards(&deck).map(<[_]>::len).unwrap_or(0),
        deck
    );
    Ok(())
}

pub fn notes_list(query: Option<String>) -> Result<()> {
    let store = open_store()?;
    let notes: NoteBook = storage::load(&store, storage::KEY_NOTES, NoteBook::default());
    if notes.is_empty() {
        println!("No notes.");
        return Ok(());
    }
    let listed = notes.list(query.as_deref().unwrap_or(""));
    if listed.is_empty() {
        println!("Nothing matches.");
        return Ok(());
    }
    for note in listed {
        let pin = if note.pinned { " [pinned]" } else { "" };
        println!("{}{}", note.display_title(), pin);
        let preview = note.preview();
        if !preview.is_empty() {
            println!("    {preview}");
        }
        if !note.tags.is_empty() {
            println!("    tags: {}", note.tags);
        }
    }
    Ok(())
}

pub fn profile(name: Option<String>, age: Option<String>, purposes: Vec<String>) -> Result<()> {
    let mut store = open_store()?;
    let mut profile: Profile = storage::load_profile(&store);
    if let Some(name) = name {
        profile.name = name.trim().to_string();
    }
    if let Some(age) = age {
        profile.age = age.trim().to_string();
    }
    if !purposes.is_empty() {
        profile.purposes = purposes;
    }
    storage::save_profile(&mut store, &profile).context("saving profile")?;
    println!(
        "Profile saved: {}",
        if profile.is_onboarded() {
            profile.name.as_str()
        } else {
            "(no name yet)"
        }
    );
    Ok(())
}

pub fn stats() -> Result<()> {
    let store = open_store()?;
    let stats: PomodoroStats =
        storage::load(&store, storage::KEY_STATS, PomodoroStats::default());
    println!("sessions: {}", stats.sessions);
    println!("focused time: {} min", stats.focused_minutes());
    Ok(())
}

pub fn reset(yes: bool) -> Result<()> {
    if !yes {
        bail!("this deletes every task, deck, note, and statistic; pass --yes to confirm");
    }
    let mut store = open_store()?;
    store.clear().context("clearing stored data")?;
    log::info!("all persisted data cleared via cli");
    println!("All data cleared.");
    Ok(())
}

pub fn tui() -> Result<()> {
    let store = open_store()?;
    let data = storage::load_app_data(&store);
    ui::run(store, data)
}

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const PREVIEW_CHARS: usize = 80;

#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("{0} cannot be empty")]
    Validation(&'static str),
    #[error("a deck named \"{0}\" already exists")]
    DuplicateName(String),
    #[error("deck not found: {0}")]
    DeckNotFound(String),
    #[error("no card at position {0}")]
    CardNotFound(usize),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Card {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub tags: String,
    pub pinned: bool,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct PomodoroStats {
    pub sessions: u64,
    pub seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub age: String,
    pub purposes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(transparent)]
pub struct TodoList(Vec<String>);

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(transparent)]
pub struct DeckSet(BTreeMap<String, Vec<Card>>);

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(transparent)]
pub struct NoteBook(Vec<Note>);

/// Everything the app holds in memory; loaded once at startup, each slice
/// re-serialized in full after every mutation of that slice.
#[derive(Debug, Clone, Default)]
pub struct AppData {
    pub profile: Profile,
    pub todos: TodoList,
    pub decks: DeckSet,
    pub notes: NoteBook,
    pub stats: PomodoroStats,
    pub theme: ThemeMode,
}

impl TodoList {
    pub fn add(&mut self, text: &str) -> Result<(), DataError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DataError::Validation("task text"));
        }
        self.0.push(trimmed.to_string());
        Ok(())
    }

    /// Removes by position. Out of bounds is a no-op; the caller skips
    /// persisting when this returns false.
    pub fn remove(&mut self, index: usize) -> bool {
        if index < self.0.len() {
            self.0.remove(index);
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl DeckSet {
    pub fn create(&mut self, name: &str) -> Result<String, DataError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DataError::Validation("deck name"));
        }
        if self.0.contains_key(trimmed) {
            return Err(DataError::DuplicateName(trimmed.to_string()));
        }
        self.0.insert(trimmed.to_string(), Vec::new());
        Ok(trimmed.to_string())
    }

    /// Moves the card list to the new key and removes the old one in a
    /// single in-memory step; the caller serializes the whole map once.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<String, DataError> {
        let trimmed = new.trim();
        if trimmed.is_empty() {
            return Err(DataError::Validation("deck name"));
        }
        if trimmed == old {
            return Ok(trimmed.to_string());
        }
        if self.0.contains_key(trimmed) {
            return Err(DataError::DuplicateName(trimmed.to_string()));
        }
        let cards = self
            .0
            .remove(old)
            .ok_or_else(|| DataError::DeckNotFound(old.to_string()))?;
        self.0.insert(trimmed.to_string(), cards);
        Ok(trimmed.to_string())
    }

    pub fn delete(&mut self, name: &str) -> bool {
        self.0.remove(name).is_some()
    }

    pub fn add_card(&mut self, deck: &str, front: &str, back: &str) -> Result<(), DataError> {
        let card = validated_card(front, back)?;
        let cards = self
            .0
            .get_mut(deck)
            .ok_or_else(|| DataError::DeckNotFound(deck.to_string()))?;
        cards.push(card);
        Ok(())
    }

    pub fn update_card(
        &mut self,
        deck: &str,
        index: usize,
        front: &str,
        back: &str,
    ) -> Result<(), DataError> {
        let card = validated_card(front, back)?;
        let cards = self
            .0
            .get_mut(deck)
            .ok_or_else(|| DataError::DeckNotFound(deck.to_string()))?;
        let slot = cards.get_mut(index).ok_or(DataError::CardNotFound(index))?;
        *slot = card;
        Ok(())
    }

    pub fn delete_card(&mut self, deck: &str, index: usize) -> Result<(), DataError> {
        let cards = self
            .0
            .get_mut(deck)
            .ok_or_else(|| DataError::DeckNotFound(deck.to_string()))?;
        if index >= cards.len() {
            return Err(DataError::CardNotFound(index));
        }
        cards.remove(index);
        Ok(())
    }

    pub fn cards(&self, name: &str) -> Option<&[Card]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Card])> {
        self.0
            .iter()
            .map(|(name, cards)| (name.as_str(), cards.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn validated_card(front: &str, back: &str) -> Result<Card, DataError> {
    let front = front.trim();
    let back = back.trim();
    if front.is_empty() {
        return Err(DataError::Validation("card front"));
    }
    if back.is_empty() {
        return Err(DataError::Validation("card back"));
    }
    Ok(Card {
        front: front.to_string(),
        back: back.to_string(),
    })
}

/// Fresh note identity: creation time in milliseconds. Unique as long as
/// notes are not created sub-millisecond-concurrently.
pub fn next_note_id() -> i64 {
    Utc::now().timestamp_millis()
}

impl Note {
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "untitled"
        } else {
            &self.title
        }
    }

    pub fn preview(&self) -> String {
        let stripped = strip_markup(&self.content);
        let text = stripped.trim();
        let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
        if text.chars().count() > PREVIEW_CHARS {
            out.push_str("...");
        }
        out
    }

    fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(query)
            || strip_markup(&self.content).to_lowercase().contains(query)
            || self.tags.to_lowercase().contains(query)
    }
}

impl NoteBook {
    /// Overwrites the note with a matching id (refreshing `updated_at`), or
    /// appends as new. A save with blank title and blank content is
    /// rejected.
    pub fn save(
        &mut self,
        id: i64,
        title: &str,
        content: &str,
        tags: &str,
        pinned: bool,
    ) -> Result<(), DataError> {
        if title.trim().is_empty() && content.trim().is_empty() {
            return Err(DataError::Validation("note"));
        }
        let note = Note {
            id,
            title: title.trim().to_string(),
            content: content.trim().to_string(),
            tags: tags.trim().to_string(),
            pinned,
            updated_at: Utc::now().timestamp_millis(),
        };
        match self.0.iter_mut().find(|n| n.id == id) {
            Some(existing) => *existing = note,
            None => self.0.push(note),
        }
        Ok(())
    }

    pub fn delete(&mut self, id: i64) -> bool {
        let before = self.0.len();
        self.0.retain(|n| n.id != id);
        self.0.len() != before
    }

    /// Flips `pinned` without touching `updated_at`.
    pub fn toggle_pin(&mut self, id: i64) -> bool {
        match self.0.iter_mut().find(|n| n.id == id) {
            Some(note) => {
                note.pinned = !note.pinned;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: i64) -> Option<&Note> {
        self.0.iter().find(|n| n.id == id)
    }

    /// Case-insensitive filter over title, stripped content, and tags, then
    /// pinned-first, most-recently-updated order. Ties keep original order
    /// (the sort is stable).
    pub fn list(&self, query: &str) -> Vec<&Note> {
        let query = query.trim().to_lowercase();
        let mut matched: Vec<&Note> = self.0.iter().filter(|n| n.matches(&query)).collect();
        matched.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then(b.updated_at.cmp(&a.updated_at))
        });
        matched
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PomodoroStats {
    /// One natural completion: the configured duration counts in full,
    /// regardless of wall time spent paused.
    pub fn record_session(&mut self, duration_secs: u64) {
        self.sessions += 1;
        self.seconds += duration_secs;
    }

    pub fn focused_minutes(&self) -> u64 {
        (self.seconds as f64 / 60.0).round() as u64
    }
}

impl Profile {
    pub fn is_onboarded(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid pattern"));

/// Drops anything that looks like a markup tag. Content is otherwise an
/// opaque string; this is only for previews and search, not a parser.
pub fn strip_markup(content: &str) -> String {
    MARKUP_TAG.replace_all(content, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: i64, title: &str, pinned: bool, updated_at: i64) -> Note {
        Note {
            id,
            title: title.to_string(),
            content: format!("body of {title}"),
            tags: String::new(),
            pinned,
            updated_at,
        }
    }

    #[test]
    fn todo_add_rejects_blank_text() {
        let mut todos = TodoList::default();
        assert!(todos.add("   ").is_err());
        assert!(todos.add("").is_err());
        assert_eq!(todos.len(), 0);
    }

    #[test]
    fn todo_add_trims_and_appends_in_order() {
        let mut todos = TodoList::default();
        todos.add("  first  ").unwrap();
        todos.add("second").unwrap();
        let items: Vec<&str> = todos.iter().collect();
        assert_eq!(items, vec!["first", "second"]);
    }

    #[test]
    fn todo_remove_out_of_bounds_is_a_noop() {
        let mut todos = TodoList::default();
        todos.add("only").unwrap();
        assert!(!todos.remove(5));
        assert_eq!(todos.len(), 1);
        assert!(todos.remove(0));
        assert!(todos.is_empty());
    }

    #[test]
    fn deck_create_rejects_duplicates() {
        let mut decks = DeckSet::default();
        decks.create("spanish").unwrap();
        let err = decks.create(" spanish ").unwrap_err();
        assert!(matches!(err, DataError::DuplicateName(_)));
        assert_eq!(decks.len(), 1);
    }

    #[test]
    fn deck_rename_moves_cards_to_new_key() {
        let mut decks = DeckSet::default();
        decks.create("old").unwrap();
        decks.add_card("old", "q", "a").unwrap();
        decks.rename("old", "new").unwrap();
        assert!(!decks.contains("old"));
        assert_eq!(decks.cards("new").unwrap().len(), 1);
    }

    #[test]
    fn deck_rename_onto_existing_name_changes_nothing() {
        let mut decks = DeckSet::default();
        decks.create("a").unwrap();
        decks.create("b").unwrap();
        decks.add_card("a", "front a", "back a").unwrap();
        decks.add_card("b", "front b", "back b").unwrap();

        let err = decks.rename("a", "b").unwrap_err();
        assert!(matches!(err, DataError::DuplicateName(_)));
        assert_eq!(decks.cards("a").unwrap()[0].front, "front a");
        assert_eq!(decks.cards("b").unwrap()[0].front, "front b");
    }

    #[test]
    fn card_sides_must_be_non_empty_after_trim() {
        let mut decks = DeckSet::default();
        decks.create("d").unwrap();
        assert!(decks.add_card("d", "  ", "back").is_err());
        assert!(decks.add_card("d", "front", "").is_err());
        assert!(decks.cards("d").unwrap().is_empty());
    }

    #[test]
    fn update_card_overwrites_in_place() {
        let mut decks = DeckSet::default();
        decks.create("d").unwrap();
        decks.add_card("d", "q1", "a1").unwrap();
        decks.add_card("d", "q2", "a2").unwrap();
        decks.update_card("d", 0, "q1'", "a1'").unwrap();
        let cards = decks.cards("d").unwrap();
        assert_eq!(cards[0].front, "q1'");
        assert_eq!(cards[1].front, "q2");
    }

    #[test]
    fn delete_card_out_of_bounds_is_not_found() {
        let mut decks = DeckSet::default();
        decks.create("d").unwrap();
        let err = decks.delete_card("d", 0).unwrap_err();
        assert!(matches!(err, DataError::CardNotFound(0)));
    }

    #[test]
    fn note_save_appends_then_overwrites_by_id() {
        let mut notes = NoteBook::default();
        notes.save(7, "title", "content", "", false).unwrap();
        assert_eq!(notes.len(), 1);
        let first_updated = notes.get(7).unwrap().updated_at;

        notes
            .save(7, "new title", "new content", "tag", true)
            .unwrap();
        assert_eq!(notes.len(), 1);
        let note = notes.get(7).unwrap();
        assert_eq!(note.title, "new title");
        assert!(note.pinned);
        assert!(note.updated_at >= first_updated);
    }

    #[test]
    fn note_save_rejects_fully_blank_note() {
        let mut notes = NoteBook::default();
        assert!(notes.save(1, "  ", "", "tag", false).is_err());
        assert!(notes.is_empty());
    }

    #[test]
    fn note_delete_missing_id_is_a_noop() {
        let mut notes = NoteBook::default();
        notes.save(1, "a", "", "", false).unwrap();
        assert!(!notes.delete(99));
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn toggle_pin_keeps_updated_at() {
        let mut notes = NoteBook::default();
        notes.save(1, "a", "", "", false).unwrap();
        let before = notes.get(1).unwrap().updated_at;
        assert!(notes.toggle_pin(1));
        let note = notes.get(1).unwrap();
        assert!(note.pinned);
        assert_eq!(note.updated_at, before);
    }

    #[test]
    fn pinned_notes_sort_before_unpinned_regardless_of_timestamps() {
        let mut notes = NoteBook::default();
        notes.0.push(note(1, "pinned old", true, 1));
        notes.0.push(note(2, "unpinned new", false, 100));
        let listed = notes.list("");
        assert_eq!(listed[0].id, 1);
        assert_eq!(listed[1].id, 2);
    }

    #[test]
    fn unpinned_notes_sort_by_recency() {
        let mut notes = NoteBook::default();
        notes.0.push(note(1, "older", false, 10));
        notes.0.push(note(2, "newer", false, 20));
        let listed = notes.list("");
        assert_eq!(listed[0].id, 2);
    }

    #[test]
    fn empty_query_lists_everything() {
        let mut notes = NoteBook::default();
        notes.0.push(note(1, "a", false, 1));
        notes.0.push(note(2, "b", false, 2));
        assert_eq!(notes.list("").len(), 2);
    }

    #[test]
    fn query_matches_tags_case_insensitively() {
        let mut notes = NoteBook::default();
        let mut tagged = note(1, "groceries", false, 1);
        tagged.tags = "Errands".to_string();
        notes.0.push(tagged);
        notes.0.push(note(2, "other", false, 2));

        let listed = notes.list("errands");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, 1);
    }

    #[test]
    fn query_searches_stripped_content_not_markup() {
        let mut notes = NoteBook::default();
        let mut formatted = note(1, "t", false, 1);
        formatted.content = "<b>hello</b> world".to_string();
        notes.0.push(formatted);

        assert_eq!(notes.list("hello world").len(), 1);
        assert!(notes.list("<b>").is_empty());
    }

    #[test]
    fn preview_strips_markup_and_truncates() {
        let mut long = note(1, "t", false, 1);
        long.content = format!("<p>{}</p>", "x".repeat(120));
        let preview = long.preview();
        assert!(!preview.contains('<'));
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn blank_title_renders_placeholder() {
        let untitled = note(1, "  ", false, 1);
        assert_eq!(untitled.display_title(), "untitled");
    }

    #[test]
    fn stats_accumulate_monotonically() {
        let mut stats = PomodoroStats::default();
        stats.record_session(1500);
        stats.record_session(90);
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.seconds, 1590);
        assert_eq!(stats.focused_minutes(), 27);
    }
}

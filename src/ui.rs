use crate::model::{AppData, Note, ThemeMode};
use crate::storage::{self, Store, StorageError};
use crate::timer::{format_secs, TimerEngine};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const PURPOSE_CHOICES: [&str; 5] = ["study", "work", "habits", "reading", "focus"];

pub fn run(store: impl Store, data: AppData) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(store, data);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Screen {
    Home,
    Decks,
    Cards,
    Notes,
    Timer,
    Settings,
}

impl Screen {
    fn label(self) -> &'static str {
        match self {
            Screen::Home => "home",
            Screen::Decks => "decks",
            Screen::Cards => "cards",
            Screen::Notes => "notes",
            Screen::Timer => "timer",
            Screen::Settings => "settings",
        }
    }
}

enum Mode {
    Normal,
    Prompt {
        purpose: PromptPurpose,
        input: FieldValue,
    },
    CardForm {
        editing: Option<usize>,
        form: CardForm,
    },
    NoteForm(NoteForm),
    Confirm(ConfirmAction),
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum PromptPurpose {
    NewTodo,
    NewDeck,
    RenameDeck,
    ChangeName,
    TimerDuration,
    SearchNotes,
}

impl PromptPurpose {
    fn title(self) -> &'static str {
        match self {
            PromptPurpose::NewTodo => "new task",
            PromptPurpose::NewDeck => "deck name",
            PromptPurpose::RenameDeck => "new deck name",
            PromptPurpose::ChangeName => "what should we call you?",
            PromptPurpose::TimerDuration => "session length (H:MM or minutes)",
            PromptPurpose::SearchNotes => "search notes",
        }
    }
}

enum ConfirmAction {
    DeleteDeck(String),
    DeleteNote(i64),
    ResetAll,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum CardFace {
    Front,
    Back,
}

struct CardForm {
    front: FieldValue,
    back: FieldValue,
    field: CardField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum CardField {
    Front,
    Back,
}

impl CardForm {
    fn new() -> Self {
        CardForm {
            front: FieldValue::new(""),
            back: FieldValue::new(""),
            field: CardField::Front,
        }
    }

    fn from_card(front: &str, back: &str) -> Self {
        CardForm {
            front: FieldValue::new(front),
            back: FieldValue::new(back),
            field: CardField::Front,
        }
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            CardField::Front => CardField::Back,
            CardField::Back => CardField::Front,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            CardField::Front => &mut self.front,
            CardField::Back => &mut self.back,
        }
    }
}

struct NoteForm {
    id: i64,
    title: FieldValue,
    content: FieldValue,
    tags: FieldValue,
    pinned: bool,
    field: NoteField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum NoteField {
    Title,
    Content,
    Tags,
}

impl NoteForm {
    fn new(id: i64) -> Self {
        NoteForm {
            id,
            title: FieldValue::new(""),
            content: FieldValue::new(""),
            tags: FieldValue::new(""),
            pinned: false,
            field: NoteField::Title,
        }
    }

    fn from_note(note: &Note) -> Self {
        NoteForm {
            id: note.id,
            title: FieldValue::new(&note.title),
            content: FieldValue::new(&note.content),
            tags: FieldValue::new(&note.tags),
            pinned: note.pinned,
            field: NoteField::Title,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            NoteField::Title => NoteField::Content,
            NoteField::Content => NoteField::Tags,
            NoteField::Tags => NoteField::Title,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            NoteField::Title => NoteField::Tags,
            NoteField::Content => NoteField::Title,
            NoteField::Tags => NoteField::Content,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            NoteField::Title => &mut self.title,
            NoteField::Content => &mut self.content,
            NoteField::Tags => &mut self.tags,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum OnboardingStep {
    Name,
    Age,
    Purposes,
}

struct OnboardingState {
    step: OnboardingStep,
    name: FieldValue,
    age: FieldValue,
    choices: [(&'static str, bool); PURPOSE_CHOICES.len()],
    cursor: usize,
}

impl OnboardingState {
    fn new() -> Self {
        OnboardingState {
            step: OnboardingStep::Name,
            name: FieldValue::new(""),
            age: FieldValue::new(""),
            choices: PURPOSE_CHOICES.map(|label| (label, false)),
            cursor: 0,
        }
    }
}

struct App<S: Store> {
    store: S,
    data: AppData,
    timer: TimerEngine,
    screen: Screen,
    mode: Mode,
    onboarding: Option<OnboardingState>,
    status: String,
    todo_idx: usize,
    deck_idx: usize,
    open_deck: Option<String>,
    card_idx: usize,
    card_face: CardFace,
    note_idx: usize,
    note_query: String,
}

impl<S: Store> App<S> {
    fn new(store: S, data: AppData) -> Self {
        let onboarding = if data.profile.is_onboarded() {
            None
        } else {
            Some(OnboardingState::new())
        };
        let status = if data.profile.is_onboarded() {
            format!("hello, {}", data.profile.name)
        } else {
            "welcome".to_string()
        };
        App {
            store,
            data,
            timer: TimerEngine::new(),
            screen: Screen::Home,
            mode: Mode::Normal,
            onboarding,
            status,
            todo_idx: 0,
            deck_idx: 0,
            open_deck: None,
            card_idx: 0,
            card_face: CardFace::Front,
            note_idx: 0,
            note_query: String::new(),
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            self.drive_timer(Instant::now());
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs every loop iteration; the engine fires any due ticks and stats
    /// are persisted once per completed session.
    fn drive_timer(&mut self, now: Instant) {
        if self.timer.poll(now, &mut self.data.stats) {
            let result = storage::save_stats(&mut self.store, &self.data.stats);
            self.after_save(result, "Session complete. Good focus.");
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        if self.onboarding.is_some() {
            self.handle_onboarding_key(key);
            return false;
        }
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Prompt { .. } => {
                self.handle_prompt_key(key);
                false
            }
            Mode::CardForm { .. } => {
                self.handle_card_form_key(key);
                false
            }
            Mode::NoteForm(_) => {
                self.handle_note_form_key(key);
                false
            }
            Mode::Confirm(_) => {
                self.handle_confirm_key(key);
                false
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('1') => self.set_screen(Screen::Home),
            KeyCode::Char('2') => self.set_screen(Screen::Decks),
            KeyCode::Char('3') => self.set_screen(Screen::Notes),
            KeyCode::Char('4') => self.set_screen(Screen::Timer),
            KeyCode::Char('5') => self.set_screen(Screen::Settings),
            _ => match self.screen {
                Screen::Home => self.handle_home_key(key),
                Screen::Decks => self.handle_decks_key(key),
                Screen::Cards => self.handle_cards_key(key),
                Screen::Notes => self.handle_notes_key(key),
                Screen::Timer => self.handle_timer_key(key),
                Screen::Settings => self.handle_settings_key(key),
            },
        }
        false
    }

    fn set_screen(&mut self, screen: Screen) {
        self.screen = screen;
    }

    fn handle_home_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.todo_idx = self.todo_idx.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.todo_idx + 1 < self.data.todos.len() {
                    self.todo_idx += 1;
                }
            }
            KeyCode::Char('a') => self.open_prompt(PromptPurpose::NewTodo, ""),
            KeyCode::Char('d') | KeyCode::Char('x') => self.remove_selected_todo(),
            _ => {}
        }
    }

    fn handle_decks_key(&mut self, key: KeyEvent) {
        let deck_count = self.data.decks.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.deck_idx = self.deck_idx.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.deck_idx + 1 < deck_count {
                    self.deck_idx += 1;
                }
            }
            KeyCode::Char('a') => self.open_prompt(PromptPurpose::NewDeck, ""),
            KeyCode::Enter => {
                if let Some(name) = self.deck_name_at(self.deck_idx) {
                    self.view_deck(&name);
                }
            }
            _ => {}
        }
    }

    fn handle_cards_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.screen = Screen::Decks;
            }
            KeyCode::Char(' ') | KeyCode::Char('f') => self.flip_card(),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('n') => self.advance_card(1),
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('p') => self.advance_card(-1),
            KeyCode::Char('a') => {
                self.mode = Mode::CardForm {
                    editing: None,
                    form: CardForm::new(),
                };
                self.status = "Adding a card (Tab move, Enter save, Esc cancel)".into();
            }
            KeyCode::Char('e') => self.open_card_editor(),
            KeyCode::Char('d') => self.delete_current_card(),
            KeyCode::Char('r') => {
                if let Some(name) = self.open_deck.clone() {
                    self.open_prompt(PromptPurpose::RenameDeck, &name);
                }
            }
            KeyCode::Char('D') => {
                if let Some(name) = self.open_deck.clone() {
                    self.mode = Mode::Confirm(ConfirmAction::DeleteDeck(name));
                }
            }
            _ => {}
        }
    }

    fn handle_notes_key(&mut self, key: KeyEvent) {
        let listed = self.data.notes.list(&self.note_query).len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.note_idx = self.note_idx.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.note_idx + 1 < listed {
                    self.note_idx += 1;
                }
            }
            KeyCode::Char('/') => {
                let query = self.note_query.clone();
                self.open_prompt(PromptPurpose::SearchNotes, &query);
            }
            KeyCode::Char('a') => {
                self.mode = Mode::NoteForm(NoteForm::new(crate::model::next_note_id()));
                self.status =
                    "New note (Tab move, Ctrl+Enter save, Ctrl+P pin, Esc cancel)".into();
            }
            KeyCode::Enter => {
                if let Some(id) = self.selected_note_id() {
                    if let Some(note) = self.data.notes.get(id) {
                        self.mode = Mode::NoteForm(NoteForm::from_note(note));
                        self.status =
                            "Editing note (Tab move, Ctrl+Enter save, Ctrl+P pin, Esc cancel)"
                                .into();
                    }
                }
            }
            KeyCode::Char('p') => self.toggle_selected_pin(),
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_note_id() {
                    self.mode = Mode::Confirm(ConfirmAction::DeleteNote(id));
                }
            }
            _ => {}
        }
    }

    fn handle_timer_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('s') | KeyCode::Char(' ') => {
                if self.timer.is_running() {
                    self.timer.pause();
                    self.status = format!("Paused at {}", self.timer.format_remaining());
                } else if self.timer.start(Instant::now()) {
                    self.status = format!("Focus until {}", self.timer.format_remaining());
                }
            }
            KeyCode::Char('r') => {
                self.timer.reset();
                self.status = format!("Timer reset to {}", self.timer.format_remaining());
            }
            KeyCode::Char('c') => self.open_prompt(PromptPurpose::TimerDuration, ""),
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('n') => {
                let name = self.data.profile.name.clone();
                self.open_prompt(PromptPurpose::ChangeName, &name);
            }
            KeyCode::Char('t') => {
                self.data.theme = self.data.theme.toggled();
                let theme = self.data.theme;
                let result = storage::save_theme(&mut self.store, theme);
                self.after_save(
                    result,
                    match theme {
                        ThemeMode::Light => "Theme: light",
                        ThemeMode::Dark => "Theme: dark",
                    },
                );
            }
            KeyCode::Char('R') => {
                self.mode = Mode::Confirm(ConfirmAction::ResetAll);
            }
            _ => {}
        }
    }

    fn open_prompt(&mut self, purpose: PromptPurpose, prefill: &str) {
        self.mode = Mode::Prompt {
            purpose,
            input: FieldValue::new(prefill),
        };
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Mode::Prompt { purpose, ref mut input } = self.mode else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = "Canceled".into();
            }
            KeyCode::Enter => {
                let text = input.value.clone();
                self.mode = Mode::Normal;
                self.submit_prompt(purpose, &text);
            }
            KeyCode::Left => input.move_left(),
            KeyCode::Right => input.move_right(),
            KeyCode::Backspace => {
                input.backspace();
                if purpose == PromptPurpose::SearchNotes {
                    self.sync_search();
                }
            }
            KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                input.insert_char(c);
                if purpose == PromptPurpose::SearchNotes {
                    self.sync_search();
                }
            }
            _ => {}
        }
    }

    /// The search prompt filters as it is typed.
    fn sync_search(&mut self) {
        if let Mode::Prompt { purpose: PromptPurpose::SearchNotes, ref input } = self.mode {
            self.note_query = input.value.clone();
            self.note_idx = 0;
        }
    }

    fn submit_prompt(&mut self, purpose: PromptPurpose, text: &str) {
        match purpose {
            PromptPurpose::NewTodo => match self.data.todos.add(text) {
                Ok(()) => {
                    let result = storage::save_todos(&mut self.store, &self.data.todos);
                    self.after_save(result, "Added task");
                }
                Err(err) => self.status = err.to_string(),
            },
            PromptPurpose::NewDeck => match self.data.decks.create(text) {
                Ok(name) => {
                    let result = storage::save_decks(&mut self.store, &self.data.decks);
                    self.after_save(result, format!("Created deck \"{name}\""));
                }
                Err(err) => self.status = err.to_string(),
            },
            PromptPurpose::RenameDeck => {
                let Some(old) = self.open_deck.clone() else {
                    return;
                };
                match self.data.decks.rename(&old, text) {
                    Ok(name) => {
                        self.open_deck = Some(name.clone());
                        let result = storage::save_decks(&mut self.store, &self.data.decks);
                        self.after_save(result, format!("Renamed deck to \"{name}\""));
                    }
                    Err(err) => self.status = err.to_string(),
                }
            }
            PromptPurpose::ChangeName => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    self.status = "Name unchanged".into();
                    return;
                }
                self.data.profile.name = trimmed.to_string();
                let result = storage::save_profile(&mut self.store, &self.data.profile);
                self.after_save(result, format!("hello, {trimmed}"));
            }
            PromptPurpose::TimerDuration => match parse_duration(text) {
                Some((hours, minutes)) => {
                    let secs = self.timer.configure(hours, minutes);
                    self.status = format!("Session length {}", format_secs(secs));
                }
                None => self.status = "Use H:MM or a number of minutes".into(),
            },
            PromptPurpose::SearchNotes => {
                self.note_query = text.to_string();
                self.note_idx = 0;
            }
        }
    }

    fn handle_card_form_key(&mut self, key: KeyEvent) {
        let Mode::CardForm { editing, ref mut form } = self.mode else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = "Canceled".into();
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Left => form.active_field_mut().move_left(),
            KeyCode::Right => form.active_field_mut().move_right(),
            KeyCode::Backspace => form.active_field_mut().backspace(),
            KeyCode::Enter => {
                let front = form.front.value.clone();
                let back = form.back.value.clone();
                if self.submit_card(editing, &front, &back) {
                    self.mode = Mode::Normal;
                }
            }
            KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                form.active_field_mut().insert_char(c);
            }
            _ => {}
        }
    }

    fn submit_card(&mut self, editing: Option<usize>, front: &str, back: &str) -> bool {
        let Some(deck) = self.open_deck.clone() else {
            return true;
        };
        let outcome = match editing {
            None => self.data.decks.add_card(&deck, front, back),
            Some(index) => self.data.decks.update_card(&deck, index, front, back),
        };
        match outcome {
            Ok(()) => {
                self.card_face = CardFace::Front;
                let result = storage::save_decks(&mut self.store, &self.data.decks);
                self.after_save(
                    result,
                    if editing.is_some() {
                        "Card updated"
                    } else {
                        "Card added"
                    },
                );
                true
            }
            Err(err) => {
                self.status = err.to_string();
                false
            }
        }
    }

    fn handle_note_form_key(&mut self, key: KeyEvent) {
        let Mode::NoteForm(ref mut form) = self.mode else {
            return;
        };
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = "Canceled".into();
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Left => form.active_field_mut().move_left(),
            KeyCode::Right => form.active_field_mut().move_right(),
            KeyCode::Up => form.active_field_mut().move_up(),
            KeyCode::Down => form.active_field_mut().move_down(),
            KeyCode::Backspace => form.active_field_mut().backspace(),
            KeyCode::Char('p') if control => {
                form.pinned = !form.pinned;
            }
            KeyCode::Enter => {
                if form.field == NoteField::Content && !control {
                    form.active_field_mut().insert_char('\n');
                } else {
                    self.submit_note_form();
                }
            }
            KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                form.active_field_mut().insert_char(c);
            }
            _ => {}
        }
    }

    fn submit_note_form(&mut self) {
        let Mode::NoteForm(ref form) = self.mode else {
            return;
        };
        let (id, title, content, tags, pinned) = (
            form.id,
            form.title.value.clone(),
            form.content.value.clone(),
            form.tags.value.clone(),
            form.pinned,
        );
        match self.data.notes.save(id, &title, &content, &tags, pinned) {
            Ok(()) => {
                self.mode = Mode::Normal;
                let result = storage::save_notes(&mut self.store, &self.data.notes);
                self.after_save(result, "Note saved");
            }
            Err(_) => {
                self.status = "A note needs a title or some content".into();
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let action = std::mem::replace(&mut self.mode, Mode::Normal);
                if let Mode::Confirm(action) = action {
                    self.apply_confirmed(action);
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = "Canceled".into();
            }
            _ => {}
        }
    }

    fn apply_confirmed(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::DeleteDeck(name) => {
                if self.data.decks.delete(&name) {
                    self.open_deck = None;
                    self.card_idx = 0;
                    self.card_face = CardFace::Front;
                    self.screen = Screen::Decks;
                    self.deck_idx = self
                        .deck_idx
                        .min(self.data.decks.len().saturating_sub(1));
                    let result = storage::save_decks(&mut self.store, &self.data.decks);
                    self.after_save(result, format!("Deleted deck \"{name}\""));
                }
            }
            ConfirmAction::DeleteNote(id) => {
                if self.data.notes.delete(id) {
                    let remaining = self.data.notes.list(&self.note_query).len();
                    self.note_idx = self.note_idx.min(remaining.saturating_sub(1));
                    let result = storage::save_notes(&mut self.store, &self.data.notes);
                    self.after_save(result, "Note deleted");
                }
            }
            ConfirmAction::ResetAll => self.reset_all(),
        }
    }

    /// The schedule is dropped before storage is touched so no tick can fire
    /// against cleared state.
    fn reset_all(&mut self) {
        self.timer.reset();
        match self.store.clear() {
            Ok(()) => {
                log::info!("all persisted data cleared");
                self.data = AppData::default();
                self.timer = TimerEngine::new();
                self.screen = Screen::Home;
                self.onboarding = Some(OnboardingState::new());
                self.todo_idx = 0;
                self.deck_idx = 0;
                self.open_deck = None;
                self.card_idx = 0;
                self.card_face = CardFace::Front;
                self.note_idx = 0;
                self.note_query.clear();
                self.status = "All data cleared".into();
            }
            Err(err) => {
                log::error!("reset failed: {err}");
                self.status = format!("Reset failed: {err}");
            }
        }
    }

    fn handle_onboarding_key(&mut self, key: KeyEvent) {
        let Some(ref mut ob) = self.onboarding else {
            return;
        };
        match ob.step {
            OnboardingStep::Name | OnboardingStep::Age => {
                let field = if ob.step == OnboardingStep::Name {
                    &mut ob.name
                } else {
                    &mut ob.age
                };
                match key.code {
                    KeyCode::Enter => {
                        if field.value.trim().is_empty() {
                            return;
                        }
                        ob.step = if ob.step == OnboardingStep::Name {
                            OnboardingStep::Age
                        } else {
                            OnboardingStep::Purposes
                        };
                    }
                    KeyCode::Left => field.move_left(),
                    KeyCode::Right => field.move_right(),
                    KeyCode::Backspace => field.backspace(),
                    KeyCode::Char(c)
                        if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
                    {
                        field.insert_char(c)
                    }
                    _ => {}
                }
            }
            OnboardingStep::Purposes => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    ob.cursor = ob.cursor.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if ob.cursor + 1 < ob.choices.len() {
                        ob.cursor += 1;
                    }
                }
                KeyCode::Char(' ') => {
                    ob.choices[ob.cursor].1 = !ob.choices[ob.cursor].1;
                }
                KeyCode::Enter => {
                    let purposes: Vec<String> = ob
                        .choices
                        .iter()
                        .filter(|(_, picked)| *picked)
                        .map(|(label, _)| label.to_string())
                        .collect();
                    if purposes.is_empty() {
                        return;
                    }
                    self.data.profile.name = ob.name.value.trim().to_string();
                    self.data.profile.age = ob.age.value.trim().to_string();
                    self.data.profile.purposes = purposes;
                    self.onboarding = None;
                    let name = self.data.profile.name.clone();
                    let profile = self.data.profile.clone();
                    let result = storage::save_profile(&mut self.store, &profile);
                    self.after_save(result, format!("hello, {name}"));
                }
                _ => {}
            },
        }
    }

    fn remove_selected_todo(&mut self) {
        if self.data.todos.remove(self.todo_idx) {
            self.todo_idx = self
                .todo_idx
                .min(self.data.todos.len().saturating_sub(1));
            let result = storage::save_todos(&mut self.store, &self.data.todos);
            self.after_save(result, "Removed task");
        }
    }

    fn deck_name_at(&self, index: usize) -> Option<String> {
        self.data.decks.names().nth(index).map(str::to_string)
    }

    fn view_deck(&mut self, name: &str) {
        if !self.data.decks.contains(name) {
            return;
        }
        self.open_deck = Some(name.to_string());
        self.card_idx = 0;
        self.card_face = CardFace::Front;
        self.screen = Screen::Cards;
        self.status = format!("Opened \"{name}\"");
    }

    fn open_card_len(&self) -> usize {
        self.open_deck
            .as_deref()
            .and_then(|name| self.data.decks.cards(name))
            .map(<[_]>::len)
            .unwrap_or(0)
    }

    fn flip_card(&mut self) {
        if self.open_card_len() == 0 {
            return;
        }
        self.card_face = match self.card_face {
            CardFace::Front => CardFace::Back,
            CardFace::Back => CardFace::Front,
        };
    }

    /// Wraps over the deck length; the face resets whenever the cursor
    /// moves.
    fn advance_card(&mut self, delta: isize) {
        let len = self.open_card_len();
        if len == 0 {
            return;
        }
        self.card_idx = wrap_index(self.card_idx, len, delta);
        self.card_face = CardFace::Front;
    }

    fn open_card_editor(&mut self) {
        let Some(deck) = self.open_deck.clone() else {
            return;
        };
        let Some(card) = self
            .data
            .decks
            .cards(&deck)
            .and_then(|cards| cards.get(self.card_idx))
        else {
            return;
        };
        self.mode = Mode::CardForm {
            editing: Some(self.card_idx),
            form: CardForm::from_card(&card.front, &card.back),
        };
        self.status = "Editing card (Tab move, Enter save, Esc cancel)".into();
    }

    /// The cursor deliberately lands back on 0: the deck may now be empty.
    fn delete_current_card(&mut self) {
        let Some(deck) = self.open_deck.clone() else {
            return;
        };
        if self.data.decks.delete_card(&deck, self.card_idx).is_ok() {
            self.card_idx = 0;
            self.card_face = CardFace::Front;
            let result = storage::save_decks(&mut self.store, &self.data.decks);
            self.after_save(result, "Card deleted");
        }
    }

    fn selected_note_id(&self) -> Option<i64> {
        self.data
            .notes
            .list(&self.note_query)
            .get(self.note_idx)
            .map(|note| note.id)
    }

    fn toggle_selected_pin(&mut self) {
        if let Some(id) = self.selected_note_id() {
            if self.data.notes.toggle_pin(id) {
                let pinned = self.data.notes.get(id).map(|n| n.pinned).unwrap_or(false);
                let result = storage::save_notes(&mut self.store, &self.data.notes);
                self.after_save(result, if pinned { "Pinned" } else { "Unpinned" });
            }
        }
    }

    /// In-memory state is already correct when a save fails; the failure is
    /// surfaced as a status notification and the action can simply be
    /// repeated.
    fn after_save(&mut self, result: Result<(), StorageError>, message: impl Into<String>) {
        match result {
            Ok(()) => self.status = message.into(),
            Err(err) => {
                log::error!("save failed: {err}");
                self.status = format!("Saved in memory only: {err}");
            }
        }
    }

    /// Pure projection of state to the frame; nothing in here mutates.
    fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let palette = palette(self.data.theme);
        if self.onboarding.is_some() {
            self.draw_onboarding(f, &palette);
            return;
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0], &palette);
        match self.screen {
            Screen::Home => self.draw_home(f, layout[1], &palette),
            Screen::Decks => self.draw_decks(f, layout[1], &palette),
            Screen::Cards => self.draw_cards(f, layout[1], &palette),
            Screen::Notes => self.draw_notes(f, layout[1], &palette),
            Screen::Timer => self.draw_timer(f, layout[1], &palette),
            Screen::Settings => self.draw_settings(f, layout[1], &palette),
        }
        self.draw_footer(f, layout[2], &palette);

        match &self.mode {
            Mode::Prompt { purpose, input } => draw_prompt(f, *purpose, input, &palette),
            Mode::CardForm { editing, form } => draw_card_form(f, editing.is_some(), form, &palette),
            Mode::NoteForm(form) => draw_note_form(f, form, &palette),
            Mode::Confirm(action) => self.draw_confirm(f, action, &palette),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let mut spans = vec![Span::styled(
            "daybook ",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )];
        if self.data.profile.is_onboarded() {
            spans.push(Span::styled(
                format!("hello, {}", self.data.profile.name),
                Style::default().fg(palette.text),
            ));
            spans.push(Span::raw("  •  "));
        }
        for (key, screen) in [
            ("1", Screen::Home),
            ("2", Screen::Decks),
            ("3", Screen::Notes),
            ("4", Screen::Timer),
            ("5", Screen::Settings),
        ] {
            let active = self.screen == screen
                || (screen == Screen::Decks && self.screen == Screen::Cards);
            let style = if active {
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(palette.dim)
            };
            spans.push(Span::styled(format!("{key} {}", screen.label()), style));
            spans.push(Span::raw("  "));
        }
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(palette.dim));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_home(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let block = Block::default()
            .title(Span::styled(
                format!("today ({} tasks)", self.data.todos.len()),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent));

        if self.data.todos.is_empty() {
            let hint = Paragraph::new("no tasks yet. press a to add one.")
                .style(Style::default().fg(palette.dim))
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(hint, area);
            return;
        }

        let items: Vec<ListItem<'_>> = self
            .data
            .todos
            .iter()
            .enumerate()
            .map(|(i, task)| {
                ListItem::new(format!("{:>3}. {}", i + 1, task))
                    .style(Style::default().fg(palette.text))
            })
            .collect();
        let mut state = ListState::default();
        state.select(Some(self.todo_idx.min(self.data.todos.len() - 1)));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(palette.highlight_bg)
                .fg(palette.highlight_fg)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_decks(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let block = Block::default()
            .title(Span::styled(
                format!("decks ({})", self.data.decks.len()),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent));

        if self.data.decks.is_empty() {
            let hint = Paragraph::new("no decks yet. create one to get started.")
                .style(Style::default().fg(palette.dim))
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(hint, area);
            return;
        }

        let items: Vec<ListItem<'_>> = self
            .data
            .decks
            .iter()
            .map(|(name, cards)| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        name.to_string(),
                        Style::default()
                            .fg(palette.text)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {} cards", cards.len()),
                        Style::default().fg(palette.dim),
                    ),
                ]))
            })
            .collect();
        let mut state = ListState::default();
        state.select(Some(self.deck_idx.min(self.data.decks.len() - 1)));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(palette.highlight_bg)
                .fg(palette.highlight_fg)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_cards(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let deck_name = self.open_deck.as_deref().unwrap_or("");
        let cards = self
            .open_deck
            .as_deref()
            .and_then(|name| self.data.decks.cards(name))
            .unwrap_or(&[]);

        let block = Block::default()
            .title(Span::styled(
                deck_name.to_string(),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent));

        if cards.is_empty() {
            let hint = Paragraph::new("no cards yet. press a to add one.")
                .style(Style::default().fg(palette.dim))
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(hint, area);
            return;
        }

        let index = self.card_idx.min(cards.len() - 1);
        let card = &cards[index];
        let (face_label, face_text) = match self.card_face {
            CardFace::Front => ("front", card.front.as_str()),
            CardFace::Back => ("back", card.back.as_str()),
        };

        let inner = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(block.inner(area));
        f.render_widget(block, area);

        let face = Paragraph::new(face_text.to_string())
            .style(
                Style::default()
                    .fg(palette.text)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(face, inner[0]);

        let meta = Line::from(vec![
            Span::styled(
                format!("{} / {}", index + 1, cards.len()),
                Style::default().fg(palette.dim),
            ),
            Span::raw("  •  "),
            Span::styled(face_label, Style::default().fg(palette.accent)),
        ]);
        let meta = Paragraph::new(meta).alignment(Alignment::Center);
        f.render_widget(meta, inner[1]);
    }

    fn draw_notes(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(4)])
            .split(area);

        let search = if self.note_query.is_empty() {
            Line::from(Span::styled(
                "press / to search",
                Style::default().fg(palette.dim),
            ))
        } else {
            Line::from(vec![
                Span::styled("search: ", Style::default().fg(palette.dim)),
                Span::styled(
                    self.note_query.clone(),
                    Style::default().fg(palette.accent),
                ),
            ])
        };
        f.render_widget(Paragraph::new(search), rows[0]);

        let listed = self.data.notes.list(&self.note_query);
        let block = Block::default()
            .title(Span::styled(
                format!("notes ({} of {})", listed.len(), self.data.notes.len()),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent));

        if listed.is_empty() {
            let text = if self.note_query.is_empty() {
                "no notes yet. press a to write one."
            } else {
                "nothing matches the search."
            };
            let hint = Paragraph::new(text)
                .style(Style::default().fg(palette.dim))
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(hint, rows[1]);
            return;
        }

        let items: Vec<ListItem<'_>> = listed
            .iter()
            .map(|note| {
                let mut title = vec![Span::styled(
                    note.display_title().to_string(),
                    Style::default()
                        .fg(palette.text)
                        .add_modifier(Modifier::BOLD),
                )];
                if note.pinned {
                    title.push(Span::styled(
                        "  pinned",
                        Style::default().fg(palette.pin),
                    ));
                }
                let mut lines = vec![Line::from(title)];
                let preview = note.preview();
                if !preview.is_empty() {
                    lines.push(Line::from(Span::styled(
                        preview,
                        Style::default().fg(palette.dim),
                    )));
                }
                if !note.tags.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!("#{}", note.tags),
                        Style::default().fg(palette.pin),
                    )));
                }
                ListItem::new(lines)
            })
            .collect();
        let mut state = ListState::default();
        state.select(Some(self.note_idx.min(listed.len() - 1)));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(palette.highlight_bg)
                .fg(palette.highlight_fg),
        );
        f.render_stateful_widget(list, rows[1], &mut state);
    }

    fn draw_timer(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let block = Block::default()
            .title(Span::styled(
                "focus",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Min(1),
            ])
            .split(inner);

        let state_label = if self.timer.is_running() {
            Span::styled(
                "running",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("paused", Style::default().fg(palette.dim))
        };
        let time = Paragraph::new(vec![
            Line::from(Span::styled(
                self.timer.format_remaining(),
                Style::default()
                    .fg(palette.text)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(state_label),
        ])
        .alignment(Alignment::Center);
        f.render_widget(time, rows[0]);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL))
            .gauge_style(Style::default().fg(palette.accent))
            .ratio(self.timer.progress().clamp(0.0, 1.0))
            .label(format!(
                "{} of {}",
                format_secs(
                    self.timer
                        .configured_secs()
                        .saturating_sub(self.timer.remaining_secs())
                ),
                format_secs(self.timer.configured_secs())
            ));
        f.render_widget(gauge, rows[1]);

        let stats = Paragraph::new(Line::from(vec![
            Span::styled(
                format!("sessions: {}", self.data.stats.sessions),
                Style::default().fg(palette.text),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("focused time: {} min", self.data.stats.focused_minutes()),
                Style::default().fg(palette.text),
            ),
        ]))
        .alignment(Alignment::Center);
        f.render_widget(stats, rows[2]);
    }

    fn draw_settings(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let profile = &self.data.profile;
        let label = Style::default().fg(palette.dim);
        let value = Style::default().fg(palette.text);
        let lines = vec![
            Line::from(vec![
                Span::styled("name      ", label),
                Span::styled(profile.name.clone(), value),
            ]),
            Line::from(vec![
                Span::styled("age       ", label),
                Span::styled(profile.age.clone(), value),
            ]),
            Line::from(vec![
                Span::styled("purposes  ", label),
                Span::styled(profile.purposes.join(", "), value),
            ]),
            Line::from(vec![
                Span::styled("theme     ", label),
                Span::styled(
                    match self.data.theme {
                        ThemeMode::Light => "light",
                        ThemeMode::Dark => "dark",
                    },
                    value,
                ),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "n change name  •  t toggle theme  •  R erase everything",
                label,
            )),
        ];
        let block = Block::default()
            .title(Span::styled(
                "settings",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent));
        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help = Paragraph::new(self.footer_help_line(palette))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(palette.dim)),
            );
        f.render_widget(help, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .style(Style::default().fg(palette.text))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(palette.dim)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self, palette: &Palette) -> Line<'static> {
        let key = Style::default().fg(palette.accent);
        let text = Style::default().fg(palette.dim);
        let pairs: &[(&str, &str)] = match self.screen {
            Screen::Home => &[
                ("j/k", " move  "),
                ("a", " add  "),
                ("d", " remove  "),
                ("q", " quit"),
            ],
            Screen::Decks => &[
                ("j/k", " move  "),
                ("a", " new deck  "),
                ("Enter", " open  "),
                ("q", " quit"),
            ],
            Screen::Cards => &[
                ("space", " flip  "),
                ("h/l", " prev/next  "),
                ("a", " add  "),
                ("e", " edit  "),
                ("d", " delete  "),
                ("r", " rename deck  "),
                ("D", " delete deck  "),
                ("Esc", " back"),
            ],
            Screen::Notes => &[
                ("j/k", " move  "),
                ("/", " search  "),
                ("a", " new  "),
                ("Enter", " open  "),
                ("p", " pin  "),
                ("d", " delete"),
            ],
            Screen::Timer => &[
                ("s", " start/pause  "),
                ("r", " reset  "),
                ("c", " set length  "),
                ("q", " quit"),
            ],
            Screen::Settings => &[
                ("n", " name  "),
                ("t", " theme  "),
                ("R", " erase all  "),
                ("q", " quit"),
            ],
        };
        let mut spans = Vec::new();
        for (k, label) in pairs {
            spans.push(Span::styled((*k).to_string(), key));
            spans.push(Span::styled((*label).to_string(), text));
        }
        Line::from(spans)
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, action: &ConfirmAction, palette: &Palette) {
        let message = match action {
            ConfirmAction::DeleteDeck(name) => format!("Delete deck \"{name}\" and its cards?"),
            ConfirmAction::DeleteNote(id) => {
                let title = self
                    .data
                    .notes
                    .get(*id)
                    .map(|n| n.display_title().to_string())
                    .unwrap_or_else(|| "this note".to_string());
                format!("Delete \"{title}\"?")
            }
            ConfirmAction::ResetAll => "Erase every task, deck, note, and statistic?".to_string(),
        };
        let area = centered_rect(50, 30, f.size());
        let body = vec![
            Line::from(Span::styled(
                message,
                Style::default()
                    .fg(palette.danger)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Confirm",
                    Style::default()
                        .fg(palette.danger)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.danger)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_onboarding(&self, f: &mut ratatui::Frame<'_>, palette: &Palette) {
        let Some(ref ob) = self.onboarding else {
            return;
        };
        let area = centered_rect(60, 50, f.size());
        let mut lines = vec![
            Line::from(Span::styled(
                "welcome to daybook",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        match ob.step {
            OnboardingStep::Name => {
                lines.push(Line::from("what's your name?"));
                lines.push(Line::from(Span::styled(
                    ob.name.with_caret(),
                    Style::default().fg(palette.accent),
                )));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Enter to continue",
                    Style::default().fg(palette.dim),
                )));
            }
            OnboardingStep::Age => {
                lines.push(Line::from("how old are you?"));
                lines.push(Line::from(Span::styled(
                    ob.age.with_caret(),
                    Style::default().fg(palette.accent),
                )));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Enter to continue",
                    Style::default().fg(palette.dim),
                )));
            }
            OnboardingStep::Purposes => {
                lines.push(Line::from("what will you use daybook for?"));
                for (i, (label, picked)) in ob.choices.iter().enumerate() {
                    let marker = if *picked { "[x]" } else { "[ ]" };
                    let style = if i == ob.cursor {
                        Style::default()
                            .fg(palette.accent)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(palette.text)
                    };
                    lines.push(Line::from(Span::styled(
                        format!("{marker} {label}"),
                        style,
                    )));
                }
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "space to toggle, Enter to finish (pick at least one)",
                    Style::default().fg(palette.dim),
                )));
            }
        }
        let dialog = Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

struct Palette {
    accent: Color,
    text: Color,
    dim: Color,
    highlight_bg: Color,
    highlight_fg: Color,
    danger: Color,
    pin: Color,
}

fn palette(theme: ThemeMode) -> Palette {
    match theme {
        ThemeMode::Light => Palette {
            accent: Color::Blue,
            text: Color::Black,
            dim: Color::DarkGray,
            highlight_bg: Color::LightYellow,
            highlight_fg: Color::Black,
            danger: Color::Red,
            pin: Color::Magenta,
        },
        ThemeMode::Dark => Palette {
            accent: Color::Cyan,
            text: Color::White,
            dim: Color::DarkGray,
            highlight_bg: Color::LightCyan,
            highlight_fg: Color::Black,
            danger: Color::LightRed,
            pin: Color::LightMagenta,
        },
    }
}

fn draw_prompt(
    f: &mut ratatui::Frame<'_>,
    purpose: PromptPurpose,
    input: &FieldValue,
    palette: &Palette,
) {
    let area = centered_rect(50, 20, f.size());
    let body = vec![
        Line::from(Span::styled(
            input.with_caret(),
            Style::default().fg(palette.text),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to confirm • Esc to cancel",
            Style::default().fg(palette.dim),
        )),
    ];
    let dialog = Paragraph::new(body).block(
        Block::default()
            .title(Span::styled(
                purpose.title(),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent)),
    );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_card_form(f: &mut ratatui::Frame<'_>, editing: bool, form: &CardForm, palette: &Palette) {
    let area = centered_rect(60, 40, f.size());
    let mut fields = Vec::new();
    fields.extend(field_lines(
        "Front",
        &form.front,
        form.field == CardField::Front,
        palette,
    ));
    fields.extend(field_lines(
        "Back",
        &form.back,
        form.field == CardField::Back,
        palette,
    ));
    fields.push(Line::from(Span::styled(
        "Tab to switch sides • Enter to save • Esc to cancel",
        Style::default().fg(palette.dim),
    )));
    let title = if editing { "Edit Card" } else { "Add Card" };
    let dialog = Paragraph::new(fields)
        .block(
            Block::default()
                .title(Span::styled(
                    title,
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_note_form(f: &mut ratatui::Frame<'_>, form: &NoteForm, palette: &Palette) {
    let area = centered_rect(80, 80, f.size());
    let mut fields = Vec::new();
    fields.extend(field_lines(
        "Title",
        &form.title,
        form.field == NoteField::Title,
        palette,
    ));
    fields.extend(field_lines(
        "Content",
        &form.content,
        form.field == NoteField::Content,
        palette,
    ));
    fields.extend(field_lines(
        "Tags",
        &form.tags,
        form.field == NoteField::Tags,
        palette,
    ));
    fields.push(Line::from(Span::styled(
        if form.pinned { "pinned" } else { "not pinned" },
        Style::default().fg(palette.pin),
    )));
    fields.push(Line::from(Span::styled(
        "Ctrl+Enter save • Ctrl+P pin • Tab move • Enter adds a line in Content • Esc cancel",
        Style::default().fg(palette.dim),
    )));
    let dialog = Paragraph::new(fields)
        .block(
            Block::default()
                .title(Span::styled(
                    "Note",
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char(self.cursor, &self.value);
    }

    fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx - 1], col);
    }

    fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx + 1], col);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

fn field_lines(
    label: &str,
    field: &FieldValue,
    active: bool,
    palette: &Palette,
) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(palette.dim)
        .add_modifier(Modifier::BOLD);
    let value_style = Style::default().fg(if active { palette.accent } else { palette.text });
    let prefix = format!("{label}: ");
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    let segments: Vec<&str> = if text.is_empty() {
        vec![""]
    } else {
        text.split('\n').collect()
    };
    segments
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            Line::from(vec![
                Span::styled(
                    if idx == 0 {
                        prefix.clone()
                    } else {
                        spacer.clone()
                    },
                    label_style,
                ),
                Span::styled((*line).to_string(), value_style),
            ])
        })
        .collect()
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// `(index ± delta + len) % len`; 0 on an empty list.
fn wrap_index(index: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    (index as isize + delta).rem_euclid(len as isize) as usize
}

/// `"1:30"` → one hour thirty minutes; a bare number is minutes.
fn parse_duration(input: &str) -> Option<(u64, u64)> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.split_once(':') {
        Some((hours, minutes)) => {
            Some((hours.trim().parse().ok()?, minutes.trim().parse().ok()?))
        }
        None => Some((0, trimmed.parse().ok()?)),
    }
}

fn prev_char(cursor: usize, text: &str) -> usize {
    let mut prev = 0;
    for (idx, _) in text.char_indices() {
        if idx >= cursor {
            break;
        }
        prev = idx;
    }
    prev
}

fn next_char(cursor: usize, text: &str) -> usize {
    for (idx, ch) in text.char_indices() {
        if idx > cursor {
            return idx;
        }
        if idx == cursor {
            return cursor + ch.len_utf8();
        }
    }
    text.len()
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let mut line_idx = 0;
    for (i, start) in starts.iter().enumerate() {
        if *start <= cursor {
            line_idx = i;
        } else {
            break;
        }
    }
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    let mut col = 0;
    for (idx, _) in slice[..limit].char_indices() {
        if col == target_col {
            return start + idx;
        }
        col += 1;
    }
    start + limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{load, MemStore, KEY_DECKS, KEY_STATS, KEY_TODOS};
    use crate::model::{DeckSet, PomodoroStats, TodoList};

    fn app_with_deck(cards: usize) -> App<MemStore> {
        let mut data = AppData::default();
        data.profile.name = "ada".to_string();
        data.decks.create("deck").unwrap();
        for i in 0..cards {
            data.decks
                .add_card("deck", &format!("front {i}"), &format!("back {i}"))
                .unwrap();
        }
        let mut app = App::new(MemStore::default(), data);
        app.view_deck("deck");
        app
    }

    #[test]
    fn wrap_index_cycles_back_to_zero_after_len_steps() {
        for len in 1..=6 {
            let mut idx = 0;
            for _ in 0..len {
                idx = wrap_index(idx, len, 1);
            }
            assert_eq!(idx, 0, "len {len}");
        }
    }

    #[test]
    fn wrap_index_retreats_past_zero() {
        assert_eq!(wrap_index(0, 3, -1), 2);
        assert_eq!(wrap_index(2, 3, 1), 0);
        assert_eq!(wrap_index(0, 0, 1), 0);
    }

    #[test]
    fn parse_duration_accepts_both_shapes() {
        assert_eq!(parse_duration("1:30"), Some((1, 30)));
        assert_eq!(parse_duration("25"), Some((0, 25)));
        assert_eq!(parse_duration(" 0:0 "), Some((0, 0)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("later"), None);
    }

    #[test]
    fn advance_card_is_a_noop_on_an_empty_deck() {
        let mut app = app_with_deck(0);
        app.advance_card(1);
        assert_eq!(app.card_idx, 0);
    }

    #[test]
    fn advance_card_resets_face_to_front() {
        let mut app = app_with_deck(3);
        app.flip_card();
        assert_eq!(app.card_face, CardFace::Back);
        app.advance_card(1);
        assert_eq!(app.card_idx, 1);
        assert_eq!(app.card_face, CardFace::Front);
    }

    #[test]
    fn delete_card_resets_cursor_to_zero() {
        let mut app = app_with_deck(3);
        app.advance_card(1);
        app.advance_card(1);
        assert_eq!(app.card_idx, 2);
        app.delete_current_card();
        assert_eq!(app.card_idx, 0);
        assert_eq!(app.open_card_len(), 2);
    }

    #[test]
    fn deleting_the_last_card_leaves_an_empty_deck_in_bounds() {
        let mut app = app_with_deck(1);
        app.delete_current_card();
        assert_eq!(app.open_card_len(), 0);
        assert_eq!(app.card_idx, 0);
        app.advance_card(1);
        app.flip_card();
        assert_eq!(app.card_idx, 0);
    }

    #[test]
    fn duplicate_deck_name_is_surfaced_not_applied() {
        let mut app = app_with_deck(0);
        app.submit_prompt(PromptPurpose::NewDeck, "deck");
        assert_eq!(app.data.decks.len(), 1);
        assert!(app.status.contains("already exists"));
    }

    #[test]
    fn todo_prompt_persists_to_the_store() {
        let mut app = app_with_deck(0);
        app.submit_prompt(PromptPurpose::NewTodo, "water the plants");
        let stored: TodoList = load(&app.store, KEY_TODOS, TodoList::default());
        assert_eq!(stored.iter().collect::<Vec<_>>(), vec!["water the plants"]);
    }

    #[test]
    fn blank_todo_prompt_changes_nothing() {
        let mut app = app_with_deck(0);
        app.submit_prompt(PromptPurpose::NewTodo, "   ");
        assert!(app.data.todos.is_empty());
        assert!(app.store.get(KEY_TODOS).is_none());
    }

    #[test]
    fn rename_prompt_follows_the_open_deck() {
        let mut app = app_with_deck(1);
        app.submit_prompt(PromptPurpose::RenameDeck, "renamed");
        assert_eq!(app.open_deck.as_deref(), Some("renamed"));
        let stored: DeckSet = load(&app.store, KEY_DECKS, DeckSet::default());
        assert!(stored.contains("renamed"));
        assert!(!stored.contains("deck"));
    }

    #[test]
    fn deck_delete_returns_to_the_deck_list() {
        let mut app = app_with_deck(2);
        app.apply_confirmed(ConfirmAction::DeleteDeck("deck".to_string()));
        assert!(app.open_deck.is_none());
        assert!(app.screen == Screen::Decks);
        assert!(app.data.decks.is_empty());
    }

    #[test]
    fn completed_session_is_persisted_once() {
        let mut app = app_with_deck(0);
        app.timer.configure(0, 1);
        let start = Instant::now();
        app.timer.start(start);
        app.drive_timer(start + Duration::from_secs(60));

        assert_eq!(app.data.stats.sessions, 1);
        assert_eq!(app.data.stats.seconds, 60);
        let stored: PomodoroStats = load(&app.store, KEY_STATS, PomodoroStats::default());
        assert_eq!(stored, app.data.stats);

        app.drive_timer(start + Duration::from_secs(120));
        assert_eq!(app.data.stats.sessions, 1);
    }

    #[test]
    fn reset_all_clears_the_store_and_restarts_onboarding() {
        let mut app = app_with_deck(1);
        app.submit_prompt(PromptPurpose::NewTodo, "task");
        app.timer.start(Instant::now());

        app.apply_confirmed(ConfirmAction::ResetAll);

        assert!(!app.timer.is_running());
        assert!(app.onboarding.is_some());
        assert!(app.data.todos.is_empty());
        assert!(app.data.decks.is_empty());
        assert!(app.store.get(KEY_TODOS).is_none());
        assert!(app.store.get(KEY_DECKS).is_none());
    }

    #[test]
    fn search_prompt_filters_and_resets_selection() {
        let mut data = AppData::default();
        data.profile.name = "ada".to_string();
        data.notes.save(1, "apples", "", "", false).unwrap();
        data.notes.save(2, "bananas", "", "", false).unwrap();
        let mut app = App::new(MemStore::default(), data);
        app.note_idx = 1;

        app.submit_prompt(PromptPurpose::SearchNotes, "ban");
        assert_eq!(app.note_idx, 0);
        assert_eq!(app.selected_note_id(), Some(2));
    }
}

mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::ai::ContentService;
use crate::learn::LearnStage;
use crate::models::{now_millis, StudyMode, StudySet, UserProgress};
use crate::modes::{ActiveSession, MatchOutcome, StudySession, WriteStage};
use crate::progress::{record_session, SessionSummary};
use crate::sample::sample_study_set;
use crate::store::{Backend, StudyStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Sets,
    SetDetail,
    Study,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Sets,
            View::Sets => View::Dashboard,
            View::SetDetail => View::Sets,
            View::Study => View::Study,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Sets,
            View::Sets => View::Dashboard,
            View::SetDetail => View::Sets,
            View::Study => View::Study,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i >= self.items.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) => {
                if i == 0 {
                    self.items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.selected = Some(i);
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

/// Lifetime totals for one mode summed over every set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeTotals {
    pub items_studied: u32,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    pub completed_sessions: u32,
}

impl ModeTotals {
    fn add(&mut self, progress: &UserProgress) {
        self.items_studied += progress.items_studied;
        self.correct_answers += progress.correct_answers;
        self.incorrect_answers += progress.incorrect_answers;
        self.completed_sessions += progress.completed_sessions;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub total_sets: usize,
    pub total_items: usize,
    pub by_mode: Vec<(StudyMode, ModeTotals)>,
}

pub struct StudyState {
    pub set: StudySet,
    pub session: ActiveSession,
    // Portion of the summary already written to the store.
    recorded: SessionSummary,
}

pub struct App {
    store: Box<dyn StudyStore>,
    service: Box<dyn ContentService>,
    pub backend: Backend,
    pub view: View,
    pub sets: StatefulList<StudySet>,
    pub selected_set: Option<StudySet>,
    pub selected_progress: Vec<UserProgress>,
    pub study: Option<StudyState>,
    pub stats: Stats,
    pub message: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        store: Box<dyn StudyStore>,
        service: Box<dyn ContentService>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let backend = store.backend();
        let mut app = Self {
            store,
            service,
            backend,
            view: View::Dashboard,
            sets: StatefulList::with_items(Vec::new()),
            selected_set: None,
            selected_progress: Vec::new(),
            study: None,
            stats: Stats::default(),
            message: None,
            should_quit: false,
        };
        app.refresh_data()?;
        Ok(app)
    }

    pub fn refresh_data(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let sets = self.store.get_all_study_sets()?;

        let mut by_mode: Vec<(StudyMode, ModeTotals)> = StudyMode::ALL
            .iter()
            .map(|m| (*m, ModeTotals::default()))
            .collect();
        for set in &sets {
            for progress in self.store.list_user_progress(&set.id)? {
                if let Some((_, totals)) = by_mode.iter_mut().find(|(m, _)| *m == progress.mode) {
                    totals.add(&progress);
                }
            }
        }
        self.stats = Stats {
            total_sets: sets.len(),
            total_items: sets.iter().map(|s| s.items.len()).sum(),
            by_mode,
        };

        let previous = self.sets.selected_item().map(|s| s.id.clone());
        self.sets = StatefulList::with_items(sets);
        if let Some(id) = previous {
            if let Some(i) = self.sets.items.iter().position(|s| s.id == id) {
                self.sets.selected = Some(i);
            }
        }

        if let Some(id) = self.selected_set.as_ref().map(|s| s.id.clone()) {
            self.load_set(&id)?;
        }
        Ok(())
    }

    fn load_set(&mut self, id: &str) -> Result<bool, Box<dyn std::error::Error>> {
        match self.store.get_study_set(id)? {
            Some(set) => {
                self.selected_progress = self.store.list_user_progress(id)?;
                self.selected_set = Some(set);
                Ok(true)
            }
            None => {
                self.selected_set = None;
                self.selected_progress.clear();
                Ok(false)
            }
        }
    }

    fn select_set(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(id) = self.sets.selected_item().map(|s| s.id.clone()) {
            if self.load_set(&id)? {
                self.view = View::SetDetail;
            }
        }
        Ok(())
    }

    fn add_sample_set(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let set = self.store.create_study_set(sample_study_set())?;
        self.message = Some(format!("Created '{}'", set.title));
        self.refresh_data()?;
        self.sets.selected = self.sets.items.iter().position(|s| s.id == set.id);
        Ok(())
    }

    pub fn start_study(
        &mut self,
        set_id: &str,
        mode: StudyMode,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !self.load_set(set_id)? {
            self.message = Some("Study set not found".to_string());
            return Ok(());
        }
        let Some(set) = self.selected_set.clone() else {
            return Ok(());
        };

        let mut rng = rand::thread_rng();
        let session = ActiveSession::start(mode, &set.items, now_millis(), &mut rng);
        log::debug!("Starting {} session on {}", mode.as_str(), set.id);
        self.study = Some(StudyState {
            set,
            session,
            recorded: SessionSummary::default(),
        });
        self.message = None;
        self.view = View::Study;
        Ok(())
    }

    /// Writes whatever the running session has not recorded yet.
    fn flush_progress(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(study) = self.study.as_mut() else {
            return Ok(());
        };
        let summary = study.session.summary();
        let unrecorded = summary.since(&study.recorded);
        if unrecorded.is_empty() && !unrecorded.completed {
            return Ok(());
        }
        record_session(
            self.store.as_mut(),
            &study.set.id,
            study.session.mode(),
            &unrecorded,
            now_millis(),
        )?;
        study.recorded = summary;
        Ok(())
    }

    fn leave_study(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.flush_progress()?;
        let set_id = self.study.take().map(|s| s.set.id);
        self.refresh_data()?;
        if let Some(id) = set_id {
            self.load_set(&id)?;
        }
        self.view = if self.selected_set.is_some() {
            View::SetDetail
        } else {
            View::Sets
        };
        Ok(())
    }

    fn handle_key(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.view == View::Study {
            return self.handle_study_key(key);
        }

        self.message = None;
        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            KeyCode::Char('s') if self.view != View::SetDetail => self.add_sample_set()?,

            KeyCode::Esc => {
                if self.view == View::SetDetail {
                    self.view = View::Sets;
                    self.selected_set = None;
                }
            }

            KeyCode::Char('h') | KeyCode::Left => match self.view {
                View::SetDetail => {
                    self.view = View::Sets;
                    self.selected_set = None;
                }
                _ => self.view = self.view.prev(),
            },
            KeyCode::Char('l') | KeyCode::Right => match self.view {
                View::Sets => self.select_set()?,
                _ => self.view = self.view.next(),
            },

            KeyCode::Tab => {
                if modifiers.contains(KeyModifiers::SHIFT) {
                    self.view = self.view.prev();
                } else {
                    self.view = self.view.next();
                }
            }
            KeyCode::BackTab => {
                self.view = self.view.prev();
            }

            KeyCode::Char('j') | KeyCode::Down if self.view == View::Sets => self.sets.next(),
            KeyCode::Char('k') | KeyCode::Up if self.view == View::Sets => self.sets.previous(),

            KeyCode::Char('g') if self.view == View::Sets && !self.sets.items.is_empty() => {
                self.sets.selected = Some(0);
            }
            KeyCode::Char('G') if self.view == View::Sets && !self.sets.items.is_empty() => {
                self.sets.selected = Some(self.sets.items.len() - 1);
            }

            KeyCode::Enter if self.view == View::Sets => self.select_set()?,

            // 1-5 pick a study mode from the set detail view
            KeyCode::Char(c @ '1'..='5') if self.view == View::SetDetail => {
                let index = (c as usize) - ('1' as usize);
                let id = self.selected_set.as_ref().map(|s| s.id.clone());
                if let Some(id) = id {
                    self.start_study(&id, StudyMode::ALL[index])?;
                }
            }

            _ => {}
        }
        Ok(())
    }

    fn learn_resettable(&self) -> bool {
        matches!(
            self.study.as_ref().map(|s| &s.session),
            Some(ActiveSession::Learn(l)) if l.stage() == LearnStage::Term
        )
    }

    fn reset_learn(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Reset drops the counters, so persist them first.
        self.flush_progress()?;
        if let Some(study) = self.study.as_mut() {
            if let ActiveSession::Learn(l) = &mut study.session {
                l.reset(now_millis());
            }
            study.recorded = SessionSummary::default();
        }
        Ok(())
    }

    fn handle_study_key(&mut self, key: KeyCode) -> Result<(), Box<dyn std::error::Error>> {
        if key == KeyCode::Esc {
            return self.leave_study();
        }

        if key == KeyCode::Char('R') && self.learn_resettable() {
            return self.reset_learn();
        }

        let Some(study) = self.study.as_mut() else {
            self.view = View::Sets;
            return Ok(());
        };
        let was_complete = study.session.is_complete();
        let now = now_millis();
        let service = self.service.as_ref();

        match &mut study.session {
            ActiveSession::Flashcards(s) => match key {
                KeyCode::Char(' ') | KeyCode::Enter => s.flip(),
                KeyCode::Char('l') | KeyCode::Char('j') | KeyCode::Right => s.next(),
                KeyCode::Char('h') | KeyCode::Char('k') | KeyCode::Left => s.previous(),
                KeyCode::Char('y') => s.mark(true),
                KeyCode::Char('n') => s.mark(false),
                KeyCode::Char('s') => s.shuffle(&mut rand::thread_rng()),
                _ => {}
            },

            ActiveSession::Quiz(s) => match key {
                KeyCode::Char(c @ '1'..='4') => {
                    s.choose((c as usize) - ('1' as usize));
                }
                KeyCode::Char(c @ 'a'..='d') => {
                    s.choose((c as usize) - ('a' as usize));
                }
                KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => s.next(),
                _ => {}
            },

            ActiveSession::Match(s) => match key {
                KeyCode::Char('l') | KeyCode::Char('j') | KeyCode::Right | KeyCode::Down => {
                    s.move_cursor(true)
                }
                KeyCode::Char('h') | KeyCode::Char('k') | KeyCode::Left | KeyCode::Up => {
                    s.move_cursor(false)
                }
                KeyCode::Char(' ') | KeyCode::Enter => match s.select_cursor() {
                    MatchOutcome::Matched => self.message = Some("Matched!".to_string()),
                    MatchOutcome::Mismatch => self.message = Some("Not a pair".to_string()),
                    _ => self.message = None,
                },
                _ => {}
            },

            ActiveSession::Learn(s) => match (s.stage(), key) {
                (LearnStage::Quiz, KeyCode::Enter) => {
                    s.submit_answer(service, now);
                }
                (LearnStage::Quiz, KeyCode::Backspace) => s.pop_char(),
                (LearnStage::Quiz, KeyCode::Char(c)) => s.push_char(c),
                (LearnStage::Term, KeyCode::Char(' ') | KeyCode::Enter) => {
                    if s.current().is_some() {
                        s.reveal();
                    } else {
                        s.refresh(now);
                    }
                }
                (LearnStage::Definition, KeyCode::Char('t')) => s.start_quiz(),
                (LearnStage::Definition, KeyCode::Char('y')) => s.self_grade(true, now),
                (LearnStage::Definition, KeyCode::Char('n')) => s.self_grade(false, now),
                _ => {}
            },

            ActiveSession::Write(s) => match (s.stage(), key) {
                (WriteStage::Answering, KeyCode::Enter) => {
                    s.submit(service);
                }
                (WriteStage::Answering, KeyCode::Backspace) => s.pop_char(),
                (WriteStage::Answering, KeyCode::Char(c)) => s.push_char(c),
                (WriteStage::Graded(_), KeyCode::Char('o')) => s.override_correct(),
                (WriteStage::Graded(_), KeyCode::Enter) => s.next(),
                _ => {}
            },
        }

        let now_complete = self
            .study
            .as_ref()
            .map(|s| s.session.is_complete())
            .unwrap_or(false);
        if now_complete && !was_complete {
            self.flush_progress()?;
            self.message = Some("Session complete, progress saved".to_string());
        }
        Ok(())
    }
}

pub fn run(
    store: Box<dyn StudyStore>,
    service: Box<dyn ContentService>,
    start: Option<(String, StudyMode)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(store, service)?;
    if let Some((set_id, mode)) = start {
        app.start_study(&set_id, mode)?;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Quitting mid-session still counts what was studied.
    if let Err(e) = app.flush_progress() {
        log::warn!("Failed to record progress on exit: {}", e);
    }

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::UnconfiguredService;
    use crate::models::{NewStudyItem, NewStudySet, SourceType};
    use crate::store::{LocalStore, MemoryKeyValueStore};

    fn app_with_set() -> (App, String) {
        let mut store = LocalStore::new(Box::new(MemoryKeyValueStore::default()));
        let set = store
            .create_study_set(NewStudySet {
                title: "Capitals".into(),
                description: String::new(),
                items: vec![
                    NewStudyItem::new("France", "Paris"),
                    NewStudyItem::new("Japan", "Tokyo"),
                ],
                source_type: SourceType::Manual,
                source_name: None,
            })
            .unwrap();
        let app = App::new(Box::new(store), Box::new(UnconfiguredService)).unwrap();
        (app, set.id)
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE).unwrap();
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn progress(app: &App, id: &str, mode: StudyMode) -> Option<UserProgress> {
        app.store.get_user_progress(id, mode).unwrap()
    }

    mod navigation_tests {
        use super::*;

        #[test]
        fn starts_on_dashboard_with_totals() {
            let (app, _) = app_with_set();
            assert_eq!(app.view, View::Dashboard);
            assert_eq!(app.stats.total_sets, 1);
            assert_eq!(app.stats.total_items, 2);
            assert_eq!(app.stats.by_mode.len(), StudyMode::ALL.len());
        }

        #[test]
        fn open_set_and_go_back() {
            let (mut app, id) = app_with_set();
            press(&mut app, KeyCode::Char('l'));
            assert_eq!(app.view, View::Sets);
            press(&mut app, KeyCode::Enter);
            assert_eq!(app.view, View::SetDetail);
            assert_eq!(app.selected_set.as_ref().unwrap().id, id);
            press(&mut app, KeyCode::Esc);
            assert_eq!(app.view, View::Sets);
            assert!(app.selected_set.is_none());
        }

        #[test]
        fn sample_key_adds_a_set() {
            let (mut app, _) = app_with_set();
            press(&mut app, KeyCode::Char('s'));
            assert_eq!(app.stats.total_sets, 2);
            assert!(app.message.is_some());
        }

        #[test]
        fn digit_starts_mode_from_detail() {
            let (mut app, _) = app_with_set();
            press(&mut app, KeyCode::Char('l'));
            press(&mut app, KeyCode::Enter);
            press(&mut app, KeyCode::Char('5'));
            assert_eq!(app.view, View::Study);
            assert_eq!(
                app.study.as_ref().unwrap().session.mode(),
                StudyMode::Write
            );
        }

        #[test]
        fn unknown_set_stays_put() {
            let (mut app, _) = app_with_set();
            app.start_study("missing", StudyMode::Quiz).unwrap();
            assert_eq!(app.view, View::Dashboard);
            assert!(app.study.is_none());
        }
    }

    mod study_tests {
        use super::*;

        #[test]
        fn leaving_records_partial_session() {
            let (mut app, id) = app_with_set();
            app.start_study(&id, StudyMode::Flashcards).unwrap();
            press(&mut app, KeyCode::Char('y'));
            press(&mut app, KeyCode::Esc);

            assert_eq!(app.view, View::SetDetail);
            let saved = progress(&app, &id, StudyMode::Flashcards).unwrap();
            assert_eq!(saved.items_studied, 1);
            assert_eq!(saved.correct_answers, 1);
            assert_eq!(saved.completed_sessions, 0);
            assert_eq!(app.selected_progress.len(), 1);
        }

        #[test]
        fn completion_records_once() {
            let (mut app, id) = app_with_set();
            app.start_study(&id, StudyMode::Write).unwrap();

            let first = app.study.as_ref().map(|s| match &s.session {
                ActiveSession::Write(w) => w.current().unwrap().definition.clone(),
                _ => unreachable!(),
            });
            type_text(&mut app, &first.unwrap());
            press(&mut app, KeyCode::Enter);
            press(&mut app, KeyCode::Enter);
            type_text(&mut app, "wrong");
            press(&mut app, KeyCode::Enter);

            let saved = progress(&app, &id, StudyMode::Write).unwrap();
            assert_eq!(saved.items_studied, 2);
            assert_eq!(saved.correct_answers, 1);
            assert_eq!(saved.incorrect_answers, 1);
            assert_eq!(saved.completed_sessions, 1);

            press(&mut app, KeyCode::Esc);
            let saved = progress(&app, &id, StudyMode::Write).unwrap();
            assert_eq!(saved.items_studied, 2);
            assert_eq!(saved.completed_sessions, 1);
        }

        #[test]
        fn leaving_untouched_session_records_nothing() {
            let (mut app, id) = app_with_set();
            app.start_study(&id, StudyMode::Match).unwrap();
            press(&mut app, KeyCode::Esc);
            assert!(progress(&app, &id, StudyMode::Match).is_none());
        }

        #[test]
        fn learn_typed_answer_is_graded() {
            let (mut app, id) = app_with_set();
            app.start_study(&id, StudyMode::Learn).unwrap();
            press(&mut app, KeyCode::Char(' '));
            press(&mut app, KeyCode::Char('t'));
            type_text(&mut app, "paris");
            press(&mut app, KeyCode::Enter);

            match &app.study.as_ref().unwrap().session {
                ActiveSession::Learn(s) => {
                    assert!(s.last_grade().unwrap().correct);
                    assert_eq!(s.items()[0].knowledge_level, 1);
                }
                _ => panic!("Expected learn session"),
            }
        }

        #[test]
        fn quit_key_is_text_while_typing() {
            let (mut app, id) = app_with_set();
            app.start_study(&id, StudyMode::Write).unwrap();
            press(&mut app, KeyCode::Char('q'));
            assert!(!app.should_quit);
            match &app.study.as_ref().unwrap().session {
                ActiveSession::Write(s) => assert_eq!(s.answer(), "q"),
                _ => panic!("Expected write session"),
            }
        }
    }
}

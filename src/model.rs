use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

use crate::browser::{DialogKind, LoadState, RecordBrowser};
use crate::config::FolioConfig;
use crate::domain::{CMDMode, FolioError, Message};
use crate::form::{EditForm, FormAction};
use crate::inputter::{InputResult, Inputter};
use crate::jobs::{Job, JobOutcome, Worker};
use crate::record::Record;
use crate::store::RecordStore;

const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    TABLE,
    RECORD,
    FORM,
    CONFIRM,
    POPUP,
    CMDINPUT,
}

pub struct Model {
    config: FolioConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    browser: RecordBrowser,
    worker: Worker,
    source: String,
    form: Option<EditForm>,
    deleting: bool,
    announce_load: bool,
    load_generation: u64,
    record_scroll: u16,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    search_before_input: String,
    active_cmdinput: bool,
    status_message: String,
    status_is_error: bool,
    last_status_message_update: Instant,
    clipboard: Option<Clipboard>,
}

impl Model {
    pub fn init(config: &FolioConfig, store: Arc<dyn RecordStore>) -> Self {
        let worker = Worker::new(store);
        let source = worker.store().describe();
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            browser: RecordBrowser::new(config.collection, config.page_size),
            worker,
            source,
            form: None,
            deleting: false,
            announce_load: false,
            load_generation: 0,
            record_scroll: 0,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            search_before_input: String::new(),
            active_cmdinput: false,
            status_message: String::new(),
            status_is_error: false,
            last_status_message_update: Instant::now(),
            clipboard: None,
        };
        model.reload();
        model
    }

    // -------------------- Accessors for the ui ---------------------- //

    pub fn browser(&self) -> &RecordBrowser {
        &self.browser
    }

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn form(&self) -> Option<&EditForm> {
        self.form.as_ref()
    }

    pub fn deleting(&self) -> bool {
        self.deleting
    }

    pub fn record_scroll(&self) -> u16 {
        self.record_scroll
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The command line while one is being typed.
    pub fn cmd_input(&self) -> Option<(CMDMode, &InputResult)> {
        match (self.active_cmdinput, self.cmd_mode) {
            (true, Some(mode)) => Some((mode, &self.last_input)),
            _ => None,
        }
    }

    /// Current status line. Notices fade after a while, errors stay until replaced.
    pub fn status_message(&self) -> (&str, bool) {
        if !self.status_is_error && self.last_status_message_update.elapsed() > STATUS_TIMEOUT {
            return ("", false);
        }
        (&self.status_message, self.status_is_error)
    }

    /// Whether keys should be handed over verbatim instead of mapped to commands.
    pub fn raw_keyevents(&self) -> bool {
        matches!(self.modus, Modus::CMDINPUT | Modus::FORM)
    }

    pub fn confirming(&self) -> bool {
        self.modus == Modus::CONFIRM
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.status_is_error = false;
        self.last_status_message_update = Instant::now();
    }

    fn set_error_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.status_is_error = true;
        self.last_status_message_update = Instant::now();
        error!("{}", self.status_message);
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), FolioError> {
        self.poll_jobs();

        if let Some(msg) = message {
            let ready = self.browser.load_state() == &LoadState::Ready;
            match self.modus {
                Modus::TABLE => match msg {
                    // Rows behind a skeleton or an error panel are not actionable
                    m @ (Message::MoveUp
                    | Message::MoveDown
                    | Message::NextPage
                    | Message::PreviousPage
                    | Message::CyclePageSize
                    | Message::Enter
                    | Message::View
                    | Message::Edit
                    | Message::Delete
                    | Message::CopyCell
                    | Message::CopyRow)
                        if !ready =>
                    {
                        trace!("Ignoring {m:?} until {} are loaded", self.browser.collection().label());
                    }
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.browser.move_cursor(-1),
                    Message::MoveDown => self.browser.move_cursor(1),
                    Message::NextPage => self.browser.next_page(),
                    Message::PreviousPage => self.browser.previous_page(),
                    Message::CyclePageSize => {
                        self.browser.cycle_page_size();
                        self.set_status_message(format!("Rows per page: {}", self.browser.page().size));
                    }
                    Message::ToggleColumn(n) => self.toggle_column(n),
                    Message::Search => self.enter_cmd_mode(CMDMode::Search),
                    Message::EnterCommand => self.enter_cmd_mode(CMDMode::Raw),
                    Message::Enter | Message::View => self.open_view(),
                    Message::Edit => self.open_edit(),
                    Message::Create => self.open_create(),
                    Message::Delete => self.open_delete(),
                    Message::Refresh => self.reload(),
                    Message::SwitchCollection => self.switch_collection(),
                    Message::CopyCell => self.copy_title(),
                    Message::CopyRow => self.copy_row(),
                    Message::Help => self.show_help(),
                    Message::Exit => {
                        if !self.browser.search_term().is_empty() {
                            self.browser.set_search_term("");
                            self.set_status_message("Search cleared");
                        }
                    }
                    _ => (),
                },
                Modus::RECORD => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.record_scroll = self.record_scroll.saturating_add(1),
                    Message::MoveUp => self.record_scroll = self.record_scroll.saturating_sub(1),
                    Message::Edit => {
                        self.close_dialog();
                        self.open_edit();
                    }
                    Message::Help => self.show_help(),
                    Message::Enter | Message::View | Message::Exit => self.close_dialog(),
                    _ => (),
                },
                Modus::CONFIRM => match msg {
                    Message::Quit => self.quit(),
                    Message::Confirm => self.confirm_delete(),
                    Message::Exit if !self.deleting => self.close_dialog(),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter | Message::Help => self.exit_popup(),
                    _ => (),
                },
                Modus::FORM => {
                    if let Message::RawKey(key) = msg {
                        self.form_input(key)
                    }
                }
                Modus::CMDINPUT => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
        }
        Ok(())
    }

    // -------------------- Background jobs ---------------------- //

    fn poll_jobs(&mut self) {
        while let Some(outcome) = self.worker.try_recv() {
            self.apply(outcome);
        }
    }

    fn apply(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Loaded {
                collection,
                generation,
                result,
            } => {
                if generation != self.load_generation || collection != self.browser.collection() {
                    trace!(
                        "Dropping stale {} load {generation}, latest is {}",
                        collection.label(),
                        self.load_generation
                    );
                    return;
                }
                match result {
                    Ok(records) => {
                        info!("Loaded {} {}", records.len(), collection.label());
                        let loaded = records.len();
                        self.browser.replace_records(records);
                        if self.announce_load {
                            self.announce_load = false;
                            self.set_status_message(format!("Loaded {loaded} {}", collection.label()));
                        }
                    }
                    Err(e) => {
                        error!("Loading {} failed: {e}", collection.label());
                        self.announce_load = false;
                        self.browser.fail(e.to_string());
                    }
                }
            }
            JobOutcome::Saved {
                collection,
                created,
                result,
            } => match result {
                Ok(()) => {
                    self.form = None;
                    self.browser.close_dialog();
                    self.modus = Modus::TABLE;
                    let verb = if created { "created" } else { "updated" };
                    self.set_status_message(format!("{} {verb}", collection.noun()));
                    if collection == self.browser.collection() {
                        self.refetch();
                    }
                }
                Err(e) => {
                    if let Some(form) = self.form.as_mut() {
                        form.submitting = false;
                        form.error = Some(e.to_string());
                    }
                    let verb = if created { "Create" } else { "Update" };
                    self.set_error_message(format!("{verb} failed: {e}"));
                }
            },
            JobOutcome::Deleted {
                collection,
                title,
                result,
            } => {
                self.deleting = false;
                if self.modus == Modus::CONFIRM {
                    self.close_dialog();
                }
                match result {
                    Ok(()) => {
                        self.set_status_message(format!("Deleted \"{title}\""));
                        if collection == self.browser.collection() {
                            self.refetch();
                        }
                    }
                    Err(e) => self.set_error_message(format!("Could not delete \"{title}\": {e}")),
                }
            }
        }
    }

    fn refetch(&mut self) {
        let collection = self.browser.collection();
        debug!("Fetching {}", collection.label());
        self.load_generation += 1;
        self.browser.begin_loading();
        self.worker.submit(Job::Load {
            collection,
            generation: self.load_generation,
        });
    }

    /// Refetch and report the result on the status line.
    fn reload(&mut self) {
        self.announce_load = true;
        self.set_status_message(format!("Loading {} ...", self.browser.collection().label()));
        self.refetch();
    }

    // -------------------- Control handling functions ---------------------- //

    fn toggle_column(&mut self, n: usize) {
        let collection = self.browser.collection();
        if let Some(&column) = collection.columns().get(n) {
            self.browser.toggle_column(column);
            let state = if self.browser.visibility().is_visible(column) {
                "Showing"
            } else {
                "Hiding"
            };
            self.set_status_message(format!("{state} column {}", column.name()));
        }
    }

    fn switch_collection(&mut self) {
        let next = self.browser.collection().other();
        if !self.worker.store().serves(next) {
            self.set_error_message(format!("{} has no {}", self.source, next.label()));
            return;
        }
        trace!("Switching to {}", next.label());
        self.browser = RecordBrowser::new(next, self.config.page_size);
        self.reload();
    }

    fn selected(&self) -> Option<Record> {
        self.browser.selected().cloned()
    }

    fn open_view(&mut self) {
        if let Some(record) = self.selected() {
            self.browser.request_view(record);
            self.record_scroll = 0;
            self.modus = Modus::RECORD;
        }
    }

    fn open_edit(&mut self) {
        if let Some(record) = self.selected() {
            self.form = Some(EditForm::from_record(&record));
            self.browser.request_edit(record);
            self.modus = Modus::FORM;
        }
    }

    fn open_create(&mut self) {
        self.form = Some(EditForm::blank(self.browser.collection()));
        self.modus = Modus::FORM;
    }

    fn open_delete(&mut self) {
        if let Some(record) = self.selected() {
            self.browser.request_delete(record);
            self.modus = Modus::CONFIRM;
        }
    }

    fn confirm_delete(&mut self) {
        if self.deleting {
            return;
        }
        let Some(dialog) = self.browser.dialog() else {
            return;
        };
        if dialog.kind != DialogKind::Delete {
            return;
        }
        let job = Job::Delete {
            collection: dialog.record.collection(),
            id: dialog.record.id(),
            title: dialog.record.title().to_string(),
        };
        self.deleting = true;
        self.worker.submit(job);
    }

    fn close_dialog(&mut self) {
        self.browser.close_dialog();
        self.modus = Modus::TABLE;
    }

    fn close_form(&mut self) {
        self.form = None;
        self.close_dialog();
    }

    fn form_input(&mut self, key: KeyEvent) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        if form.submitting {
            return;
        }
        match form.read(key) {
            FormAction::Continue => {}
            FormAction::Cancel => self.close_form(),
            FormAction::Submit => match form.validate() {
                Ok(draft) => {
                    form.error = None;
                    form.submitting = true;
                    let job = match form.target() {
                        Some(id) => Job::Update { id, draft },
                        None => Job::Create(draft),
                    };
                    self.worker.submit(job);
                }
                Err(e) => {
                    trace!("Form rejected: {e}");
                    form.error = Some(e.message);
                }
            },
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn exit_popup(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?}");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.clear();
        if mode == CMDMode::Search {
            self.search_before_input = self.browser.search_term().to_string();
            self.input.set(&self.search_before_input);
        }
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        self.last_input = self.input.read(key);
        if self.cmd_mode == Some(CMDMode::Search) {
            // Live filtering: every edit re-runs the search
            let term = if self.last_input.canceled {
                self.search_before_input.clone()
            } else {
                self.last_input.input.clone()
            };
            if term != self.browser.search_term() {
                self.browser.set_search_term(&term);
            }
        }
        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);

        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let cmd_input = self.last_input.input.clone();
        match self.cmd_mode {
            Some(CMDMode::Search) => {
                if !self.browser.search_term().is_empty() {
                    self.set_status_message(format!(
                        "{} of {} {} match \"{}\"",
                        self.browser.filtered_len(),
                        self.browser.total_records(),
                        self.browser.collection().label(),
                        self.browser.search_term()
                    ));
                }
            }
            Some(CMDMode::Raw) => {
                if !self.last_input.canceled {
                    self.run_command(&cmd_input);
                }
            }
            None => {
                info!("Cmd mode is none!")
            }
        }

        self.cmd_mode = None;
    }

    fn run_command(&mut self, line: &str) {
        let line = line.trim();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();
        match cmd {
            "" => {}
            "size" => match arg.parse::<usize>() {
                Ok(size) if self.browser.set_page_size(size) => {
                    self.set_status_message(format!("Rows per page: {size}"))
                }
                _ => self.set_error_message(format!("Page size must be one of 5, 10, 20, 50, not \"{arg}\"")),
            },
            "col" | "column" => {
                if self.browser.toggle_column_named(arg) {
                    self.set_status_message(format!("Toggled column {arg}"));
                } else {
                    self.set_error_message(format!("No column \"{arg}\" in {}", self.browser.collection().label()));
                }
            }
            "search" => self.browser.set_search_term(arg),
            "refresh" => self.reload(),
            "q" | "quit" => self.quit(),
            other => self.set_error_message(format!("Unknown command \"{other}\"")),
        }
    }

    fn clipboard(&mut self) -> Option<&mut Clipboard> {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    self.set_error_message(format!("Clipboard unavailable: {e}"));
                    return None;
                }
            }
        }
        self.clipboard.as_mut()
    }

    fn copy(&mut self, content: String, what: &str) {
        let Some(clipboard) = self.clipboard() else {
            return;
        };
        match clipboard.set_text(content) {
            Ok(_) => self.set_status_message(format!("Copied {what} to clipboard")),
            Err(e) => self.set_error_message(format!("Error copying to clipboard: {e}")),
        }
    }

    fn copy_title(&mut self) {
        if let Some(record) = self.selected() {
            self.copy(record.title().to_string(), "title");
        }
    }

    fn copy_row(&mut self) {
        if let Some(record) = self.selected() {
            self.copy(record.to_csv_row(), "row");
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::record::tests::blog;
    use crate::record::{Collection, Column, Project, ProjectType};
    use crate::store::{FileStore, MemoryStore, RecordDraft};
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Delegates reads, fails every mutation.
    struct BrokenStore(MemoryStore);

    impl RecordStore for BrokenStore {
        fn list(&self, collection: Collection) -> Result<Vec<Record>, FolioError> {
            self.0.list(collection)
        }
        fn create(&self, _draft: &RecordDraft) -> Result<(), FolioError> {
            Err(FolioError::Api { status: 500, message: "Server error".into() })
        }
        fn update(&self, _id: u64, _draft: &RecordDraft) -> Result<(), FolioError> {
            Err(FolioError::Api { status: 500, message: "Server error".into() })
        }
        fn delete(&self, _collection: Collection, _id: u64) -> Result<(), FolioError> {
            Err(FolioError::Api { status: 500, message: "Server error".into() })
        }
        fn describe(&self) -> String {
            "broken".into()
        }
    }

    /// Can hold one `list` call back after it has read the records.
    struct StallingStore {
        inner: MemoryStore,
        stall_next: AtomicBool,
        snapshot_taken: AtomicBool,
    }

    impl StallingStore {
        fn new(records: Vec<Record>) -> Self {
            StallingStore {
                inner: MemoryStore::new(records),
                stall_next: AtomicBool::new(false),
                snapshot_taken: AtomicBool::new(false),
            }
        }
    }

    impl RecordStore for StallingStore {
        fn list(&self, collection: Collection) -> Result<Vec<Record>, FolioError> {
            let records = self.inner.list(collection);
            if self.stall_next.swap(false, Ordering::SeqCst) {
                self.snapshot_taken.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(300));
            }
            records
        }
        fn create(&self, draft: &RecordDraft) -> Result<(), FolioError> {
            self.inner.create(draft)
        }
        fn update(&self, id: u64, draft: &RecordDraft) -> Result<(), FolioError> {
            self.inner.update(id, draft)
        }
        fn delete(&self, collection: Collection, id: u64) -> Result<(), FolioError> {
            self.inner.delete(collection, id)
        }
        fn describe(&self) -> String {
            "stalling".into()
        }
    }

    pub fn settle(model: &mut Model) {
        let start = Instant::now();
        while model.worker.busy() {
            assert!(start.elapsed() < Duration::from_secs(5), "jobs did not finish");
            model.update(None).unwrap();
            std::thread::sleep(Duration::from_millis(2));
        }
        model.update(None).unwrap();
    }

    pub fn model_with(records: Vec<Record>) -> Model {
        let mut model = Model::init(&FolioConfig::default(), Arc::new(MemoryStore::new(records)));
        settle(&mut model);
        model
    }

    fn send(model: &mut Model, msg: Message) {
        model.update(Some(msg)).unwrap();
    }

    fn key(model: &mut Model, code: KeyCode) {
        send(model, Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn type_str(model: &mut Model, s: &str) {
        for c in s.chars() {
            key(model, KeyCode::Char(c));
        }
    }

    fn six() -> Vec<Record> {
        (1..=6).map(|i| blog(i, &format!("Post {i}"))).collect()
    }

    #[test]
    fn loads_on_start() {
        let model = model_with(six());
        assert_eq!(model.browser().load_state(), &LoadState::Ready);
        assert_eq!(model.browser().total_records(), 6);
        assert_eq!(model.status_message(), ("Loaded 6 blogs", false));
    }

    #[test]
    fn delete_on_last_page_clamps_after_refetch() {
        let mut model = model_with(six());
        send(&mut model, Message::NextPage);
        assert_eq!(model.browser().page().index, 2);
        assert_eq!(model.browser().selected().map(|r| r.id()), Some(6));

        send(&mut model, Message::Delete);
        assert!(model.confirming());
        send(&mut model, Message::Confirm);
        settle(&mut model);

        assert_eq!(model.modus(), Modus::TABLE);
        assert!(model.browser().dialog().is_none());
        assert_eq!(model.browser().total_records(), 5);
        assert_eq!(model.browser().total_pages(), 1);
        assert_eq!(model.browser().page().index, 1);
    }

    #[test]
    fn failed_delete_leaves_the_table_alone() {
        let store = BrokenStore(MemoryStore::new(six()));
        let mut model = Model::init(&FolioConfig::default(), Arc::new(store));
        settle(&mut model);
        send(&mut model, Message::NextPage);

        send(&mut model, Message::Delete);
        send(&mut model, Message::Confirm);
        settle(&mut model);

        let (message, is_error) = model.status_message();
        assert!(is_error);
        assert!(message.starts_with("Could not delete \"Post 6\""));
        assert_eq!(model.modus(), Modus::TABLE);
        assert_eq!(model.browser().total_records(), 6);
        assert_eq!(model.browser().page().index, 2);
    }

    #[test]
    fn cancelling_delete_keeps_everything() {
        let mut model = model_with(six());
        send(&mut model, Message::Delete);
        send(&mut model, Message::Exit);
        settle(&mut model);
        assert_eq!(model.modus(), Modus::TABLE);
        assert_eq!(model.browser().total_records(), 6);
    }

    #[test]
    fn successful_edit_refetches() {
        let mut model = model_with(six());
        send(&mut model, Message::Edit);
        assert_eq!(model.modus(), Modus::FORM);
        assert_eq!(model.browser().dialog().map(|d| d.kind), Some(DialogKind::Edit));

        type_str(&mut model, " revisited");
        key(&mut model, KeyCode::Enter);
        assert!(model.form().is_some_and(|f| f.submitting));
        settle(&mut model);

        assert!(model.form().is_none());
        assert_eq!(model.modus(), Modus::TABLE);
        assert_eq!(model.browser().selected().map(|r| r.title()), Some("Post 1 revisited"));
        assert_eq!(model.status_message(), ("Blog updated", false));
    }

    #[test]
    fn failed_edit_keeps_the_form_open() {
        let store = BrokenStore(MemoryStore::new(six()));
        let mut model = Model::init(&FolioConfig::default(), Arc::new(store));
        settle(&mut model);
        send(&mut model, Message::Edit);
        key(&mut model, KeyCode::Enter);
        settle(&mut model);

        let form = model.form().unwrap();
        assert!(!form.submitting);
        assert!(form.error.as_deref().unwrap().contains("Server error"));
        assert_eq!(model.modus(), Modus::FORM);
        assert!(model.status_message().1);
    }

    #[test]
    fn invalid_forms_never_submit() {
        let mut model = model_with(six());
        send(&mut model, Message::Create);
        key(&mut model, KeyCode::Enter);
        assert!(!model.worker.busy());
        assert_eq!(model.form().and_then(|f| f.error.clone()), Some("Title is required".into()));

        key(&mut model, KeyCode::Esc);
        assert!(model.form().is_none());
        assert_eq!(model.modus(), Modus::TABLE);
    }

    #[test]
    fn create_adds_a_record() {
        let mut model = model_with(six());
        send(&mut model, Message::Create);
        type_str(&mut model, "Fresh");
        key(&mut model, KeyCode::Tab);
        type_str(&mut model, "Words");
        key(&mut model, KeyCode::Enter);
        settle(&mut model);
        assert_eq!(model.browser().total_records(), 7);
    }

    #[test]
    fn search_filters_while_typing_and_escape_restores() {
        let mut model = model_with(six());
        send(&mut model, Message::NextPage);
        send(&mut model, Message::Search);
        assert!(model.raw_keyevents());

        type_str(&mut model, "post 6");
        assert_eq!(model.browser().filtered_len(), 1);
        assert_eq!(model.browser().page().index, 1);

        key(&mut model, KeyCode::Esc);
        assert_eq!(model.browser().search_term(), "");
        assert_eq!(model.browser().filtered_len(), 6);
        assert_eq!(model.modus(), Modus::TABLE);

        send(&mut model, Message::Search);
        type_str(&mut model, "3");
        key(&mut model, KeyCode::Enter);
        assert_eq!(model.browser().search_term(), "3");
        send(&mut model, Message::Exit);
        assert_eq!(model.browser().search_term(), "");
    }

    #[test]
    fn commands_go_through_the_page_size_policy() {
        let mut model = model_with(six());
        send(&mut model, Message::EnterCommand);
        type_str(&mut model, "size 7");
        key(&mut model, KeyCode::Enter);
        assert_eq!(model.browser().page().size, 5);
        assert!(model.status_message().1);

        send(&mut model, Message::EnterCommand);
        type_str(&mut model, "size 10");
        key(&mut model, KeyCode::Enter);
        assert_eq!(model.browser().page().size, 10);

        send(&mut model, Message::EnterCommand);
        type_str(&mut model, "col tags");
        key(&mut model, KeyCode::Enter);
        assert!(!model.browser().visibility().is_visible(Column::Tags));
    }

    #[test]
    fn switching_collections_remounts_the_browser() {
        let mut records = six();
        records.push(Record::Project(Project {
            id: 1,
            title: "Folio".into(),
            description: None,
            project_type: ProjectType::Backend,
            github_client: None,
            github_server: None,
            live_link: None,
            technologies: vec![],
            features: vec![],
            thumbnail: None,
            views: 0,
            created_at: String::new(),
            updated_at: None,
        }));
        let mut model = model_with(records);
        send(&mut model, Message::ToggleColumn(1));
        assert!(!model.browser().visibility().is_visible(Column::Tags));

        send(&mut model, Message::SwitchCollection);
        assert_eq!(model.browser().load_state(), &LoadState::Loading);
        settle(&mut model);
        assert_eq!(model.browser().collection(), Collection::Projects);
        assert_eq!(model.browser().total_records(), 1);
        assert!(model.browser().visibility().entries().iter().all(|(_, v)| *v));
    }

    #[test]
    fn stale_loads_are_dropped() {
        let mut model = model_with(six());
        let latest = model.load_generation;
        model.apply(JobOutcome::Loaded {
            collection: Collection::Projects,
            generation: latest,
            result: Ok(Vec::new()),
        });
        model.apply(JobOutcome::Loaded {
            collection: Collection::Blogs,
            generation: latest - 1,
            result: Ok(Vec::new()),
        });
        assert_eq!(model.browser().total_records(), 6);
    }

    #[test]
    fn overlapping_loads_keep_the_newest_result() {
        let store = Arc::new(StallingStore::new(six()));
        let mut model = Model::init(&FolioConfig::default(), store.clone());
        settle(&mut model);

        store.stall_next.store(true, Ordering::SeqCst);
        send(&mut model, Message::Refresh);
        while !store.snapshot_taken.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
        store.inner.delete(Collection::Blogs, 6).unwrap();
        send(&mut model, Message::Refresh);
        settle(&mut model);

        assert_eq!(model.browser().total_records(), 5);
        assert!(model.browser().page_slice().iter().all(|r| r.title() != "Post 6"));
    }

    #[test]
    fn fetch_errors_reach_the_browser() {
        let mut model = model_with(six());
        model.apply(JobOutcome::Loaded {
            collection: Collection::Blogs,
            generation: model.load_generation,
            result: Err(FolioError::Api { status: 503, message: "Failed to fetch blogs".into() }),
        });
        assert!(matches!(model.browser().load_state(), LoadState::Failed(m) if m.contains("Failed to fetch blogs")));
    }

    #[test]
    fn hidden_rows_cannot_be_acted_on() {
        let mut model = model_with(six());
        model.apply(JobOutcome::Loaded {
            collection: Collection::Blogs,
            generation: model.load_generation,
            result: Err(FolioError::Api { status: 503, message: "Failed to fetch blogs".into() }),
        });
        for msg in [Message::Delete, Message::Edit, Message::View, Message::NextPage] {
            send(&mut model, msg);
            assert_eq!(model.modus(), Modus::TABLE);
        }
        assert!(model.browser().dialog().is_none());
        assert!(model.form().is_none());
        assert_eq!(model.browser().page().index, 1);

        send(&mut model, Message::Help);
        assert_eq!(model.modus(), Modus::POPUP);
    }

    #[test]
    fn rows_wait_for_a_refetch() {
        let store = Arc::new(StallingStore::new(six()));
        let mut model = Model::init(&FolioConfig::default(), store.clone());
        settle(&mut model);

        store.stall_next.store(true, Ordering::SeqCst);
        send(&mut model, Message::Refresh);
        send(&mut model, Message::MoveDown);
        send(&mut model, Message::Delete);
        assert_eq!(model.browser().load_state(), &LoadState::Loading);
        assert_eq!(model.modus(), Modus::TABLE);
        settle(&mut model);
        assert_eq!(model.browser().cursor(), 0);
    }

    #[test]
    fn file_snapshots_stay_on_their_collection() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/blogs.csv");
        let store = FileStore::open(path, Collection::Blogs).unwrap();
        let mut model = Model::init(&FolioConfig::default(), Arc::new(store));
        settle(&mut model);

        send(&mut model, Message::SwitchCollection);
        assert_eq!(model.browser().collection(), Collection::Blogs);
        assert_eq!(model.browser().load_state(), &LoadState::Ready);
        assert_eq!(model.status_message(), ("blogs.csv has no projects", true));
    }

    #[test]
    fn view_dialog_scrolls_and_closes() {
        let mut model = model_with(six());
        send(&mut model, Message::MoveDown);
        send(&mut model, Message::View);
        assert_eq!(model.modus(), Modus::RECORD);
        assert_eq!(model.browser().dialog().map(|d| d.record.id()), Some(2));
        send(&mut model, Message::MoveDown);
        assert_eq!(model.record_scroll(), 1);
        send(&mut model, Message::Exit);
        assert_eq!(model.modus(), Modus::TABLE);
        assert!(model.browser().dialog().is_none());
    }

    #[test]
    fn help_returns_to_previous_mode() {
        let mut model = model_with(six());
        send(&mut model, Message::Help);
        assert_eq!(model.modus(), Modus::POPUP);
        send(&mut model, Message::Exit);
        assert_eq!(model.modus(), Modus::TABLE);
    }
}



use crate::api::TaskBackend;
use crate::error::ClientError;
use crate::models::{Filter, NewTask, ScheduleRequest, Task, TaskBrief, TaskEdit};
use crate::parser::parse_task_input;
use crate::timestamp::{display, parse_due};
use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::ListState;

pub enum InputMode {
    Normal,
    Editing,
    Insert,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum ActiveInput {
    Title,
    Description,
    Due,
    Hint,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum AiMode {
    Schedule,
    Suggest,
    Plan,
}

impl AiMode {
    pub fn label(self) -> &'static str {
        match self {
            AiMode::Schedule => "Smart Schedule",
            AiMode::Suggest => "Suggestions",
            AiMode::Plan => "Day Plan",
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Form {
    Add,
    Edit(String),
    Hint(AiMode),
}

/// What the event loop should do after a key press.
#[derive(PartialEq, Debug)]
pub enum Outcome {
    Continue,
    Quit,
    RunAi(AiMode),
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct AiPanel {
    pub mode: Option<AiMode>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub last_output: Option<String>,
}

/// Every state change the controller can make.
#[derive(Debug)]
pub enum Action {
    TasksLoaded(Vec<Task>),
    SetFilter(Filter),
    StartAdd,
    StartEdit(Task),
    StartHint(AiMode),
    CancelForm,
    AiStarted(AiMode),
    AiFinished(Result<String, String>),
    Status(String),
}

pub struct App {
    pub tasks: Vec<Task>,
    pub filter: Filter,
    pub state: ListState,
    pub input_mode: InputMode,
    pub active_input: ActiveInput,
    pub form: Option<Form>,
    pub form_title: String,
    pub form_description: String,
    pub form_due: String,
    pub ai_hint: String,
    pub ai: AiPanel,
    pub status: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        App::new(Vec::new())
    }
}

impl App {
    pub fn new(tasks: Vec<Task>) -> App {
        let mut app = App {
            tasks: Vec::new(),
            filter: Filter::All,
            state: ListState::default(),
            input_mode: InputMode::Normal,
            active_input: ActiveInput::Title,
            form: None,
            form_title: String::new(),
            form_description: String::new(),
            form_due: String::new(),
            ai_hint: String::new(),
            ai: AiPanel::default(),
            status: None,
        };
        app.apply(Action::TasksLoaded(tasks));
        app
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::TasksLoaded(tasks) => {
                self.tasks = tasks;
                self.clamp_selection();
            }
            Action::SetFilter(filter) => {
                self.filter = filter;
                self.state.select(None);
                self.clamp_selection();
            }
            Action::StartAdd => {
                self.form = Some(Form::Add);
                self.form_title.clear();
                self.form_description.clear();
                self.form_due.clear();
                self.active_input = ActiveInput::Title;
                self.input_mode = InputMode::Editing;
            }
            Action::StartEdit(task) => {
                self.form_title = task.title.clone();
                self.form_description = task.description.clone().unwrap_or_default();
                self.form_due = display(&task.due_at);
                self.form = Some(Form::Edit(task.id));
                self.active_input = ActiveInput::Title;
                self.input_mode = InputMode::Editing;
            }
            Action::StartHint(mode) => {
                self.form = Some(Form::Hint(mode));
                self.active_input = ActiveInput::Hint;
                self.input_mode = InputMode::Editing;
            }
            Action::CancelForm => {
                self.form = None;
                self.input_mode = InputMode::Normal;
            }
            Action::AiStarted(mode) => {
                self.ai = AiPanel {
                    mode: Some(mode),
                    loading: true,
                    last_error: None,
                    last_output: None,
                };
            }
            Action::AiFinished(result) => {
                let (output, error) = match result {
                    Ok(text) => (Some(text), None),
                    Err(message) => (None, Some(message)),
                };
                self.ai.last_output = output;
                self.ai.last_error = error;
                self.ai.loading = false;
            }
            Action::Status(message) => self.status = Some(message),
        }
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| self.filter.matches(t))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_done).count()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_done).count()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let visible = self.visible_tasks();
        self.state.selected().and_then(|i| visible.get(i).copied())
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_tasks().len();
        let selected = match self.state.selected() {
            _ if len == 0 => None,
            Some(i) if i >= len => Some(len - 1),
            Some(i) => Some(i),
            None => Some(0),
        };
        self.state.select(selected);
    }

    pub fn next(&mut self) {
        let len = self.visible_tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible_tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub async fn refresh_tasks<B: TaskBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<(), ClientError> {
        let tasks = backend.fetch_tasks().await?;
        self.apply(Action::TasksLoaded(tasks));
        Ok(())
    }

    // The list is refetched after every store call, whether or not it succeeded
    async fn refetch_after<B: TaskBackend + ?Sized>(
        &mut self,
        mutation: Result<(), ClientError>,
        backend: &B,
    ) -> Result<(), ClientError> {
        let refreshed = self.refresh_tasks(backend).await;
        mutation.and(refreshed)
    }

    // Completed tasks are read-only from the client's side
    fn editable_selection(&mut self, verb: &str) -> Option<Task> {
        match self.selected_task().cloned() {
            None => None,
            Some(task) if task.is_done => {
                self.apply(Action::Status(format!("Cannot {} a completed task", verb)));
                None
            }
            Some(task) => Some(task),
        }
    }

    pub fn edit_selected(&mut self) {
        if let Some(task) = self.editable_selection("edit") {
            self.apply(Action::StartEdit(task));
        }
    }

    pub async fn complete_selected<B: TaskBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<(), ClientError> {
        match self.editable_selection("complete") {
            Some(task) => {
                let completed = backend.complete_task(&task.id).await.map(|_| ());
                self.refetch_after(completed, backend).await
            }
            None => Ok(()),
        }
    }

    pub async fn delete_selected<B: TaskBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<(), ClientError> {
        match self.editable_selection("delete") {
            Some(task) => {
                let deleted = backend.delete_task(&task.id).await;
                self.refetch_after(deleted, backend).await
            }
            None => Ok(()),
        }
    }

    // Title and due time, validated before anything is sent
    fn read_task_fields(&self) -> Result<(String, Option<String>, DateTime<Utc>), ClientError> {
        let parsed = parse_task_input(&self.form_title);
        if parsed.title.is_empty() {
            return Err(ClientError::Rejected("Task title cannot be empty.".to_string()));
        }

        let due_at = if self.form_due.trim().is_empty() {
            parsed.due_at
        } else {
            parse_due(&self.form_due)
        }
        .ok_or_else(|| {
            ClientError::Rejected("Due time must look like 2024-01-01T09:00.".to_string())
        })?;

        let description = if self.form_description.trim().is_empty() {
            None
        } else {
            Some(self.form_description.trim().to_string())
        };

        Ok((parsed.title, description, due_at))
    }

    /// Submits the open form. A hint form yields the AI request to run.
    pub async fn submit_form<B: TaskBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<Option<AiMode>, ClientError> {
        match self.form.clone() {
            None => {}
            Some(Form::Add) => {
                let (title, description, due_at) = self.read_task_fields()?;
                let task = NewTask {
                    title,
                    description,
                    due_at,
                };
                let created = backend.create_task(&task).await.map(|_| ());
                if created.is_ok() {
                    self.apply(Action::CancelForm);
                }
                self.refetch_after(created, backend).await?;
            }
            Some(Form::Edit(id)) => {
                let (title, description, due_at) = self.read_task_fields()?;
                let edit = TaskEdit {
                    title,
                    description,
                    due_at,
                };
                let updated = backend.update_task(&id, &edit).await.map(|_| ());
                if updated.is_ok() {
                    self.apply(Action::CancelForm);
                }
                self.refetch_after(updated, backend).await?;
            }
            Some(Form::Hint(mode)) => {
                self.apply(Action::CancelForm);
                return Ok(Some(mode));
            }
        }
        Ok(None)
    }

    /// One request/response cycle against the AI proxy; the latest reply wins.
    /// The caller applies `Action::AiStarted` first so the loading state can be drawn.
    pub async fn run_ai<B: TaskBackend + ?Sized>(&mut self, mode: AiMode, backend: &B) {
        let result = match mode {
            AiMode::Schedule => {
                let request = ScheduleRequest {
                    hint: Some(self.ai_hint.clone()),
                    tasks: self.tasks.iter().map(TaskBrief::from).collect(),
                };
                backend.fetch_schedule(&request).await
            }
            AiMode::Suggest => backend.fetch_suggestions().await,
            AiMode::Plan => backend.fetch_plan(&self.ai_hint).await,
        };

        let result = result.map_err(|err| match err {
            ClientError::Server { message, .. } if !message.is_empty() => message,
            ClientError::Server { .. } => "AI error".to_string(),
            ClientError::Http(e) => {
                tracing::warn!("AI request failed: {}", e);
                "AI connection failed.".to_string()
            }
            ClientError::Rejected(message) => message,
        });
        self.apply(Action::AiFinished(result));
    }

    fn report(&mut self, result: Result<(), ClientError>) {
        if let Err(err) = result {
            tracing::warn!("{}", err);
            self.apply(Action::Status(err.to_string()));
        }
    }

    fn active_buffer(&mut self) -> &mut String {
        match self.active_input {
            ActiveInput::Title => &mut self.form_title,
            ActiveInput::Description => &mut self.form_description,
            ActiveInput::Due => &mut self.form_due,
            ActiveInput::Hint => &mut self.ai_hint,
        }
    }

    pub async fn handle_input<B: TaskBackend + ?Sized>(
        &mut self,
        key: KeyEvent,
        backend: &B,
    ) -> Outcome {
        match self.input_mode {
            InputMode::Normal => {
                self.status = None;
                match key.code {
                    KeyCode::Char('q') => return Outcome::Quit,
                    KeyCode::Char('j') | KeyCode::Down => self.next(),
                    KeyCode::Char('k') | KeyCode::Up => self.previous(),
                    KeyCode::Char('f') => self.apply(Action::SetFilter(self.filter.next())),
                    KeyCode::Char('1') => self.apply(Action::SetFilter(Filter::All)),
                    KeyCode::Char('2') => self.apply(Action::SetFilter(Filter::Active)),
                    KeyCode::Char('3') => self.apply(Action::SetFilter(Filter::Completed)),
                    KeyCode::Char('r') => {
                        let result = self.refresh_tasks(backend).await;
                        self.report(result);
                    }
                    KeyCode::Char('a') => self.apply(Action::StartAdd),
                    KeyCode::Char('e') => self.edit_selected(),
                    KeyCode::Char('c') => {
                        let result = self.complete_selected(backend).await;
                        self.report(result);
                    }
                    KeyCode::Char('d') => {
                        let result = self.delete_selected(backend).await;
                        self.report(result);
                    }
                    KeyCode::Char('s') => self.apply(Action::StartHint(AiMode::Schedule)),
                    KeyCode::Char('p') => self.apply(Action::StartHint(AiMode::Plan)),
                    KeyCode::Char('g') => return Outcome::RunAi(AiMode::Suggest),
                    _ => {}
                }
            }

            InputMode::Editing => match key.code {
                KeyCode::Char('i') => {
                    self.input_mode = InputMode::Insert;
                }
                KeyCode::Tab => {
                    self.active_input = match self.active_input {
                        ActiveInput::Title => ActiveInput::Description,
                        ActiveInput::Description => ActiveInput::Due,
                        ActiveInput::Due => ActiveInput::Title,
                        ActiveInput::Hint => ActiveInput::Hint,
                    };
                }
                KeyCode::Enter => match self.submit_form(backend).await {
                    Ok(Some(mode)) => return Outcome::RunAi(mode),
                    Ok(None) => {}
                    Err(err) => self.report(Err(err)),
                },
                KeyCode::Esc => self.apply(Action::CancelForm),
                _ => {}
            },

            InputMode::Insert => match key.code {
                KeyCode::Char(c) => self.active_buffer().push(c),
                KeyCode::Backspace => {
                    self.active_buffer().pop();
                }
                KeyCode::Esc => {
                    self.input_mode = InputMode::Editing;
                }
                _ => {}
            },
        }
        Outcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryTaskStore, TaskStore};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use crossterm::event::KeyModifiers;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend that talks straight to a memory store and counts calls.
    struct FakeBackend {
        store: MemoryTaskStore,
        fetches: AtomicUsize,
        mutations: AtomicUsize,
        ai_reply: Mutex<Result<String, u16>>,
        last_schedule: Mutex<Option<ScheduleRequest>>,
    }

    impl FakeBackend {
        fn new() -> Self {
            FakeBackend {
                store: MemoryTaskStore::new(),
                fetches: AtomicUsize::new(0),
                mutations: AtomicUsize::new(0),
                ai_reply: Mutex::new(Ok("08:00 Study".to_string())),
                last_schedule: Mutex::new(None),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn mutations(&self) -> usize {
            self.mutations.load(Ordering::SeqCst)
        }

        fn ai(&self) -> Result<String, ClientError> {
            self.ai_reply
                .lock()
                .unwrap()
                .clone()
                .map_err(|status| ClientError::Server {
                    status,
                    message: "Missing OPENROUTER_API_KEY in environment.".to_string(),
                })
        }
    }

    fn store_err(err: crate::error::StoreError) -> ClientError {
        ClientError::Server {
            status: 404,
            message: err.to_string(),
        }
    }

    #[async_trait]
    impl TaskBackend for FakeBackend {
        async fn fetch_tasks(&self) -> Result<Vec<Task>, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.store.list().await.map_err(store_err)
        }

        async fn create_task(&self, task: &NewTask) -> Result<Task, ClientError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            self.store.create(task.clone()).await.map_err(store_err)
        }

        async fn update_task(&self, id: &str, edit: &TaskEdit) -> Result<Task, ClientError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            self.store.update(id, edit.clone()).await.map_err(store_err)
        }

        async fn complete_task(&self, id: &str) -> Result<Task, ClientError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            self.store.complete(id).await.map_err(store_err)
        }

        async fn delete_task(&self, id: &str) -> Result<(), ClientError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            self.store.delete(id).await.map_err(store_err)
        }

        async fn fetch_schedule(&self, request: &ScheduleRequest) -> Result<String, ClientError> {
            *self.last_schedule.lock().unwrap() = Some(request.clone());
            self.ai()
        }

        async fn fetch_suggestions(&self) -> Result<String, ClientError> {
            self.ai()
        }

        async fn fetch_plan(&self, _text: &str) -> Result<String, ClientError> {
            self.ai()
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn type_text(app: &mut App, backend: &FakeBackend, text: &str) {
        for c in text.chars() {
            app.handle_input(key(KeyCode::Char(c)), backend).await;
        }
    }

    async fn seed(backend: &FakeBackend, title: &str) -> Task {
        backend
            .store
            .create(NewTask {
                title: title.to_string(),
                description: None,
                due_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_form_creates_and_refetches() {
        let backend = FakeBackend::new();
        let mut app = App::default();

        app.handle_input(key(KeyCode::Char('a')), &backend).await;
        app.handle_input(key(KeyCode::Char('i')), &backend).await;
        type_text(&mut app, &backend, "Buy milk @2024-01-01T09:00").await;
        app.handle_input(key(KeyCode::Esc), &backend).await;
        app.handle_input(key(KeyCode::Enter), &backend).await;

        assert_eq!(backend.mutations(), 1);
        assert_eq!(backend.fetches(), 1);
        assert_eq!(app.tasks.len(), 1);
        assert_eq!(app.tasks[0].title, "Buy milk");
        assert!(!app.tasks[0].is_done);
        assert!(app.form.is_none());
    }

    #[tokio::test]
    async fn test_add_without_title_is_rejected_locally() {
        let backend = FakeBackend::new();
        let mut app = App::default();
        app.apply(Action::StartAdd);
        app.form_due = "2024-01-01T09:00".to_string();

        let result = app.submit_form(&backend).await;
        assert!(matches!(result, Err(ClientError::Rejected(_))));
        assert_eq!(backend.mutations(), 0);
        assert_eq!(app.form, Some(Form::Add));
    }

    #[tokio::test]
    async fn test_add_without_due_is_rejected_locally() {
        let backend = FakeBackend::new();
        let mut app = App::default();
        app.apply(Action::StartAdd);
        app.form_title = "No date".to_string();

        assert!(app.submit_form(&backend).await.is_err());
        assert_eq!(backend.mutations(), 0);
    }

    #[tokio::test]
    async fn test_complete_then_delete_is_refused() {
        let backend = FakeBackend::new();
        seed(&backend, "Buy milk").await;
        let mut app = App::default();
        app.refresh_tasks(&backend).await.unwrap();

        app.complete_selected(&backend).await.unwrap();
        assert!(app.tasks[0].is_done);
        assert_eq!(backend.mutations(), 1);

        app.delete_selected(&backend).await.unwrap();
        app.edit_selected();
        assert_eq!(backend.mutations(), 1);
        assert!(app.form.is_none());
        assert_eq!(app.tasks.len(), 1);
        assert!(app.status.is_some());
    }

    #[tokio::test]
    async fn test_delete_refetches_to_empty() {
        let backend = FakeBackend::new();
        seed(&backend, "Buy milk").await;
        let mut app = App::default();
        app.refresh_tasks(&backend).await.unwrap();

        app.handle_input(key(KeyCode::Char('d')), &backend).await;
        assert!(app.tasks.is_empty());
        assert_eq!(app.state.selected(), None);
    }

    #[tokio::test]
    async fn test_edit_form_prefills_and_updates() {
        let backend = FakeBackend::new();
        let original = seed(&backend, "Draft").await;
        let mut app = App::default();
        app.refresh_tasks(&backend).await.unwrap();

        app.edit_selected();
        assert_eq!(app.form, Some(Form::Edit(original.id.clone())));
        assert_eq!(app.form_title, "Draft");
        assert_eq!(app.form_due, "2024-01-01T09:00");

        app.form_title = "Final".to_string();
        app.submit_form(&backend).await.unwrap();

        assert_eq!(app.tasks[0].id, original.id);
        assert_eq!(app.tasks[0].title, "Final");
        assert_eq!(app.tasks[0].created_at, original.created_at);
        assert!(app.tasks[0].updated_at.is_some());
    }

    #[tokio::test]
    async fn test_filters_partition_tasks() {
        let backend = FakeBackend::new();
        let done = seed(&backend, "done").await;
        seed(&backend, "open").await;
        backend.store.complete(&done.id).await.unwrap();

        let mut app = App::default();
        app.refresh_tasks(&backend).await.unwrap();

        assert_eq!(app.visible_tasks().len(), 2);
        app.apply(Action::SetFilter(Filter::Active));
        assert_eq!(app.visible_tasks().len(), app.active_count());
        assert!(app.visible_tasks().iter().all(|t| !t.is_done));
        app.apply(Action::SetFilter(Filter::Completed));
        assert_eq!(app.visible_tasks().len(), app.completed_count());
        assert_eq!(app.selected_task().map(|t| t.id.clone()), Some(done.id));
        assert_eq!(app.active_count() + app.completed_count(), app.tasks.len());
    }

    #[tokio::test]
    async fn test_suggest_and_quit_keys() {
        let backend = FakeBackend::new();
        let mut app = App::default();
        assert_eq!(
            app.handle_input(key(KeyCode::Char('g')), &backend).await,
            Outcome::RunAi(AiMode::Suggest)
        );
        assert_eq!(
            app.handle_input(key(KeyCode::Char('q')), &backend).await,
            Outcome::Quit
        );
    }

    #[tokio::test]
    async fn test_filter_key_cycles() {
        let backend = FakeBackend::new();
        let mut app = App::default();
        app.handle_input(key(KeyCode::Char('f')), &backend).await;
        assert_eq!(app.filter, Filter::Active);
        app.handle_input(key(KeyCode::Char('3')), &backend).await;
        assert_eq!(app.filter, Filter::Completed);
    }

    #[tokio::test]
    async fn test_schedule_sends_hint_and_tasks() {
        let backend = FakeBackend::new();
        seed(&backend, "Study").await;
        let mut app = App::default();
        app.refresh_tasks(&backend).await.unwrap();

        app.handle_input(key(KeyCode::Char('s')), &backend).await;
        app.handle_input(key(KeyCode::Char('i')), &backend).await;
        type_text(&mut app, &backend, "gym in morning").await;
        app.handle_input(key(KeyCode::Esc), &backend).await;
        let outcome = app.handle_input(key(KeyCode::Enter), &backend).await;
        assert_eq!(outcome, Outcome::RunAi(AiMode::Schedule));
        assert!(app.form.is_none());

        app.apply(Action::AiStarted(AiMode::Schedule));
        app.run_ai(AiMode::Schedule, &backend).await;
        assert!(!app.ai.loading);
        assert_eq!(app.ai.mode, Some(AiMode::Schedule));
        assert_eq!(app.ai.last_output.as_deref(), Some("08:00 Study"));
        assert_eq!(app.ai.last_error, None);

        let sent = backend.last_schedule.lock().unwrap().clone().unwrap();
        assert_eq!(sent.hint.as_deref(), Some("gym in morning"));
        assert_eq!(sent.tasks.len(), 1);
        assert_eq!(sent.tasks[0].title, "Study");
    }

    #[tokio::test]
    async fn test_ai_error_replaces_previous_output() {
        let backend = FakeBackend::new();
        let mut app = App::default();

        app.apply(Action::AiStarted(AiMode::Suggest));
        app.run_ai(AiMode::Suggest, &backend).await;
        assert!(app.ai.last_output.is_some());

        *backend.ai_reply.lock().unwrap() = Err(500);
        app.run_ai(AiMode::Suggest, &backend).await;
        assert_eq!(app.ai.last_output, None);
        assert_eq!(
            app.ai.last_error.as_deref(),
            Some("Missing OPENROUTER_API_KEY in environment.")
        );
        assert!(!app.ai.loading);
    }

    #[tokio::test]
    async fn test_ai_reply_replaces_previous_error() {
        let backend = FakeBackend::new();
        let mut app = App::default();
        app.apply(Action::AiStarted(AiMode::Suggest));
        app.apply(Action::AiFinished(Err("old".to_string())));

        app.run_ai(AiMode::Suggest, &backend).await;
        assert_eq!(app.ai.mode, Some(AiMode::Suggest));
        assert_eq!(app.ai.last_output.as_deref(), Some("08:00 Study"));
        assert_eq!(app.ai.last_error, None);
    }

    #[tokio::test]
    async fn test_complete_of_vanished_task_still_refetches() {
        let backend = FakeBackend::new();
        let task = seed(&backend, "Buy milk").await;
        let mut app = App::default();
        app.refresh_tasks(&backend).await.unwrap();
        backend.store.delete(&task.id).await.unwrap();
        let fetches = backend.fetches();

        app.handle_input(key(KeyCode::Char('c')), &backend).await;
        assert_eq!(backend.fetches(), fetches + 1);
        assert!(app.tasks.is_empty());
        assert!(app
            .status
            .as_deref()
            .is_some_and(|s| s.contains("Task not found")));
    }

    #[tokio::test]
    async fn test_failed_edit_keeps_form_and_refetches() {
        let backend = FakeBackend::new();
        let task = seed(&backend, "Draft").await;
        let mut app = App::default();
        app.refresh_tasks(&backend).await.unwrap();
        app.edit_selected();
        backend.store.delete(&task.id).await.unwrap();
        let fetches = backend.fetches();

        assert!(app.submit_form(&backend).await.is_err());
        assert_eq!(backend.fetches(), fetches + 1);
        assert!(app.tasks.is_empty());
        assert_eq!(app.form, Some(Form::Edit(task.id)));
    }

    #[test]
    fn test_ai_started_clears_previous_state() {
        let mut app = App::default();
        app.apply(Action::AiFinished(Err("old".to_string())));
        app.apply(Action::AiStarted(AiMode::Plan));
        assert_eq!(
            app.ai,
            AiPanel {
                mode: Some(AiMode::Plan),
                loading: true,
                last_error: None,
                last_output: None,
            }
        );
    }

    #[test]
    fn test_selection_wraps() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let task = |id: &str| Task {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            due_at: now,
            is_done: false,
            created_at: now,
            updated_at: None,
        };
        let mut app = App::new(vec![task("a"), task("b")]);
        assert_eq!(app.state.selected(), Some(0));
        app.previous();
        assert_eq!(app.state.selected(), Some(1));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
    }
}

use std::collections::HashSet;

use anyhow::bail;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, error, info, warn};

use crate::datetime::local_date;
use crate::storage::KeyValueStorage;
use crate::task::{Category, Priority, Task, TaskId, normalize_subject, seed_tasks};
use crate::views::{CategoryFilter, StatusFilter, Summary, filter_tasks, summarize, todays_focus};

pub const DEFAULT_STORAGE_KEY: &str = "student-tasks";

pub trait Clock {
    /// Milliseconds since the Unix epoch. Only used as an id source.
    fn now_millis(&self) -> i64;

    /// The current local calendar day.
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    timezone: Option<Tz>,
}

impl SystemClock {
    pub fn new(timezone: Option<Tz>) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        local_date(Utc::now(), self.timezone.as_ref())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub today: NaiveDate,
    pub millis: i64,
}

impl FixedClock {
    pub fn new(today: NaiveDate, millis: i64) -> Self {
        Self { today, millis }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

/// Input fields for the next task, kept between edits and reset after a
/// successful add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftTask {
    pub title: String,
    pub subject: String,
    pub category: Category,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl DraftTask {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            title: String::new(),
            subject: String::new(),
            category: Category::Study,
            priority: Priority::Medium,
            due_date: Some(today),
        }
    }
}

/// Where the collection came from at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Persisted,
    SeedMissing,
    SeedCorrupt,
}

pub struct TaskStore<S, C = SystemClock> {
    storage: S,
    clock: C,
    key: String,
    tasks: Vec<Task>,
    last_id: TaskId,
    source: LoadSource,
    persist_error: Option<anyhow::Error>,
    pub draft: DraftTask,
    pub status_filter: StatusFilter,
    pub category_filter: CategoryFilter,
}

impl<S, C> TaskStore<S, C>
where
    S: KeyValueStorage,
    C: Clock,
{
    /// Loads the collection stored under `key`, or the seed set when the slot
    /// is missing, unreadable or unparsable. Never fails.
    #[tracing::instrument(skip(storage, clock))]
    pub fn open(storage: S, clock: C, key: &str) -> Self {
        let today = clock.today();

        let (tasks, source) = match storage.load(key) {
            Ok(Some(raw)) => match decode_tasks(&raw) {
                Ok(tasks) => (tasks, LoadSource::Persisted),
                Err(err) => {
                    warn!(key, error = %err, "discarding unparsable task data; using seed tasks");
                    (seed_tasks(today), LoadSource::SeedCorrupt)
                }
            },
            Ok(None) => {
                debug!(key, "no stored tasks; using seed tasks");
                (seed_tasks(today), LoadSource::SeedMissing)
            }
            Err(err) => {
                warn!(key, error = %err, "failed reading task slot; using seed tasks");
                (seed_tasks(today), LoadSource::SeedMissing)
            }
        };

        info!(key, count = tasks.len(), source = ?source, "opened task store");

        Self {
            storage,
            clock,
            key: key.to_string(),
            last_id: 0,
            tasks,
            source,
            persist_error: None,
            draft: DraftTask::new(today),
            status_filter: StatusFilter::All,
            category_filter: CategoryFilter::All,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn source(&self) -> LoadSource {
        self.source
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Appends a new pending task. Returns `None` without touching anything
    /// when the title is blank.
    #[tracing::instrument(skip(self))]
    pub fn add_task(
        &mut self,
        title: &str,
        subject: &str,
        category: Category,
        priority: Priority,
        due_date: Option<NaiveDate>,
    ) -> Option<TaskId> {
        let title = title.trim();
        if title.is_empty() {
            debug!("ignoring add with empty title");
            return None;
        }

        let id = self.next_id();
        let task = Task::new_pending(
            id,
            title.to_string(),
            normalize_subject(subject),
            category,
            priority,
            due_date,
        );
        self.tasks.push(task);
        self.draft = DraftTask::new(self.clock.today());
        info!(id, "task added");
        self.persist();
        Some(id)
    }

    /// Adds a task from the current draft fields.
    pub fn submit_draft(&mut self) -> Option<TaskId> {
        let draft = self.draft.clone();
        self.add_task(
            &draft.title,
            &draft.subject,
            draft.category,
            draft.priority,
            draft.due_date,
        )
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_task(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = self.tasks.len() != before;
        if removed {
            info!(id, "task deleted");
            self.persist();
        }
        removed
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_complete(&mut self, id: TaskId) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        task.completed = !task.completed;
        info!(id, completed = task.completed, "task toggled");
        self.persist();
        true
    }

    /// Removes every completed task and returns how many went.
    #[tracing::instrument(skip(self))]
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();
        if removed > 0 {
            info!(removed, "cleared completed tasks");
            self.persist();
        }
        removed
    }

    /// Replaces the notes verbatim.
    #[tracing::instrument(skip(self, text), fields(len = text.len()))]
    pub fn update_notes(&mut self, id: TaskId, text: &str) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        task.notes = text.to_string();
        info!(id, "notes updated");
        self.persist();
        true
    }

    pub fn has_completed(&self) -> bool {
        self.tasks.iter().any(|t| t.completed)
    }

    pub fn filtered(&self) -> Vec<&Task> {
        filter_tasks(&self.tasks, self.status_filter, self.category_filter)
    }

    pub fn summary(&self) -> Summary {
        summarize(&self.tasks)
    }

    pub fn focus(&self) -> Vec<&Task> {
        todays_focus(&self.tasks, self.clock.today())
    }

    /// The collection as it is written to storage.
    pub fn export_json(&self) -> anyhow::Result<String> {
        encode_tasks(&self.tasks)
    }

    /// Hands back the most recent save failure, if any, so the caller can
    /// report it. The in-memory collection is unaffected.
    pub fn take_persist_error(&mut self) -> Option<anyhow::Error> {
        self.persist_error.take()
    }

    fn next_id(&mut self) -> TaskId {
        let clock = u64::try_from(self.clock.now_millis()).unwrap_or(0);
        let max_existing = self.tasks.iter().map(|t| t.id).max().unwrap_or(0);
        let id = clock
            .max(self.last_id.saturating_add(1))
            .max(max_existing.saturating_add(1));
        self.last_id = id;
        id
    }

    fn persist(&mut self) {
        let result =
            encode_tasks(&self.tasks).and_then(|raw| self.storage.save(&self.key, &raw));
        match result {
            Ok(()) => debug!(key = %self.key, count = self.tasks.len(), "persisted tasks"),
            Err(err) => {
                error!(key = %self.key, error = %format!("{err:#}"), "failed to persist tasks");
                self.persist_error = Some(err);
            }
        }
    }
}

pub fn encode_tasks(tasks: &[Task]) -> anyhow::Result<String> {
    Ok(serde_json::to_string(tasks)?)
}

/// Parses a stored collection. Blank titles and repeated ids are rejected
/// the same way as malformed JSON.
pub fn decode_tasks(raw: &str) -> anyhow::Result<Vec<Task>> {
    let tasks: Vec<Task> = serde_json::from_str(raw)?;
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in &tasks {
        if task.title.trim().is_empty() {
            bail!("task {} has an empty title", task.id);
        }
        if !seen.insert(task.id) {
            bail!("duplicate task id {}", task.id);
        }
    }
    Ok(tasks)
}

use chrono::{Duration, NaiveDate};
use studydesk_core::storage::{KeyValueStorage, MemoryStorage};
use studydesk_core::store::{
    DEFAULT_STORAGE_KEY, DraftTask, FixedClock, LoadSource, TaskStore, decode_tasks, encode_tasks,
};
use studydesk_core::task::{Category, Priority, Task, seed_tasks};
use studydesk_core::views::{CategoryFilter, StatusFilter};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid date")
}

fn clock() -> FixedClock {
    FixedClock::new(today(), 1_718_000_000_000)
}

fn empty_store() -> TaskStore<MemoryStorage, FixedClock> {
    TaskStore::open(
        MemoryStorage::with_slot(DEFAULT_STORAGE_KEY, "[]"),
        clock(),
        DEFAULT_STORAGE_KEY,
    )
}

fn stored_tasks(store: &TaskStore<MemoryStorage, FixedClock>) -> Vec<Task> {
    let raw = store
        .storage()
        .get(DEFAULT_STORAGE_KEY)
        .expect("slot written");
    decode_tasks(raw).expect("decode slot")
}

#[test]
fn missing_slot_loads_seed_tasks() {
    let store = TaskStore::open(MemoryStorage::new(), clock(), DEFAULT_STORAGE_KEY);
    assert_eq!(store.source(), LoadSource::SeedMissing);
    assert_eq!(store.tasks(), seed_tasks(today()).as_slice());
}

#[test]
fn malformed_slot_loads_seed_tasks() {
    for raw in [
        "not json",
        "{\"id\":1}",
        "[{\"id\":1,\"title\":\"x\",\"category\":\"Chores\",\"priority\":\"Low\"}]",
        "[{\"id\":5,\"title\":\"a\",\"category\":\"Study\",\"priority\":\"Low\"},\
          {\"id\":5,\"title\":\"b\",\"category\":\"Exam\",\"priority\":\"High\"}]",
        "[{\"id\":7,\"title\":\"  \",\"category\":\"Study\",\"priority\":\"Low\"}]",
    ] {
        let storage = MemoryStorage::with_slot(DEFAULT_STORAGE_KEY, raw);
        let store = TaskStore::open(storage, clock(), DEFAULT_STORAGE_KEY);
        assert_eq!(store.source(), LoadSource::SeedCorrupt, "input: {raw}");
        assert_eq!(store.tasks(), seed_tasks(today()).as_slice());
    }
}

#[test]
fn persisted_slot_is_used_as_is() {
    let mut task = Task::new_pending(
        99,
        "Lab report".to_string(),
        "Physics".to_string(),
        Category::Project,
        Priority::Low,
        None,
    );
    task.completed = true;
    task.notes = "  keep spacing  ".to_string();
    let raw = encode_tasks(std::slice::from_ref(&task)).expect("encode");

    let store = TaskStore::open(
        MemoryStorage::with_slot(DEFAULT_STORAGE_KEY, &raw),
        clock(),
        DEFAULT_STORAGE_KEY,
    );
    assert_eq!(store.source(), LoadSource::Persisted);
    assert_eq!(store.tasks(), &[task]);
}

#[test]
fn add_appends_a_pending_task_and_persists() {
    let mut store = empty_store();
    let due = Some(today() + Duration::days(2));

    let id = store
        .add_task("  Finish essay  ", "  ", Category::Homework, Priority::High, due)
        .expect("task added");

    assert_eq!(store.tasks().len(), 1);
    let task = &store.tasks()[0];
    assert_eq!(task.id, id);
    assert_eq!(task.title, "Finish essay");
    assert_eq!(task.subject, "General");
    assert_eq!(task.category, Category::Homework);
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.due_date, due);
    assert!(!task.completed);
    assert!(task.notes.is_empty());

    assert_eq!(stored_tasks(&store), store.tasks());
}

#[test]
fn blank_title_is_ignored() {
    let mut store = empty_store();
    store.draft.subject = "Maths".to_string();

    assert!(
        store
            .add_task("   \t ", "Maths", Category::Exam, Priority::Low, None)
            .is_none()
    );
    assert!(store.tasks().is_empty());
    assert_eq!(store.storage().get(DEFAULT_STORAGE_KEY), Some("[]"));
    assert_eq!(store.draft.subject, "Maths");
}

#[test]
fn ids_stay_unique_with_a_stalled_clock() {
    let mut store = empty_store();
    let a = store
        .add_task("a", "", Category::Study, Priority::Low, None)
        .expect("a");
    let b = store
        .add_task("b", "", Category::Study, Priority::Low, None)
        .expect("b");
    let c = store
        .add_task("c", "", Category::Study, Priority::Low, None)
        .expect("c");
    assert!(a < b && b < c);
    assert_eq!(a, 1_718_000_000_000);
}

#[test]
fn ids_stay_above_loaded_ids() {
    let mut store = TaskStore::open(MemoryStorage::new(), FixedClock::new(today(), 0), DEFAULT_STORAGE_KEY);
    let id = store
        .add_task("after seeds", "", Category::Study, Priority::Low, None)
        .expect("added");
    assert_eq!(id, 4);
}

#[test]
fn submitting_the_draft_resets_it() {
    let mut store = empty_store();
    store.draft.title = "Mock interview".to_string();
    store.draft.subject = "Careers".to_string();
    store.draft.category = Category::Personal;
    store.draft.priority = Priority::High;
    store.draft.due_date = None;

    store.submit_draft().expect("draft submitted");

    assert_eq!(store.draft, DraftTask::new(today()));
    assert_eq!(store.tasks()[0].subject, "Careers");
    assert_eq!(store.tasks()[0].due_date, None);
}

#[test]
fn unknown_ids_leave_everything_unchanged() {
    let mut store = TaskStore::open(MemoryStorage::new(), clock(), DEFAULT_STORAGE_KEY);
    let before = store.tasks().to_vec();

    assert!(!store.delete_task(12345));
    assert!(!store.toggle_complete(12345));
    assert!(!store.update_notes(12345, "nope"));

    assert_eq!(store.tasks(), before.as_slice());
    assert!(store.take_persist_error().is_none());
}

#[test]
fn toggle_twice_restores_flag() {
    let mut store = TaskStore::open(MemoryStorage::new(), clock(), DEFAULT_STORAGE_KEY);
    assert!(store.toggle_complete(2));
    assert!(store.get(2).expect("task 2").completed);
    assert_eq!(stored_tasks(&store), store.tasks());

    assert!(store.toggle_complete(2));
    assert!(!store.get(2).expect("task 2").completed);
    assert_eq!(store.tasks(), seed_tasks(today()).as_slice());
}

#[test]
fn notes_are_replaced_verbatim() {
    let mut store = TaskStore::open(MemoryStorage::new(), clock(), DEFAULT_STORAGE_KEY);
    assert!(store.update_notes(3, "  trees\n graphs  "));
    assert_eq!(store.get(3).expect("task 3").notes, "  trees\n graphs  ");
    assert_eq!(stored_tasks(&store)[2].notes, "  trees\n graphs  ");
}

#[test]
fn delete_removes_only_the_match() {
    let mut store = TaskStore::open(MemoryStorage::new(), clock(), DEFAULT_STORAGE_KEY);
    assert!(store.delete_task(2));
    let ids: Vec<u64> = store.tasks().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(stored_tasks(&store).len(), 2);
}

#[test]
fn clear_completed_keeps_pending_in_order_and_is_idempotent() {
    let mut store = empty_store();
    let ids: Vec<u64> = ["a", "b", "c", "d", "e"]
        .iter()
        .filter_map(|title| store.add_task(title, "", Category::Study, Priority::Low, None))
        .collect();
    store.toggle_complete(ids[1]);
    store.toggle_complete(ids[3]);

    assert_eq!(store.clear_completed(), 2);
    let once = store.tasks().to_vec();
    let titles: Vec<&str> = once.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "c", "e"]);
    assert!(once.iter().all(|t| !t.completed));

    assert_eq!(store.clear_completed(), 0);
    assert_eq!(store.tasks(), once.as_slice());
    assert!(!store.has_completed());
}

#[test]
fn summary_and_filters_track_the_collection() {
    let mut store = empty_store();
    for title in ["w", "x", "y", "z"] {
        store.add_task(title, "", Category::Exam, Priority::Medium, None);
    }
    let first = store.tasks()[0].id;
    store.toggle_complete(first);

    let summary = store.summary();
    assert_eq!(summary.total, 4);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.pending, 3);
    assert_eq!(summary.completion_percent, 25);

    store.status_filter = StatusFilter::Completed;
    assert_eq!(store.filtered().len(), 1);
    store.status_filter = StatusFilter::Active;
    store.category_filter = CategoryFilter::Only(Category::Study);
    assert!(store.filtered().is_empty());
}

#[test]
fn empty_collection_has_zero_percent() {
    let store = empty_store();
    assert_eq!(store.summary().completion_percent, 0);
    assert!(store.focus().is_empty());
}

#[test]
fn seed_focus_ranks_high_priority_by_due_date() {
    let store = TaskStore::open(MemoryStorage::new(), clock(), DEFAULT_STORAGE_KEY);
    let ids: Vec<u64> = store.focus().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 3, 2]);
}

#[test]
fn round_trip_reproduces_the_collection() {
    let mut tasks = seed_tasks(today());
    tasks[0].completed = true;
    tasks[1].due_date = None;
    tasks[2].notes = "ünïcode ✓ and \"quotes\"".to_string();

    let raw = encode_tasks(&tasks).expect("encode");
    assert!(raw.contains("\"dueDate\":null"));
    assert!(raw.contains("\"dueDate\":\"2024-06-11\""));
    assert_eq!(decode_tasks(&raw).expect("decode"), tasks);
}

struct FailingStorage;

impl KeyValueStorage for FailingStorage {
    fn load(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Err(anyhow::anyhow!("disk on fire"))
    }

    fn save(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("disk full"))
    }
}

#[test]
fn storage_failures_never_break_operations() {
    let mut store = TaskStore::open(FailingStorage, clock(), DEFAULT_STORAGE_KEY);
    assert_eq!(store.tasks().len(), 3);

    assert!(store.toggle_complete(1));
    assert!(store.get(1).expect("task 1").completed);

    let err = store.take_persist_error().expect("save failure retained");
    assert!(format!("{err:#}").contains("disk full"));
    assert!(store.take_persist_error().is_none());
}

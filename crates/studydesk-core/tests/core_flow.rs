use std::fs;

use chrono::NaiveDate;
use clap::Parser;
use studydesk_core::cli::GlobalCli;
use studydesk_core::commands::dispatch;
use studydesk_core::config::Config;
use studydesk_core::render::Renderer;
use studydesk_core::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use studydesk_core::store::{DEFAULT_STORAGE_KEY, FixedClock, LoadSource, TaskStore};
use studydesk_core::task::{Category, Priority};
use tempfile::tempdir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid date")
}

fn run_command(store: &mut TaskStore<MemoryStorage, FixedClock>, argv: &[&str]) -> String {
    let mut args = vec!["studydesk"];
    args.extend_from_slice(argv);
    let cli = GlobalCli::parse_from(args);
    let command = cli.command.expect("command given");

    let mut out = Vec::new();
    dispatch(store, &Config::default(), &Renderer::plain(), &mut out, command)
        .expect("dispatch succeeds");
    String::from_utf8(out).expect("utf8 output")
}

#[test]
fn file_storage_roundtrip_survives_reopen() {
    let temp = tempdir().expect("tempdir");
    let clock = FixedClock::new(today(), 1_000);

    let storage = FileStorage::open(temp.path()).expect("open storage");
    let mut store = TaskStore::open(storage, clock, DEFAULT_STORAGE_KEY);
    assert_eq!(store.source(), LoadSource::SeedMissing);

    let id = store
        .add_task("Write parity notes", "OS", Category::Study, Priority::High, None)
        .expect("added");
    store.update_notes(id, "chapter 3");
    store.toggle_complete(1);
    let expected = store.tasks().to_vec();
    drop(store);

    let slot = temp.path().join("student-tasks.json");
    assert!(slot.exists());

    let reopened = TaskStore::open(
        FileStorage::open(temp.path()).expect("reopen storage"),
        clock,
        DEFAULT_STORAGE_KEY,
    );
    assert_eq!(reopened.source(), LoadSource::Persisted);
    assert_eq!(reopened.tasks(), expected.as_slice());
}

#[test]
fn corrupt_file_falls_back_to_seeds() {
    let temp = tempdir().expect("tempdir");
    fs::write(temp.path().join("student-tasks.json"), "{ truncated").expect("write junk");

    let storage = FileStorage::open(temp.path()).expect("open storage");
    let store = TaskStore::open(storage, FixedClock::new(today(), 0), DEFAULT_STORAGE_KEY);
    assert_eq!(store.source(), LoadSource::SeedCorrupt);
    assert_eq!(store.tasks().len(), 3);
}

#[test]
fn file_storage_missing_slot_is_none() {
    let temp = tempdir().expect("tempdir");
    let mut storage = FileStorage::open(&temp.path().join("nested/dir")).expect("open storage");
    assert!(storage.load("absent").expect("load").is_none());

    storage.save("present", "[1]").expect("save");
    assert_eq!(storage.load("present").expect("load").as_deref(), Some("[1]"));
}

#[test]
fn cli_flow_add_complete_clear() {
    let mut store = TaskStore::open(
        MemoryStorage::with_slot(DEFAULT_STORAGE_KEY, "[]"),
        FixedClock::new(today(), 500),
        DEFAULT_STORAGE_KEY,
    );

    let out = run_command(
        &mut store,
        &["add", "Revise trees", "--subject", "DSA", "--priority", "high", "--due", "+2"],
    );
    assert_eq!(out, "Added task 500.\n");
    let task = store.get(500).expect("task 500");
    assert_eq!(task.category, Category::Study);
    assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 6, 12));

    let out = run_command(&mut store, &["add", "   "]);
    assert_eq!(out, "Nothing added: title is empty.\n");
    assert_eq!(store.tasks().len(), 1);

    let out = run_command(&mut store, &["focus"]);
    assert!(out.contains("Revise trees"));
    assert!(out.contains("Due in 2 days"));

    assert_eq!(run_command(&mut store, &["done", "500"]), "Completed task 500.\n");
    assert_eq!(run_command(&mut store, &["done", "9"]), "No task with id 9.\n");

    let out = run_command(&mut store, &["dashboard"]);
    assert!(out.contains("Total: 1  Completed: 1  Pending: 0"));
    assert!(out.contains("100% completed"));
    assert!(!out.contains("Today's focus"));
    assert!(out.contains("studydesk clear"));

    let out = run_command(&mut store, &["list", "--status", "active"]);
    assert_eq!(out, "No tasks to show for this filter.\n");

    assert_eq!(run_command(&mut store, &["clear"]), "Cleared 1 completed task.\n");
    assert!(store.tasks().is_empty());
    assert_eq!(store.storage().get(DEFAULT_STORAGE_KEY), Some("[]"));
}

#[test]
fn cli_note_and_export() {
    let mut store = TaskStore::open(
        MemoryStorage::new(),
        FixedClock::new(today(), 0),
        DEFAULT_STORAGE_KEY,
    );

    let out = run_command(&mut store, &["note", "2", "map", "filter", "reduce"]);
    assert_eq!(out, "Updated notes for task 2.\n");
    assert_eq!(store.get(2).expect("task 2").notes, "map filter reduce");

    run_command(&mut store, &["note", "2"]);
    assert!(store.get(2).expect("task 2").notes.is_empty());

    let exported = run_command(&mut store, &["export"]);
    assert_eq!(
        exported.trim_end(),
        store.storage().get(DEFAULT_STORAGE_KEY).expect("slot written")
    );
}

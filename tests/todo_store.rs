use chrono::NaiveDate;
use todos::progress::{CelebrationMonitor, FixedClock, Phase};
use todos::storage::{FileStore, KeyValueStore, MemoryStore};
use todos::todo::{LoadOutcome, NoHook, Priority, SyncPolicy, TodoItem, TodoStore, TODOS_KEY};
use todos::view;

fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
}

#[test]
fn file_store_round_trip_reproduces_list() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let (mut store, outcome) = TodoStore::open(FileStore::new(dir.path()), NoHook, SyncPolicy::Strict);
    assert_eq!(outcome, LoadOutcome::Missing);
    store.add("Buy milk", Some(day("2025-01-02")), Priority::Low)?;
    let second = store.add("Call mom", None, Priority::High)?.expect("created");
    store.add("File taxes", Some(day("2025-04-15")), Priority::Medium)?;
    store.toggle(&second.id)?;
    let before = store.current_list().to_vec();
    let (backend, _) = store.close();

    let (reloaded, outcome) = TodoStore::open(backend, NoHook, SyncPolicy::Strict);
    assert_eq!(outcome, LoadOutcome::Loaded(3));
    assert_eq!(reloaded.current_list(), before.as_slice());
    Ok(())
}

#[test]
fn every_mutation_is_one_write() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = TodoStore::new(MemoryStore::new());
    let todo = store.add("one", None, Priority::Medium)?.expect("created");
    assert_eq!(store.backend().writes(), 1);
    store.toggle(&todo.id)?;
    assert_eq!(store.backend().writes(), 2);
    store.delete(&todo.id)?;
    assert_eq!(store.backend().writes(), 3);
    assert_eq!(store.backend().raw(TODOS_KEY), Some("[]"));
    Ok(())
}

#[test]
fn corrupt_file_degrades_to_empty_and_is_preserved() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut backend = FileStore::new(dir.path());
    backend.set(TODOS_KEY, "not json at all")?;

    let (mut store, outcome) = TodoStore::open(backend, NoHook, SyncPolicy::Strict);
    assert!(outcome.degraded());
    assert!(store.current_list().is_empty());

    store.add("fresh start", None, Priority::Medium)?;
    assert_eq!(
        store.backend().get("todos.corrupt")?.as_deref(),
        Some("not json at all")
    );
    Ok(())
}

#[test]
fn loads_snapshot_written_by_mobile_app() {
    let raw = r#"[
        {"id":"1717000000000","text":"Dentist","date":null,"priority":"High","completed":false},
        {"id":"1717000000001","text":"Gym","date":null,"priority":"Low","completed":true}
    ]"#;
    let backend = MemoryStore::new().with_value(TODOS_KEY, raw);
    let (store, outcome) = TodoStore::open(backend, NoHook, SyncPolicy::Strict);

    assert_eq!(outcome, LoadOutcome::Loaded(2));
    assert_eq!(store.current_list()[0].id, "1717000000000");
    assert!(store.current_list()[1].completed);
}

#[test]
fn views_never_touch_the_store() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = TodoStore::new(MemoryStore::new());
    store.add("undated high", None, Priority::High)?;
    store.add("dated low", Some(day("2025-01-01")), Priority::Low)?;
    store.add("undated low", None, Priority::Low)?;
    let writes = store.backend().writes();

    let sorted = view::sorted(store.current_list());
    let texts: Vec<&str> = sorted.iter().map(|todo| todo.text.as_str()).collect();
    assert_eq!(texts, vec!["dated low", "undated high", "undated low"]);

    let canonical: Vec<&str> = store.current_list().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(canonical, vec!["undated high", "dated low", "undated low"]);
    assert!(view::completed(store.current_list()).is_empty());
    assert_eq!(store.backend().writes(), writes);
    Ok(())
}

#[test]
fn celebration_fires_again_after_uncomplete_and_recomplete() -> Result<(), Box<dyn std::error::Error>> {
    let monitor = CelebrationMonitor::new(FixedClock(day("2025-03-10")));
    let (mut store, _) = TodoStore::open(MemoryStore::new(), monitor, SyncPolicy::Strict);

    let ids: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|text| {
            store
                .add(text, Some(day("2025-03-20")), Priority::Medium)
                .map(|todo| todo.map(|todo| todo.id).unwrap_or_default())
        })
        .collect::<Result<_, _>>()?;
    store.add("next month", Some(day("2025-04-01")), Priority::Medium)?;

    for id in &ids {
        store.toggle(id)?;
    }
    assert_eq!(store.hook().fired_count(), 1);
    assert_eq!(store.hook().phase(), Phase::Celebrating);
    assert_eq!(store.hook().progress().expect("progress").ratio, 1.0);
    assert!(store.hook_mut().take_celebration().is_some());

    store.toggle(&ids[0])?;
    assert_eq!(store.hook().fired_count(), 1);
    store.toggle(&ids[0])?;
    assert_eq!(store.hook().fired_count(), 2);
    Ok(())
}

#[test]
fn deleting_last_incomplete_todo_completes_month() -> Result<(), Box<dyn std::error::Error>> {
    let monitor = CelebrationMonitor::new(FixedClock(day("2025-03-10")));
    let (mut store, _) = TodoStore::open(MemoryStore::new(), monitor, SyncPolicy::Strict);

    let done = store.add("done", None, Priority::Medium)?.expect("created");
    let pending = store.add("pending", None, Priority::Medium)?.expect("created");
    store.toggle(&done.id)?;
    assert_eq!(store.hook().phase(), Phase::Idle);

    store.delete(&pending.id)?;
    assert_eq!(store.hook().phase(), Phase::Celebrating);
    Ok(())
}

#[test]
fn failed_strict_write_does_not_celebrate() -> Result<(), Box<dyn std::error::Error>> {
    let monitor = CelebrationMonitor::new(FixedClock(day("2025-03-10")));
    let (mut store, _) = TodoStore::open(MemoryStore::new(), monitor, SyncPolicy::Strict);
    let todo = store.add("only", None, Priority::Medium)?.expect("created");

    store.backend_mut().set_fail_writes(true);
    assert!(store.toggle(&todo.id).is_err());
    assert_eq!(store.hook().phase(), Phase::Idle);
    assert!(!store.current_list()[0].completed);
    Ok(())
}

#[test]
fn replace_all_accepts_wholesale_lists() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = TodoStore::new(MemoryStore::new());
    let list = vec![
        TodoItem::new("x", "imported one", None, Priority::High),
        TodoItem::new("y", "imported two", Some(day("2025-05-05")), Priority::Low),
    ];
    store.replace_all(list.clone())?;
    assert_eq!(store.current_list(), list.as_slice());
    assert_eq!(store.backend().writes(), 1);
    Ok(())
}

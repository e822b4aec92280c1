//! Read-only projections of the canonical todo list.
//!
//! Nothing here mutates or persists; every view is recomputed from the
//! slice it is given.

use std::cmp::Ordering;

use crate::todo::TodoItem;

/// Display order: dated todos by ascending date, then undated todos.
///
/// Ties on date (including "no date") fall back to priority, High first.
/// The sort is stable, so equal keys keep insertion order.
pub fn compare_display(a: &TodoItem, b: &TodoItem) -> Ordering {
    let by_date = match (a.date, b.date) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| a.priority.rank().cmp(&b.priority.rank()))
}

/// Sorted copy of the list in display order
pub fn sorted(todos: &[TodoItem]) -> Vec<TodoItem> {
    let mut view = todos.to_vec();
    view.sort_by(compare_display);
    view
}

/// Completed todos, in canonical order
pub fn completed(todos: &[TodoItem]) -> Vec<TodoItem> {
    todos.iter().filter(|todo| todo.completed).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::Priority;
    use chrono::NaiveDate;

    fn todo(id: &str, date: Option<&str>, priority: Priority) -> TodoItem {
        let date = date.map(|value| NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date"));
        TodoItem::new(id, format!("todo {id}"), date, priority)
    }

    fn ids(todos: &[TodoItem]) -> Vec<&str> {
        todos.iter().map(|todo| todo.id.as_str()).collect()
    }

    #[test]
    fn dated_before_undated_then_priority() {
        let todos = vec![
            todo("a", None, Priority::High),
            todo("b", Some("2025-01-01"), Priority::Low),
            todo("c", None, Priority::Low),
        ];
        assert_eq!(ids(&sorted(&todos)), vec!["b", "a", "c"]);
    }

    #[test]
    fn dates_ascend_and_same_day_uses_priority() {
        let todos = vec![
            todo("late", Some("2025-02-10"), Priority::High),
            todo("low", Some("2025-01-05"), Priority::Low),
            todo("high", Some("2025-01-05"), Priority::High),
            todo("early", Some("2024-12-31"), Priority::Medium),
        ];
        assert_eq!(ids(&sorted(&todos)), vec!["early", "high", "low", "late"]);
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let todos = vec![
            todo("first", None, Priority::Medium),
            todo("second", None, Priority::Medium),
            todo("third", None, Priority::Medium),
        ];
        assert_eq!(ids(&sorted(&todos)), vec!["first", "second", "third"]);
    }

    #[test]
    fn sorting_leaves_input_untouched() {
        let todos = vec![
            todo("x", None, Priority::Low),
            todo("y", Some("2025-01-01"), Priority::Low),
        ];
        let before = todos.clone();
        let _ = sorted(&todos);
        assert_eq!(todos, before);
    }

    #[test]
    fn completed_filter_keeps_canonical_order() {
        let mut todos = vec![
            todo("a", None, Priority::Low),
            todo("b", Some("2025-01-01"), Priority::High),
            todo("c", Some("2020-01-01"), Priority::High),
        ];
        todos[0].completed = true;
        todos[2].completed = true;

        assert_eq!(ids(&completed(&todos)), vec!["a", "c"]);
    }
}

// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-user log ordering and the recent-history window

use std::collections::BTreeMap;

use crate::models::WorkoutLog;

/// All validated logs of one user, newest first.
///
/// This is the only way to obtain a [`HistoryWindow`], so the windowed
/// detectors never see logs in any other order.
#[derive(Debug, Clone)]
pub struct UserHistory {
    user_id: String,
    logs: Vec<WorkoutLog>,
}

impl UserHistory {
    /// Sort by effective date descending; equal dates fall back to log id
    pub fn new(user_id: impl Into<String>, mut logs: Vec<WorkoutLog>) -> Self {
        logs.sort_by(|a, b| {
            b.completed_date
                .cmp(&a.completed_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Self {
            user_id: user_id.into(),
            logs,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Logs, newest first
    pub fn logs(&self) -> &[WorkoutLog] {
        &self.logs
    }

    /// The `size` most recent logs
    pub fn recent_window(&self, size: usize) -> HistoryWindow<'_> {
        HistoryWindow {
            logs: &self.logs[..size.min(self.logs.len())],
        }
    }
}

/// A bounded, newest-first slice of one user's history
#[derive(Debug, Clone, Copy)]
pub struct HistoryWindow<'a> {
    logs: &'a [WorkoutLog],
}

impl<'a> HistoryWindow<'a> {
    pub fn newest_first(&self) -> &'a [WorkoutLog] {
        self.logs
    }

    pub fn oldest_first(&self) -> impl Iterator<Item = &'a WorkoutLog> {
        self.logs.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Whether effective dates never increase from one log to the next
    pub fn is_newest_first(&self) -> bool {
        self.logs
            .windows(2)
            .all(|pair| pair[0].completed_date >= pair[1].completed_date)
    }
}

/// Group validated logs by user. Users come back in id order.
pub fn group_by_user(logs: Vec<WorkoutLog>) -> BTreeMap<String, UserHistory> {
    let mut grouped: BTreeMap<String, Vec<WorkoutLog>> = BTreeMap::new();
    for log in logs {
        grouped.entry(log.user_id.clone()).or_default().push(log);
    }

    grouped
        .into_iter()
        .map(|(user_id, logs)| {
            let history = UserHistory::new(user_id.clone(), logs);
            (user_id, history)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn log(id: &str, user: &str, date: &str) -> WorkoutLog {
        WorkoutLog {
            id: id.to_string(),
            user_id: user.to_string(),
            completed_date: DateTime::parse_from_rfc3339(date).unwrap(),
            exercises: Vec::new(),
            skipped_entries: 0,
        }
    }

    #[test]
    fn test_history_is_sorted_newest_first() {
        let history = UserHistory::new(
            "u1",
            vec![
                log("a", "u1", "2024-01-01T10:00:00Z"),
                log("c", "u1", "2024-03-01T10:00:00Z"),
                log("b", "u1", "2024-02-01T10:00:00Z"),
            ],
        );

        let ids: Vec<&str> = history.logs().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert!(history.recent_window(20).is_newest_first());
    }

    #[test]
    fn test_sorting_compares_instants_across_offsets() {
        // 09:00+02:00 is 07:00Z, earlier than 08:00Z
        let history = UserHistory::new(
            "u1",
            vec![
                log("offset", "u1", "2024-01-01T09:00:00+02:00"),
                log("utc", "u1", "2024-01-01T08:00:00Z"),
            ],
        );
        assert_eq!(history.logs()[0].id, "utc");
    }

    #[test]
    fn test_window_is_bounded() {
        let logs = (1..=25)
            .map(|d| log(&format!("l{d}"), "u1", &format!("2024-01-{d:02}T10:00:00Z")))
            .collect();
        let history = UserHistory::new("u1", logs);

        let window = history.recent_window(20);
        assert_eq!(window.len(), 20);
        assert_eq!(window.newest_first()[0].id, "l25");
        assert_eq!(window.oldest_first().next().unwrap().id, "l6");

        assert_eq!(history.recent_window(100).len(), 25);
    }

    #[test]
    fn test_group_by_user_orders_each_history() {
        let grouped = group_by_user(vec![
            log("x1", "bob", "2024-01-01T10:00:00Z"),
            log("y1", "alice", "2024-01-05T10:00:00Z"),
            log("x2", "bob", "2024-02-01T10:00:00Z"),
        ]);

        let users: Vec<&String> = grouped.keys().collect();
        assert_eq!(users, vec!["alice", "bob"]);
        assert_eq!(grouped["bob"].logs()[0].id, "x2");
        assert!(grouped.values().all(|h| h.recent_window(20).is_newest_first()));
    }
}

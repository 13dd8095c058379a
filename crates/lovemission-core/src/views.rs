//! Derived views over fetched rows.
//!
//! Screens hold whatever the backend returned and project it through these
//! functions. Matching on assignment and status is exact; nothing here
//! mutates the input.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::mission::ScheduledMission;
use crate::task::{AssignedTo, Status, Task};

/// Pending tasks the current user created for themselves or for both.
pub fn my_tasks(tasks: &[Task], user_id: i64) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| {
            t.status == Status::Pending
                && matches!(t.assigned_to, AssignedTo::Me | AssignedTo::Both)
                && t.created_by == user_id
        })
        .cloned()
        .collect()
}

/// Assignments that show up on the shared board.
///
/// `Both` is included: a task the couple shares has to appear on the shared
/// board as well as on its creator's own list, at the cost of listing
/// joint tasks in both places.
pub const SHARED_ASSIGNMENTS: &[AssignedTo] =
    &[AssignedTo::Me, AssignedTo::Partner, AssignedTo::Both];

/// Pending tasks on the shared board, newest first.
pub fn shared_tasks(tasks: &[Task]) -> Vec<Task> {
    let mut shared: Vec<Task> = tasks
        .iter()
        .filter(|t| t.status == Status::Pending && SHARED_ASSIGNMENTS.contains(&t.assigned_to))
        .cloned()
        .collect();
    shared.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    shared
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryBuckets {
    pub completed: Vec<Task>,
    pub cancelled: Vec<Task>,
}

impl HistoryBuckets {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.cancelled.is_empty()
    }
}

/// Split tasks by terminal status. Pending tasks land in neither bucket.
pub fn history(tasks: &[Task]) -> HistoryBuckets {
    let mut buckets = HistoryBuckets::default();
    for task in tasks {
        match task.status {
            Status::Completed => buckets.completed.push(task.clone()),
            Status::Cancelled => buckets.cancelled.push(task.clone()),
            Status::Pending => {}
        }
    }
    buckets
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayMarker {
    pub task_count: usize,
    pub selected: bool,
}

impl DayMarker {
    pub fn is_marked(&self) -> bool {
        self.task_count > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarView {
    pub markers: BTreeMap<NaiveDate, DayMarker>,
    pub selected: Option<NaiveDate>,
    pub tasks_on_selected: Vec<Task>,
}

/// Group pending tasks by due day. Tasks without a parseable due date are
/// left off the calendar. A selected day is always present in the marker
/// map, even when nothing is due on it.
pub fn calendar(tasks: &[Task], selected: Option<NaiveDate>) -> CalendarView {
    let mut markers: BTreeMap<NaiveDate, DayMarker> = BTreeMap::new();
    for task in tasks.iter().filter(|t| t.is_pending()) {
        if let Some(day) = task.due_day() {
            markers.entry(day).or_default().task_count += 1;
        }
    }

    let tasks_on_selected = match selected {
        Some(day) => {
            markers.entry(day).or_default().selected = true;
            tasks_due_on(tasks, day)
        }
        None => Vec::new(),
    };

    CalendarView {
        markers,
        selected,
        tasks_on_selected,
    }
}

pub fn tasks_due_on(tasks: &[Task], day: NaiveDate) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| t.is_pending() && t.due_day() == Some(day))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionBoard {
    pub incomplete: Vec<ScheduledMission>,
    pub completed: Vec<ScheduledMission>,
}

pub fn mission_board(missions: &[ScheduledMission]) -> MissionBoard {
    let (completed, incomplete) = missions.iter().cloned().partition(|m| m.completed);
    MissionBoard {
        incomplete,
        completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn task(id: i64, status: Status, assigned_to: AssignedTo, created_by: i64) -> Task {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let at = base + Duration::minutes(id);
        Task {
            id,
            title: format!("task {id}"),
            description: None,
            due_date: None,
            assigned_to,
            created_by,
            status,
            completed_at: None,
            completed_by: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn due(mut t: Task, date: &str) -> Task {
        t.due_date = Some(date.into());
        t
    }

    fn ids(tasks: &[Task]) -> Vec<i64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn my_tasks_filters_status_assignment_and_creator() {
        let tasks = vec![
            task(1, Status::Pending, AssignedTo::Me, 10),
            task(2, Status::Pending, AssignedTo::Both, 10),
            task(3, Status::Pending, AssignedTo::Partner, 10),
            task(4, Status::Pending, AssignedTo::Me, 20),
            task(5, Status::Completed, AssignedTo::Me, 10),
            task(6, Status::Cancelled, AssignedTo::Both, 10),
        ];
        let mine = my_tasks(&tasks, 10);
        assert_eq!(ids(&mine), vec![1, 2]);
        assert!(mine
            .iter()
            .all(|t| t.status == Status::Pending && t.created_by == 10));
    }

    #[test]
    fn shared_board_covers_every_assignment() {
        for a in AssignedTo::ALL {
            assert!(SHARED_ASSIGNMENTS.contains(a));
        }
    }

    #[test]
    fn shared_tasks_pending_only_newest_first() {
        let tasks = vec![
            task(1, Status::Pending, AssignedTo::Me, 10),
            task(2, Status::Pending, AssignedTo::Partner, 20),
            task(3, Status::Completed, AssignedTo::Partner, 20),
            task(4, Status::Pending, AssignedTo::Both, 10),
        ];
        assert_eq!(ids(&shared_tasks(&tasks)), vec![4, 2, 1]);
    }

    #[test]
    fn history_partition_is_exhaustive_and_disjoint() {
        let tasks = vec![
            task(1, Status::Completed, AssignedTo::Me, 10),
            task(2, Status::Cancelled, AssignedTo::Partner, 10),
            task(3, Status::Pending, AssignedTo::Both, 10),
            task(4, Status::Completed, AssignedTo::Both, 20),
        ];
        let buckets = history(&tasks);
        assert_eq!(ids(&buckets.completed), vec![1, 4]);
        assert_eq!(ids(&buckets.cancelled), vec![2]);

        for t in &tasks {
            let hits = buckets.completed.iter().filter(|c| c.id == t.id).count()
                + buckets.cancelled.iter().filter(|c| c.id == t.id).count();
            let expected = if t.status == Status::Pending { 0 } else { 1 };
            assert_eq!(hits, expected, "task {} placed {hits} times", t.id);
        }
    }

    #[test]
    fn history_of_nothing_is_empty() {
        assert!(history(&[]).is_empty());
    }

    #[test]
    fn calendar_groups_by_day_and_skips_undated() {
        let tasks = vec![
            due(task(1, Status::Pending, AssignedTo::Me, 10), "2024-05-03"),
            due(task(2, Status::Pending, AssignedTo::Both, 10), "2024-05-03T20:00:00Z"),
            due(task(3, Status::Pending, AssignedTo::Partner, 20), "2024-05-04"),
            task(4, Status::Pending, AssignedTo::Me, 10),
            due(task(5, Status::Completed, AssignedTo::Me, 10), "2024-05-05"),
        ];
        let view = calendar(&tasks, None);
        let may3 = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let may4 = NaiveDate::from_ymd_opt(2024, 5, 4).unwrap();
        assert_eq!(view.markers.len(), 2);
        assert_eq!(view.markers[&may3].task_count, 2);
        assert_eq!(view.markers[&may4].task_count, 1);
        assert!(view.tasks_on_selected.is_empty());
        assert!(view.markers.values().all(|m| !m.selected));
    }

    #[test]
    fn calendar_selection_filters_list() {
        let tasks = vec![
            due(task(1, Status::Pending, AssignedTo::Me, 10), "2024-05-03"),
            due(task(2, Status::Pending, AssignedTo::Both, 10), "2024-05-04"),
        ];
        let may3 = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let view = calendar(&tasks, Some(may3));
        assert_eq!(ids(&view.tasks_on_selected), vec![1]);
        assert!(view.markers[&may3].selected);
        assert!(view.markers[&may3].is_marked());
    }

    #[test]
    fn selecting_an_empty_day_adds_unmarked_entry() {
        let tasks = vec![due(task(1, Status::Pending, AssignedTo::Me, 10), "2024-05-03")];
        let june = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let view = calendar(&tasks, Some(june));
        let marker = view.markers[&june];
        assert!(marker.selected);
        assert!(!marker.is_marked());
        assert!(view.tasks_on_selected.is_empty());
    }

    #[test]
    fn mission_board_partitions_on_flag() {
        let mission = |id, completed| ScheduledMission {
            id,
            title: format!("mission {id}"),
            completed,
            kind: "daily".into(),
            owner_id: 2,
        };
        let board = mission_board(&[mission(1, false), mission(2, true), mission(3, false)]);
        assert_eq!(
            board.incomplete.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(board.completed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![2]);
    }
}

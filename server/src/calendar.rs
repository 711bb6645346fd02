// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{Datelike, NaiveDate};
use common::{TaskPriority, TaskStatus, TaskWithUsers};
use serde::{Deserialize, Serialize};

/// How many tasks a day cell shows before collapsing into "+N more".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    #[default]
    Wide,
    Narrow,
}

impl Viewport {
    fn day_cap(self) -> usize {
        match self {
            Viewport::Wide => 3,
            Viewport::Narrow => 2,
        }
    }
}

/// One day of the month grid.
#[derive(Debug, Serialize)]
pub struct DayCell {
    pub day: u32,
    pub date: NaiveDate,
    pub visible: Vec<TaskWithUsers>,
    pub hidden_count: usize,
}

/// A Sunday-first month grid ready for rendering.
#[derive(Debug, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
}

/// Projects tasks onto a month grid. Tasks without a due date never appear.
/// Returns `None` for an invalid year/month pair.
pub fn project_month(
    tasks: &[TaskWithUsers],
    year: i32,
    month: u32,
    viewport: Viewport,
) -> Option<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let leading_blanks = first.weekday().num_days_from_sunday();
    let cap = viewport.day_cap();

    let mut days = Vec::with_capacity(31);
    let mut date = first;
    while date.month() == month {
        let mut due: Vec<TaskWithUsers> = tasks
            .iter()
            .filter(|t| t.due_date == Some(date))
            .cloned()
            .collect();
        let hidden_count = due.len().saturating_sub(cap);
        due.truncate(cap);
        days.push(DayCell {
            day: date.day(),
            date,
            visible: due,
            hidden_count,
        });
        date = date.succ_opt()?;
    }

    Some(MonthGrid {
        year,
        month,
        leading_blanks,
        days,
    })
}

/// Filters by substring and exact status/priority. Absent filters match
/// everything; present ones compose by AND. The search is case-insensitive
/// over title and description.
pub fn filter_tasks(
    tasks: Vec<TaskWithUsers>,
    search: Option<&str>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
) -> Vec<TaskWithUsers> {
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    tasks
        .into_iter()
        .filter(|t| {
            let matches_search = needle.as_deref().is_none_or(|n| {
                t.title.to_lowercase().contains(n)
                    || t.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(n))
            });
            let matches_status = status.is_none_or(|s| t.status == s);
            let matches_priority = priority.is_none_or(|p| t.priority == p);
            matches_search && matches_status && matches_priority
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{Task, UserSummary};

    fn summary(id: &str) -> UserSummary {
        UserSummary {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@example.com"),
        }
    }

    fn task_on(id: i64, title: &str, due: Option<NaiveDate>) -> TaskWithUsers {
        let now = Utc::now();
        TaskWithUsers {
            task: Task {
                id,
                title: title.to_string(),
                description: None,
                assigned_to: "alice".to_string(),
                assigned_by: "alice".to_string(),
                due_date: due,
                due_time: None,
                priority: TaskPriority::Medium,
                status: TaskStatus::Todo,
                category: None,
                is_personal: false,
                created_at: now,
                updated_at: now,
            },
            assigned_to_user: summary("alice"),
            assigned_by_user: summary("alice"),
        }
    }

    #[test]
    fn grid_starts_on_the_right_weekday() {
        // June 2024 starts on a Saturday.
        let grid = project_month(&[], 2024, 6, Viewport::Wide).unwrap();
        assert_eq!(grid.leading_blanks, 6);
        assert_eq!(grid.days.len(), 30);
        assert_eq!(grid.days[0].day, 1);
        assert_eq!(grid.days[29].day, 30);
    }

    #[test]
    fn leap_february_has_29_cells() {
        let grid = project_month(&[], 2024, 2, Viewport::Wide).unwrap();
        assert_eq!(grid.days.len(), 29);
    }

    #[test]
    fn invalid_month_yields_no_grid() {
        assert!(project_month(&[], 2024, 13, Viewport::Wide).is_none());
        assert!(project_month(&[], 2024, 0, Viewport::Wide).is_none());
    }

    #[test]
    fn tasks_land_on_their_due_day_only() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 14);
        let tasks = vec![
            task_on(1, "Dated", day),
            task_on(2, "Undated", None),
        ];
        let grid = project_month(&tasks, 2024, 6, Viewport::Wide).unwrap();

        assert_eq!(grid.days[13].visible.len(), 1);
        assert_eq!(grid.days[13].visible[0].title, "Dated");
        let elsewhere: usize = grid
            .days
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 13)
            .map(|(_, c)| c.visible.len())
            .sum();
        assert_eq!(elsewhere, 0);
    }

    #[test]
    fn overflowing_days_split_into_visible_and_hidden() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 14);
        let tasks: Vec<_> = (1..=5).map(|i| task_on(i, "Busy", day)).collect();

        let wide = project_month(&tasks, 2024, 6, Viewport::Wide).unwrap();
        assert_eq!(wide.days[13].visible.len(), 3);
        assert_eq!(wide.days[13].hidden_count, 2);

        let narrow = project_month(&tasks, 2024, 6, Viewport::Narrow).unwrap();
        assert_eq!(narrow.days[13].visible.len(), 2);
        assert_eq!(narrow.days[13].hidden_count, 3);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let mut described = task_on(1, "Quarterly numbers", None);
        described.task.description = Some("Prepare the BUDGET sheet".to_string());
        let tasks = vec![described, task_on(2, "Water the plants", None)];

        let hits = filter_tasks(tasks.clone(), Some("budget"), None, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        let hits = filter_tasks(tasks, Some("WATER"), None, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn filters_compose_by_and() {
        let mut urgent = task_on(1, "Fix the boiler", None);
        urgent.task.priority = TaskPriority::Urgent;
        let mut done = task_on(2, "Fix the fence", None);
        done.task.status = TaskStatus::Completed;
        let tasks = vec![urgent, done, task_on(3, "Paint the shed", None)];

        let hits = filter_tasks(tasks.clone(), Some("fix"), None, Some(TaskPriority::Urgent));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        let hits = filter_tasks(tasks.clone(), Some("fix"), Some(TaskStatus::Completed), None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);

        // No filters at all passes everything through.
        let hits = filter_tasks(tasks, None, None, None);
        assert_eq!(hits.len(), 3);
    }
}

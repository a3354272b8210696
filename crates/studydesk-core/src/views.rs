use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;

use crate::datetime::days_until;
use crate::task::{Category, Priority, Task};

pub const FOCUS_LIMIT: usize = 3;

pub const NEUTRAL_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusFilter::All => "All",
            StatusFilter::Active => "Active",
            StatusFilter::Completed => "Completed",
        })
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" | "pending" => Ok(StatusFilter::Active),
            "completed" | "done" => Ok(StatusFilter::Completed),
            _ => Err(anyhow!(
                "unknown status filter: {s} (expected all, active or completed)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => task.category == category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("All categories"),
            CategoryFilter::Only(category) => write!(f, "{category}"),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        s.parse::<Category>().map(CategoryFilter::Only)
    }
}

/// Tasks passing both filters, in collection order.
pub fn filter_tasks(
    tasks: &[Task],
    status: StatusFilter,
    category: CategoryFilter,
) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| status.matches(task) && category.matches(task))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub completion_percent: u32,
}

pub fn summarize(tasks: &[Task]) -> Summary {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    Summary {
        total,
        completed,
        pending: total - completed,
        completion_percent: completion_percent(completed, total),
    }
}

/// `round(completed / total * 100)`, with an empty collection at 0%.
pub fn completion_percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// Ranking weight for a raw priority name; unknown names weigh 0.
pub fn priority_weight(priority: &str) -> u8 {
    match priority {
        "High" => 3,
        "Medium" => 2,
        "Low" => 1,
        _ => 0,
    }
}

/// Top pending tasks by priority, then nearest due date. Undated tasks sort
/// after every dated task of the same priority; they are never promoted out
/// of their priority tier.
pub fn todays_focus(tasks: &[Task], today: NaiveDate) -> Vec<&Task> {
    let mut pending: Vec<&Task> = tasks.iter().filter(|t| !t.completed).collect();

    pending.sort_by(|a, b| {
        let wa = priority_weight(a.priority.as_str());
        let wb = priority_weight(b.priority.as_str());
        wb.cmp(&wa).then_with(|| {
            let da = days_until(a.due_date, today).unwrap_or(i64::MAX);
            let db = days_until(b.due_date, today).unwrap_or(i64::MAX);
            da.cmp(&db)
        })
    });

    pending.truncate(FOCUS_LIMIT);
    pending
}

pub fn category_color(category: &str) -> &'static str {
    match category {
        "Study" => "#03b3feff",
        "Homework" => "#8b5cf6",
        "Exam" => "#f97316",
        "Project" => "#22c55e",
        "Personal" => "#ec4899",
        _ => NEUTRAL_COLOR,
    }
}

pub fn priority_color(priority: &str) -> &'static str {
    match priority {
        "High" => "#ef4444",
        "Medium" => "#f97316",
        _ => "#22c55e",
    }
}

impl Category {
    pub fn color(self) -> &'static str {
        category_color(self.as_str())
    }
}

impl Priority {
    pub fn color(self) -> &'static str {
        priority_color(self.as_str())
    }
}

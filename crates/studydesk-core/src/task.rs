use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub type TaskId = u64;

pub const DEFAULT_SUBJECT: &str = "General";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    Study,
    Homework,
    Exam,
    Project,
    Personal,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Study,
        Category::Homework,
        Category::Exam,
        Category::Project,
        Category::Personal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Study => "Study",
            Category::Homework => "Homework",
            Category::Exam => "Exam",
            Category::Project => "Project",
            Category::Personal => "Personal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                anyhow!("unknown category: {s} (expected Study, Homework, Exam, Project or Personal)")
            })
    }
}

/// Ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow!("unknown priority: {s} (expected Low, Medium or High)"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    #[serde(default = "default_subject")]
    pub subject: String,

    pub category: Category,

    pub priority: Priority,

    #[serde(default)]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub notes: String,
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

impl Task {
    /// A fresh pending task with empty notes. Callers are expected to have
    /// trimmed and validated `title` already.
    pub fn new_pending(
        id: TaskId,
        title: String,
        subject: String,
        category: Category,
        priority: Priority,
        due_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id,
            title,
            subject,
            category,
            priority,
            due_date,
            completed: false,
            notes: String::new(),
        }
    }
}

/// Trims `raw`, falling back to [`DEFAULT_SUBJECT`] when nothing is left.
pub fn normalize_subject(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        default_subject()
    } else {
        trimmed.to_string()
    }
}

/// The first-run collection, with due dates relative to `today`.
pub fn seed_tasks(today: NaiveDate) -> Vec<Task> {
    let offset = |days: i64| today.checked_add_signed(Duration::days(days));

    vec![
        Task {
            id: 1,
            title: "Finish DBMS assignment".to_string(),
            subject: "DBMS".to_string(),
            category: Category::Homework,
            priority: Priority::High,
            due_date: offset(1),
            completed: false,
            notes: "Solve questions 1–5 from tutorial sheet.".to_string(),
        },
        Task {
            id: 2,
            title: "Revise JavaScript array methods".to_string(),
            subject: "Web Development".to_string(),
            category: Category::Study,
            priority: Priority::Medium,
            due_date: offset(0),
            completed: false,
            notes: "Map, filter, reduce practice problems.".to_string(),
        },
        Task {
            id: 3,
            title: "Prepare DSA mock test".to_string(),
            subject: "DSA".to_string(),
            category: Category::Exam,
            priority: Priority::High,
            due_date: offset(3),
            completed: false,
            notes: "Focus on trees and graphs.".to_string(),
        },
    ]
}

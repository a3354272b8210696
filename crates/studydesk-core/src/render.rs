use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::due_label;
use crate::task::Task;
use crate::views::Summary;

const PROGRESS_WIDTH: usize = 20;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

struct Row {
    cells: Vec<String>,
    notes: Option<String>,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.color_enabled()? && io::stdout().is_terminal();
        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, tasks))]
    pub fn write_task_table<W: Write>(
        &self,
        out: &mut W,
        tasks: &[&Task],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No tasks to show for this filter.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Title".to_string(),
            "Subject".to_string(),
            "Category".to_string(),
            "Priority".to_string(),
            "Due".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let done = if task.completed { "[x]" } else { "[ ]" };
                let title = if task.completed {
                    self.paint_sgr(&task.title, "9")
                } else {
                    task.title.clone()
                };
                let notes = (!task.notes.is_empty()).then(|| task.notes.clone());
                Row {
                    cells: vec![
                        task.id.to_string(),
                        done.to_string(),
                        title,
                        task.subject.clone(),
                        self.paint_hex(task.category.as_str(), task.category.color()),
                        self.paint_hex(task.priority.as_str(), task.priority.color()),
                        due_label(task.due_date, today),
                    ],
                    notes,
                }
            })
            .collect::<Vec<_>>();

        write_table(out, headers, rows)?;
        Ok(())
    }

    pub fn write_summary<W: Write>(&self, out: &mut W, summary: &Summary) -> anyhow::Result<()> {
        writeln!(
            out,
            "Total: {}  Completed: {}  Pending: {}",
            summary.total, summary.completed, summary.pending
        )?;
        writeln!(
            out,
            "{} {}% completed",
            progress_bar(summary.completion_percent),
            summary.completion_percent
        )?;
        Ok(())
    }

    pub fn write_focus<W: Write>(
        &self,
        out: &mut W,
        focus: &[&Task],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        writeln!(out, "Today's focus")?;
        for task in focus {
            writeln!(
                out,
                "  {:>3}. {}  ({}, {})",
                task.id,
                task.title,
                self.paint_hex(task.priority.as_str(), task.priority.color()),
                due_label(task.due_date, today)
            )?;
        }
        Ok(())
    }

    fn paint_hex(&self, text: &str, hex: &str) -> String {
        match parse_hex_color(hex) {
            Some((r, g, b)) => self.paint_sgr(text, &format!("38;2;{r};{g};{b}")),
            None => text.to_string(),
        }
    }

    fn paint_sgr(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn progress_bar(percent: u32) -> String {
    let filled = ((percent.min(100) as usize * PROGRESS_WIDTH) + 50) / 100;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled)
    )
}

/// `#rrggbb` or `#rrggbbaa`; alpha is ignored.
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 && digits.len() != 8 {
        return None;
    }
    let channel = |idx: usize| {
        digits
            .get(idx..idx + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
    };
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn write_table<W: Write>(writer: &mut W, headers: Vec<String>, rows: Vec<Row>) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.cells.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    let notes_indent = widths[0] + 1;
    for row in rows {
        for (idx, cell) in row.cells.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;

        if let Some(notes) = row.notes {
            for line in notes.lines() {
                writeln!(writer, "{}  {}", " ".repeat(notes_indent), line)?;
            }
        }
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

use std::io::Write;

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::cli::{Command, FilterArgs};
use crate::config::Config;
use crate::datetime::parse_date_expr;
use crate::render::Renderer;
use crate::storage::KeyValueStorage;
use crate::store::{Clock, TaskStore};
use crate::task::{Category, Priority, TaskId};

#[instrument(skip(store, cfg, renderer, out, command))]
pub fn dispatch<S, C, W>(
    store: &mut TaskStore<S, C>,
    cfg: &Config,
    renderer: &Renderer,
    out: &mut W,
    command: Command,
) -> anyhow::Result<()>
where
    S: KeyValueStorage,
    C: Clock,
    W: Write,
{
    debug!(?command, "dispatching command");

    match command {
        Command::Dashboard { filters } => cmd_dashboard(store, renderer, out, filters),
        Command::List { filters } => cmd_list(store, renderer, out, filters),
        Command::Add {
            title,
            subject,
            category,
            priority,
            due,
            no_due,
        } => cmd_add(store, out, title, subject, category, priority, due, no_due),
        Command::Done { id } => cmd_done(store, out, id),
        Command::Delete { id } => cmd_delete(store, out, id),
        Command::Note { id, text } => cmd_note(store, out, id, &text.join(" ")),
        Command::Clear => cmd_clear(store, out),
        Command::Stats => {
            renderer.write_summary(out, &store.summary())?;
            Ok(())
        }
        Command::Focus => cmd_focus(store, renderer, out),
        Command::Export => {
            writeln!(out, "{}", store.export_json()?)?;
            Ok(())
        }
        Command::Show => cmd_show(cfg, out),
    }?;

    // Mutations never fail on input, but the write behind them can.
    if let Some(err) = store.take_persist_error() {
        return Err(err.context("failed to save tasks"));
    }
    Ok(())
}

#[instrument(skip(store, renderer, out))]
fn cmd_dashboard<S: KeyValueStorage, C: Clock, W: Write>(
    store: &mut TaskStore<S, C>,
    renderer: &Renderer,
    out: &mut W,
    filters: FilterArgs,
) -> anyhow::Result<()> {
    info!("command dashboard");
    store.status_filter = filters.status;
    store.category_filter = filters.category;
    let today = store.today();

    renderer.write_summary(out, &store.summary())?;

    let focus = store.focus();
    if !focus.is_empty() {
        writeln!(out)?;
        renderer.write_focus(out, &focus, today)?;
    }

    writeln!(out)?;
    writeln!(out, "Showing: {} / {}", store.status_filter, store.category_filter)?;
    renderer.write_task_table(out, &store.filtered(), today)?;

    if store.has_completed() {
        writeln!(out)?;
        writeln!(out, "Run `studydesk clear` to clear completed tasks.")?;
    }
    Ok(())
}

#[instrument(skip(store, renderer, out))]
fn cmd_list<S: KeyValueStorage, C: Clock, W: Write>(
    store: &mut TaskStore<S, C>,
    renderer: &Renderer,
    out: &mut W,
    filters: FilterArgs,
) -> anyhow::Result<()> {
    info!("command list");
    store.status_filter = filters.status;
    store.category_filter = filters.category;
    let today = store.today();
    renderer.write_task_table(out, &store.filtered(), today)
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip(store, out))]
fn cmd_add<S: KeyValueStorage, C: Clock, W: Write>(
    store: &mut TaskStore<S, C>,
    out: &mut W,
    title: String,
    subject: Option<String>,
    category: Option<Category>,
    priority: Option<Priority>,
    due: Option<String>,
    no_due: bool,
) -> anyhow::Result<()> {
    info!("command add");

    let today = store.today();
    let due_date = match (no_due, due.as_deref()) {
        (true, _) => None,
        (false, Some(expr)) => Some(
            parse_date_expr(expr, today).with_context(|| format!("invalid --due value: {expr}"))?,
        ),
        (false, None) => store.draft.due_date,
    };

    store.draft.title = title;
    if let Some(subject) = subject {
        store.draft.subject = subject;
    }
    if let Some(category) = category {
        store.draft.category = category;
    }
    if let Some(priority) = priority {
        store.draft.priority = priority;
    }
    store.draft.due_date = due_date;

    match store.submit_draft() {
        Some(id) => writeln!(out, "Added task {id}.")?,
        None => writeln!(out, "Nothing added: title is empty.")?,
    }
    Ok(())
}

#[instrument(skip(store, out))]
fn cmd_done<S: KeyValueStorage, C: Clock, W: Write>(
    store: &mut TaskStore<S, C>,
    out: &mut W,
    id: TaskId,
) -> anyhow::Result<()> {
    info!("command done");
    if !store.toggle_complete(id) {
        writeln!(out, "No task with id {id}.")?;
        return Ok(());
    }
    let completed = store.get(id).is_some_and(|t| t.completed);
    if completed {
        writeln!(out, "Completed task {id}.")?;
    } else {
        writeln!(out, "Reopened task {id}.")?;
    }
    Ok(())
}

#[instrument(skip(store, out))]
fn cmd_delete<S: KeyValueStorage, C: Clock, W: Write>(
    store: &mut TaskStore<S, C>,
    out: &mut W,
    id: TaskId,
) -> anyhow::Result<()> {
    info!("command delete");
    if store.delete_task(id) {
        writeln!(out, "Deleted task {id}.")?;
    } else {
        writeln!(out, "No task with id {id}.")?;
    }
    Ok(())
}

#[instrument(skip(store, out, text))]
fn cmd_note<S: KeyValueStorage, C: Clock, W: Write>(
    store: &mut TaskStore<S, C>,
    out: &mut W,
    id: TaskId,
    text: &str,
) -> anyhow::Result<()> {
    info!("command note");
    if store.update_notes(id, text) {
        writeln!(out, "Updated notes for task {id}.")?;
    } else {
        writeln!(out, "No task with id {id}.")?;
    }
    Ok(())
}

#[instrument(skip(store, out))]
fn cmd_clear<S: KeyValueStorage, C: Clock, W: Write>(
    store: &mut TaskStore<S, C>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command clear");
    let removed = store.clear_completed();
    let plural = if removed == 1 { "" } else { "s" };
    writeln!(out, "Cleared {removed} completed task{plural}.")?;
    Ok(())
}

#[instrument(skip(store, renderer, out))]
fn cmd_focus<S: KeyValueStorage, C: Clock, W: Write>(
    store: &TaskStore<S, C>,
    renderer: &Renderer,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command focus");
    let focus = store.focus();
    if focus.is_empty() {
        writeln!(out, "Nothing pending.")?;
        return Ok(());
    }
    renderer.write_focus(out, &focus, store.today())
}

fn cmd_show<W: Write>(cfg: &Config, out: &mut W) -> anyhow::Result<()> {
    for path in &cfg.loaded_files {
        writeln!(out, "# loaded {}", path.display())?;
    }
    for (key, value) in cfg.iter() {
        writeln!(out, "{key} = {value}")?;
    }
    Ok(())
}

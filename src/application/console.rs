use crate::application::view_model::{
    DeleteConfirmation, DragHandler, NowProvider, TaskViewModel, ViewScope, ViewSnapshot,
};
use crate::domain::models::{NavDirection, RangeUnit, Task, TaskId};
use crate::domain::navigation::LocalZone;
use crate::domain::view_state::ViewState;
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::task_store::TaskStore;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

const HELP: &str = "\
Commands:
  all                          list every task
  day | week | month           switch range around the current date
  prev | next | today          move the window
  add <title> [| description]  create a task
  edit <id> <title> [| desc]   change title and description
  toggle <id>                  flip completion
  delete <id>                  delete after confirmation
  drag <source> <target>       move source onto target's slot
  retry                        reload the current window
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    All,
    Range(RangeUnit),
    Navigate(NavDirection),
    Today,
    Add {
        title: String,
        description: Option<String>,
    },
    Edit {
        id: TaskId,
        title: String,
        description: Option<String>,
    },
    Toggle(TaskId),
    Delete(TaskId),
    Drag {
        source: TaskId,
        target: TaskId,
    },
    Retry,
    Help,
    Quit,
}

fn split_description(rest: &str) -> (String, Option<String>) {
    match rest.split_once('|') {
        Some((title, description)) => (
            title.trim().to_string(),
            Some(description.trim().to_string()).filter(|value| !value.is_empty()),
        ),
        None => (rest.trim().to_string(), None),
    }
}

fn required_id(value: Option<&str>, usage: &str) -> Result<TaskId, String> {
    value
        .and_then(TaskId::parse)
        .ok_or_else(|| format!("usage: {usage}"))
}

pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word.to_ascii_lowercase().as_str() {
        "all" => Command::All,
        "day" | "week" | "month" => {
            Command::Range(RangeUnit::parse(word).ok_or_else(|| format!("unknown range '{word}'"))?)
        }
        "prev" => Command::Navigate(NavDirection::Prev),
        "next" => Command::Navigate(NavDirection::Next),
        "today" => Command::Today,
        "add" => {
            let (title, description) = split_description(rest);
            Command::Add { title, description }
        }
        "edit" => {
            let (id, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let id = required_id(Some(id), "edit <id> <title> [| description]")?;
            let (title, description) = split_description(tail);
            Command::Edit {
                id,
                title,
                description,
            }
        }
        "toggle" => Command::Toggle(required_id(Some(rest), "toggle <id>")?),
        "delete" => Command::Delete(required_id(Some(rest), "delete <id>")?),
        "drag" => {
            let mut ids = rest.split_whitespace();
            let source = required_id(ids.next(), "drag <source> <target>")?;
            let target = required_id(ids.next(), "drag <source> <target>")?;
            Command::Drag { source, target }
        }
        "retry" => Command::Retry,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}', type 'help'")),
    };
    Ok(Some(command))
}

pub struct ConsoleIo<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl<R, W> ConsoleIo<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    pub fn read_line(&self) -> Result<Option<String>, InfraError> {
        let mut input = self
            .input
            .lock()
            .map_err(|_| InfraError::State("console input lock poisoned".to_string()))?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    pub fn write(&self, text: &str) -> Result<(), InfraError> {
        let mut output = self
            .output
            .lock()
            .map_err(|_| InfraError::State("console output lock poisoned".to_string()))?;
        output.write_all(text.as_bytes())?;
        output.flush()?;
        Ok(())
    }
}

pub struct ConsoleConfirmation<R, W> {
    io: Arc<ConsoleIo<R, W>>,
}

impl<R, W> DeleteConfirmation for ConsoleConfirmation<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn confirm_delete(&self, id: &TaskId, cached: Option<&Task>) -> bool {
        let label = cached.map_or_else(|| format!("#{id}"), |task| format!("\"{}\"", task.title));
        if self.io.write(&format!("Delete {label}? [y/N] ")).is_err() {
            return false;
        }
        match self.io.read_line() {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct ConsoleController<S, R, W>
where
    S: TaskStore,
    R: BufRead + Send,
    W: Write + Send,
{
    store: Arc<S>,
    view_model: TaskViewModel<S, ConsoleConfirmation<R, W>>,
    io: Arc<ConsoleIo<R, W>>,
}

impl<S, R, W> ConsoleController<S, R, W>
where
    S: TaskStore,
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(store: Arc<S>, config: &ClientConfig, input: R, output: W) -> Result<Self, InfraError> {
        let io = Arc::new(ConsoleIo::new(input, output));
        let confirmation = Arc::new(ConsoleConfirmation { io: Arc::clone(&io) });
        let view_model = TaskViewModel::new(Arc::clone(&store), confirmation, config)?;
        Ok(Self {
            store,
            view_model,
            io,
        })
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.view_model = self.view_model.with_now_provider(now_provider);
        self
    }

    pub fn view_model(&self) -> &TaskViewModel<S, ConsoleConfirmation<R, W>> {
        &self.view_model
    }

    pub fn into_view_model(self) -> TaskViewModel<S, ConsoleConfirmation<R, W>> {
        self.view_model
    }

    pub async fn run(&self) -> Result<(), InfraError> {
        self.probe_health().await?;
        if let Err(error) = self.view_model.go_to_today().await {
            tracing::warn!(%error, "initial load failed");
        }
        self.render()?;

        loop {
            self.io.write("> ")?;
            let Some(line) = self.io.read_line()? else {
                break;
            };
            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(message) => {
                    self.io.write(&format!("{message}\n"))?;
                    continue;
                }
            };
            if self.execute(command).await? == Flow::Quit {
                break;
            }
        }
        tracing::info!("console session ended");
        Ok(())
    }

    async fn probe_health(&self) -> Result<(), InfraError> {
        match self.store.health().await {
            Ok(status) if status.is_healthy() => {
                tracing::info!(time = ?status.time, "task service healthy");
            }
            Ok(status) => {
                tracing::warn!(status = %status.status, "task service reports unhealthy");
                self.io
                    .write(&format!("warning: task service status is '{}'\n", status.status))?;
            }
            Err(error) => {
                tracing::warn!(%error, "task service health check failed");
                self.io
                    .write(&format!("warning: backend not reachable: {error}\n"))?;
            }
        }
        Ok(())
    }

    async fn execute(&self, command: Command) -> Result<Flow, InfraError> {
        let vm = &self.view_model;
        // Store failures land in the error banner; only console I/O aborts.
        let outcome = match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => {
                self.io.write(&format!("{HELP}\n"))?;
                return Ok(Flow::Continue);
            }
            Command::All => vm.load_all().await.map(drop),
            Command::Range(range) => vm.set_range(range).await.map(drop),
            Command::Navigate(direction) => match vm.navigate(direction).await {
                Ok(None) => {
                    self.io.write("Cannot go back more than one year.\n")?;
                    Ok(())
                }
                other => other.map(drop),
            },
            Command::Today => vm.go_to_today().await.map(drop),
            Command::Retry => vm.reload().await.map(drop),
            Command::Add { title, description } => {
                vm.add_task(&title, description.as_deref()).await.map(drop)
            }
            Command::Edit {
                id,
                title,
                description,
            } => {
                if !vm.begin_edit(&id)? {
                    self.io.write(&format!("No task #{id} in this view.\n"))?;
                    return Ok(Flow::Continue);
                }
                let result = vm.edit_task(&id, &title, description.as_deref()).await;
                if matches!(result, Ok(None)) {
                    vm.cancel_edit()?;
                }
                result.map(drop)
            }
            Command::Toggle(id) => match vm.find_task(&id)? {
                Some(task) => vm.toggle_completion(&id, !task.completed).await.map(drop),
                None => {
                    self.io.write(&format!("No task #{id} in this view.\n"))?;
                    Ok(())
                }
            },
            Command::Delete(id) => vm.delete_task(&id).await.map(drop),
            Command::Drag { source, target } => {
                if !vm.on_drag_start(&source)? || !vm.on_drag_enter(&target)? {
                    vm.on_drag_end()?;
                    self.io.write("Nothing to move.\n")?;
                    return Ok(Flow::Continue);
                }
                vm.drop_on_hovered().await.map(drop)
            }
        };

        if let Err(error) = outcome {
            tracing::debug!(%error, "command failed");
        }
        self.render()?;
        Ok(Flow::Continue)
    }

    fn render(&self) -> Result<(), InfraError> {
        let snapshot = self.view_model.snapshot()?;
        self.io.write(&render_snapshot(&snapshot, self.view_model.zone()))
    }
}

fn render_task(out: &mut String, task: &Task, zone: LocalZone, editing: bool) {
    let mark = if task.completed { "x" } else { " " };
    out.push_str(&format!("  [{mark}] #{} {}", task.id, task.title));
    if editing {
        out.push_str(" (editing)");
    }
    out.push('\n');
    if let Some(description) = task.description.as_deref().filter(|value| !value.is_empty()) {
        out.push_str(&format!("        {description}\n"));
    }
    out.push_str(&format!("        created {}\n", zone.format_timestamp(task.created_at)));
}

pub fn render_snapshot(snapshot: &ViewSnapshot, zone: LocalZone) -> String {
    let mut out = String::new();
    let mode = match snapshot.scope {
        ViewScope::All => "all".to_string(),
        ViewScope::Dated => snapshot.cursor.range.to_string(),
    };
    out.push_str(&format!("\n== {} [{mode}] ==\n", snapshot.header));

    if let Some(error) = &snapshot.error {
        let hint = if error.retryable { " (type 'retry')" } else { "" };
        out.push_str(&format!("! {}{hint}\n", error.message));
    }
    if snapshot.loading {
        out.push_str("Loading...\n");
        return out;
    }

    let is_editing = |task: &Task| snapshot.editing.as_ref() == Some(&task.id);
    match &snapshot.state {
        ViewState::Flat(tasks) => {
            for task in tasks {
                render_task(&mut out, task, zone, is_editing(task));
            }
        }
        ViewState::Grouped(groups) => {
            for group in groups {
                out.push_str(&format!("{}\n", group.date.format("%A, %B %-d")));
                for task in &group.tasks {
                    render_task(&mut out, task, zone, is_editing(task));
                }
            }
        }
    }

    if snapshot.state.is_empty() {
        out.push_str("No tasks for this period.\n");
    } else {
        out.push_str(&format!(
            "{} of {} completed\n",
            snapshot.summary.completed, snapshot.summary.total
        ));
    }
    out
}

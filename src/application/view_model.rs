use crate::domain::drag::{DragContext, Point, Rect};
use crate::domain::models::{NavDirection, NewTask, RangeUnit, Task, TaskId};
use crate::domain::navigation::{LocalZone, NavigationCursor};
use crate::domain::view_state::{CompletionSummary, ReorderChange, ViewState};
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::task_store::{TaskListing, TaskStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub trait DeleteConfirmation: Send + Sync {
    fn confirm_delete(&self, id: &TaskId, cached: Option<&Task>) -> bool;
}

#[async_trait]
pub trait DragHandler {
    fn on_drag_start(&self, source: &TaskId) -> Result<bool, InfraError>;

    fn on_drag_enter(&self, target: &TaskId) -> Result<bool, InfraError>;

    fn on_drag_leave(&self, pointer: Point, bounds: Rect) -> Result<bool, InfraError>;

    fn on_drag_end(&self) -> Result<(), InfraError>;

    async fn on_drop(
        &self,
        source: &TaskId,
        target: &TaskId,
    ) -> Result<Option<ReorderChange>, InfraError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Load,
    Add,
    Update,
    Delete,
    Reorder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ViewError {
    fn new(kind: ErrorKind, error: &InfraError) -> Self {
        let action = match kind {
            ErrorKind::Load => "load tasks",
            ErrorKind::Add => "add task",
            ErrorKind::Update => "update task",
            ErrorKind::Delete => "delete task",
            ErrorKind::Reorder => "save task order",
        };
        Self {
            kind,
            message: format!("Failed to {action}: {error}"),
            retryable: kind == ErrorKind::Load,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewScope {
    All,
    Dated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load started while this one was in flight; its response was dropped.
    Stale,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub scope: ViewScope,
    pub cursor: NavigationCursor,
    pub header: String,
    pub state: ViewState,
    pub loading: bool,
    pub error: Option<ViewError>,
    pub editing: Option<TaskId>,
    pub drag_source: Option<TaskId>,
    pub summary: CompletionSummary,
}

#[derive(Debug)]
struct ViewRuntime {
    scope: ViewScope,
    cursor: NavigationCursor,
    state: ViewState,
    drag: DragContext,
    editing: Option<TaskId>,
    error: Option<ViewError>,
    loading: bool,
    generation: u64,
}

impl ViewRuntime {
    fn new(today: NaiveDate) -> Self {
        Self {
            scope: ViewScope::Dated,
            cursor: NavigationCursor::new(today, RangeUnit::Day),
            state: ViewState::empty_for(RangeUnit::Day),
            drag: DragContext::default(),
            editing: None,
            error: None,
            loading: false,
            generation: 0,
        }
    }

    fn begin_load(&mut self, scope: ViewScope, empty: ViewState) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.scope = scope;
        self.state = empty;
        self.drag.cancel();
        self.loading = true;
        self.generation
    }
}

/// Every mutation waits for the store's response and then applies the
/// returned representation; nothing is patched locally ahead of the round
/// trip. Methods take `&self` and never hold the internal lock across an
/// `.await`, so loads may overlap; only the most recently started one is
/// applied.
pub struct TaskViewModel<S, C>
where
    S: TaskStore,
    C: DeleteConfirmation,
{
    store: Arc<S>,
    confirmation: Arc<C>,
    persist_reorder: bool,
    zone: LocalZone,
    now_provider: NowProvider,
    runtime: Mutex<ViewRuntime>,
}

impl<S, C> TaskViewModel<S, C>
where
    S: TaskStore,
    C: DeleteConfirmation,
{
    pub fn new(store: Arc<S>, confirmation: Arc<C>, config: &ClientConfig) -> Result<Self, InfraError> {
        let zone = LocalZone::from_name(config.timezone.as_deref()).map_err(InfraError::InvalidConfig)?;
        let now_provider: NowProvider = Arc::new(Utc::now);
        let today = zone.date_of(now_provider());

        Ok(Self {
            store,
            confirmation,
            persist_reorder: config.persist_reorder,
            zone,
            now_provider,
            runtime: Mutex::new(ViewRuntime::new(today)),
        })
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        let today = self.zone.date_of(now_provider());
        self.now_provider = now_provider;
        match self.runtime.get_mut() {
            Ok(runtime) => runtime.cursor.date = today,
            Err(error) => tracing::error!(%error, "view runtime lock poisoned; cursor left unchanged"),
        }
        self
    }

    pub fn zone(&self) -> LocalZone {
        self.zone
    }

    pub fn today(&self) -> NaiveDate {
        self.zone.date_of((self.now_provider)())
    }

    fn lock_runtime(&self) -> Result<MutexGuard<'_, ViewRuntime>, InfraError> {
        self.runtime
            .lock()
            .map_err(|error| InfraError::State(format!("view runtime lock poisoned: {error}")))
    }

    pub fn snapshot(&self) -> Result<ViewSnapshot, InfraError> {
        let runtime = self.lock_runtime()?;
        let header = match runtime.scope {
            ViewScope::All => "All tasks".to_string(),
            ViewScope::Dated => runtime.cursor.header_label(),
        };
        Ok(ViewSnapshot {
            scope: runtime.scope,
            cursor: runtime.cursor,
            header,
            state: runtime.state.clone(),
            loading: runtime.loading,
            error: runtime.error.clone(),
            editing: runtime.editing.clone(),
            drag_source: runtime.drag.source().cloned(),
            summary: runtime.state.summary(),
        })
    }

    pub fn cursor(&self) -> Result<NavigationCursor, InfraError> {
        Ok(self.lock_runtime()?.cursor)
    }

    pub fn editing(&self) -> Result<Option<TaskId>, InfraError> {
        Ok(self.lock_runtime()?.editing.clone())
    }

    pub fn error(&self) -> Result<Option<ViewError>, InfraError> {
        Ok(self.lock_runtime()?.error.clone())
    }

    pub fn is_loading(&self) -> Result<bool, InfraError> {
        Ok(self.lock_runtime()?.loading)
    }

    pub fn find_task(&self, id: &TaskId) -> Result<Option<Task>, InfraError> {
        Ok(self.lock_runtime()?.state.find(id).cloned())
    }

    fn record_error(&self, kind: ErrorKind, error: &InfraError) {
        tracing::error!(kind = ?kind, %error, "task store request failed");
        match self.lock_runtime() {
            Ok(mut runtime) => runtime.error = Some(ViewError::new(kind, error)),
            Err(lock_error) => tracing::error!(%lock_error, "error banner not recorded"),
        }
    }

    pub async fn load(&self, range: RangeUnit, date: NaiveDate) -> Result<LoadOutcome, InfraError> {
        let generation = {
            let mut runtime = self.lock_runtime()?;
            runtime.cursor = NavigationCursor::new(date, range);
            runtime.begin_load(ViewScope::Dated, ViewState::empty_for(range))
        };
        tracing::info!(%range, %date, generation, "loading tasks");

        let result = self
            .store
            .list_by_date(range, date)
            .await
            .map(|listing| match listing {
                TaskListing::Flat(tasks) => ViewState::Flat(tasks),
                TaskListing::Grouped(groups) => ViewState::grouped(groups),
            });
        self.finish_load(generation, ViewState::empty_for(range), result)
    }

    pub async fn load_all(&self) -> Result<LoadOutcome, InfraError> {
        let generation = self
            .lock_runtime()?
            .begin_load(ViewScope::All, ViewState::empty_for(RangeUnit::Day));
        tracing::info!(generation, "loading all tasks");

        let result = self.store.list_all().await.map(ViewState::Flat);
        self.finish_load(generation, ViewState::empty_for(RangeUnit::Day), result)
    }

    fn finish_load(
        &self,
        generation: u64,
        empty: ViewState,
        result: Result<ViewState, InfraError>,
    ) -> Result<LoadOutcome, InfraError> {
        let mut runtime = self.lock_runtime()?;
        if runtime.generation != generation {
            tracing::warn!(
                generation,
                current = runtime.generation,
                "discarding stale task list response"
            );
            return Ok(LoadOutcome::Stale);
        }
        runtime.loading = false;

        match result {
            Ok(state) => {
                tracing::info!(generation, tasks = state.len(), "tasks loaded");
                runtime.state = state;
                runtime.error = None;
                Ok(LoadOutcome::Applied)
            }
            Err(error) => {
                runtime.state = empty;
                runtime.error = Some(ViewError::new(ErrorKind::Load, &error));
                drop(runtime);
                tracing::error!(generation, %error, "failed to load tasks");
                Err(error)
            }
        }
    }

    pub async fn reload(&self) -> Result<LoadOutcome, InfraError> {
        let (scope, cursor) = {
            let runtime = self.lock_runtime()?;
            (runtime.scope, runtime.cursor)
        };
        match scope {
            ViewScope::All => self.load_all().await,
            ViewScope::Dated => self.load(cursor.range, cursor.date).await,
        }
    }

    pub async fn navigate(&self, direction: NavDirection) -> Result<Option<LoadOutcome>, InfraError> {
        let current = self.cursor()?;
        let today = self.today();
        let Some(next) = current.navigate(direction, today) else {
            tracing::warn!(date = %current.date, %today, "navigation before one-year limit rejected");
            return Ok(None);
        };
        self.load(next.range, next.date).await.map(Some)
    }

    pub async fn set_range(&self, range: RangeUnit) -> Result<LoadOutcome, InfraError> {
        let next = self.cursor()?.with_range(range);
        self.load(next.range, next.date).await
    }

    pub async fn go_to_today(&self) -> Result<LoadOutcome, InfraError> {
        let current = self.cursor()?;
        self.load(current.range, self.today()).await
    }

    pub async fn add_task(&self, title: &str, description: Option<&str>) -> Result<Option<Task>, InfraError> {
        let Some(new_task) = NewTask::from_input(title, description) else {
            tracing::debug!("ignoring task with blank title");
            return Ok(None);
        };

        let created = match self.store.create(&new_task).await {
            Ok(task) => task,
            Err(error) => {
                self.record_error(ErrorKind::Add, &error);
                return Err(error);
            }
        };

        let today = self.today();
        let mut runtime = self.lock_runtime()?;
        runtime.state.insert_head(created.clone(), today);
        runtime.error = None;
        tracing::info!(task_id = %created.id, "task created");
        Ok(Some(created))
    }

    pub async fn update_task(&self, task: Task) -> Result<Task, InfraError> {
        let updated = match self.store.update(&task).await {
            Ok(updated) => updated,
            Err(error) => {
                self.record_error(ErrorKind::Update, &error);
                return Err(error);
            }
        };

        let mut runtime = self.lock_runtime()?;
        if !runtime.state.replace(updated.clone()) {
            tracing::debug!(task_id = %updated.id, "updated task is not in the current view");
        }
        if runtime.editing.as_ref() == Some(&task.id) || runtime.editing.as_ref() == Some(&updated.id) {
            runtime.editing = None;
        }
        runtime.error = None;
        tracing::info!(task_id = %updated.id, completed = updated.completed, "task updated");
        Ok(updated)
    }

    pub async fn edit_task(
        &self,
        id: &TaskId,
        title: &str,
        description: Option<&str>,
    ) -> Result<Option<Task>, InfraError> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }
        let Some(cached) = self.find_task(id)? else {
            tracing::warn!(task_id = %id, "edit requested for task outside the current view");
            return Ok(None);
        };
        let edited = Task {
            title: title.to_string(),
            description: description
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
            ..cached
        };
        self.update_task(edited).await.map(Some)
    }

    pub async fn toggle_completion(&self, id: &TaskId, completed: bool) -> Result<Option<Task>, InfraError> {
        let Some(cached) = self.find_task(id)? else {
            tracing::warn!(task_id = %id, "toggle requested for task outside the current view");
            return Ok(None);
        };
        self.update_task(cached.with_completed(completed)).await.map(Some)
    }

    pub async fn delete_task(&self, id: &TaskId) -> Result<bool, InfraError> {
        let cached = self.find_task(id)?;
        if !self.confirmation.confirm_delete(id, cached.as_ref()) {
            tracing::debug!(task_id = %id, "delete cancelled by user");
            return Ok(false);
        }

        if let Err(error) = self.store.delete(id).await {
            self.record_error(ErrorKind::Delete, &error);
            return Err(error);
        }

        let mut runtime = self.lock_runtime()?;
        if runtime.state.remove(id).is_none() {
            tracing::debug!(task_id = %id, "deleted task is not in the current view");
        }
        if runtime.drag.forget(id) {
            tracing::debug!(task_id = %id, "drag cancelled for deleted task");
        }
        if runtime.editing.as_ref() == Some(id) {
            runtime.editing = None;
        }
        runtime.error = None;
        tracing::info!(task_id = %id, "task deleted");
        Ok(true)
    }

    pub fn begin_edit(&self, id: &TaskId) -> Result<bool, InfraError> {
        let mut runtime = self.lock_runtime()?;
        if runtime.state.locate(id).is_none() {
            return Ok(false);
        }
        runtime.editing = Some(id.clone());
        Ok(true)
    }

    pub fn cancel_edit(&self) -> Result<(), InfraError> {
        self.lock_runtime()?.editing = None;
        Ok(())
    }

    pub fn reorder(&self, source: &TaskId, target: &TaskId) -> Result<Option<ReorderChange>, InfraError> {
        let mut runtime = self.lock_runtime()?;
        let change = runtime.state.reorder(source, target);
        match &change {
            Some(change) => tracing::debug!(
                source_id = %source,
                target_id = %target,
                cross_group = change.is_cross_group(),
                "task reordered"
            ),
            None => tracing::debug!(source_id = %source, target_id = %target, "reorder ignored"),
        }
        Ok(change)
    }

    pub async fn save_order(&self, change: &ReorderChange) -> Result<(), InfraError> {
        if !self.persist_reorder {
            return Ok(());
        }

        let containers = {
            let runtime = self.lock_runtime()?;
            let mut containers = vec![runtime.state.container_ids(change.origin)];
            if change.is_cross_group() {
                containers.push(runtime.state.container_ids(change.destination));
            }
            containers
        };

        for ids in containers.iter().filter(|ids| !ids.is_empty()) {
            if let Err(error) = self.store.persist_order(ids).await {
                self.record_error(ErrorKind::Reorder, &error);
                return Err(error);
            }
        }
        tracing::info!(containers = containers.len(), "task order saved");
        Ok(())
    }

    pub async fn drop_on_hovered(&self) -> Result<Option<ReorderChange>, InfraError> {
        let pair = self.lock_runtime()?.drag.drop_on_target();
        match pair {
            Some((source, target)) => self.on_drop(&source, &target).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<S, C> DragHandler for TaskViewModel<S, C>
where
    S: TaskStore,
    C: DeleteConfirmation,
{
    fn on_drag_start(&self, source: &TaskId) -> Result<bool, InfraError> {
        let mut runtime = self.lock_runtime()?;
        if runtime.state.locate(source).is_none() {
            return Ok(false);
        }
        runtime.drag.start(source.clone());
        tracing::debug!(source_id = %source, "drag started");
        Ok(true)
    }

    fn on_drag_enter(&self, target: &TaskId) -> Result<bool, InfraError> {
        let mut runtime = self.lock_runtime()?;
        if runtime.state.locate(target).is_none() {
            return Ok(false);
        }
        let entered = runtime.drag.enter(target.clone());
        tracing::debug!(target_id = %target, phase = ?runtime.drag.phase(), "drag entered target");
        Ok(entered)
    }

    fn on_drag_leave(&self, pointer: Point, bounds: Rect) -> Result<bool, InfraError> {
        Ok(self.lock_runtime()?.drag.leave(pointer, bounds))
    }

    fn on_drag_end(&self) -> Result<(), InfraError> {
        let mut runtime = self.lock_runtime()?;
        if !runtime.drag.is_idle() {
            tracing::debug!(source = ?runtime.drag.source(), "drag cancelled");
            runtime.drag.cancel();
        }
        Ok(())
    }

    async fn on_drop(
        &self,
        source: &TaskId,
        target: &TaskId,
    ) -> Result<Option<ReorderChange>, InfraError> {
        self.lock_runtime()?.drag.cancel();
        let Some(change) = self.reorder(source, target)? else {
            return Ok(None);
        };
        self.save_order(&change).await?;
        Ok(Some(change))
    }
}

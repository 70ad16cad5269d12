use crate::application::view_model::DeleteConfirmation;
use crate::domain::models::{DateGroup, NewTask, RangeUnit, Task, TaskId};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::task_store::{HealthStatus, TaskListing, TaskStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) struct FakeTaskStore {
    pub calls: AtomicUsize,
    flat: Mutex<Vec<Task>>,
    groups: Mutex<Vec<DateGroup>>,
    orders: Mutex<Vec<Vec<TaskId>>>,
    last_query: Mutex<Option<(RangeUnit, NaiveDate)>>,
    list_delay: Mutex<Option<Duration>>,
    fail_next: AtomicBool,
    next_id: AtomicI64,
    clock: AtomicI64,
}

impl Default for FakeTaskStore {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            flat: Mutex::new(Vec::new()),
            groups: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            last_query: Mutex::new(None),
            list_delay: Mutex::new(None),
            fail_next: AtomicBool::new(false),
            next_id: AtomicI64::new(100),
            clock: AtomicI64::new(0),
        }
    }
}

impl FakeTaskStore {
    pub fn with_flat(tasks: Vec<Task>) -> Self {
        let store = Self::default();
        store.set_flat(tasks);
        store
    }

    pub fn set_flat(&self, tasks: Vec<Task>) {
        *self.flat.lock().expect("flat lock") = tasks;
    }

    pub fn set_groups(&self, groups: Vec<DateGroup>) {
        *self.groups.lock().expect("groups lock") = groups;
    }

    pub fn fail_next_request(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn delay_next_list(&self, delay: Duration) {
        *self.list_delay.lock().expect("delay lock") = Some(delay);
    }

    pub fn last_query(&self) -> Option<(RangeUnit, NaiveDate)> {
        *self.last_query.lock().expect("query lock")
    }

    pub fn persisted_orders(&self) -> Vec<Vec<TaskId>> {
        self.orders.lock().expect("orders lock").clone()
    }

    pub fn stored(&self, id: &TaskId) -> Option<Task> {
        let flat = self.flat.lock().expect("flat lock");
        let groups = self.groups.lock().expect("groups lock");
        flat.iter()
            .chain(groups.iter().flat_map(|group| group.tasks.iter()))
            .find(|task| &task.id == id)
            .cloned()
    }

    fn begin_request(&self) -> Result<(), InfraError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(InfraError::Network("connection refused".to_string()));
        }
        Ok(())
    }

    fn tick(&self) -> DateTime<Utc> {
        let step = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        fixed_now() + ChronoDuration::seconds(step)
    }

    fn not_found(id: &TaskId) -> InfraError {
        InfraError::Http {
            status: 404,
            message: format!("todo {id} not found"),
        }
    }
}

fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-18T12:00:00Z")
        .expect("valid datetime")
        .with_timezone(&Utc)
}

#[async_trait]
impl TaskStore for FakeTaskStore {
    async fn list_all(&self) -> Result<Vec<Task>, InfraError> {
        self.begin_request()?;
        Ok(self.flat.lock().expect("flat lock").clone())
    }

    async fn list_by_date(
        &self,
        range: RangeUnit,
        date: NaiveDate,
    ) -> Result<TaskListing, InfraError> {
        self.begin_request()?;
        *self.last_query.lock().expect("query lock") = Some((range, date));
        let delay = self.list_delay.lock().expect("delay lock").take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if range.is_grouped() {
            Ok(TaskListing::Grouped(self.groups.lock().expect("groups lock").clone()))
        } else {
            Ok(TaskListing::Flat(self.flat.lock().expect("flat lock").clone()))
        }
    }

    async fn create(&self, task: &NewTask) -> Result<Task, InfraError> {
        self.begin_request()?;
        let now = self.tick();
        let created = Task {
            id: TaskId::from(self.next_id.fetch_add(1, Ordering::SeqCst)),
            title: task.title.clone(),
            description: (!task.description.is_empty()).then(|| task.description.clone()),
            completed: task.completed,
            created_at: now,
            updated_at: now,
        };
        self.flat.lock().expect("flat lock").insert(0, created.clone());
        Ok(created)
    }

    async fn update(&self, task: &Task) -> Result<Task, InfraError> {
        self.begin_request()?;
        let updated = Task {
            updated_at: self.tick(),
            ..task.clone()
        };
        let mut flat = self.flat.lock().expect("flat lock");
        let mut groups = self.groups.lock().expect("groups lock");
        let slot = flat
            .iter_mut()
            .chain(groups.iter_mut().flat_map(|group| group.tasks.iter_mut()))
            .find(|stored| stored.id == task.id)
            .ok_or_else(|| Self::not_found(&task.id))?;
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: &TaskId) -> Result<(), InfraError> {
        self.begin_request()?;
        let mut flat = self.flat.lock().expect("flat lock");
        if let Some(index) = flat.iter().position(|task| &task.id == id) {
            flat.remove(index);
            return Ok(());
        }
        let mut groups = self.groups.lock().expect("groups lock");
        for group in groups.iter_mut() {
            if let Some(index) = group.tasks.iter().position(|task| &task.id == id) {
                group.tasks.remove(index);
                return Ok(());
            }
        }
        Err(Self::not_found(id))
    }

    async fn persist_order(&self, ids: &[TaskId]) -> Result<(), InfraError> {
        self.begin_request()?;
        self.orders.lock().expect("orders lock").push(ids.to_vec());
        Ok(())
    }

    async fn health(&self) -> Result<HealthStatus, InfraError> {
        self.begin_request()?;
        Ok(HealthStatus {
            status: "healthy".to_string(),
            time: Some(fixed_now().to_rfc3339()),
        })
    }
}

pub(crate) struct ScriptedConfirmation {
    reply: bool,
}

impl ScriptedConfirmation {
    pub fn always(reply: bool) -> Self {
        Self { reply }
    }
}

impl DeleteConfirmation for ScriptedConfirmation {
    fn confirm_delete(&self, _id: &TaskId, _cached: Option<&Task>) -> bool {
        self.reply
    }
}

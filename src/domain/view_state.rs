use crate::domain::models::{DateGroup, RangeUnit, Task, TaskId};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "mode", content = "items", rename_all = "snake_case")]
pub enum ViewState {
    Flat(Vec<Task>),
    Grouped(Vec<DateGroup>),
}

impl Default for ViewState {
    fn default() -> Self {
        Self::Flat(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLocation {
    pub group: Option<usize>,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderChange {
    pub origin: Option<usize>,
    pub destination: Option<usize>,
}

impl ReorderChange {
    pub fn is_cross_group(&self) -> bool {
        self.origin != self.destination
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CompletionSummary {
    pub completed: usize,
    pub total: usize,
}

impl ViewState {
    pub fn empty_for(range: RangeUnit) -> Self {
        if range.is_grouped() {
            Self::Grouped(Vec::new())
        } else {
            Self::Flat(Vec::new())
        }
    }

    pub fn grouped(mut groups: Vec<DateGroup>) -> Self {
        groups.retain(|group| !group.tasks.is_empty());
        groups.sort_by(|left, right| right.date.cmp(&left.date));
        Self::Grouped(groups)
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, Self::Grouped(_))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.tasks().count()
    }

    pub fn tasks(&self) -> Box<dyn Iterator<Item = &Task> + '_> {
        match self {
            Self::Flat(tasks) => Box::new(tasks.iter()),
            Self::Grouped(groups) => Box::new(groups.iter().flat_map(|group| group.tasks.iter())),
        }
    }

    pub fn locate(&self, id: &TaskId) -> Option<TaskLocation> {
        match self {
            Self::Flat(tasks) => tasks
                .iter()
                .position(|task| &task.id == id)
                .map(|index| TaskLocation { group: None, index }),
            Self::Grouped(groups) => groups.iter().enumerate().find_map(|(group_index, group)| {
                group
                    .tasks
                    .iter()
                    .position(|task| &task.id == id)
                    .map(|index| TaskLocation {
                        group: Some(group_index),
                        index,
                    })
            }),
        }
    }

    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        let location = self.locate(id)?;
        self.container(location.group)
            .and_then(|tasks| tasks.get(location.index))
    }

    pub fn container_ids(&self, group: Option<usize>) -> Vec<TaskId> {
        self.container(group)
            .map(|tasks| tasks.iter().map(|task| task.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn replace(&mut self, task: Task) -> bool {
        let Some(location) = self.locate(&task.id) else {
            return false;
        };
        match self.container_mut(location.group) {
            Some(tasks) => {
                tasks[location.index] = task;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let location = self.locate(id)?;
        match self {
            Self::Flat(tasks) => Some(tasks.remove(location.index)),
            Self::Grouped(groups) => {
                let group_index = location.group?;
                let removed = groups[group_index].tasks.remove(location.index);
                if groups[group_index].tasks.is_empty() {
                    groups.remove(group_index);
                }
                Some(removed)
            }
        }
    }

    pub fn insert_head(&mut self, task: Task, today: NaiveDate) {
        match self {
            Self::Flat(tasks) => tasks.insert(0, task),
            Self::Grouped(groups) => {
                match groups.iter_mut().find(|group| group.date == today) {
                    Some(group) => group.tasks.insert(0, task),
                    None => groups.insert(0, DateGroup::new(today, vec![task])),
                }
            }
        }
    }

    /// Moves `source` to the slot `target` occupied before the move.
    ///
    /// Within one container the source is removed first and reinserted at the
    /// target's original index. Across groups the source is inserted into the
    /// target's group at the target's index. Groups emptied by a move are kept.
    /// Returns `None` when nothing moved.
    pub fn reorder(&mut self, source: &TaskId, target: &TaskId) -> Option<ReorderChange> {
        if source == target {
            return None;
        }
        let from = self.locate(source)?;
        let to = self.locate(target)?;

        let moved = self.container_mut(from.group)?.remove(from.index);
        let destination = self.container_mut(to.group)?;
        let index = to.index.min(destination.len());
        destination.insert(index, moved);

        Some(ReorderChange {
            origin: from.group,
            destination: to.group,
        })
    }

    pub fn summary(&self) -> CompletionSummary {
        self.tasks().fold(CompletionSummary::default(), |mut summary, task| {
            summary.total += 1;
            if task.completed {
                summary.completed += 1;
            }
            summary
        })
    }

    fn container(&self, group: Option<usize>) -> Option<&Vec<Task>> {
        match (self, group) {
            (Self::Flat(tasks), None) => Some(tasks),
            (Self::Grouped(groups), Some(index)) => groups.get(index).map(|group| &group.tasks),
            _ => None,
        }
    }

    fn container_mut(&mut self, group: Option<usize>) -> Option<&mut Vec<Task>> {
        match (self, group) {
            (Self::Flat(tasks), None) => Some(tasks),
            (Self::Grouped(groups), Some(index)) => {
                groups.get_mut(index).map(|group| &mut group.tasks)
            }
            _ => None,
        }
    }
}

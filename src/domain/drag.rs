use crate::domain::models::TaskId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging {
        source: TaskId,
    },
    Hovering {
        source: TaskId,
        target: TaskId,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragContext {
    phase: DragPhase,
}

impl DragContext {
    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn source(&self) -> Option<&TaskId> {
        match &self.phase {
            DragPhase::Idle => None,
            DragPhase::Dragging { source } | DragPhase::Hovering { source, .. } => Some(source),
        }
    }

    pub fn target(&self) -> Option<&TaskId> {
        match &self.phase {
            DragPhase::Hovering { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn start(&mut self, source: TaskId) {
        self.phase = DragPhase::Dragging { source };
    }

    pub fn enter(&mut self, target: TaskId) -> bool {
        let Some(source) = self.source().cloned() else {
            return false;
        };
        if source == target {
            self.phase = DragPhase::Dragging { source };
            return false;
        }
        self.phase = DragPhase::Hovering { source, target };
        true
    }

    /// Drops the hover only once the pointer is outside the target bounds on
    /// some side; moving within the bounds (over child content) keeps it.
    pub fn leave(&mut self, pointer: Point, bounds: Rect) -> bool {
        let DragPhase::Hovering { source, .. } = &self.phase else {
            return false;
        };
        if bounds.contains(pointer) {
            return false;
        }
        self.phase = DragPhase::Dragging {
            source: source.clone(),
        };
        true
    }

    pub fn drop_on_target(&mut self) -> Option<(TaskId, TaskId)> {
        match std::mem::take(&mut self.phase) {
            DragPhase::Hovering { source, target } => Some((source, target)),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.phase = DragPhase::Idle;
    }

    pub fn forget(&mut self, id: &TaskId) -> bool {
        let involved = self.source() == Some(id) || self.target() == Some(id);
        if involved {
            self.phase = DragPhase::Idle;
        }
        involved
    }

    pub fn is_idle(&self) -> bool {
        self.phase == DragPhase::Idle
    }
}

//! Drag gesture state machine.
//!
//! ```text
//! Idle --start--> Dragging(task) --over--> Hovering(task, target) --end--> Idle
//!                                   ^----------over-----------'
//! ```
//!
//! The machine is pure: events return the intent the store should submit.
//! Quadrant moves are issued while hovering, so abandoning a gesture keeps
//! the moves already made.

use crate::task::{Quadrant, TaskId};

/// What the pointer is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// A quadrant container.
    Quadrant(Quadrant),
    /// Another task card.
    Task(TaskId),
}

/// Gesture state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A task has been picked up.
    Dragging {
        /// The dragged task.
        task: TaskId,
    },
    /// The dragged task is over a target.
    Hovering {
        /// The dragged task.
        task: TaskId,
        /// The current target.
        target: DropTarget,
    },
}

/// A mutation requested by the gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragIntent {
    /// Reassign the dragged task to `to`.
    Move {
        /// Dragged task.
        task: TaskId,
        /// Destination quadrant.
        to: Quadrant,
    },
    /// Place the dragged task next to `reference` within its quadrant.
    Reorder {
        /// Dragged task.
        task: TaskId,
        /// Task it was dropped on.
        reference: TaskId,
    },
}

/// One drag gesture at a time.
#[derive(Debug, Default)]
pub struct DragEngine {
    state: DragState,
    provisional: Option<Quadrant>,
}

impl DragEngine {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Quadrant the dragged task was last sent to during this gesture.
    /// Display only; hover decisions use the confirmed quadrant.
    #[must_use]
    pub fn provisional_quadrant(&self) -> Option<Quadrant> {
        self.provisional
    }

    fn dragged(&self) -> Option<&TaskId> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging { task } | DragState::Hovering { task, .. } => Some(task),
        }
    }

    /// Picks `task` up. Any gesture in progress is discarded.
    pub fn start(&mut self, task: TaskId) {
        self.state = DragState::Dragging { task };
        self.provisional = None;
    }

    /// The pointer moved over `target`.
    ///
    /// `quadrant_of` resolves a task's confirmed quadrant. Returns a move
    /// whenever the target's quadrant differs from the dragged task's
    /// confirmed one, so a failed move is retried on the next hover.
    pub fn over(
        &mut self,
        target: DropTarget,
        quadrant_of: impl Fn(&TaskId) -> Option<Quadrant>,
    ) -> Option<DragIntent> {
        let task = self.dragged()?.clone();
        let current = quadrant_of(&task);
        let destination = match &target {
            DropTarget::Quadrant(quadrant) => Some(*quadrant),
            DropTarget::Task(other) => quadrant_of(other),
        };
        self.state = DragState::Hovering { task: task.clone(), target };

        let (Some(current), Some(to)) = (current, destination) else {
            return None;
        };
        if current == to {
            return None;
        }
        self.provisional = Some(to);
        Some(DragIntent::Move { task, to })
    }

    /// The gesture ended over `target`, or outside any target.
    ///
    /// Dropping on a task asks for a reorder. Dropping on a quadrant or
    /// nowhere issues nothing further.
    pub fn end(&mut self, target: Option<DropTarget>) -> Option<DragIntent> {
        let task = self.dragged().cloned();
        self.state = DragState::Idle;
        self.provisional = None;
        match (task, target) {
            (Some(task), Some(DropTarget::Task(reference))) => {
                Some(DragIntent::Reorder { task, reference })
            }
            _ => None,
        }
    }

    /// Abandons the gesture without a drop.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
        self.provisional = None;
    }
}

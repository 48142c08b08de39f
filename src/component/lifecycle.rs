//! Component lifecycle: state machine and attachment tracking.
//!
//! The `AttachmentTracker` records which components were last reported as
//! attached and accumulates transitions (`Inserted`, `Removed`) that the
//! runtime drains to fire `on_insert` / `on_remove` exactly once each.

use std::collections::HashSet;

use super::ComponentId;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Coarse state of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Setup, first render and `init` are running.
    Constructing,
    /// Fully constructed and accepting calls.
    Initialized,
    /// `destroy` is running; no further mutation is accepted.
    Destroying,
    /// The record is gone. Reported for stale handles.
    Destroyed,
}

impl Lifecycle {
    /// Whether lifecycle and event methods may still be called.
    pub fn is_alive(self) -> bool {
        matches!(self, Self::Constructing | Self::Initialized)
    }
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Attachment transitions awaiting their hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The component's element became connected.
    Inserted { component: ComponentId },
    /// The component's element was disconnected.
    Removed { component: ComponentId },
}

// ---------------------------------------------------------------------------
// AttachmentTracker
// ---------------------------------------------------------------------------

/// Tracks last-reported attachment per component and queues transitions.
#[derive(Debug, Default)]
pub struct AttachmentTracker {
    attached: HashSet<ComponentId>,
    pending: Vec<LifecycleEvent>,
}

impl AttachmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the current connectedness of `id`.
    ///
    /// Queues an event only when it differs from the last report.
    pub fn observe(&mut self, id: ComponentId, connected: bool) {
        if connected {
            if self.attached.insert(id) {
                self.pending.push(LifecycleEvent::Inserted { component: id });
            }
        } else if self.attached.remove(&id) {
            self.pending.push(LifecycleEvent::Removed { component: id });
        }
    }

    /// Whether `on_insert` fired last for `id`.
    pub fn is_attached(&self, id: ComponentId) -> bool {
        self.attached.contains(&id)
    }

    /// Forget a component without queuing anything (used on destroy).
    pub fn forget(&mut self, id: ComponentId) {
        self.attached.remove(&id);
        self.pending.retain(|event| match *event {
            LifecycleEvent::Inserted { component } | LifecycleEvent::Removed { component } => {
                component != id
            }
        });
    }

    /// Drain all pending transitions in order of occurrence.
    pub fn drain(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.attached.clear();
        self.pending.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

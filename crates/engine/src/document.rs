//! Document: the live model plus change notifications.
//!
//! Hosts drive a `Document` instead of a bare `DatabaseModel`:
//! - `dispatch` applies a local edit, bumps the revision and asks the host to save
//! - `replace` installs a model pushed from outside (e.g. the file changed on disk).
//!   It notifies listeners but does NOT request a save, so a reload is never echoed
//!   back to disk as if it were a new edit.
//!
//! The document also tracks which view is active and keeps that index valid as
//! views are added and deleted.

use crate::action::Action;
use crate::model::DatabaseModel;
use crate::projection::{project_view, Projection};

/// Where a model change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// An action dispatched through this document
    Local,
    /// A full replacement pushed by the host
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    /// The model changed. Emitted once per dispatch or replace.
    ModelChanged { revision: u64, origin: ChangeOrigin },
    /// The host should persist the model. Only follows local changes.
    SaveRequested { revision: u64 },
    /// The active view index moved
    ActiveViewChanged { view: usize },
}

/// Callback type for receiving document events.
pub type EventCallback = Box<dyn FnMut(&DocumentEvent) + Send>;

pub struct Document {
    model: DatabaseModel,
    revision: u64,
    saved_revision: u64,
    active_view: usize,
    listeners: Vec<EventCallback>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DatabaseModel::new())
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("revision", &self.revision)
            .field("saved_revision", &self.saved_revision)
            .field("active_view", &self.active_view)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Document {
    pub fn new(model: DatabaseModel) -> Self {
        Self { model, revision: 0, saved_revision: 0, active_view: 0, listeners: Vec::new() }
    }

    pub fn model(&self) -> &DatabaseModel {
        &self.model
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn active_view(&self) -> usize {
        self.active_view
    }

    /// Unsaved local edits exist
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn subscribe(&mut self, callback: EventCallback) {
        self.listeners.push(callback);
    }

    /// The host finished persisting the current revision
    pub fn mark_saved(&mut self) {
        self.saved_revision = self.revision;
    }

    /// Apply a locally-originated edit
    pub fn dispatch(&mut self, action: Action) {
        let before_views = self.model.views().len();
        let deleted_view = match &action {
            Action::DeleteView { view } => Some(*view),
            _ => None,
        };

        self.model.apply_mut(action);
        self.revision += 1;

        let after_views = self.model.views().len();
        if after_views > before_views {
            // A new view becomes the active one
            self.set_active_view_inner(after_views - 1);
        } else if after_views < before_views {
            if let Some(deleted) = deleted_view {
                if deleted < self.active_view || self.active_view >= after_views {
                    self.set_active_view_inner(self.active_view.saturating_sub(1).min(after_views - 1));
                }
            }
        }

        let revision = self.revision;
        self.emit(DocumentEvent::ModelChanged { revision, origin: ChangeOrigin::Local });
        self.emit(DocumentEvent::SaveRequested { revision });
    }

    /// Apply several edits in order, each observing the previous result
    pub fn dispatch_all<I: IntoIterator<Item = Action>>(&mut self, actions: I) {
        for action in actions {
            self.dispatch(action);
        }
    }

    /// Install a model pushed from outside. Counts as saved: nothing is echoed back.
    pub fn replace(&mut self, model: DatabaseModel) {
        self.model = model;
        self.revision += 1;
        self.saved_revision = self.revision;
        if self.active_view >= self.model.views().len() {
            self.set_active_view_inner(0);
        }
        let revision = self.revision;
        self.emit(DocumentEvent::ModelChanged { revision, origin: ChangeOrigin::External });
    }

    /// Switch the active view. Out-of-range indices are ignored.
    pub fn set_active_view(&mut self, view: usize) {
        if view >= self.model.views().len() {
            log::warn!("set_active_view: view {view} out of range");
            return;
        }
        if view != self.active_view {
            self.set_active_view_inner(view);
        }
    }

    /// Projection of the active view
    pub fn projection(&self) -> Projection<'_> {
        project_view(&self.model, self.active_view)
    }

    fn set_active_view_inner(&mut self, view: usize) {
        self.active_view = view;
        self.emit(DocumentEvent::ActiveViewChanged { view });
    }

    fn emit(&mut self, event: DocumentEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

/// Simple event collector for testing.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<DocumentEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: DocumentEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[DocumentEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Revisions for which a save was requested
    pub fn save_requests(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DocumentEvent::SaveRequested { revision } => Some(*revision),
                _ => None,
            })
            .collect()
    }

    /// Origins of every model change, in order
    pub fn changes(&self) -> Vec<ChangeOrigin> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DocumentEvent::ModelChanged { origin, .. } => Some(*origin),
                _ => None,
            })
            .collect()
    }
}

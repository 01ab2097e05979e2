//! Undo log for scene mutations.
//!
//! Every structural mutation pushes one [`HistoryEntry`]; deletion entries
//! own the removed object so undo can put it back. Parameter edits coalesce:
//! consecutive edits of the same parameter on the same element keep only the
//! oldest previous value, so a slider drag undoes in one step.

use serde_json::Value;

use crate::element::{Element, ElementId};
use crate::ray::{Ray, RayId};

/// One recorded mutation, stored in inverse-ready form.
#[derive(Debug)]
pub enum HistoryEntry {
    ElementAdded(ElementId),
    ElementDeleted { id: ElementId, element: Element },
    RayAdded(RayId),
    RayDeleted { id: RayId, ray: Ray },
    ParamChanged {
        element: ElementId,
        param: String,
        previous: Value,
    },
}

/// A linear undo log. No redo stack: undoing a mutation simply removes it.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation. A [`HistoryEntry::ParamChanged`] whose element and
    /// parameter match the newest entry is dropped, keeping the older
    /// previous value.
    pub fn push(&mut self, entry: HistoryEntry) {
        if let HistoryEntry::ParamChanged { element, param, .. } = &entry {
            if let Some(HistoryEntry::ParamChanged {
                element: tail_element,
                param: tail_param,
                ..
            }) = self.entries.last()
            {
                if tail_element == element && tail_param == param {
                    return;
                }
            }
        }
        self.entries.push(entry);
    }

    /// Remove and return the newest entry.
    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop()
    }

    /// If the newest entry is a parameter edit of the same element and
    /// parameter, remove it too. Undoing a coalesced edit must not leave a
    /// stale duplicate behind.
    pub fn pop_matching_param(&mut self, element: ElementId, param: &str) {
        if let Some(HistoryEntry::ParamChanged {
            element: tail_element,
            param: tail_param,
            ..
        }) = self.entries.last()
        {
            if *tail_element == element && tail_param == param {
                self.entries.pop();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

use crate::FileId;
use crate::error::ActionError;

/// Single-slot reference to the file open in the detail view.
///
/// Selecting replaces any previous selection; there is never more than one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionCursor {
    current: Option<FileId>,
}

impl SelectionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, id: FileId) {
        self.current = Some(id);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<FileId> {
        self.current
    }

    pub fn is_selected(&self, id: FileId) -> bool {
        self.current == Some(id)
    }

    /// The selected id, or [`ActionError::NoSelection`] for actions that need one.
    pub fn require(&self) -> Result<FileId, ActionError> {
        self.current.ok_or(ActionError::NoSelection)
    }
}

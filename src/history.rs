// syn.txt -- a text based synthesizer and audio workstation
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Linear undo/redo log of note edits.

use crate::pianoroll::Change;

/// Records committed changes of a song and remembers which of them were saved.
#[derive(Debug, Clone)]
pub struct CommandHistory {
    actions: Vec<Change>,
    /// Number of actions currently applied.
    cursor: usize,
    /// The cursor at the time of the last save, `None` if that state can't be reached anymore.
    saved: Option<usize>,
}

impl CommandHistory {
    pub fn new() -> Self {
        CommandHistory {
            actions: Vec::new(),
            cursor: 0,
            saved: Some(0),
        }
    }

    /// Log a change, discarding everything that could have been redone.
    pub fn record(&mut self, change: Change) {
        self.actions.truncate(self.cursor);
        if self.saved.map_or(false, |saved| saved > self.cursor) {
            self.saved = None;
        }
        self.actions.push(change);
        self.cursor += 1;
    }

    /// Step back, returning the change to revert.
    pub fn undo(&mut self) -> Option<&Change> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.actions[self.cursor])
    }

    /// Step forward, returning the change to apply again.
    pub fn redo(&mut self) -> Option<&Change> {
        let change = self.actions.get(self.cursor)?;
        self.cursor += 1;
        Some(change)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.actions.len()
    }

    /// Forget all actions and treat the current state as saved, e.g. after loading.
    pub fn clear_actions(&mut self) {
        self.actions.clear();
        self.cursor = 0;
        self.saved = Some(0);
    }

    pub fn mark_saved(&mut self) {
        self.saved = Some(self.cursor);
    }

    /// Whether there are changes since the last save.
    pub fn is_dirty(&self) -> bool {
        self.saved != Some(self.cursor)
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn change() -> Change {
        Change::default()
    }

    #[test]
    fn dirty_tracking() {
        let mut history = CommandHistory::new();
        assert!(!history.is_dirty());
        history.record(change());
        assert!(history.is_dirty());
        history.mark_saved();
        assert!(!history.is_dirty());
        history.record(change());
        assert!(history.is_dirty());
        assert!(history.undo().is_some());
        assert!(!history.is_dirty());
        assert!(history.redo().is_some());
        assert!(history.is_dirty());
    }

    #[test]
    fn saved_state_lost_by_branching() {
        let mut history = CommandHistory::new();
        history.record(change());
        history.record(change());
        history.mark_saved();
        history.undo();
        history.undo();
        history.record(change());
        assert!(history.is_dirty());
        history.undo();
        assert!(history.is_dirty());
        assert!(history.can_redo());
    }

    #[test]
    fn clear_actions() {
        let mut history = CommandHistory::new();
        history.record(change());
        history.clear_actions();
        assert!(!history.is_dirty());
        assert!(!history.can_undo());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }
}

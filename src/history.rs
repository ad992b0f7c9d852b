/// One undoable step: the state before the mutation, the state after, and a
/// short label for the action bar tooltip.
#[derive(Clone, Debug)]
pub struct Command<T> {
    pub before: T,
    pub after: T,
    pub label: &'static str,
}

/// Linear undo/redo stack over whole-state snapshots. The engine owns plain
/// snapshot values only, never live annotation handles, which is what lets
/// undo survive full scene rebuilds.
#[derive(Clone, Debug, Default)]
pub struct UndoEngine<T: Clone + PartialEq> {
    commands: Vec<Command<T>>,
    /// Number of commands currently applied; the next undo reverts
    /// `commands[cursor - 1]`.
    cursor: usize,
    pending: Option<(T, &'static str)>,
}

impl<T: Clone + PartialEq> UndoEngine<T> {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            cursor: 0,
            pending: None,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.commands.len()
    }

    pub fn undo_label(&self) -> Option<&'static str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.commands.get(i))
            .map(|c| c.label)
    }

    pub fn redo_label(&self) -> Option<&'static str> {
        self.commands.get(self.cursor).map(|c| c.label)
    }

    /// Appends a command, discarding any redo entries past the cursor.
    /// Identical before/after snapshots are dropped so aborted gestures do
    /// not pollute the stack.
    pub fn push(&mut self, before: T, after: T, label: &'static str) {
        if before == after {
            return;
        }
        self.commands.truncate(self.cursor);
        self.commands.push(Command {
            before,
            after,
            label,
        });
        self.cursor = self.commands.len();
    }

    /// Returns the snapshot to restore, or `None` at the bottom of the stack.
    pub fn undo(&mut self) -> Option<T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.commands[self.cursor].before.clone())
    }

    /// Returns the snapshot to restore, or `None` at the top of the stack.
    pub fn redo(&mut self) -> Option<T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.commands[self.cursor - 1].after.clone())
    }

    /// Starts an interactive capture: the mutation happens incrementally
    /// across many pointer events but should collapse into one undo step.
    /// A second begin before `end_snapshot` is ignored, keeping the original
    /// before-state.
    pub fn begin_snapshot(&mut self, label: &'static str, before: T) {
        if self.pending.is_none() {
            self.pending = Some((before, label));
        }
    }

    pub fn end_snapshot(&mut self, after: T) {
        if let Some((before, label)) = self.pending.take() {
            self.push(before, after, label);
        }
    }

    pub fn cancel_snapshot(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::UndoEngine;

    #[test]
    fn undo_redo_are_inverses() {
        let mut engine: UndoEngine<Vec<u32>> = UndoEngine::new();
        engine.push(vec![], vec![1], "a");
        engine.push(vec![1], vec![1, 2], "b");
        engine.push(vec![1, 2], vec![1, 2, 3], "c");

        assert_eq!(engine.undo(), Some(vec![1, 2]));
        assert_eq!(engine.undo(), Some(vec![1]));
        assert_eq!(engine.undo(), Some(vec![]));
        assert_eq!(engine.undo(), None);

        assert_eq!(engine.redo(), Some(vec![1]));
        assert_eq!(engine.redo(), Some(vec![1, 2]));
        assert_eq!(engine.redo(), Some(vec![1, 2, 3]));
        assert_eq!(engine.redo(), None);
    }

    #[test]
    fn push_truncates_redo_entries() {
        let mut engine: UndoEngine<u32> = UndoEngine::new();
        engine.push(0, 1, "a");
        engine.push(1, 2, "b");
        engine.undo();
        engine.push(1, 9, "c");

        assert!(!engine.can_redo());
        assert_eq!(engine.undo(), Some(1));
        assert_eq!(engine.redo(), Some(9));
    }

    #[test]
    fn unchanged_state_records_nothing() {
        let mut engine: UndoEngine<u32> = UndoEngine::new();
        engine.push(5, 5, "noop");
        assert!(!engine.can_undo());
    }

    #[test]
    fn drag_capture_collapses_to_one_step() {
        let mut engine: UndoEngine<u32> = UndoEngine::new();
        engine.begin_snapshot("drag", 0);
        // Intermediate states never reach the engine.
        engine.begin_snapshot("drag", 3);
        engine.end_snapshot(7);

        assert_eq!(engine.undo_label(), Some("drag"));
        assert_eq!(engine.undo(), Some(0));
        assert_eq!(engine.redo(), Some(7));
    }

    #[test]
    fn cancelled_capture_records_nothing() {
        let mut engine: UndoEngine<u32> = UndoEngine::new();
        engine.begin_snapshot("drag", 0);
        engine.cancel_snapshot();
        engine.end_snapshot(7);
        assert!(!engine.can_undo());
    }

    #[test]
    fn labels_track_the_cursor() {
        let mut engine: UndoEngine<u32> = UndoEngine::new();
        engine.push(0, 1, "first");
        engine.push(1, 2, "second");
        assert_eq!(engine.undo_label(), Some("second"));
        engine.undo();
        assert_eq!(engine.undo_label(), Some("first"));
        assert_eq!(engine.redo_label(), Some("second"));
    }
}

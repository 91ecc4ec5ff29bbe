//! State store of one editor session.
//!
//! The store owns the ordered code lines and the selection cursor. State
//! is only ever changed by whole-value replacement through
//! [`StateStore::set_state`]; every line sequence is an immutable value
//! whose untouched lines are shared with the sequence it was derived
//! from, so history snapshots cost one reference count each.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::syntax::CodeLine;
use crate::BlockError;

// ── Line sequence ───────────────────────────────────────────────────

/// Immutable, cheaply clonable ordered list of code lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSequence(Arc<Vec<Arc<CodeLine>>>);

impl LineSequence {
  pub fn new(lines: Vec<CodeLine>) -> Self {
    Self(Arc::new(lines.into_iter().map(Arc::new).collect()))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&CodeLine> {
    self.0.get(index).map(|line| line.as_ref())
  }

  pub fn iter(&self) -> impl Iterator<Item = &CodeLine> + '_ {
    self.0.iter().map(|line| line.as_ref())
  }

  pub fn to_vec(&self) -> Vec<CodeLine> {
    self.iter().cloned().collect()
  }

  /// Checks that `index` names an existing line.
  pub fn check(&self, index: usize) -> Result<&CodeLine, BlockError> {
    self.get(index).ok_or(BlockError::LineOutOfRange {
      index,
      len: self.len(),
    })
  }

  /// New sequence with `line` inserted at `index` (`index == len` appends).
  pub fn inserted(
    &self,
    index: usize,
    line: CodeLine,
  ) -> Result<Self, BlockError> {
    if index > self.len() {
      return Err(BlockError::LineOutOfRange {
        index,
        len: self.len(),
      });
    }
    let mut lines = self.0.as_ref().clone();
    lines.insert(index, Arc::new(line));
    Ok(Self(Arc::new(lines)))
  }

  pub fn removed(&self, index: usize) -> Result<Self, BlockError> {
    self.check(index)?;
    let mut lines = self.0.as_ref().clone();
    lines.remove(index);
    Ok(Self(Arc::new(lines)))
  }

  pub fn replaced(
    &self,
    index: usize,
    line: CodeLine,
  ) -> Result<Self, BlockError> {
    self.check(index)?;
    let mut lines = self.0.as_ref().clone();
    lines[index] = Arc::new(line);
    Ok(Self(Arc::new(lines)))
  }

  pub fn swapped(&self, a: usize, b: usize) -> Result<Self, BlockError> {
    self.check(a)?;
    self.check(b)?;
    let mut lines = self.0.as_ref().clone();
    lines.swap(a, b);
    Ok(Self(Arc::new(lines)))
  }

  /// Whether both sequences hold the very same allocation for line
  /// `index` (as opposed to an equal copy).
  pub fn shares_line(&self, other: &LineSequence, index: usize) -> bool {
    match (self.0.get(index), other.0.get(index)) {
      (Some(a), Some(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl From<Vec<CodeLine>> for LineSequence {
  fn from(lines: Vec<CodeLine>) -> Self {
    Self::new(lines)
  }
}

impl FromIterator<CodeLine> for LineSequence {
  fn from_iter<I: IntoIterator<Item = CodeLine>>(iter: I) -> Self {
    Self::new(iter.into_iter().collect())
  }
}

// ── Selection ───────────────────────────────────────────────────────

/// Which line (1-based) and which of its tokens the user has selected.
///
/// `current_line_number` is 0 only while the sequence is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCursor {
  pub current_line_number: usize,
  pub selected_token_index: Option<usize>,
}

impl Default for SelectionCursor {
  fn default() -> Self {
    Self {
      current_line_number: 1,
      selected_token_index: None,
    }
  }
}

impl SelectionCursor {
  pub fn at_line(line_number: usize) -> Self {
    Self {
      current_line_number: line_number,
      selected_token_index: None,
    }
  }

  /// Zero-based index of the selected line.
  pub fn line_index(&self) -> Option<usize> {
    self.current_line_number.checked_sub(1)
  }

  /// Cursor moved back inside a sequence of `len` lines.
  pub fn clamped(self, len: usize) -> Self {
    if len == 0 {
      return Self {
        current_line_number: 0,
        selected_token_index: None,
      };
    }
    let line = self.current_line_number.clamp(1, len);
    Self {
      current_line_number: line,
      selected_token_index: if line == self.current_line_number {
        self.selected_token_index
      } else {
        None
      },
    }
  }
}

// ── Store ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
  pub lines: LineSequence,
  pub cursor: SelectionCursor,
}

/// A partial update: only the keys that are `Some` are replaced.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
  pub lines: Option<LineSequence>,
  pub cursor: Option<SelectionCursor>,
}

impl StatePatch {
  pub fn lines(lines: LineSequence) -> Self {
    Self {
      lines: Some(lines),
      cursor: None,
    }
  }

  pub fn cursor(cursor: SelectionCursor) -> Self {
    Self {
      lines: None,
      cursor: Some(cursor),
    }
  }

  pub fn with_cursor(mut self, cursor: SelectionCursor) -> Self {
    self.cursor = Some(cursor);
    self
  }
}

/// Addressable pieces of the editor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey {
  Lines,
  Cursor,
  CurrentLineNumber,
  SelectedTokenIndex,
  LineCount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
  Lines(LineSequence),
  Cursor(SelectionCursor),
  Count(usize),
  Index(Option<usize>),
}

#[derive(Debug, Clone, Default)]
pub struct StateStore {
  state: EditorState,
  revision: u64,
}

impl StateStore {
  pub fn new(lines: LineSequence) -> Self {
    let cursor = SelectionCursor::default().clamped(lines.len());
    Self {
      state: EditorState { lines, cursor },
      revision: 0,
    }
  }

  /// Replaces exactly the keys present in `patch`, keeping the rest.
  pub fn set_state(&mut self, patch: StatePatch) {
    if let Some(lines) = patch.lines {
      trace!(len = lines.len(), "replacing line sequence");
      self.state.lines = lines;
    }
    if let Some(cursor) = patch.cursor {
      self.state.cursor = cursor;
    }
    self.revision += 1;
    debug!(revision = self.revision, "state updated");
  }

  pub fn get_state(&self, key: StateKey) -> StateValue {
    match key {
      StateKey::Lines => StateValue::Lines(self.state.lines.clone()),
      StateKey::Cursor => StateValue::Cursor(self.state.cursor),
      StateKey::CurrentLineNumber => {
        StateValue::Count(self.state.cursor.current_line_number)
      }
      StateKey::SelectedTokenIndex => {
        StateValue::Index(self.state.cursor.selected_token_index)
      }
      StateKey::LineCount => StateValue::Count(self.state.lines.len()),
    }
  }

  pub fn state(&self) -> &EditorState {
    &self.state
  }

  pub fn lines(&self) -> &LineSequence {
    &self.state.lines
  }

  pub fn cursor(&self) -> SelectionCursor {
    self.state.cursor
  }

  /// Incremented by every `set_state`.
  pub fn revision(&self) -> u64 {
    self.revision
  }
}

// ── History ─────────────────────────────────────────────────────────

pub const DEFAULT_HISTORY_DEPTH: usize = 64;

/// Snapshots of the line sequence taken before structural edits.
#[derive(Debug, Clone)]
pub struct EditorHistoryStack {
  snapshots: VecDeque<LineSequence>,
  max_depth: usize,
}

impl Default for EditorHistoryStack {
  fn default() -> Self {
    Self::with_depth(DEFAULT_HISTORY_DEPTH)
  }
}

impl EditorHistoryStack {
  pub fn with_depth(max_depth: usize) -> Self {
    Self {
      snapshots: VecDeque::new(),
      max_depth: max_depth.max(1),
    }
  }

  pub fn push(&mut self, snapshot: LineSequence) {
    if self.snapshots.len() == self.max_depth {
      self.snapshots.pop_front();
    }
    self.snapshots.push_back(snapshot);
  }

  pub fn pop(&mut self) -> Option<LineSequence> {
    self.snapshots.pop_back()
  }

  pub fn clear(&mut self) {
    self.snapshots.clear();
  }

  pub fn len(&self) -> usize {
    self.snapshots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.snapshots.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::{Payload, Token};

  fn sample() -> LineSequence {
    LineSequence::new(vec![
      CodeLine::new(Payload::Pass, 0),
      CodeLine::new(Payload::CustomTokenLine(vec![Token::variable("x")]), 1),
      CodeLine::blank(0),
    ])
  }

  #[test]
  fn set_state_keeps_absent_keys() {
    let mut store = StateStore::new(sample());
    store.set_state(StatePatch::cursor(SelectionCursor::at_line(3)));
    assert_eq!(store.lines().len(), 3);
    assert_eq!(store.cursor().current_line_number, 3);

    store.set_state(StatePatch::lines(LineSequence::default()));
    assert!(store.lines().is_empty());
    assert_eq!(store.cursor().current_line_number, 3);
    assert_eq!(store.revision(), 2);
  }

  #[test]
  fn get_state_by_key() {
    let store = StateStore::new(sample());
    assert_eq!(store.get_state(StateKey::LineCount), StateValue::Count(3));
    assert_eq!(
      store.get_state(StateKey::SelectedTokenIndex),
      StateValue::Index(None)
    );
  }

  #[test]
  fn edits_share_untouched_lines() {
    let before = sample();
    let after = before.replaced(1, CodeLine::new(Payload::Break, 1)).unwrap();
    assert!(before.shares_line(&after, 0));
    assert!(!before.shares_line(&after, 1));
    assert!(before.shares_line(&after, 2));
    assert_eq!(
      before.get(1).unwrap().kind(),
      crate::BlockKind::CustomTokenLine
    );
  }

  #[test]
  fn out_of_range_edits_are_errors() {
    let seq = sample();
    assert!(matches!(
      seq.removed(3),
      Err(BlockError::LineOutOfRange { index: 3, len: 3 })
    ));
    assert!(seq.inserted(3, CodeLine::blank(0)).is_ok());
    assert!(seq.inserted(4, CodeLine::blank(0)).is_err());
  }

  #[test]
  fn history_drops_oldest_beyond_depth() {
    let mut history = EditorHistoryStack::with_depth(2);
    history.push(LineSequence::default());
    history.push(sample());
    history.push(LineSequence::new(vec![CodeLine::blank(0)]));
    assert_eq!(history.len(), 2);
    assert_eq!(history.pop().unwrap().len(), 1);
    assert_eq!(history.pop().unwrap().len(), 3);
    assert!(history.pop().is_none());
  }

  #[test]
  fn cursor_clamps_into_sequence() {
    let cursor = SelectionCursor {
      current_line_number: 7,
      selected_token_index: Some(2),
    };
    assert_eq!(cursor.clamped(3), SelectionCursor::at_line(3));
    assert_eq!(cursor.clamped(0).current_line_number, 0);
    assert_eq!(
      SelectionCursor {
        current_line_number: 2,
        selected_token_index: Some(1)
      }
      .clamped(3)
      .selected_token_index,
      Some(1)
    );
  }
}

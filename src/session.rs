//! Editor session: every user action is a [`Message`] applied by
//! [`EditorSession::update`]. The session owns the state store, the undo
//! history and the open palette; drawing is left to [`crate::render`].

use tracing::{debug, info, warn};

use crate::codegen::{generate_with, CodegenOptions};
use crate::palette::{
  show_editor_for, Form, FormEdit, MakeTarget, MakeVariableForm, Palette,
  RangeParams,
};
use crate::render::{render_all, CodeView};
use crate::store::{
  EditorHistoryStack, LineSequence, SelectionCursor, StatePatch, StateStore,
  DEFAULT_HISTORY_DEPTH,
};
use crate::syntax::{
  BlockKind, CodeLine, Token, TokenType, MAX_INDENT_DEPTH,
};
use crate::BlockError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
  pub history_depth: usize,
  pub codegen: CodegenOptions,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      history_depth: DEFAULT_HISTORY_DEPTH,
      codegen: CodegenOptions::default(),
    }
  }
}

/// Line arguments are 0-based indices except for `SelectLine`, which
/// takes the 1-based number shown on the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
  // Structural edits
  InsertAfter(usize),
  Delete(usize),
  MoveUp(usize),
  MoveDown(usize),
  Indent(usize),
  Outdent(usize),

  // Selection
  SelectLine(usize),
  SelectToken(usize),

  // Palette
  OpenPalette(usize),
  ChooseKind(BlockKind),
  ChooseMakeVariable(MakeTarget),
  Edit(FormEdit),
  Confirm,
  Cancel,

  // History
  Back,
}

#[derive(Debug, Clone)]
pub struct EditorSession {
  store: StateStore,
  history: EditorHistoryStack,
  palette: Option<Palette>,
  config: SessionConfig,
}

impl Default for EditorSession {
  fn default() -> Self {
    Self::new(Vec::new(), SessionConfig::default())
  }
}

impl EditorSession {
  pub fn new(lines: Vec<CodeLine>, config: SessionConfig) -> Self {
    Self {
      store: StateStore::new(LineSequence::new(lines)),
      history: EditorHistoryStack::with_depth(config.history_depth),
      palette: None,
      config,
    }
  }

  pub fn store(&self) -> &StateStore {
    &self.store
  }

  pub fn lines(&self) -> &LineSequence {
    self.store.lines()
  }

  pub fn cursor(&self) -> SelectionCursor {
    self.store.cursor()
  }

  pub fn palette(&self) -> Option<&Palette> {
    self.palette.as_ref()
  }

  pub fn history_len(&self) -> usize {
    self.history.len()
  }

  pub fn view(&self) -> CodeView {
    render_all(self.store.state())
  }

  pub fn generate(&self) -> String {
    generate_with(&self.lines().to_vec(), &self.config.codegen)
  }

  /// Applies one user action. On error nothing has changed.
  pub fn update(&mut self, message: Message) -> Result<(), BlockError> {
    debug!(?message, "update");
    match message {
      Message::InsertAfter(index) => {
        let lines = self.lines().clone();
        let (at, depth) = if lines.is_empty() && index == 0 {
          (0, 0)
        } else {
          let line = lines.check(index)?;
          // A line after a block opener starts inside that block's body;
          // see decision 9 in DESIGN.md.
          let depth = if line.kind().opens_block() {
            line.shifted(1).indent_depth
          } else {
            line.indent_depth.min(MAX_INDENT_DEPTH)
          };
          (index + 1, depth)
        };
        let next = lines.inserted(at, CodeLine::blank(depth))?;
        self.commit(lines, next, SelectionCursor::at_line(at + 1));
      }

      Message::Delete(index) => {
        let lines = self.lines().clone();
        let next = lines.removed(index)?;
        let cursor = self.cursor().clamped(next.len());
        self.commit(lines, next, cursor);
      }

      Message::MoveUp(index) => {
        let lines = self.lines().clone();
        lines.check(index)?;
        if index > 0 {
          let next = lines.swapped(index, index - 1)?;
          self.commit(lines, next, SelectionCursor::at_line(index));
        }
      }

      Message::MoveDown(index) => {
        let lines = self.lines().clone();
        lines.check(index)?;
        if index + 1 < lines.len() {
          let next = lines.swapped(index, index + 1)?;
          self.commit(lines, next, SelectionCursor::at_line(index + 2));
        }
      }

      Message::Indent(index) => self.shift(index, 1)?,

      Message::Outdent(index) => self.shift(index, -1)?,

      Message::SelectLine(number) => {
        let len = self.lines().len();
        if number == 0 || number > len {
          return Err(BlockError::NoSuchLine { number, len });
        }
        self
          .store
          .set_state(StatePatch::cursor(SelectionCursor::at_line(number)));
      }

      Message::SelectToken(token) => {
        let cursor = self.cursor();
        let index = cursor.line_index().ok_or(BlockError::LineOutOfRange {
          index: 0,
          len: self.lines().len(),
        })?;
        let line = self.lines().check(index)?;
        let len = line
          .payload
          .tokens()
          .ok_or(BlockError::NoTokenList(line.kind()))?
          .len();
        if token >= len {
          return Err(BlockError::TokenOutOfRange { index: token, len });
        }
        if let Some(palette) =
          self.palette.as_mut().filter(|p| p.line_index == index)
        {
          if palette.form.token_editor().is_some() {
            palette.form.apply(FormEdit::SelectToken(token))?;
          }
        }
        self.store.set_state(StatePatch::cursor(SelectionCursor {
          selected_token_index: Some(token),
          ..cursor
        }));
      }

      Message::OpenPalette(index) => {
        let palette = show_editor_for(self.lines(), index)?;
        debug!(line = index, form = palette.form.name(), "palette opened");
        self.palette = Some(palette);
        self
          .store
          .set_state(StatePatch::cursor(SelectionCursor::at_line(index + 1)));
      }

      Message::ChooseKind(kind) => {
        self.palette_mut()?.form = Form::for_kind(kind);
      }

      Message::ChooseMakeVariable(target) => {
        self.palette_mut()?.form =
          Form::MakeVariable(MakeVariableForm::new(target));
      }

      Message::Edit(edit) => {
        self.palette_mut()?.form.apply(edit)?;
      }

      Message::Confirm => {
        let palette = self.palette.as_ref().ok_or(BlockError::NoPaletteOpen)?;
        let payload = match palette.form.confirm() {
          Ok(payload) => payload,
          Err(err) => {
            warn!(%err, "palette edit rejected");
            return Err(err);
          }
        };
        let index = palette.line_index;
        let line = self.lines().check(index)?.with_payload(payload);
        let kind = line.kind();
        let next = self.lines().replaced(index, line)?;
        self.store.set_state(StatePatch::lines(next));
        self.palette = None;
        info!(line = index, %kind, "line confirmed");
      }

      Message::Cancel => {
        let palette = self.palette_mut()?;
        if palette.form == Form::KindSelection {
          self.palette = None;
        } else {
          palette.form = Form::KindSelection;
        }
      }

      Message::Back => {
        let snapshot = self.history.pop().ok_or(BlockError::NothingToGoBack)?;
        let cursor = self.cursor().clamped(snapshot.len());
        self.palette = None;
        self
          .store
          .set_state(StatePatch::lines(snapshot).with_cursor(cursor));
        debug!(remaining = self.history.len(), "went back");
      }
    }
    Ok(())
  }

  /// Applies messages in order, stopping at the first error.
  pub fn update_all(
    &mut self,
    messages: impl IntoIterator<Item = Message>,
  ) -> Result<(), BlockError> {
    messages.into_iter().try_for_each(|message| self.update(message))
  }

  /// Ends the session: history and palette are dropped.
  pub fn teardown(&mut self) {
    self.history.clear();
    self.palette = None;
  }

  fn shift(&mut self, index: usize, delta: isize) -> Result<(), BlockError> {
    let lines = self.lines().clone();
    let line = lines.check(index)?;
    let shifted = line.shifted(delta);
    if shifted.indent_depth != line.indent_depth {
      let next = lines.replaced(index, shifted)?;
      let cursor = self.cursor();
      self.commit(lines, next, cursor);
    }
    Ok(())
  }

  fn palette_mut(&mut self) -> Result<&mut Palette, BlockError> {
    self.palette.as_mut().ok_or(BlockError::NoPaletteOpen)
  }

  /// Records `before` in the history and installs `after`. Line indices
  /// may have moved, so an open palette is closed.
  fn commit(
    &mut self,
    before: LineSequence,
    after: LineSequence,
    cursor: SelectionCursor,
  ) {
    if self.palette.take().is_some() {
      debug!("structural edit closed the palette");
    }
    self.history.push(before);
    let cursor = cursor.clamped(after.len());
    self
      .store
      .set_state(StatePatch::lines(after).with_cursor(cursor));
  }
}

// ── Command scripts ─────────────────────────────────────────────────

fn invalid(line: &str) -> BlockError {
  BlockError::InvalidCommand(line.to_string())
}

/// 1-based line number to 0-based index.
fn line_arg(arg: &str, line: &str) -> Result<usize, BlockError> {
  match arg.trim().parse::<usize>() {
    Ok(n) if n > 0 => Ok(n - 1),
    _ => Err(invalid(line)),
  }
}

fn list_arg(rest: &str) -> Vec<String> {
  rest
    .split(',')
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
    .collect()
}

/// Parses one command. Line and token numbers are 1-based, as shown by
/// the `render` command.
pub fn parse_command(line: &str) -> Result<Message, BlockError> {
  let line = line.trim();
  let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
  let rest = rest.trim();
  let edit = |e: FormEdit| -> Result<Message, BlockError> {
    Ok(Message::Edit(e))
  };

  match word {
    "insert" => Ok(Message::InsertAfter(line_arg(rest, line)?)),
    "delete" => Ok(Message::Delete(line_arg(rest, line)?)),
    "up" => Ok(Message::MoveUp(line_arg(rest, line)?)),
    "down" => Ok(Message::MoveDown(line_arg(rest, line)?)),
    "indent" => Ok(Message::Indent(line_arg(rest, line)?)),
    "outdent" => Ok(Message::Outdent(line_arg(rest, line)?)),
    "select" => Ok(Message::SelectLine(line_arg(rest, line)? + 1)),
    "token" => Ok(Message::SelectToken(line_arg(rest, line)?)),
    "open" => Ok(Message::OpenPalette(line_arg(rest, line)?)),
    "kind" => Ok(Message::ChooseKind(rest.parse()?)),
    "make" => Ok(Message::ChooseMakeVariable(rest.parse()?)),
    "confirm" => Ok(Message::Confirm),
    "cancel" => Ok(Message::Cancel),
    "back" => Ok(Message::Back),
    "name" => edit(FormEdit::SetName(rest.to_string())),
    "params" => edit(FormEdit::SetParams(list_arg(rest))),
    "index" => edit(FormEdit::SetIndexList(list_arg(rest))),
    "operator" => edit(FormEdit::SetOperator(rest.to_string())),
    "text" => edit(FormEdit::SetText(rest.to_string())),
    "add-token" => edit(FormEdit::AddToken),
    "remove-token" => edit(FormEdit::RemoveToken),
    "set-token" => {
      let (ty, data) = rest.split_once(' ').unwrap_or((rest, ""));
      let ty: TokenType = ty.parse()?;
      edit(FormEdit::SetToken(Token::new(ty, data.trim())))
    }
    "type" => edit(FormEdit::TypeTokens(rest.to_string())),
    "return-var" => edit(FormEdit::SetReturnVariable(rest.to_string())),
    "items" => edit(FormEdit::SetItems(list_arg(rest))),
    "entries" => {
      let entries = list_arg(rest)
        .into_iter()
        .map(|entry| {
          entry
            .split_once(':')
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .ok_or_else(|| invalid(line))
        })
        .collect::<Result<Vec<_>, _>>()?;
      edit(FormEdit::SetEntries(entries))
    }
    "range" => {
      let args: Vec<&str> = rest.split_whitespace().collect();
      let range = match args.as_slice() {
        [stop] => RangeParams {
          start: None,
          stop: stop.to_string(),
          step: None,
        },
        [start, stop] => RangeParams {
          start: Some(start.to_string()),
          stop: stop.to_string(),
          step: None,
        },
        [start, stop, step] => RangeParams {
          start: Some(start.to_string()),
          stop: stop.to_string(),
          step: Some(step.to_string()),
        },
        _ => return Err(invalid(line)),
      };
      edit(FormEdit::SetRange(range))
    }
    "iterable" => edit(FormEdit::SetIterable(rest.to_string())),
    "start" => edit(FormEdit::SetStart(
      (!rest.is_empty()).then(|| rest.to_string()),
    )),
    _ => Err(invalid(line)),
  }
}

/// One command per line; blank lines and `#` comments are skipped.
pub fn parse_script(script: &str) -> Result<Vec<Message>, BlockError> {
  script
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty() && !line.starts_with('#'))
    .map(parse_command)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::Payload;

  #[test]
  fn insert_into_empty_session() {
    let mut session = EditorSession::default();
    session.update(Message::InsertAfter(0)).unwrap();
    assert_eq!(session.lines().len(), 1);
    assert_eq!(session.cursor().current_line_number, 1);
    assert!(matches!(
      session.update(Message::InsertAfter(5)),
      Err(BlockError::LineOutOfRange { index: 5, len: 1 })
    ));
  }

  #[test]
  fn inserted_line_is_nested_under_block_openers() {
    let mut session = EditorSession::new(
      vec![CodeLine::new(Payload::Else, 1)],
      SessionConfig::default(),
    );
    session.update(Message::InsertAfter(0)).unwrap();
    assert_eq!(session.lines().get(1).unwrap().indent_depth, 2);
  }

  #[test]
  fn structural_edits_close_the_palette() {
    let mut session =
      EditorSession::new(vec![CodeLine::blank(0)], SessionConfig::default());
    session.update(Message::OpenPalette(0)).unwrap();
    assert!(session.palette().is_some());
    session.update(Message::Indent(0)).unwrap();
    assert!(session.palette().is_none());
  }

  #[test]
  fn cancel_goes_back_to_kind_selection_then_closes() {
    let mut session =
      EditorSession::new(vec![CodeLine::blank(0)], SessionConfig::default());
    session.update(Message::OpenPalette(0)).unwrap();
    session.update(Message::ChooseKind(BlockKind::Pass)).unwrap();
    session.update(Message::Cancel).unwrap();
    assert_eq!(session.palette().unwrap().form, Form::KindSelection);
    session.update(Message::Cancel).unwrap();
    assert!(session.palette().is_none());
    assert_eq!(session.lines().get(0).unwrap().kind(), BlockKind::Blank);
  }

  #[test]
  fn select_token_checks_the_line() {
    let mut session = EditorSession::new(
      vec![CodeLine::new(Payload::Pass, 0)],
      SessionConfig::default(),
    );
    assert!(matches!(
      session.update(Message::SelectToken(0)),
      Err(BlockError::NoTokenList(BlockKind::Pass))
    ));
  }

  #[test]
  fn script_commands() {
    let script = "
      # build a loop
      insert 1
      open 2
      kind for
      index i
      type range(3)
      confirm
      range 1 10 2
    ";
    let messages = parse_script(script).unwrap();
    assert_eq!(messages[0], Message::InsertAfter(0));
    assert_eq!(messages[1], Message::OpenPalette(1));
    assert_eq!(messages[2], Message::ChooseKind(BlockKind::For));
    assert_eq!(
      messages[3],
      Message::Edit(FormEdit::SetIndexList(vec!["i".into()]))
    );
    assert_eq!(
      messages[6],
      Message::Edit(FormEdit::SetRange(RangeParams {
        start: Some("1".into()),
        stop: "10".into(),
        step: Some("2".into()),
      }))
    );
    assert!(matches!(
      parse_command("jump 3"),
      Err(BlockError::InvalidCommand(_))
    ));
    assert!(matches!(
      parse_command("delete 0"),
      Err(BlockError::InvalidCommand(_))
    ));
  }
}

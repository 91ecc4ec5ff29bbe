//! Line renderer.
//!
//! Drawing is a pure function of [`EditorState`]: [`render_all`] walks the
//! line sequence in order, hands each line to its block's renderer and
//! returns a [`CodeView`]. Frontends turn the view into text or HTML; the
//! controls on each row map back to session [`Message`]s.

use crate::registry::block_for;
use crate::session::Message;
use crate::store::EditorState;
use crate::syntax::{indent_string, BlockKind, TokenType};

/// What a block renderer needs to know about the row it draws.
#[derive(Debug, Clone)]
pub struct RenderContext {
  pub line_index: usize,
  pub indent: String,
  pub selected: bool,
  pub selected_token: Option<usize>,
}

/// Per-row affordances. Every kind shows all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
  MoveUp,
  MoveDown,
  Indent,
  Outdent,
  InsertAfter,
  Delete,
}

impl Control {
  pub const ALL: [Control; 6] = [
    Control::MoveUp,
    Control::MoveDown,
    Control::Indent,
    Control::Outdent,
    Control::InsertAfter,
    Control::Delete,
  ];

  pub fn label(self) -> &'static str {
    match self {
      Control::MoveUp => "up",
      Control::MoveDown => "down",
      Control::Indent => "indent",
      Control::Outdent => "outdent",
      Control::InsertAfter => "add",
      Control::Delete => "delete",
    }
  }

  /// The session message this control sends for the row at `line_index`.
  pub fn message(self, line_index: usize) -> Message {
    match self {
      Control::MoveUp => Message::MoveUp(line_index),
      Control::MoveDown => Message::MoveDown(line_index),
      Control::Indent => Message::Indent(line_index),
      Control::Outdent => Message::Outdent(line_index),
      Control::InsertAfter => Message::InsertAfter(line_index),
      Control::Delete => Message::Delete(line_index),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
  pub label: &'static str,
  pub value: String,
  pub editable: bool,
}

impl Field {
  pub fn editable(label: &'static str, value: &str) -> Self {
    Self {
      label,
      value: value.to_string(),
      editable: true,
    }
  }

  pub fn fixed(label: &'static str, value: &str) -> Self {
    Self {
      label,
      value: value.to_string(),
      editable: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenChip {
  pub index: usize,
  pub token_type: TokenType,
  pub text: String,
  pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
  /// 1-based, matching the selection cursor.
  pub line_number: usize,
  pub kind: BlockKind,
  pub indent: String,
  pub label: String,
  pub tokens: Vec<TokenChip>,
  pub fields: Vec<Field>,
  pub controls: Vec<Control>,
  pub selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeView {
  pub rows: Vec<RowView>,
}

impl CodeView {
  pub fn selected_row(&self) -> Option<&RowView> {
    self.rows.iter().find(|row| row.selected)
  }
}

/// Draws every line of `state`, in sequence order.
pub fn render_all(state: &EditorState) -> CodeView {
  let mut rows: Vec<RowView> = state
    .lines
    .iter()
    .enumerate()
    .map(|(line_index, line)| {
      let ctx = RenderContext {
        line_index,
        indent: indent_string(line.indent_depth),
        selected: false,
        selected_token: None,
      };
      block_for(&line.payload).render(&ctx)
    })
    .collect();

  // Highlight goes on after every row exists.
  if let Some(index) = state.cursor.line_index() {
    if let Some(row) = rows.get_mut(index) {
      row.selected = true;
      if let Some(token) = state.cursor.selected_token_index {
        for chip in &mut row.tokens {
          chip.selected = chip.index == token;
        }
      }
    }
  }

  tracing::trace!(rows = rows.len(), "rendered code view");
  CodeView { rows }
}

/// Plain-text view: line number, selection marker, indented label.
pub fn to_text(view: &CodeView) -> String {
  let width = view.rows.len().to_string().len();
  let mut out = String::new();
  for row in &view.rows {
    let marker = if row.selected { '>' } else { ' ' };
    out.push_str(&format!(
      "{:>width$} {} {}{}\n",
      row.line_number, marker, row.indent, row.label
    ));
  }
  out
}

pub fn to_html(view: &CodeView) -> String {
  let mut out = String::from("<div class=\"pyblocks-code-view\">\n");
  for row in &view.rows {
    let class = if row.selected {
      "pyblocks-line selected"
    } else {
      "pyblocks-line"
    };
    out.push_str(&format!(
      "  <div class=\"{class}\" data-line=\"{}\" data-kind=\"{}\">\n",
      row.line_number, row.kind
    ));
    out.push_str(&format!(
      "    <span class=\"indent\">{}</span><span class=\"label\">{}</span>\n",
      "&nbsp;".repeat(row.indent.len()),
      escape_html(&row.label)
    ));
    for chip in &row.tokens {
      out.push_str(&format!(
        "    <span class=\"token{}\" data-type=\"{}\">{}</span>\n",
        if chip.selected { " selected" } else { "" },
        chip.token_type,
        escape_html(&chip.text)
      ));
    }
    for control in &row.controls {
      out.push_str(&format!(
        "    <button data-action=\"{}\"></button>\n",
        control.label()
      ));
    }
    out.push_str("  </div>\n");
  }
  out.push_str("</div>\n");
  out
}

fn escape_html(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}

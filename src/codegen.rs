//! Code generator: line sequence to Python source.
//!
//! Generation is best-effort and never fails. Malformed payloads produce
//! whatever text they produce; the kernel reports syntax errors when the
//! code runs.

use tracing::debug;

use crate::registry::block_for;
use crate::syntax::{indent_string, CodeLine};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodegenOptions {
  /// Emitted as a leading `# ` comment line.
  pub header: Option<String>,
}

impl CodegenOptions {
  pub fn with_header(header: impl Into<String>) -> Self {
    Self {
      header: Some(header.into()),
    }
  }
}

/// Source text of one line, without the newline.
pub fn line_source(line: &CodeLine) -> String {
  let block = block_for(&line.payload);
  let mut text = indent_string(line.indent_depth);
  text.push_str(&block.fragment());
  if line.kind().opens_block() {
    text.push(':');
  }
  text
}

/// One string per line, in sequence order.
pub fn generate_lines(lines: &[CodeLine]) -> Vec<String> {
  lines.iter().map(line_source).collect()
}

pub fn generate(lines: &[CodeLine]) -> String {
  generate_with(lines, &CodegenOptions::default())
}

pub fn generate_with(lines: &[CodeLine], options: &CodegenOptions) -> String {
  let mut out = String::new();
  if let Some(header) = &options.header {
    out.push_str("# ");
    out.push_str(header);
    out.push('\n');
  }
  for text in generate_lines(lines) {
    out.push_str(&text);
    out.push('\n');
  }
  debug!(lines = lines.len(), bytes = out.len(), "generated source");
  out
}

/// Indices of lines that still hold UNDEFINED tokens. Those tokens are
/// left out of the generated text.
pub fn incomplete_lines(lines: &[CodeLine]) -> Vec<usize> {
  lines
    .iter()
    .enumerate()
    .filter(|(_, line)| {
      line
        .payload
        .tokens()
        .is_some_and(|tokens| tokens.iter().any(|t| t.is_undefined()))
    })
    .map(|(index, _)| index)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::{ForHeader, Payload, Signature, Token};

  #[test]
  fn class_without_params_gets_empty_parens() {
    let line = CodeLine::new(Payload::Class(Signature::new("Car", &[])), 0);
    assert_eq!(line_source(&line), "class Car():");
  }

  #[test]
  fn blank_line_is_just_indent() {
    assert_eq!(generate(&[CodeLine::blank(2)]), "        \n");
  }

  #[test]
  fn header_comes_first() {
    let code = generate_with(
      &[CodeLine::new(Payload::Pass, 0)],
      &CodegenOptions::with_header("Auto-Generated by pyblocks"),
    );
    assert_eq!(code, "# Auto-Generated by pyblocks\npass\n");
  }

  #[test]
  fn return_with_and_without_value() {
    let lines = [
      CodeLine::new(Payload::Return(vec![]), 1),
      CodeLine::new(Payload::Return(vec![Token::variable("total")]), 1),
    ];
    assert_eq!(generate_lines(&lines), vec!["    return", "    return total"]);
  }

  #[test]
  fn incomplete_lines_are_reported() {
    let lines = [
      CodeLine::new(
        Payload::For(ForHeader {
          index_list: vec!["i".into()],
          operator: "in".into(),
          iterable_tokens: vec![Token::undefined()],
        }),
        0,
      ),
      CodeLine::new(Payload::Pass, 1),
      CodeLine::new(Payload::CustomTokenLine(vec![Token::undefined()]), 1),
    ];
    assert_eq!(incomplete_lines(&lines), vec![0, 2]);
  }
}

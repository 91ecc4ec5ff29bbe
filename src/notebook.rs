//! Session files and Jupyter notebook export.
//!
//! A session file is a JSON document
//! `{"version": 1, "savedAt": "<RFC 3339>", "lines": [...]}`. A bare JSON
//! array of lines is accepted on input as well.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::syntax::{lines_from_json, CodeLine};
use crate::BlockError;

pub const SESSION_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionDocument {
  version: u32,
  saved_at: DateTime<Utc>,
  lines: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSession {
  /// `None` for a bare line array.
  pub saved_at: Option<DateTime<Utc>>,
  pub lines: Vec<CodeLine>,
}

pub fn session_to_string(
  lines: &[CodeLine],
  saved_at: DateTime<Utc>,
) -> Result<String, BlockError> {
  let doc = SessionDocument {
    version: SESSION_VERSION,
    saved_at,
    lines: serde_json::to_value(lines)?,
  };
  Ok(serde_json::to_string_pretty(&doc)? + "\n")
}

pub fn session_from_str(text: &str) -> Result<LoadedSession, BlockError> {
  let value: Value = serde_json::from_str(text)?;
  if value.is_array() {
    return Ok(LoadedSession {
      saved_at: None,
      lines: lines_from_json(value)?,
    });
  }

  let doc: SessionDocument = serde_json::from_value(value)?;
  if doc.version != SESSION_VERSION {
    return Err(BlockError::UnsupportedSessionVersion(doc.version));
  }
  Ok(LoadedSession {
    saved_at: Some(doc.saved_at),
    lines: lines_from_json(doc.lines)?,
  })
}

pub fn save_session(
  path: impl AsRef<Path>,
  lines: &[CodeLine],
) -> Result<(), BlockError> {
  let path = path.as_ref();
  fs::write(path, session_to_string(lines, Utc::now())?)?;
  tracing::info!(path = %path.display(), lines = lines.len(), "session saved");
  Ok(())
}

pub fn load_session(
  path: impl AsRef<Path>,
) -> Result<LoadedSession, BlockError> {
  let path = path.as_ref();
  let session = session_from_str(&fs::read_to_string(path)?)?;
  tracing::debug!(
    path = %path.display(),
    lines = session.lines.len(),
    "session loaded"
  );
  Ok(session)
}

/// Splits source into the line list notebooks store, keeping the `\n`
/// on every line but the last.
fn source_lines(source: &str) -> Vec<String> {
  let mut lines: Vec<String> =
    source.split_inclusive('\n').map(str::to_string).collect();
  if let Some(last) = lines.last_mut() {
    if source.ends_with('\n') {
      last.pop();
      if last.is_empty() {
        lines.pop();
      }
    }
  }
  lines
}

/// nbformat 4 notebook holding `code` in a single Python code cell.
pub fn to_jupyter(code: &str) -> String {
  let notebook = json!({
    "nbformat": 4,
    "nbformat_minor": 5,
    "metadata": {
      "kernelspec": {
        "display_name": "Python 3",
        "language": "python",
        "name": "python3"
      },
      "language_info": { "name": "python" }
    },
    "cells": [{
      "cell_type": "code",
      "execution_count": null,
      "metadata": {},
      "source": source_lines(code),
      "outputs": []
    }]
  });
  // Serializing a `Value` cannot fail.
  serde_json::to_string_pretty(&notebook).unwrap_or_default() + "\n"
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::Payload;

  #[test]
  fn source_lines_keep_newlines() {
    assert_eq!(source_lines("a\nb\n"), vec!["a\n", "b"]);
    assert_eq!(source_lines("a\n    b"), vec!["a\n", "    b"]);
    assert!(source_lines("").is_empty());
  }

  #[test]
  fn future_versions_are_rejected() {
    let text =
      r#"{"version": 2, "savedAt": "2024-01-01T00:00:00Z", "lines": []}"#;
    assert!(matches!(
      session_from_str(text),
      Err(BlockError::UnsupportedSessionVersion(2))
    ));
  }

  #[test]
  fn bare_arrays_load() {
    let session =
      session_from_str(r#"[{"kind": "PASS", "indentDepth": 1}]"#).unwrap();
    assert_eq!(session.saved_at, None);
    assert_eq!(session.lines, vec![CodeLine::new(Payload::Pass, 1)]);
  }
}

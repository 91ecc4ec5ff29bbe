use std::sync::Once;

use thiserror::Error;

pub mod codegen;
pub mod kernel;
pub mod notebook;
pub mod palette;
pub mod registry;
pub mod render;
pub mod session;
pub mod store;
pub mod syntax;
pub mod templates;
pub mod token_line;

pub use codegen::{generate, generate_lines, generate_with, CodegenOptions};
pub use palette::ValidationError;
pub use session::{EditorSession, Message, SessionConfig};
pub use syntax::{BlockKind, CodeLine, Payload, Token, TokenType};

#[derive(Error, Debug)]
pub enum BlockError {
  #[error("Unknown block kind: {0}")]
  UnknownBlockKind(String),
  #[error("Unknown token type: {0}")]
  UnknownTokenType(String),
  #[error("Validation failed: {0}")]
  Validation(#[from] ValidationError),
  #[error("Line {index} is out of range (sequence has {len} lines)")]
  LineOutOfRange { index: usize, len: usize },
  #[error("There is no line {number} (sequence has {len} lines)")]
  NoSuchLine { number: usize, len: usize },
  #[error("Indent depth {depth} is deeper than the maximum of {max}")]
  IndentTooDeep { depth: usize, max: usize },
  #[error("Token {index} is out of range (line has {len} tokens)")]
  TokenOutOfRange { index: usize, len: usize },
  #[error("Nothing to go back to")]
  NothingToGoBack,
  #[error("No palette is open")]
  NoPaletteOpen,
  #[error("No token is selected")]
  NoTokenSelected,
  #[error("The kind selection has nothing to confirm")]
  NothingToConfirm,
  #[error("Edit '{edit}' does not apply to the {form} form")]
  EditNotApplicable {
    edit: &'static str,
    form: &'static str,
  },
  #[error("Line kind {0} has no token list")]
  NoTokenList(BlockKind),
  #[error("Token parse error: {0}")]
  TokenParse(#[from] Box<pest::error::Error<token_line::Rule>>),
  #[error("Invalid command: {0}")]
  InvalidCommand(String),
  #[error("Unknown template: {0}")]
  UnknownTemplate(String),
  #[error("Unsupported session file version: {0}")]
  UnsupportedSessionVersion(u32),
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call has an effect.
/// Enable with e.g. `RUST_LOG=pyblocks=debug`.
pub fn init_tracing() {
  TRACING_INIT.call_once(|| {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
      .with(
        fmt::layer()
          .with_target(true)
          .with_level(true)
          .with_writer(std::io::stderr),
      )
      .with(filter)
      .try_init();
  });
}

/// Parse a JSON array of code lines and generate Python source from it.
pub fn generate_from_json(input: &str) -> Result<String, BlockError> {
  let lines = syntax::lines_from_json(serde_json::from_str(input)?)?;
  Ok(generate(&lines))
}

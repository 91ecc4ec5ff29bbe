//! Block registry.
//!
//! Every block kind implements the same [`Block`] interface: how its line
//! reads as Python, how its row is drawn, which palette form edits it, and
//! how that data is validated. [`block_for`] selects the implementation
//! with an exhaustive match over [`Payload`], so a new kind without an
//! implementation does not compile. Tags coming from outside the program
//! (session files, the command line) are parsed into [`BlockKind`] first,
//! which fails with [`crate::BlockError::UnknownBlockKind`].

use crate::palette::{validate_binding_name, Form, ValidationError};
use crate::render::{Control, Field, RenderContext, RowView, TokenChip};
use crate::syntax::{
  tokens_to_source, BlockKind, ForHeader, MethodParams, Payload,
  SelfAssignment, Signature, Token, TokenType,
};

/// Shown in place of an empty FOR iterable.
pub const ITERABLE_PLACEHOLDER: &str = "( iterable object )";
/// Shown in place of an UNDEFINED token.
pub const UNDEFINED_PLACEHOLDER: &str = "( ? )";

pub trait Block {
  fn kind(&self) -> BlockKind;

  /// Statement text without indentation and without the trailing colon.
  fn fragment(&self) -> String;

  /// Editable token list of this line, if it has one.
  fn tokens(&self) -> &[Token] {
    &[]
  }

  /// Text drawn on the editor row.
  fn label(&self) -> String {
    with_colon(self.kind(), self.fragment())
  }

  /// Named values shown next to the row.
  fn fields(&self) -> Vec<Field> {
    Vec::new()
  }

  /// Palette form pre-filled with this line's data.
  fn editor(&self) -> Form;

  fn validate(&self) -> Result<(), ValidationError> {
    Ok(())
  }

  /// One editor row. Every kind carries the same controls.
  fn render(&self, ctx: &RenderContext) -> RowView {
    RowView {
      line_number: ctx.line_index + 1,
      kind: self.kind(),
      indent: ctx.indent.clone(),
      label: self.label(),
      tokens: token_chips(self.tokens(), ctx.selected_token),
      fields: self.fields(),
      controls: Control::ALL.to_vec(),
      selected: ctx.selected,
    }
  }
}

/// Looks up the implementation for a line's payload.
pub fn block_for(payload: &Payload) -> Box<dyn Block + '_> {
  match payload {
    Payload::Class(sig) => Box::new(SignatureBlock {
      kind: BlockKind::Class,
      sig,
    }),
    Payload::Def(sig) => Box::new(SignatureBlock {
      kind: BlockKind::Def,
      sig,
    }),
    Payload::DefInit(params) => Box::new(MethodBlock {
      kind: BlockKind::DefInit,
      name: "__init__",
      params,
    }),
    Payload::DefDel(params) => Box::new(MethodBlock {
      kind: BlockKind::DefDel,
      name: "__del__",
      params,
    }),
    Payload::For(header) => Box::new(ForBlock { header }),
    Payload::If(tokens) => Box::new(TokenBlock {
      kind: BlockKind::If,
      tokens,
    }),
    Payload::While(tokens) => Box::new(TokenBlock {
      kind: BlockKind::While,
      tokens,
    }),
    Payload::Elif(tokens) => Box::new(TokenBlock {
      kind: BlockKind::Elif,
      tokens,
    }),
    Payload::Return(tokens) => Box::new(TokenBlock {
      kind: BlockKind::Return,
      tokens,
    }),
    Payload::CustomTokenLine(tokens) => Box::new(TokenBlock {
      kind: BlockKind::CustomTokenLine,
      tokens,
    }),
    Payload::Else => Box::new(KeywordBlock(BlockKind::Else)),
    Payload::Break => Box::new(KeywordBlock(BlockKind::Break)),
    Payload::Continue => Box::new(KeywordBlock(BlockKind::Continue)),
    Payload::Pass => Box::new(KeywordBlock(BlockKind::Pass)),
    Payload::SelfVariable(assignment) => {
      Box::new(SelfVariableBlock { assignment })
    }
    Payload::Comment(text) => Box::new(CommentBlock { text }),
    Payload::Blank => Box::new(BlankBlock),
  }
}

fn with_colon(kind: BlockKind, mut text: String) -> String {
  if kind.opens_block() {
    text.push(':');
  }
  text
}

/// `keyword rest`, or just `keyword` when `rest` is empty.
fn keyword_line(kind: BlockKind, rest: &str) -> String {
  let keyword = kind.keyword().unwrap_or_default();
  if rest.is_empty() {
    keyword.to_string()
  } else if keyword.is_empty() {
    rest.to_string()
  } else {
    format!("{keyword} {rest}")
  }
}

fn tokens_label(tokens: &[Token]) -> String {
  tokens
    .iter()
    .map(|t| {
      if t.is_undefined() {
        UNDEFINED_PLACEHOLDER
      } else {
        t.data.as_str()
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}

fn token_chips(tokens: &[Token], selected: Option<usize>) -> Vec<TokenChip> {
  tokens
    .iter()
    .enumerate()
    .map(|(index, token)| TokenChip {
      index,
      token_type: token.token_type,
      text: if token.is_undefined() {
        UNDEFINED_PLACEHOLDER.to_string()
      } else {
        token.data.clone()
      },
      selected: selected == Some(index),
    })
    .collect()
}

// ── class / def ─────────────────────────────────────────────────────

struct SignatureBlock<'a> {
  kind: BlockKind,
  sig: &'a Signature,
}

impl Block for SignatureBlock<'_> {
  fn kind(&self) -> BlockKind {
    self.kind
  }

  fn fragment(&self) -> String {
    keyword_line(
      self.kind,
      &format!("{}({})", self.sig.name, self.sig.params.join(", ")),
    )
  }

  fn fields(&self) -> Vec<Field> {
    let mut fields = vec![Field::editable("name", &self.sig.name)];
    fields.extend(
      self
        .sig
        .params
        .iter()
        .map(|param| Field::editable("param", param)),
    );
    fields
  }

  fn editor(&self) -> Form {
    Form::Signature {
      kind: self.kind,
      name: self.sig.name.clone(),
      params: self.sig.params.clone(),
    }
  }

  fn validate(&self) -> Result<(), ValidationError> {
    validate_binding_name(&self.sig.name)
  }
}

/// `__init__` / `__del__`: fixed name, `self` always first.
struct MethodBlock<'a> {
  kind: BlockKind,
  name: &'static str,
  params: &'a MethodParams,
}

impl MethodBlock<'_> {
  fn user_params(&self) -> impl Iterator<Item = &String> {
    self.params.params.iter().filter(|p| p.as_str() != "self")
  }
}

impl Block for MethodBlock<'_> {
  fn kind(&self) -> BlockKind {
    self.kind
  }

  fn fragment(&self) -> String {
    let params = std::iter::once("self")
      .chain(self.user_params().map(String::as_str))
      .collect::<Vec<_>>()
      .join(", ");
    keyword_line(self.kind, &format!("{}({})", self.name, params))
  }

  fn fields(&self) -> Vec<Field> {
    let mut fields = vec![Field::fixed("param", "self")];
    fields.extend(self.user_params().map(|p| Field::editable("param", p)));
    fields
  }

  fn editor(&self) -> Form {
    Form::Method {
      kind: self.kind,
      params: self.user_params().cloned().collect(),
    }
  }
}

// ── for ─────────────────────────────────────────────────────────────

struct ForBlock<'a> {
  header: &'a ForHeader,
}

impl ForBlock<'_> {
  fn head(&self) -> String {
    format!(
      "{} {}",
      self.header.index_list.join(", "),
      self.header.operator
    )
  }
}

impl Block for ForBlock<'_> {
  fn kind(&self) -> BlockKind {
    BlockKind::For
  }

  fn fragment(&self) -> String {
    let iterable = tokens_to_source(&self.header.iterable_tokens);
    let rest = format!("{} {}", self.head(), iterable);
    keyword_line(BlockKind::For, rest.trim())
  }

  fn tokens(&self) -> &[Token] {
    &self.header.iterable_tokens
  }

  fn label(&self) -> String {
    let iterable = if self.header.iterable_tokens.is_empty() {
      ITERABLE_PLACEHOLDER.to_string()
    } else {
      tokens_label(&self.header.iterable_tokens)
    };
    with_colon(
      BlockKind::For,
      keyword_line(BlockKind::For, &format!("{} {}", self.head(), iterable)),
    )
  }

  fn fields(&self) -> Vec<Field> {
    let mut fields: Vec<Field> = self
      .header
      .index_list
      .iter()
      .map(|index| Field::editable("index", index))
      .collect();
    fields.push(Field::editable("operator", &self.header.operator));
    fields
  }

  fn editor(&self) -> Form {
    Form::For {
      index_list: self.header.index_list.clone(),
      operator: self.header.operator.clone(),
      iterable: self.header.iterable_tokens.clone().into(),
    }
  }
}

// ── token lines: if / elif / while / return / custom ────────────────

struct TokenBlock<'a> {
  kind: BlockKind,
  tokens: &'a [Token],
}

impl Block for TokenBlock<'_> {
  fn kind(&self) -> BlockKind {
    self.kind
  }

  fn fragment(&self) -> String {
    keyword_line(self.kind, &tokens_to_source(self.tokens))
  }

  fn tokens(&self) -> &[Token] {
    self.tokens
  }

  fn label(&self) -> String {
    with_colon(self.kind, keyword_line(self.kind, &tokens_label(self.tokens)))
  }

  fn editor(&self) -> Form {
    Form::Tokens {
      kind: self.kind,
      tokens: self.tokens.to_vec().into(),
    }
  }
}

// ── else / break / continue / pass ──────────────────────────────────

struct KeywordBlock(BlockKind);

impl Block for KeywordBlock {
  fn kind(&self) -> BlockKind {
    self.0
  }

  fn fragment(&self) -> String {
    keyword_line(self.0, "")
  }

  fn editor(&self) -> Form {
    Form::Keyword { kind: self.0 }
  }
}

// ── self.<name> = ... ───────────────────────────────────────────────

struct SelfVariableBlock<'a> {
  assignment: &'a SelfAssignment,
}

impl SelfVariableBlock<'_> {
  fn target(&self) -> String {
    let name = self.assignment.name.trim();
    let name = name.strip_prefix("self.").unwrap_or(name);
    format!("self.{name}")
  }
}

impl Block for SelfVariableBlock<'_> {
  fn kind(&self) -> BlockKind {
    BlockKind::SelfVariable
  }

  fn fragment(&self) -> String {
    let value = tokens_to_source(&self.assignment.value_tokens);
    if value.is_empty() {
      self.target()
    } else {
      format!("{} = {}", self.target(), value)
    }
  }

  fn tokens(&self) -> &[Token] {
    &self.assignment.value_tokens
  }

  fn label(&self) -> String {
    if self.assignment.value_tokens.is_empty() {
      self.target()
    } else {
      format!(
        "{} = {}",
        self.target(),
        tokens_label(&self.assignment.value_tokens)
      )
    }
  }

  fn fields(&self) -> Vec<Field> {
    vec![Field::editable("name", &self.assignment.name)]
  }

  fn editor(&self) -> Form {
    Form::SelfVariable {
      name: self.assignment.name.clone(),
      value: self.assignment.value_tokens.clone().into(),
    }
  }
}

// ── comment / blank ─────────────────────────────────────────────────

struct CommentBlock<'a> {
  text: &'a str,
}

impl Block for CommentBlock<'_> {
  fn kind(&self) -> BlockKind {
    BlockKind::Comment
  }

  fn fragment(&self) -> String {
    // One source line: line breaks become spaces, other spacing stays.
    let text = self.text.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let text = text.trim();
    if text.is_empty() {
      "#".to_string()
    } else {
      format!("# {text}")
    }
  }

  fn editor(&self) -> Form {
    Form::Comment {
      text: self.text.to_string(),
    }
  }
}

struct BlankBlock;

impl Block for BlankBlock {
  fn kind(&self) -> BlockKind {
    BlockKind::Blank
  }

  fn fragment(&self) -> String {
    String::new()
  }

  fn editor(&self) -> Form {
    Form::KindSelection
  }
}

/// Token types offered by the palette for a line of the given kind.
pub fn token_palette(kind: BlockKind) -> &'static [TokenType] {
  use TokenType as T;
  match kind {
    BlockKind::If | BlockKind::Elif | BlockKind::While => &[
      T::Variable,
      T::Number,
      T::String,
      T::ConditionOperator,
      T::CalculationOperator,
      T::LeftBracket,
      T::RightBracket,
      T::FunctionCall,
    ],
    BlockKind::For => &[
      T::Variable,
      T::List,
      T::Tuple,
      T::Set,
      T::Dictionary,
      T::FunctionCall,
    ],
    _ => &[
      T::Variable,
      T::Number,
      T::String,
      T::List,
      T::Dictionary,
      T::Tuple,
      T::Set,
      T::AssignOperator,
      T::ConditionOperator,
      T::CalculationOperator,
      T::LeftBracket,
      T::RightBracket,
      T::FunctionCall,
    ],
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntax::Token;

  #[test]
  fn dunder_methods_force_self_once() {
    let params = MethodParams {
      params: vec!["self".into(), "name".into()],
    };
    let payload = Payload::DefInit(params);
    assert_eq!(block_for(&payload).fragment(), "def __init__(self, name)");

    let payload = Payload::DefDel(MethodParams::default());
    assert_eq!(block_for(&payload).fragment(), "def __del__(self)");
  }

  #[test]
  fn empty_for_iterable_shows_placeholder() {
    let payload = Payload::For(ForHeader {
      index_list: vec!["i".into()],
      ..ForHeader::default()
    });
    let block = block_for(&payload);
    assert_eq!(block.label(), "for i in ( iterable object ):");
    assert_eq!(block.fragment(), "for i in");
  }

  #[test]
  fn undefined_tokens_are_visible_on_the_row_only() {
    let payload = Payload::CustomTokenLine(vec![
      Token::variable("x"),
      Token::assign("="),
      Token::undefined(),
    ]);
    let block = block_for(&payload);
    assert_eq!(block.label(), "x = ( ? )");
    assert_eq!(block.fragment(), "x =");
  }

  #[test]
  fn self_variable_prefix_not_doubled() {
    let payload = Payload::SelfVariable(SelfAssignment {
      name: "self._speed".into(),
      value_tokens: vec![Token::number("0")],
    });
    assert_eq!(block_for(&payload).fragment(), "self._speed = 0");
  }

  #[test]
  fn every_kind_has_a_block() {
    for kind in BlockKind::ALL {
      let payload = Payload::empty(*kind);
      assert_eq!(block_for(&payload).kind(), *kind);
    }
  }

  #[test]
  fn class_name_is_validated() {
    let payload = Payload::Class(Signature::new("while", &[]));
    assert!(block_for(&payload).validate().is_err());
    let payload = Payload::Class(Signature::new("Car", &["object"]));
    assert!(block_for(&payload).validate().is_ok());
  }
}

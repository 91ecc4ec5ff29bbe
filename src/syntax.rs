//! Data model of the block editor.
//!
//! A program is an ordered sequence of [`CodeLine`]s. Each line carries a
//! [`Payload`], a tagged union with one variant per [`BlockKind`], and an
//! indentation depth counted in units of [`INDENT_WIDTH`] spaces.
//! Free-form lines are built from [`Token`]s.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::BlockError;

/// Spaces per indentation unit.
pub const INDENT_WIDTH: usize = 4;

/// Deepest indentation a line may have.
pub const MAX_INDENT_DEPTH: usize = 64;

/// Python keywords that can never be used as a binding name.
pub const PYTHON_KEYWORDS: &[&str] = &[
  "False", "None", "True", "and", "as", "assert", "async", "await", "break",
  "class", "continue", "def", "del", "elif", "else", "except", "finally",
  "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal",
  "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

pub fn is_reserved_word(name: &str) -> bool {
  PYTHON_KEYWORDS.contains(&name)
}

/// Returns the leading whitespace for `depth` indent units, capped at
/// [`MAX_INDENT_DEPTH`].
pub fn indent_string(depth: usize) -> String {
  " ".repeat(INDENT_WIDTH * depth.min(MAX_INDENT_DEPTH))
}

// ── Block kinds ─────────────────────────────────────────────────────

/// The Python construct a [`CodeLine`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
  Class,
  Def,
  DefInit,
  DefDel,
  For,
  If,
  While,
  Elif,
  Else,
  Return,
  Break,
  Continue,
  Pass,
  SelfVariable,
  Comment,
  CustomTokenLine,
  Blank,
}

impl BlockKind {
  pub const ALL: &'static [BlockKind] = &[
    BlockKind::Class,
    BlockKind::Def,
    BlockKind::DefInit,
    BlockKind::DefDel,
    BlockKind::For,
    BlockKind::If,
    BlockKind::While,
    BlockKind::Elif,
    BlockKind::Else,
    BlockKind::Return,
    BlockKind::Break,
    BlockKind::Continue,
    BlockKind::Pass,
    BlockKind::SelfVariable,
    BlockKind::Comment,
    BlockKind::CustomTokenLine,
    BlockKind::Blank,
  ];

  /// The upper-case tag used in session files and on the command line.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Class => "CLASS",
      Self::Def => "DEF",
      Self::DefInit => "DEF_INIT",
      Self::DefDel => "DEF_DEL",
      Self::For => "FOR",
      Self::If => "IF",
      Self::While => "WHILE",
      Self::Elif => "ELIF",
      Self::Else => "ELSE",
      Self::Return => "RETURN",
      Self::Break => "BREAK",
      Self::Continue => "CONTINUE",
      Self::Pass => "PASS",
      Self::SelfVariable => "SELF_VARIABLE",
      Self::Comment => "COMMENT",
      Self::CustomTokenLine => "CUSTOM_TOKEN_LINE",
      Self::Blank => "BLANK",
    }
  }

  /// Python keyword that starts a line of this kind, if any.
  pub fn keyword(self) -> Option<&'static str> {
    match self {
      Self::Class => Some("class"),
      Self::Def | Self::DefInit | Self::DefDel => Some("def"),
      Self::For => Some("for"),
      Self::If => Some("if"),
      Self::While => Some("while"),
      Self::Elif => Some("elif"),
      Self::Else => Some("else"),
      Self::Return => Some("return"),
      Self::Break => Some("break"),
      Self::Continue => Some("continue"),
      Self::Pass => Some("pass"),
      Self::SelfVariable
      | Self::Comment
      | Self::CustomTokenLine
      | Self::Blank => None,
    }
  }

  /// Whether the emitted line ends with `:` and opens a suite.
  pub fn opens_block(self) -> bool {
    matches!(
      self,
      Self::Class
        | Self::Def
        | Self::DefInit
        | Self::DefDel
        | Self::For
        | Self::If
        | Self::While
        | Self::Elif
        | Self::Else
    )
  }

  /// Kinds whose payload is a plain token list.
  pub fn has_token_list(self) -> bool {
    matches!(
      self,
      Self::If
        | Self::While
        | Self::Elif
        | Self::Return
        | Self::CustomTokenLine
    )
  }
}

impl fmt::Display for BlockKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BlockKind {
  type Err = BlockError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let tag = s.trim().to_ascii_uppercase().replace('-', "_");
    Self::ALL
      .iter()
      .copied()
      .find(|kind| kind.as_str() == tag)
      .ok_or_else(|| BlockError::UnknownBlockKind(s.to_string()))
  }
}

// ── Tokens ──────────────────────────────────────────────────────────

/// Category of a [`Token`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
  Undefined,
  Variable,
  Number,
  String,
  List,
  Dictionary,
  Tuple,
  Set,
  AssignOperator,
  ConditionOperator,
  CalculationOperator,
  LeftBracket,
  RightBracket,
  FunctionCall,
}

impl TokenType {
  pub const ALL: &'static [TokenType] = &[
    TokenType::Undefined,
    TokenType::Variable,
    TokenType::Number,
    TokenType::String,
    TokenType::List,
    TokenType::Dictionary,
    TokenType::Tuple,
    TokenType::Set,
    TokenType::AssignOperator,
    TokenType::ConditionOperator,
    TokenType::CalculationOperator,
    TokenType::LeftBracket,
    TokenType::RightBracket,
    TokenType::FunctionCall,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Undefined => "UNDEFINED",
      Self::Variable => "VARIABLE",
      Self::Number => "NUMBER",
      Self::String => "STRING",
      Self::List => "LIST",
      Self::Dictionary => "DICTIONARY",
      Self::Tuple => "TUPLE",
      Self::Set => "SET",
      Self::AssignOperator => "ASSIGN_OPERATOR",
      Self::ConditionOperator => "CONDITION_OPERATOR",
      Self::CalculationOperator => "CALCULATION_OPERATOR",
      Self::LeftBracket => "LEFT_BRACKET",
      Self::RightBracket => "RIGHT_BRACKET",
      Self::FunctionCall => "FUNCTION_CALL",
    }
  }
}

impl fmt::Display for TokenType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TokenType {
  type Err = BlockError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let tag = s.trim().to_ascii_uppercase().replace('-', "_");
    Self::ALL
      .iter()
      .copied()
      .find(|ty| ty.as_str() == tag)
      .ok_or_else(|| BlockError::UnknownTokenType(s.to_string()))
  }
}

/// One atomic fragment of a free-form line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
  #[serde(rename = "type")]
  pub token_type: TokenType,
  #[serde(default)]
  pub data: String,
}

impl Token {
  pub fn new(token_type: TokenType, data: impl Into<String>) -> Self {
    Self {
      token_type,
      data: data.into(),
    }
  }

  /// A placeholder awaiting the user's choice.
  pub fn undefined() -> Self {
    Self::new(TokenType::Undefined, "")
  }

  pub fn variable(data: impl Into<String>) -> Self {
    Self::new(TokenType::Variable, data)
  }

  pub fn number(data: impl Into<String>) -> Self {
    Self::new(TokenType::Number, data)
  }

  pub fn string(data: impl Into<String>) -> Self {
    Self::new(TokenType::String, data)
  }

  pub fn assign(data: impl Into<String>) -> Self {
    Self::new(TokenType::AssignOperator, data)
  }

  pub fn condition(data: impl Into<String>) -> Self {
    Self::new(TokenType::ConditionOperator, data)
  }

  pub fn calculation(data: impl Into<String>) -> Self {
    Self::new(TokenType::CalculationOperator, data)
  }

  pub fn call(data: impl Into<String>) -> Self {
    Self::new(TokenType::FunctionCall, data)
  }

  pub fn is_undefined(&self) -> bool {
    self.token_type == TokenType::Undefined
  }
}

/// Joins token text with single spaces, dropping UNDEFINED placeholders.
pub fn tokens_to_source(tokens: &[Token]) -> String {
  tokens
    .iter()
    .filter(|t| !t.is_undefined())
    .map(|t| t.data.as_str())
    .collect::<Vec<_>>()
    .join(" ")
}

// ── Payloads ────────────────────────────────────────────────────────

/// Name and parameter list of a `class` or `def` header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Signature {
  #[serde(default)]
  pub name: String,
  #[serde(rename = "paramList", default)]
  pub params: Vec<String>,
}

impl Signature {
  pub fn new(name: impl Into<String>, params: &[&str]) -> Self {
    Self {
      name: name.into(),
      params: params.iter().map(|p| p.to_string()).collect(),
    }
  }
}

/// Parameters of a dunder method whose name is fixed by its kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodParams {
  #[serde(rename = "paramList", default)]
  pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForHeader {
  #[serde(default)]
  pub index_list: Vec<String>,
  #[serde(default = "default_for_operator")]
  pub operator: String,
  #[serde(default)]
  pub iterable_tokens: Vec<Token>,
}

fn default_for_operator() -> String {
  "in".to_string()
}

impl Default for ForHeader {
  fn default() -> Self {
    Self {
      index_list: Vec::new(),
      operator: default_for_operator(),
      iterable_tokens: Vec::new(),
    }
  }
}

/// `self.<name> = <value>` inside a method body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfAssignment {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub value_tokens: Vec<Token>,
}

/// Kind-specific data of a line. The variant determines the line's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
  Class(Signature),
  Def(Signature),
  DefInit(MethodParams),
  DefDel(MethodParams),
  For(ForHeader),
  If(Vec<Token>),
  While(Vec<Token>),
  Elif(Vec<Token>),
  Else,
  Return(Vec<Token>),
  Break,
  Continue,
  Pass,
  SelfVariable(SelfAssignment),
  Comment(String),
  CustomTokenLine(Vec<Token>),
  Blank,
}

impl Payload {
  pub fn kind(&self) -> BlockKind {
    match self {
      Self::Class(_) => BlockKind::Class,
      Self::Def(_) => BlockKind::Def,
      Self::DefInit(_) => BlockKind::DefInit,
      Self::DefDel(_) => BlockKind::DefDel,
      Self::For(_) => BlockKind::For,
      Self::If(_) => BlockKind::If,
      Self::While(_) => BlockKind::While,
      Self::Elif(_) => BlockKind::Elif,
      Self::Else => BlockKind::Else,
      Self::Return(_) => BlockKind::Return,
      Self::Break => BlockKind::Break,
      Self::Continue => BlockKind::Continue,
      Self::Pass => BlockKind::Pass,
      Self::SelfVariable(_) => BlockKind::SelfVariable,
      Self::Comment(_) => BlockKind::Comment,
      Self::CustomTokenLine(_) => BlockKind::CustomTokenLine,
      Self::Blank => BlockKind::Blank,
    }
  }

  /// Fresh payload for a newly chosen kind.
  pub fn empty(kind: BlockKind) -> Self {
    match kind {
      BlockKind::Class => Self::Class(Signature::default()),
      BlockKind::Def => Self::Def(Signature::default()),
      BlockKind::DefInit => Self::DefInit(MethodParams::default()),
      BlockKind::DefDel => Self::DefDel(MethodParams::default()),
      BlockKind::For => Self::For(ForHeader::default()),
      BlockKind::If => Self::If(Vec::new()),
      BlockKind::While => Self::While(Vec::new()),
      BlockKind::Elif => Self::Elif(Vec::new()),
      BlockKind::Else => Self::Else,
      BlockKind::Return => Self::Return(Vec::new()),
      BlockKind::Break => Self::Break,
      BlockKind::Continue => Self::Continue,
      BlockKind::Pass => Self::Pass,
      BlockKind::SelfVariable => Self::SelfVariable(SelfAssignment::default()),
      BlockKind::Comment => Self::Comment(String::new()),
      BlockKind::CustomTokenLine => Self::CustomTokenLine(Vec::new()),
      BlockKind::Blank => Self::Blank,
    }
  }

  /// The token list of token-list kinds.
  pub fn tokens(&self) -> Option<&[Token]> {
    match self {
      Self::If(tokens)
      | Self::While(tokens)
      | Self::Elif(tokens)
      | Self::Return(tokens)
      | Self::CustomTokenLine(tokens) => Some(tokens),
      Self::For(header) => Some(&header.iterable_tokens),
      Self::SelfVariable(assignment) => Some(&assignment.value_tokens),
      _ => None,
    }
  }

  /// Returns a copy with the editable token list replaced. Kinds without
  /// tokens are returned unchanged.
  pub fn with_tokens(&self, tokens: Vec<Token>) -> Self {
    match self {
      Self::If(_) => Self::If(tokens),
      Self::While(_) => Self::While(tokens),
      Self::Elif(_) => Self::Elif(tokens),
      Self::Return(_) => Self::Return(tokens),
      Self::CustomTokenLine(_) => Self::CustomTokenLine(tokens),
      Self::For(header) => Self::For(ForHeader {
        iterable_tokens: tokens,
        ..header.clone()
      }),
      Self::SelfVariable(assignment) => Self::SelfVariable(SelfAssignment {
        value_tokens: tokens,
        ..assignment.clone()
      }),
      other => other.clone(),
    }
  }

  fn from_json(
    kind: BlockKind,
    value: serde_json::Value,
  ) -> Result<Self, serde_json::Error> {
    use serde_json::from_value;

    if value.is_null() {
      return Ok(Self::empty(kind));
    }

    Ok(match kind {
      BlockKind::Class => Self::Class(from_value(value)?),
      BlockKind::Def => Self::Def(from_value(value)?),
      BlockKind::DefInit => Self::DefInit(from_value(value)?),
      BlockKind::DefDel => Self::DefDel(from_value(value)?),
      BlockKind::For => Self::For(from_value(value)?),
      BlockKind::If => Self::If(from_value(value)?),
      BlockKind::While => Self::While(from_value(value)?),
      BlockKind::Elif => Self::Elif(from_value(value)?),
      BlockKind::Return => Self::Return(from_value(value)?),
      BlockKind::SelfVariable => Self::SelfVariable(from_value(value)?),
      BlockKind::Comment => Self::Comment(from_value(value)?),
      BlockKind::CustomTokenLine => Self::CustomTokenLine(from_value(value)?),
      BlockKind::Else => Self::Else,
      BlockKind::Break => Self::Break,
      BlockKind::Continue => Self::Continue,
      BlockKind::Pass => Self::Pass,
      BlockKind::Blank => Self::Blank,
    })
  }

  fn to_json(&self) -> serde_json::Value {
    use serde_json::to_value;

    let value = match self {
      Self::Class(sig) | Self::Def(sig) => to_value(sig),
      Self::DefInit(params) | Self::DefDel(params) => to_value(params),
      Self::For(header) => to_value(header),
      Self::If(tokens)
      | Self::While(tokens)
      | Self::Elif(tokens)
      | Self::Return(tokens)
      | Self::CustomTokenLine(tokens) => to_value(tokens),
      Self::SelfVariable(assignment) => to_value(assignment),
      Self::Comment(text) => to_value(text),
      Self::Else | Self::Break | Self::Continue | Self::Pass | Self::Blank => {
        return serde_json::Value::Null;
      }
    };
    value.unwrap_or(serde_json::Value::Null)
  }
}

// ── Code lines ──────────────────────────────────────────────────────

/// One logical source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCodeLine", into = "RawCodeLine")]
pub struct CodeLine {
  pub payload: Payload,
  pub indent_depth: usize,
}

impl CodeLine {
  pub fn new(payload: Payload, indent_depth: usize) -> Self {
    Self {
      payload,
      indent_depth,
    }
  }

  pub fn blank(indent_depth: usize) -> Self {
    Self::new(Payload::Blank, indent_depth)
  }

  pub fn kind(&self) -> BlockKind {
    self.payload.kind()
  }

  pub fn indent_string(&self) -> String {
    indent_string(self.indent_depth)
  }

  /// Copy with a replaced payload and the same indentation.
  pub fn with_payload(&self, payload: Payload) -> Self {
    Self::new(payload, self.indent_depth)
  }

  /// Copy with the indentation moved by `delta` units, clamped to
  /// `0..=MAX_INDENT_DEPTH`.
  pub fn shifted(&self, delta: isize) -> Self {
    let depth = if delta < 0 {
      self.indent_depth.saturating_sub(delta.unsigned_abs())
    } else {
      self.indent_depth.saturating_add(delta.unsigned_abs())
    };
    let depth = depth.min(MAX_INDENT_DEPTH);
    Self::new(self.payload.clone(), depth)
  }
}

/// Wire form of a [`CodeLine`]: the kind travels as its tag so that a
/// misspelled tag surfaces as [`BlockError::UnknownBlockKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCodeLine {
  kind: String,
  #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
  payload: serde_json::Value,
  #[serde(default)]
  indent_depth: usize,
}

impl TryFrom<RawCodeLine> for CodeLine {
  type Error = BlockError;

  fn try_from(raw: RawCodeLine) -> Result<Self, Self::Error> {
    let kind: BlockKind = raw.kind.parse()?;
    if raw.indent_depth > MAX_INDENT_DEPTH {
      return Err(BlockError::IndentTooDeep {
        depth: raw.indent_depth,
        max: MAX_INDENT_DEPTH,
      });
    }
    let payload = Payload::from_json(kind, raw.payload)?;
    Ok(CodeLine::new(payload, raw.indent_depth))
  }
}

impl From<CodeLine> for RawCodeLine {
  fn from(line: CodeLine) -> Self {
    RawCodeLine {
      kind: line.kind().as_str().to_string(),
      payload: line.payload.to_json(),
      indent_depth: line.indent_depth,
    }
  }
}

/// Decode a JSON array of lines, keeping [`BlockError::UnknownBlockKind`]
/// intact instead of folding it into a generic JSON error.
pub fn lines_from_json(
  value: serde_json::Value,
) -> Result<Vec<CodeLine>, BlockError> {
  let raw: Vec<RawCodeLine> = serde_json::from_value(value)?;
  raw.into_iter().map(CodeLine::try_from).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_tags_round_trip() {
    for kind in BlockKind::ALL {
      assert_eq!(kind.as_str().parse::<BlockKind>().unwrap(), *kind);
    }
    assert_eq!(
      "custom-token-line".parse::<BlockKind>().unwrap(),
      BlockKind::CustomTokenLine
    );
  }

  #[test]
  fn unknown_kind_is_reported_by_name() {
    match "FORR".parse::<BlockKind>() {
      Err(BlockError::UnknownBlockKind(tag)) => assert_eq!(tag, "FORR"),
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn shifting_clamps_to_the_allowed_range() {
    let line = CodeLine::new(Payload::Pass, 1);
    assert_eq!(line.shifted(-1).indent_depth, 0);
    assert_eq!(line.shifted(-1).shifted(-1).indent_depth, 0);
    assert_eq!(line.shifted(2).indent_depth, 3);

    let deepest = CodeLine::new(Payload::Pass, MAX_INDENT_DEPTH);
    assert_eq!(deepest.shifted(1).indent_depth, MAX_INDENT_DEPTH);
    let huge = CodeLine::new(Payload::Pass, usize::MAX);
    assert_eq!(huge.shifted(1).indent_depth, MAX_INDENT_DEPTH);
    assert_eq!(
      indent_string(usize::MAX).len(),
      INDENT_WIDTH * MAX_INDENT_DEPTH
    );
  }

  #[test]
  fn oversized_indent_is_rejected_on_load() {
    let json = serde_json::json!([
      {"kind": "PASS", "indentDepth": 4_611_686_018_427_387_904_u64}
    ]);
    assert!(matches!(
      lines_from_json(json),
      Err(BlockError::IndentTooDeep {
        max: MAX_INDENT_DEPTH,
        ..
      })
    ));
  }

  #[test]
  fn tokens_to_source_skips_placeholders() {
    let tokens = vec![
      Token::variable("x"),
      Token::undefined(),
      Token::assign("="),
      Token::number("1"),
    ];
    assert_eq!(tokens_to_source(&tokens), "x = 1");
  }

  #[test]
  fn for_line_json_shape() {
    let json = r#"{"kind":"FOR","indentDepth":0,"payload":{
      "indexList":["i"],"operator":"in",
      "iterableTokens":[{"type":"FUNCTION_CALL","data":"range(3)"}]}}"#;
    let line: CodeLine = serde_json::from_str(json).unwrap();
    assert_eq!(
      line.payload,
      Payload::For(ForHeader {
        index_list: vec!["i".into()],
        operator: "in".into(),
        iterable_tokens: vec![Token::call("range(3)")],
      })
    );
  }

  #[test]
  fn payloadless_kinds_omit_payload() {
    let json =
      serde_json::to_string(&CodeLine::new(Payload::Break, 2)).unwrap();
    assert_eq!(json, r#"{"kind":"BREAK","indentDepth":2}"#);
  }

  #[test]
  fn lines_from_json_keeps_unknown_kind() {
    let value = serde_json::json!([{"kind": "PASS"}, {"kind": "SWITCH"}]);
    match lines_from_json(value) {
      Err(BlockError::UnknownBlockKind(tag)) => assert_eq!(tag, "SWITCH"),
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn unknown_kind_in_json_is_an_error() {
    let err = serde_json::from_str::<CodeLine>(r#"{"kind":"LOOP"}"#)
      .unwrap_err()
      .to_string();
    assert!(err.contains("LOOP"), "{err}");
  }
}

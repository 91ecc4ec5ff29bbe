//! Palette editor.
//!
//! The palette edits one line at a time through a kind-specific [`Form`].
//! Edits change only the form; [`Form::confirm`] validates it and builds
//! the new [`Payload`]. A failed validation leaves both the form and the
//! line untouched.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::registry::block_for;
use crate::store::LineSequence;
use crate::syntax::{
  is_reserved_word, BlockKind, ForHeader, MethodParams, Payload,
  SelfAssignment, Signature, Token, TokenType,
};
use crate::token_line::parse_tokens;
use crate::BlockError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
  #[error("Name must not be empty")]
  EmptyName,
  #[error("'{0}' is a reserved word")]
  ReservedWord(String),
  #[error("'{0}' is a number, not a name")]
  NumericName(String),
  #[error("'{0}' is not a valid name")]
  InvalidName(String),
  #[error("Range parameter '{0}' is empty")]
  EmptyRangeParameter(&'static str),
  #[error("Range parameter '{name}' must be an integer, got '{value}'")]
  NonNumericRangeParameter { name: &'static str, value: String },
  #[error("enumerate needs an iterable")]
  MissingIterable,
}

/// Digits with an optional sign and decimal point.
fn is_numeric(text: &str) -> bool {
  let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
  digits.chars().any(|c| c.is_ascii_digit())
    && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn is_identifier(text: &str) -> bool {
  let mut chars = text.chars();
  matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
    && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// A name that something gets bound to: class, function or variable.
pub fn validate_binding_name(name: &str) -> Result<(), ValidationError> {
  let name = name.trim();
  if name.is_empty() {
    return Err(ValidationError::EmptyName);
  }
  if is_reserved_word(name) {
    return Err(ValidationError::ReservedWord(name.to_string()));
  }
  if is_numeric(name) {
    return Err(ValidationError::NumericName(name.to_string()));
  }
  if !is_identifier(name) {
    return Err(ValidationError::InvalidName(name.to_string()));
  }
  Ok(())
}

/// Like [`validate_binding_name`], but an empty name is allowed: the
/// literal is then emitted as a bare expression.
pub fn validate_return_variable(name: &str) -> Result<(), ValidationError> {
  if name.trim().is_empty() {
    Ok(())
  } else {
    validate_binding_name(name)
  }
}

fn clean_names(names: &[String]) -> Vec<String> {
  names
    .iter()
    .map(|name| name.trim())
    .filter(|name| !name.is_empty())
    .map(str::to_string)
    .collect()
}

// ── Token list editing ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenListEditor {
  pub tokens: Vec<Token>,
  pub selected: Option<usize>,
}

impl From<Vec<Token>> for TokenListEditor {
  fn from(tokens: Vec<Token>) -> Self {
    Self {
      tokens,
      selected: None,
    }
  }
}

impl TokenListEditor {
  /// Appends an UNDEFINED placeholder and selects it.
  pub fn push_placeholder(&mut self) {
    self.tokens.push(Token::undefined());
    self.selected = Some(self.tokens.len() - 1);
  }

  pub fn select(&mut self, index: usize) -> Result<(), BlockError> {
    if index >= self.tokens.len() {
      return Err(BlockError::TokenOutOfRange {
        index,
        len: self.tokens.len(),
      });
    }
    self.selected = Some(index);
    Ok(())
  }

  fn selected_index(&self) -> Result<usize, BlockError> {
    self
      .selected
      .filter(|&index| index < self.tokens.len())
      .ok_or(BlockError::NoTokenSelected)
  }

  pub fn set_selected(&mut self, token: Token) -> Result<(), BlockError> {
    let index = self.selected_index()?;
    self.tokens[index] = token;
    Ok(())
  }

  pub fn remove_selected(&mut self) -> Result<Token, BlockError> {
    let index = self.selected_index()?;
    let token = self.tokens.remove(index);
    self.selected = None;
    Ok(token)
  }

  pub fn replace_from_text(&mut self, text: &str) -> Result<(), BlockError> {
    self.tokens = parse_tokens(text)?;
    self.selected = None;
    Ok(())
  }
}

// ── Make variable ───────────────────────────────────────────────────

/// Literal built by the "make variable" palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakeTarget {
  List,
  Tuple,
  Set,
  Dictionary,
  Range,
  Enumerate,
}

impl MakeTarget {
  pub const ALL: [MakeTarget; 6] = [
    MakeTarget::List,
    MakeTarget::Tuple,
    MakeTarget::Set,
    MakeTarget::Dictionary,
    MakeTarget::Range,
    MakeTarget::Enumerate,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      MakeTarget::List => "list",
      MakeTarget::Tuple => "tuple",
      MakeTarget::Set => "set",
      MakeTarget::Dictionary => "dictionary",
      MakeTarget::Range => "range",
      MakeTarget::Enumerate => "enumerate",
    }
  }
}

impl fmt::Display for MakeTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for MakeTarget {
  type Err = BlockError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let name = s.trim().to_ascii_lowercase();
    Self::ALL
      .into_iter()
      .find(|target| {
        target.as_str() == name
          || (name == "dict" && *target == MakeTarget::Dictionary)
      })
      .ok_or_else(|| {
        BlockError::InvalidCommand(format!("unknown literal: {s}"))
      })
  }
}

/// `range(stop)`, `range(start, stop)` or `range(start, stop, step)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeParams {
  pub start: Option<String>,
  pub stop: String,
  pub step: Option<String>,
}

impl RangeParams {
  fn validate(&self) -> Result<(), ValidationError> {
    let params = [
      ("start", self.start.as_deref()),
      ("stop", Some(self.stop.as_str())),
      ("step", self.step.as_deref()),
    ];
    for (name, value) in params {
      let Some(value) = value else { continue };
      let value = value.trim();
      if value.is_empty() {
        return Err(ValidationError::EmptyRangeParameter(name));
      }
      if value.parse::<i64>().is_err() {
        return Err(ValidationError::NonNumericRangeParameter {
          name,
          value: value.to_string(),
        });
      }
    }
    Ok(())
  }

  fn to_call(&self) -> String {
    let stop = self.stop.trim();
    match (&self.start, &self.step) {
      (None, None) => format!("range({stop})"),
      (Some(start), None) => format!("range({}, {stop})", start.trim()),
      (start, Some(step)) => format!(
        "range({}, {stop}, {})",
        start.as_deref().map(str::trim).unwrap_or("0"),
        step.trim()
      ),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeVariableForm {
  pub target: MakeTarget,
  pub return_variable: String,
  /// Elements of a list, tuple or set.
  pub items: Vec<String>,
  /// Key/value pairs of a dictionary.
  pub entries: Vec<(String, String)>,
  pub range: RangeParams,
  /// Argument of `enumerate`.
  pub iterable: String,
  pub start: Option<String>,
}

impl MakeVariableForm {
  pub fn new(target: MakeTarget) -> Self {
    Self {
      target,
      return_variable: String::new(),
      items: Vec::new(),
      entries: Vec::new(),
      range: RangeParams::default(),
      iterable: String::new(),
      start: None,
    }
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    validate_return_variable(&self.return_variable)?;
    match self.target {
      MakeTarget::Range => self.range.validate(),
      MakeTarget::Enumerate if self.iterable.trim().is_empty() => {
        Err(ValidationError::MissingIterable)
      }
      _ => Ok(()),
    }
  }

  fn elements(&self) -> String {
    clean_names(&self.items).join(", ")
  }

  /// The literal as a single token.
  pub fn literal(&self) -> Token {
    match self.target {
      MakeTarget::List => {
        Token::new(TokenType::List, format!("[{}]", self.elements()))
      }
      MakeTarget::Tuple => {
        let items = clean_names(&self.items);
        let text = match items.as_slice() {
          [single] => format!("({single},)"),
          _ => format!("({})", items.join(", ")),
        };
        Token::new(TokenType::Tuple, text)
      }
      MakeTarget::Set if clean_names(&self.items).is_empty() => {
        Token::call("set()")
      }
      MakeTarget::Set => {
        Token::new(TokenType::Set, format!("{{{}}}", self.elements()))
      }
      MakeTarget::Dictionary => {
        let entries = self
          .entries
          .iter()
          .map(|(key, value)| format!("{}: {}", key.trim(), value.trim()))
          .collect::<Vec<_>>()
          .join(", ");
        Token::new(TokenType::Dictionary, format!("{{{entries}}}"))
      }
      MakeTarget::Range => Token::call(self.range.to_call()),
      MakeTarget::Enumerate => {
        let iterable = self.iterable.trim();
        match self.start.as_deref().map(str::trim) {
          Some(start) if !start.is_empty() => {
            Token::call(format!("enumerate({iterable}, {start})"))
          }
          _ => Token::call(format!("enumerate({iterable})")),
        }
      }
    }
  }

  /// `ret = <literal>`, or the bare literal without a return variable.
  pub fn tokens(&self) -> Vec<Token> {
    let name = self.return_variable.trim();
    if name.is_empty() {
      vec![self.literal()]
    } else {
      vec![Token::variable(name), Token::assign("="), self.literal()]
    }
  }
}

// ── Forms ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Form {
  /// Choose what the line becomes.
  KindSelection,
  Signature {
    kind: BlockKind,
    name: String,
    params: Vec<String>,
  },
  /// `__init__` / `__del__`; `self` is implied.
  Method {
    kind: BlockKind,
    params: Vec<String>,
  },
  For {
    index_list: Vec<String>,
    operator: String,
    iterable: TokenListEditor,
  },
  Tokens {
    kind: BlockKind,
    tokens: TokenListEditor,
  },
  /// Kinds without data.
  Keyword {
    kind: BlockKind,
  },
  SelfVariable {
    name: String,
    value: TokenListEditor,
  },
  Comment {
    text: String,
  },
  MakeVariable(MakeVariableForm),
}

/// One change to the open form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEdit {
  SetName(String),
  SetParams(Vec<String>),
  SetIndexList(Vec<String>),
  SetOperator(String),
  SetText(String),
  AddToken,
  SelectToken(usize),
  SetToken(Token),
  RemoveToken,
  /// Replace the whole token list with the tokens of typed text.
  TypeTokens(String),
  SetReturnVariable(String),
  SetItems(Vec<String>),
  SetEntries(Vec<(String, String)>),
  SetRange(RangeParams),
  SetIterable(String),
  SetStart(Option<String>),
}

impl FormEdit {
  pub fn name(&self) -> &'static str {
    match self {
      FormEdit::SetName(_) => "set name",
      FormEdit::SetParams(_) => "set params",
      FormEdit::SetIndexList(_) => "set index list",
      FormEdit::SetOperator(_) => "set operator",
      FormEdit::SetText(_) => "set text",
      FormEdit::AddToken => "add token",
      FormEdit::SelectToken(_) => "select token",
      FormEdit::SetToken(_) => "set token",
      FormEdit::RemoveToken => "remove token",
      FormEdit::TypeTokens(_) => "type tokens",
      FormEdit::SetReturnVariable(_) => "set return variable",
      FormEdit::SetItems(_) => "set items",
      FormEdit::SetEntries(_) => "set entries",
      FormEdit::SetRange(_) => "set range",
      FormEdit::SetIterable(_) => "set iterable",
      FormEdit::SetStart(_) => "set start",
    }
  }
}

impl Form {
  /// Empty form for a freshly chosen kind.
  pub fn for_kind(kind: BlockKind) -> Self {
    match kind {
      BlockKind::Blank => Form::Keyword { kind },
      _ => block_for(&Payload::empty(kind)).editor(),
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Form::KindSelection => "kind selection",
      Form::Signature { .. } => "signature",
      Form::Method { .. } => "method",
      Form::For { .. } => "for",
      Form::Tokens { .. } => "token",
      Form::Keyword { .. } => "keyword",
      Form::SelfVariable { .. } => "self variable",
      Form::Comment { .. } => "comment",
      Form::MakeVariable(_) => "make variable",
    }
  }

  pub fn token_editor(&self) -> Option<&TokenListEditor> {
    match self {
      Form::For { iterable: e, .. }
      | Form::Tokens { tokens: e, .. }
      | Form::SelfVariable { value: e, .. } => Some(e),
      _ => None,
    }
  }

  fn token_editor_mut(&mut self) -> Option<&mut TokenListEditor> {
    match self {
      Form::For { iterable: e, .. }
      | Form::Tokens { tokens: e, .. }
      | Form::SelfVariable { value: e, .. } => Some(e),
      _ => None,
    }
  }

  fn make_form_mut(&mut self) -> Option<&mut MakeVariableForm> {
    match self {
      Form::MakeVariable(form) => Some(form),
      _ => None,
    }
  }

  pub fn apply(&mut self, edit: FormEdit) -> Result<(), BlockError> {
    let not_applicable = BlockError::EditNotApplicable {
      edit: edit.name(),
      form: self.name(),
    };

    match edit {
      FormEdit::AddToken => {
        self.token_editor_mut().ok_or(not_applicable)?.push_placeholder()
      }
      FormEdit::SelectToken(index) => {
        self.token_editor_mut().ok_or(not_applicable)?.select(index)?
      }
      FormEdit::SetToken(token) => {
        self.token_editor_mut().ok_or(not_applicable)?.set_selected(token)?
      }
      FormEdit::RemoveToken => {
        self.token_editor_mut().ok_or(not_applicable)?.remove_selected()?;
      }
      FormEdit::TypeTokens(text) => self
        .token_editor_mut()
        .ok_or(not_applicable)?
        .replace_from_text(&text)?,
      FormEdit::SetName(value) => match self {
        Form::Signature { name, .. } | Form::SelfVariable { name, .. } => {
          *name = value
        }
        _ => return Err(not_applicable),
      },
      FormEdit::SetParams(value) => match self {
        Form::Signature { params, .. } | Form::Method { params, .. } => {
          *params = value
        }
        _ => return Err(not_applicable),
      },
      FormEdit::SetIndexList(value) => match self {
        Form::For { index_list, .. } => *index_list = value,
        _ => return Err(not_applicable),
      },
      FormEdit::SetOperator(value) => match self {
        Form::For { operator, .. } => *operator = value,
        _ => return Err(not_applicable),
      },
      FormEdit::SetText(value) => match self {
        Form::Comment { text } => *text = value,
        _ => return Err(not_applicable),
      },
      FormEdit::SetReturnVariable(value) => {
        self.make_form_mut().ok_or(not_applicable)?.return_variable = value
      }
      FormEdit::SetItems(value) => {
        self.make_form_mut().ok_or(not_applicable)?.items = value
      }
      FormEdit::SetEntries(value) => {
        self.make_form_mut().ok_or(not_applicable)?.entries = value
      }
      FormEdit::SetRange(value) => {
        self.make_form_mut().ok_or(not_applicable)?.range = value
      }
      FormEdit::SetIterable(value) => {
        self.make_form_mut().ok_or(not_applicable)?.iterable = value
      }
      FormEdit::SetStart(value) => {
        self.make_form_mut().ok_or(not_applicable)?.start = value
      }
    }
    Ok(())
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    match self {
      Form::Signature { name, .. } => validate_binding_name(name),
      Form::MakeVariable(form) => form.validate(),
      _ => Ok(()),
    }
  }

  /// Validates the form and builds the payload it describes.
  pub fn confirm(&self) -> Result<Payload, BlockError> {
    self.validate()?;
    let payload = match self {
      Form::KindSelection => return Err(BlockError::NothingToConfirm),
      Form::Signature { kind, name, params } => {
        let sig = Signature {
          name: name.trim().to_string(),
          params: clean_names(params),
        };
        if *kind == BlockKind::Class {
          Payload::Class(sig)
        } else {
          Payload::Def(sig)
        }
      }
      Form::Method { kind, params } => {
        let params = MethodParams {
          params: clean_names(params),
        };
        if *kind == BlockKind::DefDel {
          Payload::DefDel(params)
        } else {
          Payload::DefInit(params)
        }
      }
      Form::For {
        index_list,
        operator,
        iterable,
      } => Payload::For(ForHeader {
        index_list: clean_names(index_list),
        operator: operator.trim().to_string(),
        iterable_tokens: iterable.tokens.clone(),
      }),
      Form::Tokens { kind, tokens } => {
        Payload::empty(*kind).with_tokens(tokens.tokens.clone())
      }
      Form::Keyword { kind } => Payload::empty(*kind),
      Form::SelfVariable { name, value } => {
        Payload::SelfVariable(SelfAssignment {
          name: name.trim().to_string(),
          value_tokens: value.tokens.clone(),
        })
      }
      Form::Comment { text } => Payload::Comment(text.clone()),
      Form::MakeVariable(form) => Payload::CustomTokenLine(form.tokens()),
    };
    Ok(payload)
  }
}

/// The palette attached to one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
  pub line_index: usize,
  pub form: Form,
}

/// Opens the editor for the line at `line_index`, pre-filled with its
/// current data.
pub fn show_editor_for(
  lines: &LineSequence,
  line_index: usize,
) -> Result<Palette, BlockError> {
  let line = lines.check(line_index)?;
  Ok(Palette {
    line_index,
    form: block_for(&line.payload).editor(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn make(target: MakeTarget, ret: &str) -> MakeVariableForm {
    MakeVariableForm {
      return_variable: ret.to_string(),
      ..MakeVariableForm::new(target)
    }
  }

  #[test]
  fn reserved_and_numeric_return_variables_are_rejected() {
    assert_eq!(
      make(MakeTarget::List, "for").validate(),
      Err(ValidationError::ReservedWord("for".into()))
    );
    assert_eq!(
      make(MakeTarget::List, "42").validate(),
      Err(ValidationError::NumericName("42".into()))
    );
    assert_eq!(make(MakeTarget::List, "").validate(), Ok(()));
  }

  #[test]
  fn range_parameters_must_be_integers() {
    let mut form = make(MakeTarget::Range, "r");
    assert_eq!(
      form.validate(),
      Err(ValidationError::EmptyRangeParameter("stop"))
    );
    form.range = RangeParams {
      start: Some("1".into()),
      stop: "ten".into(),
      step: None,
    };
    assert!(matches!(
      form.validate(),
      Err(ValidationError::NonNumericRangeParameter { name: "stop", .. })
    ));
    form.range.stop = "10".into();
    form.range.step = Some("2".into());
    assert_eq!(form.validate(), Ok(()));
    assert_eq!(form.literal(), Token::call("range(1, 10, 2)"));
  }

  #[test]
  fn literals() {
    let mut form = make(MakeTarget::Tuple, "t");
    form.items = vec!["1".into()];
    assert_eq!(form.literal().data, "(1,)");

    let mut form = make(MakeTarget::Set, "s");
    assert_eq!(form.literal(), Token::call("set()"));
    form.items = vec!["'a'".into(), " 'b' ".into()];
    assert_eq!(form.literal().data, "{'a', 'b'}");

    let mut form = make(MakeTarget::Dictionary, "d");
    form.entries = vec![("'x'".into(), "1".into())];
    assert_eq!(
      form.tokens(),
      vec![
        Token::variable("d"),
        Token::assign("="),
        Token::new(TokenType::Dictionary, "{'x': 1}"),
      ]
    );
  }

  #[test]
  fn enumerate_needs_iterable() {
    let mut form = make(MakeTarget::Enumerate, "pairs");
    assert_eq!(form.validate(), Err(ValidationError::MissingIterable));
    form.iterable = "names".into();
    form.start = Some("1".into());
    assert_eq!(form.literal(), Token::call("enumerate(names, 1)"));
  }

  #[test]
  fn token_edits_need_a_selection() {
    let mut form = Form::for_kind(BlockKind::If);
    assert!(matches!(
      form.apply(FormEdit::SetToken(Token::variable("x"))),
      Err(BlockError::NoTokenSelected)
    ));
    form.apply(FormEdit::AddToken).unwrap();
    form.apply(FormEdit::SetToken(Token::variable("ready"))).unwrap();
    assert_eq!(
      form.confirm().unwrap(),
      Payload::If(vec![Token::variable("ready")])
    );
  }

  #[test]
  fn edits_must_fit_the_form() {
    let mut form = Form::Comment { text: String::new() };
    assert!(matches!(
      form.apply(FormEdit::SetIndexList(vec!["i".into()])),
      Err(BlockError::EditNotApplicable { form: "comment", .. })
    ));
  }

  #[test]
  fn signature_confirm_trims_params() {
    let form = Form::Signature {
      kind: BlockKind::Def,
      name: " area ".into(),
      params: vec!["w".into(), "".into(), " h".into()],
    };
    assert_eq!(
      form.confirm().unwrap(),
      Payload::Def(Signature::new("area", &["w", "h"]))
    );
  }

  #[test]
  fn kind_selection_cannot_be_confirmed() {
    assert!(matches!(
      Form::KindSelection.confirm(),
      Err(BlockError::NothingToConfirm)
    ));
  }
}

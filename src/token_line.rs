//! Parses typed Python text into editor tokens.

use pest::Parser;
use pest_derive::Parser;

use crate::syntax::{Token, TokenType};
use crate::BlockError;

#[derive(Parser)]
#[grammar = "token_line.pest"]
pub struct TokenLineParser;

fn token_type(rule: Rule) -> Option<TokenType> {
  Some(match rule {
    Rule::StringLit => TokenType::String,
    Rule::NumberLit => TokenType::Number,
    Rule::Call => TokenType::FunctionCall,
    Rule::ListLit => TokenType::List,
    Rule::DictLit => TokenType::Dictionary,
    Rule::SetLit => TokenType::Set,
    Rule::TupleLit => TokenType::Tuple,
    Rule::LeftBracket => TokenType::LeftBracket,
    Rule::RightBracket => TokenType::RightBracket,
    Rule::ConditionOp => TokenType::ConditionOperator,
    Rule::AssignOp => TokenType::AssignOperator,
    Rule::CalculationOp => TokenType::CalculationOperator,
    // No separator type exists; `,` and `:` travel as operators.
    Rule::Separator => TokenType::CalculationOperator,
    Rule::Name => TokenType::Variable,
    _ => return None,
  })
}

/// Splits `input` into tokens. Literals and calls stay whole, so
/// `print(a, b)` is one FUNCTION_CALL token.
pub fn parse_tokens(input: &str) -> Result<Vec<Token>, BlockError> {
  let pairs =
    TokenLineParser::parse(Rule::TokenLine, input).map_err(Box::new)?;
  let tokens: Vec<Token> = pairs
    .flat_map(|line| line.into_inner())
    .filter_map(|pair| {
      token_type(pair.as_rule()).map(|ty| Token::new(ty, pair.as_str()))
    })
    .collect();
  tracing::trace!(count = tokens.len(), "parsed token line");
  Ok(tokens)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn types(input: &str) -> Vec<TokenType> {
    parse_tokens(input)
      .unwrap()
      .into_iter()
      .map(|t| t.token_type)
      .collect()
  }

  #[test]
  fn assignment_with_arithmetic() {
    let tokens = parse_tokens("total = total + x ** 2").unwrap();
    assert_eq!(
      tokens,
      vec![
        Token::variable("total"),
        Token::assign("="),
        Token::variable("total"),
        Token::calculation("+"),
        Token::variable("x"),
        Token::calculation("**"),
        Token::number("2"),
      ]
    );
  }

  #[test]
  fn literals_stay_whole() {
    use TokenType as T;
    assert_eq!(
      types("a = [1, (2, 3)]"),
      vec![T::Variable, T::AssignOperator, T::List]
    );
    assert_eq!(types("{'a': 1}"), vec![T::Dictionary]);
    assert_eq!(types("{}"), vec![T::Dictionary]);
    assert_eq!(types("{1, 2}"), vec![T::Set]);
    assert_eq!(types("(1, 2)"), vec![T::Tuple]);
    assert_eq!(
      types("(a + 1)"),
      vec![
        T::LeftBracket,
        T::Variable,
        T::CalculationOperator,
        T::Number,
        T::RightBracket
      ]
    );
  }

  #[test]
  fn calls_and_strings() {
    let tokens = parse_tokens(r#"print("a, \"b\")", self.name)"#).unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token_type, TokenType::FunctionCall);
  }

  #[test]
  fn word_operators_need_a_boundary() {
    use TokenType as T;
    assert_eq!(
      types("index in items"),
      vec![T::Variable, T::ConditionOperator, T::Variable]
    );
    assert_eq!(
      types("x != 3 and y"),
      vec![
        T::Variable,
        T::ConditionOperator,
        T::Number,
        T::ConditionOperator,
        T::Variable
      ]
    );
  }

  #[test]
  fn separators_and_bitwise_operators() {
    let tokens = parse_tokens("a, b = 1, 2").unwrap();
    assert_eq!(
      tokens,
      vec![
        Token::variable("a"),
        Token::calculation(","),
        Token::variable("b"),
        Token::assign("="),
        Token::number("1"),
        Token::calculation(","),
        Token::number("2"),
      ]
    );

    use TokenType as T;
    assert_eq!(
      types("f = lambda x: x"),
      vec![
        T::Variable,
        T::AssignOperator,
        T::Variable,
        T::Variable,
        T::CalculationOperator,
        T::Variable
      ]
    );
    assert_eq!(
      types("m = a & b | ~c ^ d"),
      vec![
        T::Variable,
        T::AssignOperator,
        T::Variable,
        T::ConditionOperator,
        T::Variable,
        T::ConditionOperator,
        T::ConditionOperator,
        T::Variable,
        T::ConditionOperator,
        T::Variable
      ]
    );
  }

  #[test]
  fn shifts_and_augmented_assignment_stay_whole() {
    let data: Vec<String> = parse_tokens("x <<= y >> 2 <= z @ w")
      .unwrap()
      .into_iter()
      .map(|t| t.data)
      .collect();
    assert_eq!(data, vec!["x", "<<=", "y", ">>", "2", "<=", "z", "@", "w"]);
    assert_eq!(
      parse_tokens("if (n := len(a)) == 0").unwrap()[3],
      Token::assign(":=")
    );
  }

  #[test]
  fn number_forms() {
    let forms =
      ["1e5", "2.5E-3", "0x1F", "0o17", "0b1010", "1_000", "1j", ".5"];
    for text in forms {
      assert_eq!(parse_tokens(text).unwrap(), vec![Token::number(text)]);
    }
    assert_eq!(
      parse_tokens("größe = 1").unwrap()[0],
      Token::variable("größe")
    );
  }

  #[test]
  fn unterminated_string_is_a_parse_error() {
    assert!(matches!(
      parse_tokens("x = 'abc"),
      Err(BlockError::TokenParse(_))
    ));
  }

  #[test]
  fn empty_input_has_no_tokens() {
    assert!(parse_tokens("   ").unwrap().is_empty());
  }
}

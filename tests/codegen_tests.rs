use pyblocks::render::render_all;
use pyblocks::store::{EditorState, LineSequence, SelectionCursor};
use pyblocks::syntax::{ForHeader, MethodParams, Signature};
use pyblocks::{generate, generate_lines, CodeLine, Payload, Token};

fn for_range(depth: usize, index: &str, call: &str) -> CodeLine {
  CodeLine::new(
    Payload::For(ForHeader {
      index_list: vec![index.to_string()],
      operator: "in".to_string(),
      iterable_tokens: vec![Token::call(call)],
    }),
    depth,
  )
}

fn assign(depth: usize, name: &str, value: &str) -> CodeLine {
  CodeLine::new(
    Payload::CustomTokenLine(vec![
      Token::variable(name),
      Token::assign("="),
      Token::number(value),
    ]),
    depth,
  )
}

mod codegen_tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn for_loop_with_body() {
    let lines = vec![for_range(0, "i", "range(3)"), assign(1, "x", "1")];
    assert_eq!(generate(&lines), "for i in range(3):\n    x = 1\n");
  }

  #[test]
  fn constructor_gets_self_first() {
    let line = CodeLine::new(
      Payload::DefInit(MethodParams {
        params: vec!["name".to_string()],
      }),
      1,
    );
    assert_eq!(
      generate_lines(&[line]),
      vec!["    def __init__(self, name):"]
    );
  }

  #[test]
  fn self_is_not_repeated() {
    let line = CodeLine::new(
      Payload::DefDel(MethodParams {
        params: vec!["self".to_string()],
      }),
      0,
    );
    assert_eq!(generate(&[line]), "def __del__(self):\n");
  }

  #[test]
  fn indentation_is_four_spaces_per_level() {
    let lines: Vec<CodeLine> = [0, 1, 2, 1, 0]
      .into_iter()
      .map(|depth| CodeLine::new(Payload::Pass, depth))
      .collect();
    let widths: Vec<usize> = generate_lines(&lines)
      .iter()
      .map(|line| line.len() - line.trim_start().len())
      .collect();
    assert_eq!(widths, vec![0, 4, 8, 4, 0]);
  }

  #[test]
  fn generation_is_repeatable() {
    let lines = pyblocks::templates::template("mandelbrot").unwrap();
    assert_eq!(generate(&lines), generate(&lines));
  }

  #[test]
  fn one_output_line_per_row_in_the_same_order() {
    let lines = vec![
      CodeLine::new(Payload::Def(Signature::new("f", &["a", "b"])), 0),
      CodeLine::new(Payload::If(vec![Token::variable("a")]), 1),
      CodeLine::new(Payload::Return(vec![Token::variable("b")]), 2),
      CodeLine::new(Payload::Else, 1),
      CodeLine::new(Payload::Return(vec![]), 2),
    ];
    let state = EditorState {
      lines: LineSequence::new(lines.clone()),
      cursor: SelectionCursor::default(),
    };
    let rows = render_all(&state).rows;
    let code = generate_lines(&lines);
    assert_eq!(rows.len(), code.len());
    for (row, text) in rows.iter().zip(&code) {
      assert_eq!(format!("{}{}", row.indent, row.label), *text);
    }
  }

  #[test]
  fn generate_from_json_lines() {
    let json = r#"[
      {
        "kind": "DEF_INIT",
        "indentDepth": 1,
        "payload": {"paramList": ["self", "name"]}
      },
      {
        "kind": "SELF_VARIABLE",
        "indentDepth": 2,
        "payload": {
          "name": "name",
          "valueTokens": [{"type": "VARIABLE", "data": "name"}]
        }
      }
    ]"#;
    assert_eq!(
      pyblocks::generate_from_json(json).unwrap(),
      "    def __init__(self, name):\n        self.name = name\n"
    );
    assert!(matches!(
      pyblocks::generate_from_json(r#"[{"kind": "LOOP"}]"#),
      Err(pyblocks::BlockError::UnknownBlockKind(_))
    ));
  }

  #[test]
  fn oversized_indent_depth_is_an_error() {
    let json = r#"[{"kind": "PASS", "indentDepth": 4611686018427387904}]"#;
    assert!(matches!(
      pyblocks::generate_from_json(json),
      Err(pyblocks::BlockError::IndentTooDeep { .. })
    ));

    let json = format!(
      r#"[{{"kind": "PASS", "indentDepth": {}}}]"#,
      pyblocks::syntax::MAX_INDENT_DEPTH
    );
    let code = pyblocks::generate_from_json(&json).unwrap();
    assert_eq!(code.trim_start(), "pass\n");
  }

  #[test]
  fn empty_sequence_generates_nothing() {
    assert_eq!(generate(&[]), "");
  }

  #[test]
  fn undefined_tokens_are_skipped() {
    let line = CodeLine::new(
      Payload::While(vec![
        Token::variable("n"),
        Token::undefined(),
        Token::number("0"),
      ]),
      0,
    );
    assert_eq!(generate(&[line]), "while n 0:\n");
  }

  #[test]
  fn comments_and_self_assignments() {
    let lines = vec![
      CodeLine::new(Payload::Comment("  keep   speed ".to_string()), 2),
      CodeLine::new(
        Payload::SelfVariable(pyblocks::syntax::SelfAssignment {
          name: "self.speed".to_string(),
          value_tokens: vec![Token::number("0")],
        }),
        2,
      ),
    ];
    assert_eq!(
      generate_lines(&lines),
      vec!["        # keep   speed", "        self.speed = 0"]
    );
  }

  #[test]
  fn comment_line_breaks_become_spaces() {
    let line = CodeLine::new(Payload::Comment("a    b\nc\r\nd".to_string()), 0);
    assert_eq!(generate(&[line]), "# a    b c d\n");
  }
}

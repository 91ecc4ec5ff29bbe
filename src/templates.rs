//! Built-in starting programs.

use crate::syntax::{
  CodeLine, ForHeader, MethodParams, Payload, SelfAssignment, Signature,
  Token, TokenType,
};
use crate::BlockError;
use crate::syntax::TokenType::{
  AssignOperator as Assign, CalculationOperator as Calc,
  ConditionOperator as Cond, FunctionCall as Call, LeftBracket as LParen,
  Number as Num, RightBracket as RParen, Variable as Var,
};

pub struct Template {
  pub name: &'static str,
  pub description: &'static str,
  build: fn() -> Vec<CodeLine>,
}

impl Template {
  pub fn lines(&self) -> Vec<CodeLine> {
    (self.build)()
  }
}

pub const TEMPLATES: &[Template] = &[
  Template {
    name: "class",
    description: "Empty class header",
    build: class,
  },
  Template {
    name: "def",
    description: "Function with one parameter",
    build: def,
  },
  Template {
    name: "for",
    description: "Loop over a range and print the index",
    build: for_loop,
  },
  Template {
    name: "while",
    description: "Loop while two values are equal",
    build: while_loop,
  },
  Template {
    name: "if",
    description: "if / elif on two values",
    build: if_elif,
  },
  Template {
    name: "multiplication-table",
    description: "Nested loops printing the 2 to 9 times tables",
    build: multiplication_table,
  },
  Template {
    name: "mandelbrot",
    description: "Mandelbrot fractal with numpy and matplotlib",
    build: mandelbrot,
  },
  Template {
    name: "car-class",
    description: "Class with a constructor and a getter",
    build: car_class,
  },
  Template {
    name: "mean",
    description: "Arithmetic mean of a list",
    build: mean,
  },
  Template {
    name: "variance",
    description: "Variance of a list (uses makeMean)",
    build: variance,
  },
  Template {
    name: "covariance",
    description: "Covariance of two lists (uses makeMean)",
    build: covariance,
  },
];

pub fn find(name: &str) -> Result<&'static Template, BlockError> {
  TEMPLATES
    .iter()
    .find(|t| t.name == name)
    .ok_or_else(|| BlockError::UnknownTemplate(name.to_string()))
}

pub fn template(name: &str) -> Result<Vec<CodeLine>, BlockError> {
  find(name).map(Template::lines)
}

// ── Builders ────────────────────────────────────────────────────────

fn tokens(parts: &[(TokenType, &str)]) -> Vec<Token> {
  parts.iter().map(|(ty, data)| Token::new(*ty, *data)).collect()
}

fn custom(depth: usize, parts: &[(TokenType, &str)]) -> CodeLine {
  CodeLine::new(Payload::CustomTokenLine(tokens(parts)), depth)
}

fn for_in(depth: usize, index: &str, iterable: Token) -> CodeLine {
  CodeLine::new(
    Payload::For(ForHeader {
      index_list: vec![index.to_string()],
      operator: "in".to_string(),
      iterable_tokens: vec![iterable],
    }),
    depth,
  )
}

fn def_line(name: &str, params: &[&str]) -> CodeLine {
  CodeLine::new(Payload::Def(Signature::new(name, params)), 0)
}

fn comment(depth: usize, text: &str) -> CodeLine {
  CodeLine::new(Payload::Comment(text.to_string()), depth)
}

fn class() -> Vec<CodeLine> {
  vec![CodeLine::new(Payload::Class(Signature::new("YourClass", &[])), 0)]
}

fn def() -> Vec<CodeLine> {
  vec![def_line("make_your_data", &["a"])]
}

fn for_loop() -> Vec<CodeLine> {
  vec![
    for_in(0, "i", Token::call("range(100)")),
    custom(1, &[(Call, "print(i)")]),
  ]
}

fn while_loop() -> Vec<CodeLine> {
  vec![CodeLine::new(
    Payload::While(tokens(&[
      (Var, "left_var"),
      (Cond, "=="),
      (Var, "right_var"),
    ])),
    0,
  )]
}

fn if_elif() -> Vec<CodeLine> {
  vec![
    CodeLine::new(
      Payload::If(tokens(&[
        (Var, "left_var"),
        (Cond, "=="),
        (Var, "right_var"),
      ])),
      0,
    ),
    custom(1, &[(Var, "left_var"), (Assign, "="), (Num, "0")]),
    CodeLine::new(
      Payload::Elif(tokens(&[
        (Var, "left_var"),
        (Cond, "!="),
        (Var, "right_var"),
      ])),
      0,
    ),
    custom(1, &[(Var, "right_var"), (Assign, "="), (Num, "1")]),
  ]
}

fn multiplication_table() -> Vec<CodeLine> {
  vec![
    comment(0, "tables 2 to 9"),
    for_in(0, "i", Token::call("range(2, 10)")),
    custom(1, &[(Call, "print(i)")]),
    comment(1, "factors 1 to 9"),
    for_in(1, "j", Token::call("range(1, 10)")),
    custom(2, &[(Call, "print((i, j, i * j))")]),
  ]
}

fn mandelbrot() -> Vec<CodeLine> {
  vec![
    def_line("mandelbrot", &["h", "w", "maxit=20"]),
    comment(1, "Returns an image of the Mandelbrot fractal of size (h,w)."),
    custom(
      1,
      &[
        (Var, "y, x"),
        (Assign, "="),
        (Var, "np.ogrid[-1.4:1.4:h*1j, -2:0.8:w*1j]"),
      ],
    ),
    custom(
      1,
      &[
        (Var, "c"),
        (Assign, "="),
        (Var, "x"),
        (Calc, "+"),
        (Var, "y"),
        (Calc, "*"),
        (Num, "1j"),
      ],
    ),
    custom(1, &[(Var, "z"), (Assign, "="), (Var, "c")]),
    custom(
      1,
      &[
        (Var, "divtime"),
        (Assign, "="),
        (Var, "maxit"),
        (Calc, "+"),
        (Call, "np.zeros(z.shape, dtype=int)"),
      ],
    ),
    for_in(1, "i", Token::call("range(maxit)")),
    custom(
      2,
      &[
        (Var, "z"),
        (Assign, "="),
        (Var, "z"),
        (Calc, "**"),
        (Num, "2"),
        (Calc, "+"),
        (Var, "c"),
      ],
    ),
    custom(
      2,
      &[
        (Var, "diverge"),
        (Assign, "="),
        (Var, "z"),
        (Calc, "*"),
        (Call, "np.conj(z)"),
        (Cond, ">"),
        (Num, "2"),
        (Calc, "**"),
        (Num, "2"),
      ],
    ),
    custom(
      2,
      &[
        (Var, "div_now"),
        (Assign, "="),
        (Var, "diverge"),
        (Cond, "&"),
        (LParen, "("),
        (Var, "divtime"),
        (Cond, "=="),
        (Var, "maxit"),
        (RParen, ")"),
      ],
    ),
    custom(2, &[(Var, "divtime[div_now]"), (Assign, "="), (Var, "i")]),
    custom(2, &[(Var, "z[diverge]"), (Assign, "="), (Num, "2")]),
    CodeLine::new(Payload::Return(tokens(&[(Var, "divtime")])), 1),
    CodeLine::blank(0),
    custom(
      0,
      &[(Var, "mandelbrot_var"), (Assign, "="), (Call, "mandelbrot(400, 400)")],
    ),
    custom(0, &[(Call, "plt.imshow(mandelbrot_var)")]),
    custom(0, &[(Call, "plt.show()")]),
  ]
}

fn car_class() -> Vec<CodeLine> {
  vec![
    CodeLine::new(Payload::Class(Signature::new("Car", &["object"])), 0),
    CodeLine::new(Payload::DefInit(MethodParams::default()), 1),
    CodeLine::new(
      Payload::SelfVariable(SelfAssignment {
        name: "_speed".to_string(),
        value_tokens: vec![Token::number("0")],
      }),
      2,
    ),
    CodeLine::blank(0),
    CodeLine::new(Payload::Def(Signature::new("speed", &["self"])), 1),
    CodeLine::new(Payload::Return(vec![Token::variable("self._speed")]), 2),
  ]
}

fn mean() -> Vec<CodeLine> {
  vec![
    def_line("makeMean", &["values"]),
    custom(1, &[(Var, "total"), (Assign, "="), (Num, "0")]),
    for_in(1, "i", Token::variable("values")),
    custom(2, &[(Var, "total"), (Assign, "+="), (Var, "i")]),
    CodeLine::new(
      Payload::Return(tokens(&[
        (Var, "total"),
        (Calc, "/"),
        (Call, "len(values)"),
      ])),
      1,
    ),
  ]
}

fn variance() -> Vec<CodeLine> {
  vec![
    def_line("makeVariance", &["values"]),
    custom(1, &[(Var, "mean"), (Assign, "="), (Call, "makeMean(values)")]),
    custom(1, &[(Var, "total"), (Assign, "="), (Num, "0")]),
    for_in(1, "i", Token::variable("values")),
    custom(
      2,
      &[
        (Var, "total"),
        (Assign, "+="),
        (LParen, "("),
        (Var, "i"),
        (Calc, "-"),
        (Var, "mean"),
        (RParen, ")"),
        (Calc, "*"),
        (LParen, "("),
        (Var, "i"),
        (Calc, "-"),
        (Var, "mean"),
        (RParen, ")"),
      ],
    ),
    CodeLine::new(
      Payload::Return(tokens(&[
        (Var, "total"),
        (Calc, "/"),
        (Call, "len(values)"),
      ])),
      1,
    ),
  ]
}

fn covariance() -> Vec<CodeLine> {
  vec![
    def_line("makeCovariance", &["xs", "ys"]),
    custom(1, &[(Var, "mean_x"), (Assign, "="), (Call, "makeMean(xs)")]),
    custom(1, &[(Var, "mean_y"), (Assign, "="), (Call, "makeMean(ys)")]),
    CodeLine::blank(0),
    custom(1, &[(Var, "n"), (Assign, "="), (Call, "len(xs)")]),
    custom(1, &[(Var, "total"), (Assign, "="), (Num, "0")]),
    CodeLine::new(
      Payload::While(tokens(&[(Var, "n"), (Cond, "!="), (Num, "0")])),
      1,
    ),
    custom(2, &[(Var, "n"), (Assign, "-="), (Num, "1")]),
    custom(
      2,
      &[
        (Var, "total"),
        (Assign, "+="),
        (Var, "xs[n]"),
        (Calc, "*"),
        (Var, "ys[n]"),
      ],
    ),
    custom(
      1,
      &[
        (Var, "mean_xy"),
        (Assign, "="),
        (Var, "total"),
        (Calc, "/"),
        (Call, "len(xs)"),
      ],
    ),
    CodeLine::new(
      Payload::Return(tokens(&[
        (Var, "mean_xy"),
        (Calc, "-"),
        (LParen, "("),
        (Var, "mean_x"),
        (Calc, "*"),
        (Var, "mean_y"),
        (RParen, ")"),
      ])),
      1,
    ),
  ]
}

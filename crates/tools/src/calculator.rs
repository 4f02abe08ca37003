//! Calculator tool: evaluates mathematical expressions.
//!
//! Supports `+ - * / % ^`, parentheses, unary minus, the constants `pi`
//! and `e`, and a handful of functions. Uses a recursive-descent parser;
//! no dependencies beyond std.

use agentmesh_core::error::ToolError;
use agentmesh_core::tool::{Tool, ToolCategory, ToolParameter};
use async_trait::async_trait;

/// Longest expression the tool will accept, in characters.
const MAX_EXPRESSION_LEN: usize = 1024;

/// Deepest operand nesting (parentheses, unary signs, exponents) the
/// parser will recurse into.
const MAX_NESTING: usize = 64;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression. Supports + - * / % ^, parentheses, pi, e, \
         and sqrt, abs, round, floor, ceil, ln, log10, sin, cos, tan, min, max, pow."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Computation
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::new(
            "expression",
            "string",
            "The mathematical expression to evaluate, e.g. '(2 + 3) * 4'",
        )]
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let expr = arguments["expression"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'expression' argument".into()))?;
        if expr.chars().count() > MAX_EXPRESSION_LEN {
            return Err(ToolError::InvalidArguments(format!(
                "Expression longer than {MAX_EXPRESSION_LEN} characters"
            )));
        }

        let value = evaluate(expr).map_err(|reason| ToolError::ExecutionFailed {
            tool_name: "calculate".into(),
            reason,
        })?;

        Ok(serde_json::json!({
            "expression": expr,
            "result": number_value(value),
        }))
    }
}

/// Whole numbers are reported as integers.
fn number_value(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Value::from(value)
    }
}

// ── Recursive-descent expression evaluator ────────────────────────────────

/// Evaluate a mathematical expression string.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser::new(&tokens);
    let result = parser.parse_expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(format!(
            "Unexpected token at position {}: {:?}",
            parser.pos, parser.tokens[parser.pos]
        ));
    }
    if !result.is_finite() {
        return Err("Result is not a finite number".into());
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' if chars.get(i + 1) == Some(&'*') => { tokens.push(Token::Caret); i += 2; }
            '*' => { tokens.push(Token::Star); i += 1; }
            '/' => { tokens.push(Token::Slash); i += 1; }
            '%' => { tokens.push(Token::Percent); i += 1; }
            '^' => { tokens.push(Token::Caret); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            ',' => { tokens.push(Token::Comma); i += 1; }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| format!("Invalid number: {}", num_str))?;
                tokens.push(Token::Number(num));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(ident.to_ascii_lowercase()));
            }
            c => return Err(format!("Unexpected character: '{}'", c)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), String> {
        match self.consume() {
            Some(tok) if *tok == expected => Ok(()),
            _ => Err(format!("Expected {what}")),
        }
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, String> {
        let mut left = self.parse_term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.consume();
                    left += self.parse_term()?;
                }
                Token::Minus => {
                    self.consume();
                    left -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // term = unary (('*' | '/' | '%') unary)*
    fn parse_term(&mut self) -> Result<f64, String> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.consume();
                    left *= self.parse_unary()?;
                }
                Token::Slash => {
                    self.consume();
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err("Division by zero".into());
                    }
                    left /= right;
                }
                Token::Percent => {
                    self.consume();
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err("Modulo by zero".into());
                    }
                    left %= right;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // unary = ('-' | '+') unary | power
    fn parse_unary(&mut self) -> Result<f64, String> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err("expression nested too deeply".into());
        }
        let value = self.parse_signed();
        self.depth -= 1;
        value
    }

    fn parse_signed(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                Ok(-self.parse_unary()?)
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // power = primary ('^' unary)?   (right-associative)
    fn parse_power(&mut self) -> Result<f64, String> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // primary = NUMBER | IDENT | IDENT '(' args ')' | '(' expr ')'
    fn parse_primary(&mut self) -> Result<f64, String> {
        match self.consume().cloned() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let val = self.parse_expr()?;
                self.expect(Token::RParen, "closing parenthesis")?;
                Ok(val)
            }
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let args = self.parse_args()?;
                    call_function(&name, &args)
                } else {
                    constant(&name)
                }
            }
            Some(tok) => Err(format!("Unexpected token: {:?}", tok)),
            None => Err("Unexpected end of expression".into()),
        }
    }

    // args = expr (',' expr)* ')'
    fn parse_args(&mut self) -> Result<Vec<f64>, String> {
        let mut args = vec![self.parse_expr()?];
        while let Some(Token::Comma) = self.peek() {
            self.consume();
            args.push(self.parse_expr()?);
        }
        self.expect(Token::RParen, "closing parenthesis after arguments")?;
        Ok(args)
    }
}

fn constant(name: &str) -> Result<f64, String> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        _ => Err(format!("Unknown identifier: {name}")),
    }
}

fn call_function(name: &str, args: &[f64]) -> Result<f64, String> {
    let unary = |f: fn(f64) -> f64| -> Result<f64, String> {
        match args {
            [x] => Ok(f(*x)),
            _ => Err(format!("{name}() takes exactly one argument")),
        }
    };

    match name {
        "sqrt" => match args {
            [x] if *x < 0.0 => Err("Square root of a negative number".into()),
            _ => unary(f64::sqrt),
        },
        "ln" | "log10" => match args {
            [x] if *x <= 0.0 => Err(format!("{name}() of a non-positive number")),
            _ if name == "ln" => unary(f64::ln),
            _ => unary(f64::log10),
        },
        "abs" => unary(f64::abs),
        "round" => unary(f64::round),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "pow" => match args {
            [base, exp] => Ok(base.powf(*exp)),
            _ => Err("pow() takes exactly two arguments".into()),
        },
        "min" => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
        "max" => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        _ => Err(format!("Unknown function: {name}")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

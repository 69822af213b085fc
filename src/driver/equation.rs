//! Arithmetic evaluator for calculated table columns
//!
//! Expressions reference other columns through variables named
//! `c_<columnIndex>`. Supported syntax: numbers, variables, `+ - * / ^`,
//! unary minus, parentheses and the functions `sqrt` and `abs`.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref VARIABLE_PATTERN: Regex = Regex::new(r"\bc_(\d+)\b").expect("valid variable pattern");
}

/// Prefix of column variables
pub const VARIABLE_PREFIX: &str = "c_";

/// Name of the variable that refers to `column`
pub fn variable_name(column: usize) -> String {
    format!("{}{}", VARIABLE_PREFIX, column)
}

/// A parsed-on-demand expression over column variables
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    expression: String,
    variables: Vec<(String, usize)>,
}

impl Equation {
    pub fn new(expression: &str) -> Self {
        let mut variables: Vec<(String, usize)> = Vec::new();
        for capture in VARIABLE_PATTERN.captures_iter(expression) {
            let name = capture[0].to_string();
            let index = match capture[1].parse::<usize>() {
                Ok(index) => index,
                Err(_) => continue,
            };
            if !variables.iter().any(|(n, _)| *n == name) {
                variables.push((name, index));
            }
        }
        Equation { expression: expression.to_string(), variables }
    }

    /// Source text
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Variable names in order of first appearance
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(name, _)| name.as_str())
    }

    /// Column indices referenced by the expression
    pub fn columns(&self) -> Vec<usize> {
        self.variables.iter().map(|(_, index)| *index).collect()
    }

    /// Evaluate with the given variable values
    pub fn evaluate(&self, bindings: &HashMap<String, f64>) -> Result<f64, String> {
        let tokens = tokenize(&self.expression)?;
        let mut parser = Parser { tokens: &tokens, position: 0, bindings };
        let value = parser.expression()?;
        if parser.position != tokens.len() {
            return Err(format!("Unexpected token {:?} in '{}'", tokens[parser.position], self.expression));
        }
        if value.is_finite() {
            Ok(value)
        } else {
            Err(format!("'{}' does not evaluate to a finite value", self.expression))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Operator(char),
    Open,
    Close,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // exponent part, e.g. 1e-3
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text.parse::<f64>().map_err(|_| format!("Invalid number '{}'", text))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Identifier(chars[start..i].iter().collect()));
        } else if "+-*/^".contains(c) {
            tokens.push(Token::Operator(c));
            i += 1;
        } else if c == '(' {
            tokens.push(Token::Open);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::Close);
            i += 1;
        } else {
            return Err(format!("Unexpected character '{}'", c));
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    bindings: &'a HashMap<String, f64>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    fn expression(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(Token::Operator(op)) = self.peek() {
            let op = *op;
            if op != '+' && op != '-' {
                break;
            }
            self.position += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.power()?;
        while let Some(Token::Operator(op)) = self.peek() {
            let op = *op;
            if op != '*' && op != '/' {
                break;
            }
            self.position += 1;
            let rhs = self.power()?;
            value = if op == '*' { value * rhs } else { value / rhs };
        }
        Ok(value)
    }

    // right associative
    fn power(&mut self) -> Result<f64, String> {
        let base = self.unary()?;
        if let Some(Token::Operator('^')) = self.peek() {
            self.position += 1;
            let exponent = self.power()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Operator('-')) => {
                self.position += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Operator('+')) => {
                self.position += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, String> {
        match self.next().cloned() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Open) => {
                let value = self.expression()?;
                self.expect_close()?;
                Ok(value)
            }
            Some(Token::Identifier(name)) => {
                if let Some(Token::Open) = self.peek() {
                    self.position += 1;
                    let argument = self.expression()?;
                    self.expect_close()?;
                    return match name.as_str() {
                        "sqrt" => Ok(argument.sqrt()),
                        "abs" => Ok(argument.abs()),
                        _ => Err(format!("Unknown function '{}'", name)),
                    };
                }
                self.bindings.get(&name).copied()
                    .ok_or_else(|| format!("Variable '{}' has no value", name))
            }
            Some(token) => Err(format!("Unexpected token {:?}", token)),
            None => Err("Unexpected end of expression".to_string()),
        }
    }

    fn expect_close(&mut self) -> Result<(), String> {
        match self.next() {
            Some(Token::Close) => Ok(()),
            _ => Err("Missing closing parenthesis".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(values: &[(usize, f64)]) -> HashMap<String, f64> {
        values.iter().map(|(c, v)| (variable_name(*c), *v)).collect()
    }

    #[test]
    fn test_extracts_variables_once() {
        let equation = Equation::new("sqrt((c_1 - c_4)^2 + (c_2 - c_5)^2) + c_1");
        let names: Vec<&str> = equation.variables().collect();
        assert_eq!(names, vec!["c_1", "c_4", "c_2", "c_5"]);
        assert_eq!(equation.columns(), vec![1, 4, 2, 5]);
    }

    #[test]
    fn test_evaluates_quadratic_error() {
        let equation = Equation::new("sqrt((c_1 - c_4)^2 + (c_2 - c_5)^2)");
        let value = equation.evaluate(&bind(&[(1, 4.0), (4, 1.0), (2, 6.0), (5, 2.0)])).unwrap();
        assert!((value - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_precedence_and_unary_minus() {
        let equation = Equation::new("-2 ^ 2 + 3 * 4 - 10 / 4");
        // unary minus binds tighter than ^ here: (-2)^2
        assert!((equation.evaluate(&HashMap::new()).unwrap() - 13.5).abs() < 1e-12);
        let equation = Equation::new("2 ^ 3 ^ 2");
        assert_eq!(equation.evaluate(&HashMap::new()).unwrap(), 512.0);
        assert_eq!(Equation::new("1.5e2 + abs(-0.5)").evaluate(&HashMap::new()).unwrap(), 150.5);
    }

    #[test]
    fn test_errors() {
        assert!(Equation::new("c_1 + 1").evaluate(&HashMap::new()).is_err());
        assert!(Equation::new("(1 + 2").evaluate(&HashMap::new()).is_err());
        assert!(Equation::new("1 / 0").evaluate(&HashMap::new()).is_err());
        assert!(Equation::new("sqrt(-1)").evaluate(&HashMap::new()).is_err());
        assert!(Equation::new("foo(1)").evaluate(&HashMap::new()).is_err());
        assert!(Equation::new("1 $ 2").evaluate(&HashMap::new()).is_err());
    }
}

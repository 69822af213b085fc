//! Minimal WKT tree parser
//!
//! Both spatial-reference WKT and the raster-model `PARAM_MT` encoding share
//! the same `KEYWORD[value, value, ...]` grammar. This module parses that
//! grammar into a small tree so callers can look up nodes by keyword.

use std::fmt;

use crate::errors::{GeorefError, GeorefResult};

/// A single value inside a WKT node
#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    /// Double-quoted string
    Text(String),
    /// Bare number
    Number(f64),
    /// Bare keyword without brackets (e.g. `EAST`)
    Keyword(String),
    /// Nested node
    Node(WktNode),
}

/// A `KEYWORD[...]` node
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    /// Node keyword, as written
    pub keyword: String,
    /// Ordered node values
    pub values: Vec<WktValue>,
}

impl WktNode {
    /// Create a new empty node
    pub fn new(keyword: &str) -> Self {
        WktNode {
            keyword: keyword.to_string(),
            values: Vec::new(),
        }
    }

    /// Parse a complete WKT string into its root node
    pub fn parse(text: &str) -> GeorefResult<WktNode> {
        let mut parser = WktParser { chars: text.char_indices().peekable(), text };
        let node = parser.parse_node()?;
        parser.skip_whitespace();
        if let Some((pos, _)) = parser.chars.peek() {
            return Err(GeorefError::Wkt(format!("Trailing characters at offset {}", pos)));
        }
        Ok(node)
    }

    /// First string value of the node (usually its name)
    pub fn name(&self) -> Option<&str> {
        self.values.iter().find_map(|v| match v {
            WktValue::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Direct children that are nodes
    pub fn children(&self) -> impl Iterator<Item = &WktNode> {
        self.values.iter().filter_map(|v| match v {
            WktValue::Node(n) => Some(n),
            _ => None,
        })
    }

    /// First direct child with the given keyword (case-insensitive)
    pub fn child(&self, keyword: &str) -> Option<&WktNode> {
        self.children().find(|n| n.keyword.eq_ignore_ascii_case(keyword))
    }

    /// Number values of the node, in order
    pub fn numbers(&self) -> Vec<f64> {
        self.values.iter().filter_map(|v| match v {
            WktValue::Number(n) => Some(*n),
            _ => None,
        }).collect()
    }
}

impl fmt::Display for WktNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.keyword)?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match value {
                WktValue::Text(s) => write!(f, "\"{}\"", s.replace('"', "\"\""))?,
                // Debug formatting keeps the shortest representation that round-trips
                WktValue::Number(n) => write!(f, "{:?}", n)?,
                WktValue::Keyword(k) => write!(f, "{}", k)?,
                WktValue::Node(n) => write!(f, "{}", n)?,
            }
        }
        write!(f, "]")
    }
}

struct WktParser<'t> {
    chars: std::iter::Peekable<std::str::CharIndices<'t>>,
    text: &'t str,
}

impl<'t> WktParser<'t> {
    fn skip_whitespace(&mut self) {
        while let Some((_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn error(&mut self, message: &str) -> GeorefError {
        let pos = self.chars.peek().map(|(p, _)| *p).unwrap_or(self.text.len());
        GeorefError::Wkt(format!("{} at offset {}", message, pos))
    }

    fn parse_keyword(&mut self) -> String {
        let mut keyword = String::new();
        while let Some((_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || *c == '_' {
                keyword.push(*c);
                self.chars.next();
            } else {
                break;
            }
        }
        keyword
    }

    fn parse_node(&mut self) -> GeorefResult<WktNode> {
        self.skip_whitespace();
        let keyword = self.parse_keyword();
        if keyword.is_empty() {
            return Err(self.error("Expected WKT keyword"));
        }
        self.skip_whitespace();
        self.parse_body(&keyword)
    }

    /// Parse `[v, v, ...]` (or the parenthesized variant) after a keyword
    fn parse_body(&mut self, keyword: &str) -> GeorefResult<WktNode> {
        let close = match self.chars.next() {
            Some((_, '[')) => ']',
            Some((_, '(')) => ')',
            _ => return Err(self.error(&format!("Expected '[' after {}", keyword))),
        };

        let mut node = WktNode::new(keyword);
        loop {
            self.skip_whitespace();
            if let Some((_, c)) = self.chars.peek() {
                if *c == close && node.values.is_empty() {
                    self.chars.next();
                    return Ok(node);
                }
            }
            node.values.push(self.parse_value()?);
            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, c)) if c == close => return Ok(node),
                _ => return Err(self.error(&format!("Unterminated {} node", keyword))),
            }
        }
    }

    fn parse_value(&mut self) -> GeorefResult<WktValue> {
        self.skip_whitespace();
        match self.chars.peek().map(|(_, c)| *c) {
            Some('"') => {
                self.chars.next();
                let mut text = String::new();
                loop {
                    match self.chars.next() {
                        // doubled quotes escape a quote inside a string
                        Some((_, '"')) => {
                            if matches!(self.chars.peek(), Some((_, '"'))) {
                                self.chars.next();
                                text.push('"');
                            } else {
                                return Ok(WktValue::Text(text));
                            }
                        }
                        Some((_, c)) => text.push(c),
                        None => return Err(self.error("Unterminated string")),
                    }
                }
            }
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                let mut number = String::new();
                while let Some((_, c)) = self.chars.peek() {
                    if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                        number.push(*c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                number.parse::<f64>()
                    .map(WktValue::Number)
                    .map_err(|_| GeorefError::Wkt(format!("Invalid number '{}'", number)))
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let keyword = self.parse_keyword();
                self.skip_whitespace();
                match self.chars.peek().map(|(_, c)| *c) {
                    Some('[') | Some('(') => Ok(WktValue::Node(self.parse_body(&keyword)?)),
                    _ => Ok(WktValue::Keyword(keyword)),
                }
            }
            _ => Err(self.error("Unexpected character")),
        }
    }
}

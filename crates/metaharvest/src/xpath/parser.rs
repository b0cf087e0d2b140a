//! Recursive-descent parser for the XPath subset.
//!
//! The dialect covers what publisher schema tables actually write: absolute
//! and relative location paths, `//` descendants, name and `*` tests,
//! terminal `@attr` and `text()` steps, `.`/`..`, and predicates that are
//! positional (`[2]`), existence (`[IDValue]`, `[@id]`) or an equality test
//! against a quoted literal (`[ProductIDType = "15"]`, `[@fmt != '00']`).
//!
//! Name tests are namespace-naive: a prefix before `:` is stripped at compile
//! time and matching happens on local names only.

use crate::error::{HarvestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Descendant,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeTest {
    /// Element with the given local name.
    Name(String),
    /// Any element.
    Wildcard,
    /// Attribute of the context element. Terminal.
    Attribute(String),
    /// Text node children. Terminal.
    Text,
    /// The context node itself (`.` / `..` steps).
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone)]
pub(crate) enum Predicate {
    /// 1-based position among the step's matches under one context node.
    Position(usize),
    /// True when the relative path matches at least one node.
    Exists(Vec<Step>),
    /// True when any node matched by the relative path compares true
    /// against the literal.
    Compare {
        operand: Vec<Step>,
        op: CmpOp,
        literal: String,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Predicate>,
}

/// Parse `expr` into (anchored-at-root, steps).
pub(crate) fn parse(expr: &str) -> Result<(bool, Vec<Step>)> {
    let mut p = Parser {
        expr,
        bytes: expr.as_bytes(),
        pos: 0,
    };
    p.parse_path()
}

struct Parser<'a> {
    expr: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn err(&self, message: impl Into<String>) -> HarvestError {
        HarvestError::path_syntax(self.expr, message)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.bytes[self.pos..].starts_with(s.as_bytes()) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn parse_path(&mut self) -> Result<(bool, Vec<Step>)> {
        self.skip_ws();
        if self.at_end() {
            return Err(self.err("empty expression"));
        }
        let mut anchored = false;
        let mut axis = Axis::Child;
        if self.eat_str("//") {
            anchored = true;
            axis = Axis::Descendant;
        } else if self.eat(b'/') {
            anchored = true;
            // "/" alone selects the root
            if self.at_end() {
                return Ok((true, Vec::new()));
            }
        }

        let mut steps = Vec::new();
        loop {
            let step = self.parse_step(axis, true)?;
            let terminal = matches!(step.test, NodeTest::Attribute(_) | NodeTest::Text);
            steps.push(step);
            self.skip_ws();
            if self.at_end() {
                break;
            }
            if terminal {
                return Err(self.err("`@attr` and `text()` must be the final step"));
            }
            if self.eat_str("//") {
                axis = Axis::Descendant;
            } else if self.eat(b'/') {
                axis = Axis::Child;
            } else {
                return Err(self.err(format!("unexpected character at offset {}", self.pos)));
            }
        }
        Ok((anchored, steps))
    }

    fn parse_step(&mut self, axis: Axis, allow_predicates: bool) -> Result<Step> {
        if self.eat(b'.') {
            if self.eat(b'.') {
                return Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            return Ok(Step {
                axis: Axis::SelfNode,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let test = if self.eat(b'@') {
            let name = self.parse_name()?;
            NodeTest::Attribute(local_name(&name))
        } else if self.eat_str("text()") {
            NodeTest::Text
        } else if self.eat(b'*') {
            NodeTest::Wildcard
        } else {
            let name = self.parse_name()?;
            NodeTest::Name(local_name(&name))
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(b'[') {
            if !allow_predicates {
                return Err(self.err("nested predicates are not supported"));
            }
            self.pos += 1;
            predicates.push(self.parse_predicate()?);
            self.skip_ws();
            if !self.eat(b']') {
                return Err(self.err("unterminated predicate"));
            }
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            let c = b as char;
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.err(format!("expected a name at offset {}", start)));
        }
        Ok(self.expr[start..self.pos].to_string())
    }

    fn parse_predicate(&mut self) -> Result<Predicate> {
        self.skip_ws();
        if self.peek().is_some_and(|b| b.is_ascii_digit()) {
            let start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            let n: usize = self.expr[start..self.pos]
                .parse()
                .map_err(|_| self.err("invalid position predicate"))?;
            if n == 0 {
                return Err(self.err("positions are 1-based"));
            }
            return Ok(Predicate::Position(n));
        }

        let operand = self.parse_predicate_path()?;
        self.skip_ws();
        let op = if self.eat_str("!=") {
            Some(CmpOp::Ne)
        } else if self.eat(b'=') {
            Some(CmpOp::Eq)
        } else {
            None
        };
        match op {
            None => Ok(Predicate::Exists(operand)),
            Some(op) => {
                self.skip_ws();
                let literal = self.parse_literal()?;
                Ok(Predicate::Compare {
                    operand,
                    op,
                    literal,
                })
            }
        }
    }

    fn parse_predicate_path(&mut self) -> Result<Vec<Step>> {
        let mut steps = Vec::new();
        loop {
            let step = self.parse_step(Axis::Child, false)?;
            let terminal = matches!(step.test, NodeTest::Attribute(_) | NodeTest::Text);
            steps.push(step);
            if terminal || !self.eat(b'/') {
                break;
            }
        }
        Ok(steps)
    }

    fn parse_literal(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.err("expected a quoted literal")),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                let lit = self.expr[start..self.pos].to_string();
                self.pos += 1;
                return Ok(lit);
            }
            self.pos += 1;
        }
        Err(self.err("unterminated string literal"))
    }
}

fn local_name(name: &str) -> String {
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.to_string(),
    }
}

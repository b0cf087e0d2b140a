//! Compiled JsonPath expressions evaluated over `serde_json::Value` trees.
//!
//! Same contract as [`crate::xpath`]: compile once, evaluate to an ordered
//! node set, zero matches means an absent field. When a path is evaluated per
//! record, `$` refers to the record-scope value rather than the whole
//! document, which is what lets the same `$.doi` expression work inside every
//! element of `$.articles[*]`.
//!
//! Dialect: `$`, `.name`, `['name']`, `[n]`, `[*]`, `.*`, and recursive
//! descent `..name`.

use crate::error::{HarvestError, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum JsonStep {
    /// `.name` or `['name']`
    Child(String),
    /// `[n]`
    Index(usize),
    /// `[*]` or `.*` — every array element or object member, in order.
    Wildcard,
    /// `..name` — every descendant member with this name, depth-first.
    Recursive(String),
}

/// A compiled, reusable JsonPath expression.
#[derive(Debug, Clone)]
pub struct JsonPath {
    raw: String,
    steps: Vec<JsonStep>,
}

impl JsonPath {
    /// Compile `expr`, failing with `PathSyntax` on a malformed expression.
    pub fn compile(expr: &str) -> Result<Self> {
        let steps = parse(expr)?;
        Ok(Self {
            raw: expr.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Evaluate against `root`, returning matched values in document order.
    pub fn evaluate<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];
        for step in &self.steps {
            let mut next = Vec::new();
            for value in current {
                apply_step(value, step, &mut next);
            }
            current = next;
        }
        current
    }
}

fn apply_step<'a>(value: &'a Value, step: &JsonStep, out: &mut Vec<&'a Value>) {
    match step {
        JsonStep::Child(name) => {
            if let Some(v) = value.get(name.as_str()) {
                out.push(v);
            }
        }
        JsonStep::Index(i) => {
            if let Some(v) = value.get(*i) {
                out.push(v);
            }
        }
        JsonStep::Wildcard => match value {
            Value::Array(items) => out.extend(items.iter()),
            Value::Object(map) => out.extend(map.values()),
            _ => {}
        },
        JsonStep::Recursive(name) => descend(value, name, out),
    }
}

fn descend<'a>(value: &'a Value, name: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == name {
                    out.push(v);
                }
                descend(v, name, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                descend(v, name, out);
            }
        }
        _ => {}
    }
}

fn parse(expr: &str) -> Result<Vec<JsonStep>> {
    let err = |message: &str| HarvestError::path_syntax(expr, message);
    let bytes = expr.as_bytes();
    let mut pos = 0usize;

    if !expr.starts_with('$') {
        return Err(err("expression must start with `$`"));
    }
    pos += 1;

    let mut steps = Vec::new();
    while pos < bytes.len() {
        match bytes[pos] {
            b'.' => {
                pos += 1;
                if pos < bytes.len() && bytes[pos] == b'.' {
                    pos += 1;
                    let (name, new_pos) = parse_bare_name(expr, pos)
                        .ok_or_else(|| err("`..` must be followed by a member name"))?;
                    steps.push(JsonStep::Recursive(name));
                    pos = new_pos;
                } else if pos < bytes.len() && bytes[pos] == b'*' {
                    pos += 1;
                    steps.push(JsonStep::Wildcard);
                } else if pos < bytes.len() && bytes[pos] == b'[' {
                    // jayway-style `$.[*]` — the dot is decorative
                    continue;
                } else {
                    let (name, new_pos) = parse_bare_name(expr, pos)
                        .ok_or_else(|| err("expected a member name after `.`"))?;
                    steps.push(JsonStep::Child(name));
                    pos = new_pos;
                }
            }
            b'[' => {
                pos += 1;
                if pos >= bytes.len() {
                    return Err(err("unterminated bracket selector"));
                }
                match bytes[pos] {
                    b'*' => {
                        pos += 1;
                        steps.push(JsonStep::Wildcard);
                    }
                    b'\'' | b'"' => {
                        let quote = bytes[pos];
                        pos += 1;
                        let start = pos;
                        while pos < bytes.len() && bytes[pos] != quote {
                            pos += 1;
                        }
                        if pos >= bytes.len() {
                            return Err(err("unterminated quoted member name"));
                        }
                        steps.push(JsonStep::Child(expr[start..pos].to_string()));
                        pos += 1;
                    }
                    b'0'..=b'9' => {
                        let start = pos;
                        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                            pos += 1;
                        }
                        let index: usize = expr[start..pos]
                            .parse()
                            .map_err(|_| err("invalid array index"))?;
                        steps.push(JsonStep::Index(index));
                    }
                    _ => return Err(err("unsupported bracket selector")),
                }
                if pos >= bytes.len() || bytes[pos] != b']' {
                    return Err(err("expected `]`"));
                }
                pos += 1;
            }
            _ => return Err(err("expected `.` or `[`")),
        }
    }
    Ok(steps)
}

fn parse_bare_name(expr: &str, start: usize) -> Option<(String, usize)> {
    let bytes = expr.as_bytes();
    let mut pos = start;
    while pos < bytes.len() {
        let c = bytes[pos] as char;
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
            pos += 1;
        } else {
            break;
        }
    }
    if pos == start {
        None
    } else {
        Some((expr[start..pos].to_string(), pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(doc: &Value, expr: &str) -> Vec<Value> {
        JsonPath::compile(expr)
            .unwrap()
            .evaluate(doc)
            .into_iter()
            .cloned()
            .collect()
    }

    #[test]
    fn test_root_only() {
        let doc = json!({"a": 1});
        let got = eval(&doc, "$");
        assert_eq!(got, vec![doc.clone()]);
    }

    #[test]
    fn test_dot_children() {
        let doc = json!({"meta": {"doi": "10.1/x"}});
        assert_eq!(eval(&doc, "$.meta.doi"), vec![json!("10.1/x")]);
    }

    #[test]
    fn test_bracket_child_and_index() {
        let doc = json!({"authors": ["A", "B"]});
        assert_eq!(eval(&doc, "$['authors'][1]"), vec![json!("B")]);
        assert_eq!(eval(&doc, "$.authors[0]"), vec![json!("A")]);
    }

    #[test]
    fn test_array_wildcard_order() {
        let doc = json!({"articles": [{"doi": "10.1/x"}, {"doi": "10.1/y"}]});
        let got = eval(&doc, "$.articles[*].doi");
        assert_eq!(got, vec![json!("10.1/x"), json!("10.1/y")]);
    }

    #[test]
    fn test_object_wildcard() {
        let doc = json!({"ids": {"print": "1234", "online": "5678"}});
        let got = eval(&doc, "$.ids.*");
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn test_object_members_keep_document_order() {
        // keys deliberately out of alphabetical order; matches must come back
        // as written, not sorted
        let doc = json!({"records": {"zeta": {"id": "Z"}, "alpha": {"id": "A"}}});
        assert_eq!(
            eval(&doc, "$.records.*.id"),
            vec![json!("Z"), json!("A")]
        );
        assert_eq!(eval(&doc, "$..id"), vec![json!("Z"), json!("A")]);
    }

    #[test]
    fn test_recursive_descent() {
        let doc = json!({"a": {"doi": "1"}, "b": [{"doi": "2"}]});
        let got = eval(&doc, "$..doi");
        assert_eq!(got, vec![json!("1"), json!("2")]);
    }

    #[test]
    fn test_relative_to_scope_value() {
        let doc = json!({"articles": [{"doi": "10.1/x"}]});
        let scopes = JsonPath::compile("$.articles[*]").unwrap();
        let field = JsonPath::compile("$.doi").unwrap();
        let nodes = scopes.evaluate(&doc);
        assert_eq!(field.evaluate(nodes[0]), vec![&json!("10.1/x")]);
    }

    #[test]
    fn test_zero_matches() {
        let doc = json!({"a": 1});
        assert!(eval(&doc, "$.missing").is_empty());
        assert!(eval(&doc, "$.a[0]").is_empty());
    }

    #[test]
    fn test_jayway_decorative_dot() {
        let doc = json!([{"id": 1}, {"id": 2}]);
        let got = eval(&doc, "$.[*].id");
        assert_eq!(got, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(JsonPath::compile("articles").is_err());
        assert!(JsonPath::compile("$.").is_err());
        assert!(JsonPath::compile("$[").is_err());
        assert!(JsonPath::compile("$['a").is_err());
        assert!(JsonPath::compile("$..").is_err());
        assert!(JsonPath::compile("$[?(@.x)]").is_err());
    }
}

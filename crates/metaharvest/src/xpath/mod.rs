//! Compiled XPath expressions evaluated over a `roxmltree` document.
//!
//! The pack of publisher schemas drives a deliberately small dialect (see
//! [`parser`]); evaluation always yields a node set in document order with
//! duplicates removed, because every consumer in the engine wants node-set
//! semantics: zero matches means an absent field, never an error.

mod parser;

use crate::error::Result;
use parser::{Axis, CmpOp, NodeTest, Predicate, Step};
use roxmltree::Node;

/// A compiled, reusable XPath expression. `Send + Sync`; compile once per
/// schema and share across extractions.
#[derive(Debug, Clone)]
pub struct XPath {
    raw: String,
    anchored: bool,
    steps: Vec<Step>,
}

/// One node-set member produced by evaluation.
#[derive(Debug, Clone, Copy)]
pub enum XMatch<'a, 'input> {
    /// An element (or the document root).
    Element(Node<'a, 'input>),
    /// An attribute, carried as its owning element plus the value.
    Attribute {
        owner: Node<'a, 'input>,
        value: &'a str,
    },
    /// A text node.
    Text(Node<'a, 'input>),
}

impl<'a, 'input> XMatch<'a, 'input> {
    /// XPath string value: concatenated descendant text for an element, the
    /// literal value for an attribute or text node.
    pub fn string_value(&self) -> String {
        match self {
            XMatch::Element(node) => element_text(*node),
            XMatch::Attribute { value, .. } => (*value).to_string(),
            XMatch::Text(node) => node.text().unwrap_or("").to_string(),
        }
    }

    /// The element this match belongs to, when it is one.
    pub fn as_element(&self) -> Option<Node<'a, 'input>> {
        match self {
            XMatch::Element(node) => Some(*node),
            _ => None,
        }
    }
}

/// Concatenated text content of all descendant text nodes. Useful inside
/// custom node extractors built with [`crate::schema::xml_node_value`].
pub fn element_text(node: Node<'_, '_>) -> String {
    let mut out = String::new();
    for d in node.descendants() {
        if d.is_text() {
            if let Some(t) = d.text() {
                out.push_str(t);
            }
        }
    }
    out
}

impl XPath {
    /// Compile `expr`, failing with `PathSyntax` on a malformed expression.
    pub fn compile(expr: &str) -> Result<Self> {
        let (anchored, steps) = parser::parse(expr)?;
        Ok(Self {
            raw: expr.to_string(),
            anchored,
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Evaluate against `context`, returning matches in document order.
    ///
    /// An anchored expression ignores `context` and starts at the document
    /// root; a relative one walks down from `context`.
    pub fn evaluate<'a, 'input>(&self, context: Node<'a, 'input>) -> Vec<XMatch<'a, 'input>> {
        let start = if self.anchored {
            context.document().root()
        } else {
            context
        };
        eval_steps(start, &self.steps)
    }
}

fn eval_steps<'a, 'input>(start: Node<'a, 'input>, steps: &[Step]) -> Vec<XMatch<'a, 'input>> {
    let mut nodes: Vec<Node<'a, 'input>> = vec![start];

    for (i, step) in steps.iter().enumerate() {
        debug_assert!(i == steps.len() - 1 || !is_terminal(&step.test));
        match &step.test {
            NodeTest::Attribute(name) => {
                return nodes
                    .iter()
                    .filter_map(|n| {
                        n.attribute(name.as_str())
                            .map(|value| XMatch::Attribute { owner: *n, value })
                    })
                    .collect();
            }
            NodeTest::Text => {
                let mut out = Vec::new();
                for n in &nodes {
                    match step.axis {
                        Axis::Descendant => {
                            for d in n.descendants().skip(1).filter(Node::is_text) {
                                out.push(XMatch::Text(d));
                            }
                        }
                        _ => {
                            for c in n.children().filter(Node::is_text) {
                                out.push(XMatch::Text(c));
                            }
                        }
                    }
                }
                return out;
            }
            NodeTest::Node => {
                let mut next = Vec::new();
                for n in &nodes {
                    match step.axis {
                        Axis::Parent => {
                            if let Some(p) = n.parent() {
                                push_unique(&mut next, p);
                            }
                        }
                        _ => push_unique(&mut next, *n),
                    }
                }
                nodes = next;
            }
            NodeTest::Name(_) | NodeTest::Wildcard => {
                let mut next = Vec::new();
                for n in &nodes {
                    let mut candidates: Vec<Node<'a, 'input>> = match step.axis {
                        Axis::Descendant => n
                            .descendants()
                            .skip(1)
                            .filter(|c| test_matches(*c, &step.test))
                            .collect(),
                        _ => n
                            .children()
                            .filter(|c| test_matches(*c, &step.test))
                            .collect(),
                    };
                    // predicates apply one after another; a position counts
                    // within the survivors of the predicates before it
                    for predicate in &step.predicates {
                        candidates = candidates
                            .into_iter()
                            .enumerate()
                            .filter(|(idx, c)| predicate_holds(*c, idx + 1, predicate))
                            .map(|(_, c)| c)
                            .collect();
                    }
                    for c in candidates {
                        push_unique(&mut next, c);
                    }
                }
                nodes = next;
            }
        }
    }

    nodes.into_iter().map(XMatch::Element).collect()
}

fn is_terminal(test: &NodeTest) -> bool {
    matches!(test, NodeTest::Attribute(_) | NodeTest::Text)
}

fn test_matches(node: Node<'_, '_>, test: &NodeTest) -> bool {
    if !node.is_element() {
        return false;
    }
    match test {
        NodeTest::Wildcard => true,
        // namespace-naive: local names only
        NodeTest::Name(name) => node.tag_name().name() == name,
        _ => false,
    }
}

fn predicate_holds(node: Node<'_, '_>, position: usize, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Position(p) => position == *p,
        Predicate::Exists(path) => !eval_steps(node, path).is_empty(),
        Predicate::Compare {
            operand,
            op,
            literal,
        } => {
            let matches = eval_steps(node, operand);
            match op {
                CmpOp::Eq => matches.iter().any(|m| m.string_value() == *literal),
                CmpOp::Ne => matches.iter().any(|m| m.string_value() != *literal),
            }
        }
    }
}

fn push_unique<'a, 'input>(nodes: &mut Vec<Node<'a, 'input>>, node: Node<'a, 'input>) {
    if !nodes.contains(&node) {
        nodes.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn values(doc: &Document, expr: &str) -> Vec<String> {
        let xp = XPath::compile(expr).unwrap();
        xp.evaluate(doc.root())
            .iter()
            .map(XMatch::string_value)
            .collect()
    }

    #[test]
    fn test_absolute_selection() {
        let doc = Document::parse("<items><item>A</item><item>B</item></items>").unwrap();
        assert_eq!(values(&doc, "/items/item"), vec!["A", "B"]);
    }

    #[test]
    fn test_relative_from_context() {
        let doc = Document::parse("<r><rec><t>X</t></rec><rec><t>Y</t></rec></r>").unwrap();
        let boundary = XPath::compile("/r/rec").unwrap();
        let field = XPath::compile("t").unwrap();
        let scopes = boundary.evaluate(doc.root());
        assert_eq!(scopes.len(), 2);
        let first = field.evaluate(scopes[0].as_element().unwrap());
        assert_eq!(first[0].string_value(), "X");
        let second = field.evaluate(scopes[1].as_element().unwrap());
        assert_eq!(second[0].string_value(), "Y");
    }

    #[test]
    fn test_zero_matches_is_empty_set() {
        let doc = Document::parse("<r><a>1</a></r>").unwrap();
        assert!(values(&doc, "/r/missing").is_empty());
    }

    #[test]
    fn test_descendant_axis() {
        let doc = Document::parse("<r><a><b>1</b></a><b>2</b></r>").unwrap();
        assert_eq!(values(&doc, "//b"), vec!["1", "2"]);
        assert_eq!(values(&doc, "/r//b"), vec!["1", "2"]);
    }

    #[test]
    fn test_document_order_no_duplicates() {
        let doc = Document::parse("<r><a><a><b>1</b></a></a></r>").unwrap();
        // nested contexts would surface b twice without deduplication
        assert_eq!(values(&doc, "//a//b"), vec!["1"]);
    }

    #[test]
    fn test_attribute_selection() {
        let doc = Document::parse(r#"<r><a id="one"/><a id="two"/><a/></r>"#).unwrap();
        assert_eq!(values(&doc, "/r/a/@id"), vec!["one", "two"]);
    }

    #[test]
    fn test_equality_predicate_on_child() {
        let xml = r#"<r>
            <pid><type>15</type><val>9781</val></pid>
            <pid><type>06</type><val>10.1/x</val></pid>
        </r>"#;
        let doc = Document::parse(xml).unwrap();
        let got = values(&doc, "/r/pid[type = \"06\"]/val");
        assert_eq!(got, vec!["10.1/x"]);
    }

    #[test]
    fn test_attribute_predicate() {
        let doc =
            Document::parse(r#"<r><d fmt="00">20200101</d><d fmt="05">2020</d></r>"#).unwrap();
        assert_eq!(values(&doc, "/r/d[@fmt = '05']"), vec!["2020"]);
        assert_eq!(values(&doc, "/r/d[@fmt != '05']"), vec!["20200101"]);
    }

    #[test]
    fn test_positional_predicate_per_context() {
        let xml = "<r><g><i>a</i><i>b</i></g><g><i>c</i></g></r>";
        let doc = Document::parse(xml).unwrap();
        // position counts restart under each context node
        assert_eq!(values(&doc, "/r/g/i[1]"), vec!["a", "c"]);
        assert_eq!(values(&doc, "/r/g/i[2]"), vec!["b"]);
    }

    #[test]
    fn test_predicates_apply_in_sequence() {
        let xml = r#"<r>
            <a x="0">skip</a>
            <a x="1">first</a>
            <a x="1">second</a>
        </r>"#;
        let doc = Document::parse(xml).unwrap();
        // position counts among the survivors of the filter before it, so
        // [1] here means "first of the x='1' elements", not "the overall
        // first element, which must also have x='1'"
        assert_eq!(values(&doc, "/r/a[@x = '1'][1]"), vec!["first"]);
        assert_eq!(values(&doc, "/r/a[@x = '1'][2]"), vec!["second"]);
        assert_eq!(values(&doc, "/r/a[1][@x = '1']"), Vec::<String>::new());
    }

    #[test]
    fn test_existence_predicate() {
        let xml = "<r><p><isbn>1</isbn></p><p/></r>";
        let doc = Document::parse(xml).unwrap();
        let got = values(&doc, "/r/p[isbn]");
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_wildcard_and_text() {
        let doc = Document::parse("<r><a>1</a><b>2</b></r>").unwrap();
        assert_eq!(values(&doc, "/r/*"), vec!["1", "2"]);
        assert_eq!(values(&doc, "/r/a/text()"), vec!["1"]);
    }

    #[test]
    fn test_namespace_naive_matching() {
        let xml = r#"<ns:r xmlns:ns="http://example.com"><ns:a>1</ns:a></ns:r>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(values(&doc, "/r/a"), vec!["1"]);
        assert_eq!(values(&doc, "/ns:r/ns:a"), vec!["1"]);
    }

    #[test]
    fn test_element_string_value_is_deep() {
        let doc = Document::parse("<r><t>Hello <b>world</b>!</t></r>").unwrap();
        assert_eq!(values(&doc, "/r/t"), vec!["Hello world!"]);
    }

    #[test]
    fn test_parent_step() {
        let doc = Document::parse("<r><pub>Acme</pub><rec><t>X</t></rec></r>").unwrap();
        let boundary = XPath::compile("/r/rec").unwrap();
        let up = XPath::compile("../pub").unwrap();
        let scope = boundary.evaluate(doc.root())[0].as_element().unwrap();
        assert_eq!(up.evaluate(scope)[0].string_value(), "Acme");
    }

    #[test]
    fn test_compiled_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<XPath>();
    }
}

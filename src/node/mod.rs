use std::fmt;

/// Byte range of the source text a node was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub begin: usize,
    pub end: usize,
}

impl Span {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.begin, self.end)
    }
}

/// Node is the universal tree element produced by every parser in this crate and consumed by the
/// backends and the tree-to-source compiler.
///
/// The `name` of a node decides the meaning of its children. Consumers rely on positional
/// conventions per name, for instance a `Comparison` always holds exactly three children:
/// left operand, comparator and right operand.
///
/// Nodes own their children, so a node can never be its own ancestor. Once a parser has built a
/// tree it is only ever read.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    children: Vec<Node>,
    data: String,
    span: Span,
}

impl Node {
    pub fn new(name: impl Into<String>, data: impl Into<String>, span: Span, children: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            children,
            data: data.into(),
            span,
        }
    }

    /// Leaf node holding a literal value, used when building trees by hand.
    pub fn leaf(name: impl Into<String>, data: impl Into<String>) -> Self {
        let data = data.into();
        let span = Span::new(0, data.len());
        Self::new(name, data, span, vec![])
    }

    /// Inner node whose data is the concatenation of its children's data.
    pub fn branch(name: impl Into<String>, children: Vec<Node>) -> Self {
        let data: String = children.iter().map(|child| child.data.as_str()).collect();
        let span = Span::new(0, data.len());
        Self::new(name, data, span, children)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// The literal source text this node spans.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.children.last()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Counts this node and all of its descendants.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Node::len).sum::<usize>()
    }

    /// Two trees are equivalent when they have the same shape, the same rule names and the
    /// same child ordering. Data and spans are not compared.
    pub fn is_equivalent(&self, other: &Node) -> bool {
        self.name == other.name
            && self.children.len() == other.children.len()
            && self.children.iter()
                .zip(other.children.iter())
                .all(|(lhs, rhs)| lhs.is_equivalent(rhs))
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{}{}: \"{}\" - Data: {:?}", "\t".repeat(depth), self.span, self.name, self.data)?;
        for child in &self.children {
            child.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

/// Indented tree dump, one node per line.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::branch("Comparison", vec![
            Node::leaf("Identifier", "x"),
            Node::leaf("ge", ">="),
            Node::leaf("Integer", "5"),
        ])
    }

    #[test]
    fn test_branch_data_is_concatenated() {
        let node = sample();
        assert_eq!("x>=5", node.data());
        assert_eq!(3, node.children().len());
        assert_eq!(4, node.len());
        assert_eq!(Some("Integer"), node.last_child().map(Node::name));
    }

    #[test]
    fn test_equivalence_ignores_data() {
        let other = Node::branch("Comparison", vec![
            Node::leaf("Identifier", "y"),
            Node::leaf("ge", ">="),
            Node::leaf("Integer", "10"),
        ]);
        assert!(sample().is_equivalent(&other));
        assert_ne!(sample(), other);
    }

    #[test]
    fn test_equivalence_respects_order() {
        let swapped = Node::branch("Comparison", vec![
            Node::leaf("Integer", "5"),
            Node::leaf("ge", ">="),
            Node::leaf("Identifier", "x"),
        ]);
        assert!(!sample().is_equivalent(&swapped));
    }

    #[test]
    fn test_tree_dump() {
        let dump = sample().to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(4, lines.len());
        assert_eq!("0-4: \"Comparison\" - Data: \"x>=5\"", lines[0]);
        assert_eq!("\t0-1: \"Identifier\" - Data: \"x\"", lines[1]);
    }
}

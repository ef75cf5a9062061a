//! Tagged model of a PEG grammar, lowered from the Node tree the grammar parser produces.
//!
//! Backends and the interpreter work on this model instead of re-deriving the meaning of
//! `Prefix`/`Suffix`/`Primary` nodes everywhere.

use std::collections::HashSet;

use crate::error::GenerationError;
use crate::node::Node;

/// A single entry of a character class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    Single(char),
    Range(char, char),
}

impl ClassItem {
    pub fn bounds(&self) -> (char, char) {
        match *self {
            ClassItem::Single(c) => (c, c),
            ClassItem::Range(low, high) => (low, high),
        }
    }

    pub fn contains(&self, c: char) -> bool {
        let (low, high) = self.bounds();
        low <= c && c <= high
    }
}

/// Parsing expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// e1 e2 ... all must match in order
    Sequence(Vec<Expression>),
    /// e1 / e2 / ... first match wins
    Choice(Vec<Expression>),
    /// e*
    ZeroOrMore(Box<Expression>),
    /// e+
    OneOrMore(Box<Expression>),
    /// e?
    Optional(Box<Expression>),
    /// &e, never consumes
    And(Box<Expression>),
    /// !e, never consumes
    Not(Box<Expression>),
    /// 'text'
    Literal(String),
    /// [a-z_]
    Class(Vec<ClassItem>),
    /// .
    Any,
    /// Reference to another definition
    Rule(String),
}

impl Expression {
    /// Names of all rules referenced by this expression in order of first appearance.
    pub fn referenced_rules(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut rules = Vec::new();
        self.collect_rules(&mut seen, &mut rules);
        rules
    }

    fn collect_rules<'a>(&'a self, seen: &mut HashSet<&'a str>, rules: &mut Vec<&'a str>) {
        match self {
            Expression::Sequence(items) | Expression::Choice(items) => {
                for item in items {
                    item.collect_rules(seen, rules);
                }
            }
            Expression::ZeroOrMore(inner)
            | Expression::OneOrMore(inner)
            | Expression::Optional(inner)
            | Expression::And(inner)
            | Expression::Not(inner) => inner.collect_rules(seen, rules),
            Expression::Rule(name) => {
                if seen.insert(name.as_str()) {
                    rules.push(name.as_str());
                }
            }
            Expression::Literal(_) | Expression::Class(_) | Expression::Any => {}
        }
    }
}

/// Named rule of a grammar
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub expression: Expression,
}

/// Grammar is the ordered list of definitions, the first one is the entry rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    pub definitions: Vec<Definition>,
}

impl Grammar {
    /// Lowers the tree produced by the PEG grammar parser.
    /// Definitions keep the order they have in the tree, the trailing `EndOfFile` marker is
    /// skipped. A rule name defined twice is rejected at its second definition.
    pub fn from_node(root: &Node) -> Result<Self, GenerationError> {
        let mut definitions = Vec::new();
        for child in root.children() {
            match child.name() {
                "Definition" => {
                    let definition = lower_definition(child)?;
                    if definitions.iter().any(|defined: &Definition| defined.name == definition.name) {
                        return Err(GenerationError::malformed(child, "a rule name defined only once"));
                    }
                    definitions.push(definition);
                }
                "EndOfFile" => {}
                _ => return Err(GenerationError::malformed(child, "`Definition` or `EndOfFile`")),
            }
        }

        if definitions.is_empty() {
            return Err(GenerationError::malformed(root, "at least one `Definition`"));
        }

        Ok(Self { definitions })
    }

    /// The first definition is where parsing starts.
    pub fn entry(&self) -> &Definition {
        &self.definitions[0]
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.iter().find(|definition| definition.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|definition| definition.name.as_str())
    }

    /// Rules that are referenced but never defined.
    pub fn undefined_rules(&self) -> Vec<&str> {
        let mut undefined = Vec::new();
        for definition in &self.definitions {
            for rule in definition.expression.referenced_rules() {
                if !self.contains(rule) && !undefined.contains(&rule) {
                    undefined.push(rule);
                }
            }
        }
        undefined
    }
}

/// Reads the rule name out of an `Identifier` node.
/// Any other node here means the tree was not produced by the PEG grammar parser.
pub(crate) fn resolve_identifier(node: &Node) -> &str {
    assert!(node.is("Identifier"), "expected an `Identifier` node, found {:?}", node.name());
    node.data()
}

fn expect_children<'a>(node: &'a Node, count: usize, expected: &str) -> Result<&'a [Node], GenerationError> {
    if node.children().len() < count {
        return Err(GenerationError::malformed(node, expected));
    }
    Ok(node.children())
}

fn lower_definition(node: &Node) -> Result<Definition, GenerationError> {
    let children = expect_children(node, 2, "`Identifier` followed by `Expression`")?;
    if !children[0].is("Identifier") {
        return Err(GenerationError::malformed(&children[0], "`Identifier`"));
    }

    Ok(Definition {
        name: resolve_identifier(&children[0]).to_owned(),
        expression: lower_expression(&children[1])?,
    })
}

fn lower_expression(node: &Node) -> Result<Expression, GenerationError> {
    if !node.is("Expression") {
        return Err(GenerationError::malformed(node, "`Expression`"));
    }

    let mut alternatives = node.children().iter()
        .map(lower_sequence)
        .collect::<Result<Vec<_>, _>>()?;

    match alternatives.len() {
        0 => Err(GenerationError::malformed(node, "at least one `Sequence`")),
        1 => Ok(alternatives.remove(0)),
        _ => Ok(Expression::Choice(alternatives)),
    }
}

fn lower_sequence(node: &Node) -> Result<Expression, GenerationError> {
    if !node.is("Sequence") {
        return Err(GenerationError::malformed(node, "`Sequence`"));
    }

    let mut items = node.children().iter()
        .map(lower_prefix)
        .collect::<Result<Vec<_>, _>>()?;

    if items.len() == 1 {
        Ok(items.remove(0))
    } else {
        Ok(Expression::Sequence(items))
    }
}

fn lower_prefix(node: &Node) -> Result<Expression, GenerationError> {
    if !node.is("Prefix") {
        return Err(GenerationError::malformed(node, "`Prefix`"));
    }

    match node.children() {
        [suffix] => lower_suffix(suffix),
        [operator, suffix] => {
            let inner = Box::new(lower_suffix(suffix)?);
            match operator.name() {
                "AND" => Ok(Expression::And(inner)),
                "NOT" => Ok(Expression::Not(inner)),
                _ => Err(GenerationError::malformed(operator, "`AND` or `NOT`")),
            }
        }
        _ => Err(GenerationError::malformed(node, "optional predicate followed by `Suffix`")),
    }
}

fn lower_suffix(node: &Node) -> Result<Expression, GenerationError> {
    if !node.is("Suffix") {
        return Err(GenerationError::malformed(node, "`Suffix`"));
    }

    match node.children() {
        [primary] => lower_primary(primary),
        [primary, operator] => {
            let inner = Box::new(lower_primary(primary)?);
            match operator.name() {
                "QUESTION" => Ok(Expression::Optional(inner)),
                "STAR" => Ok(Expression::ZeroOrMore(inner)),
                "PLUS" => Ok(Expression::OneOrMore(inner)),
                _ => Err(GenerationError::malformed(operator, "`QUESTION`, `STAR` or `PLUS`")),
            }
        }
        _ => Err(GenerationError::malformed(node, "`Primary` followed by an optional repetition")),
    }
}

fn lower_primary(node: &Node) -> Result<Expression, GenerationError> {
    let inner = match node.children() {
        [inner] if node.is("Primary") => inner,
        _ => return Err(GenerationError::malformed(node, "`Primary` with a single child")),
    };

    match inner.name() {
        "Identifier" => Ok(Expression::Rule(resolve_identifier(inner).to_owned())),
        "Expression" => lower_expression(inner),
        "Literal" => {
            let text = inner.children().iter()
                .map(unescape_char)
                .collect::<Result<String, _>>()?;
            Ok(Expression::Literal(text))
        }
        "Class" => {
            let items = inner.children().iter()
                .map(lower_range)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expression::Class(items))
        }
        "DOT" => Ok(Expression::Any),
        _ => Err(GenerationError::malformed(inner, "`Identifier`, `Expression`, `Literal`, `Class` or `DOT`")),
    }
}

fn lower_range(node: &Node) -> Result<ClassItem, GenerationError> {
    match node.children() {
        [single] if node.is("Range") => Ok(ClassItem::Single(unescape_char(single)?)),
        [low, high] if node.is("Range") => Ok(ClassItem::Range(unescape_char(low)?, unescape_char(high)?)),
        _ => Err(GenerationError::malformed(node, "`Range` of one or two `Char`")),
    }
}

/// Resolves the escape sequences a `Char` node may hold.
fn unescape_char(node: &Node) -> Result<char, GenerationError> {
    if !node.is("Char") {
        return Err(GenerationError::malformed(node, "`Char`"));
    }

    let data = node.data();
    let mut chars = data.chars();
    let unescaped = match (chars.next(), chars.as_str()) {
        (Some('\\'), "n") => Some('\n'),
        (Some('\\'), "r") => Some('\r'),
        (Some('\\'), "t") => Some('\t'),
        (Some('\\'), rest) if rest.len() == 1 && "'\"[]\\-".contains(rest) => rest.chars().next(),
        (Some('\\'), octal) if !octal.is_empty() => u32::from_str_radix(octal, 8).ok().and_then(char::from_u32),
        (Some(c), "") => Some(c),
        _ => None,
    };

    unescaped.ok_or_else(|| GenerationError::malformed(node, "a single or escaped character"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse_grammar;

    fn lower(source: &str) -> Grammar {
        Grammar::from_node(&parse_grammar(source).unwrap()).unwrap()
    }

    #[test]
    fn test_lower_operators() {
        let grammar = lower("A <- &B !'x' C? D* E+ .\n");
        assert_eq!(
            Expression::Sequence(vec![
                Expression::And(Box::new(Expression::Rule("B".into()))),
                Expression::Not(Box::new(Expression::Literal("x".into()))),
                Expression::Optional(Box::new(Expression::Rule("C".into()))),
                Expression::ZeroOrMore(Box::new(Expression::Rule("D".into()))),
                Expression::OneOrMore(Box::new(Expression::Rule("E".into()))),
                Expression::Any,
            ]),
            grammar.entry().expression
        );
    }

    #[test]
    fn test_rule_defined_twice_is_rejected() {
        let root = parse_grammar("A <- B\nB <- 'a'\nB <- 'b'\n").unwrap();
        match Grammar::from_node(&root) {
            Err(GenerationError::StructuralContractViolation { node, .. }) => {
                assert_eq!("Definition", node.name);
                assert_eq!(16, node.position);
            }
            other => panic!("expected a structural contract violation, got {:?}", other),
        }
    }

    #[test]
    fn test_lower_choice_and_grouping() {
        let grammar = lower("A <- ('a' / 'b') / 'c'\n");
        assert_eq!(
            Expression::Choice(vec![
                Expression::Choice(vec![
                    Expression::Literal("a".into()),
                    Expression::Literal("b".into()),
                ]),
                Expression::Literal("c".into()),
            ]),
            grammar.entry().expression
        );
    }

    #[test]
    fn test_lower_class_and_escapes() {
        let grammar = lower("A <- [a-z_\\]\\-] '\\t\\101'\n");
        assert_eq!(
            Expression::Sequence(vec![
                Expression::Class(vec![
                    ClassItem::Range('a', 'z'),
                    ClassItem::Single('_'),
                    ClassItem::Single(']'),
                    ClassItem::Single('-'),
                ]),
                Expression::Literal("\tA".into()),
            ]),
            grammar.entry().expression
        );
    }

    #[test]
    fn test_empty_sequence() {
        let grammar = lower("A <- 'a' / \nB <- 'b'\n");
        assert_eq!(
            Expression::Choice(vec![Expression::Literal("a".into()), Expression::Sequence(vec![])]),
            grammar.entry().expression
        );
        assert_eq!(2, grammar.definitions.len());
    }

    #[test]
    fn test_referenced_and_undefined_rules() {
        let grammar = lower("A <- B C B / D\nB <- 'b'\nC <- 'c'\n");
        assert_eq!(vec!["B", "C", "D"], grammar.entry().expression.referenced_rules());
        assert_eq!(vec!["D"], grammar.undefined_rules());
    }

    #[test]
    fn test_malformed_tree_is_reported() {
        let root = Node::branch("Peg", vec![Node::leaf("Identifier", "A")]);
        let error = Grammar::from_node(&root).unwrap_err();
        assert!(matches!(error, GenerationError::StructuralContractViolation { .. }));
    }

    #[test]
    #[should_panic(expected = "expected an `Identifier` node")]
    fn test_resolve_identifier_contract() {
        resolve_identifier(&Node::leaf("Literal", "'a'"));
    }
}

pub mod expression;
pub mod interpreter;

use pest::iterators::Pair;
use pest::{Parser, RuleType};

use crate::error::GrammarSyntaxError;
use crate::node::{Node, Span};

// Concrete Definition Export
pub use self::expression::{ClassItem, Definition, Expression, Grammar};
pub use self::interpreter::GrammarInterpreter;

/// NodeParser turns source text into a Node tree.
/// Parsing is all or nothing: when no alternative matches at some point the whole parse fails
/// with the furthest position reached.
pub trait NodeParser {
    /// Creates a default configuration of a NodeParser
    fn default() -> Self;

    /// Parse a source string into a Node tree
    fn parse(self, source: &str) -> Result<Node, GrammarSyntaxError>;
}

/// Converts a pest token pair and everything below it into a Node.
/// Non-silent pest rules become nodes named after the rule. The end of input marker carries no
/// information and is dropped.
pub(crate) fn node_from_pair<R: RuleType>(pair: Pair<R>) -> Node {
    let name = format!("{:?}", pair.as_rule());
    let span = pair.as_span();
    let data = span.as_str().to_owned();
    let span = Span::new(span.start(), span.end());
    let children = pair.into_inner()
        .filter(|inner| format!("{:?}", inner.as_rule()) != "EOI")
        .map(node_from_pair)
        .collect();

    Node::new(name, data, span, children)
}

/// Pest Peg Parser parses PEG grammar source into a series of tokens.
/// These tokens are defined in the src/grammar/peg.pest file, the hand maintained bootstrap of
/// grammars/peg.peg.
#[derive(Parser)]
#[grammar = "grammar/peg.pest"]
struct PegParser;

/// PestPegParser is a concrete NodeParser for PEG grammars.
/// The root of the produced tree is named `Peg`; its children are the `Definition` nodes
/// followed by `EndOfFile` when the whole input was consumed.
pub struct PestPegParser;

impl NodeParser for PestPegParser {
    /// PestPegParser has no configuration the default is just instantiation
    fn default() -> Self {
        Self
    }

    fn parse(self, source: &str) -> Result<Node, GrammarSyntaxError> {
        let mut pairs = PegParser::parse(Rule::Peg, source)?;
        match pairs.next() {
            Some(pair) => Ok(node_from_pair(pair)),
            None => Err(GrammarSyntaxError::at(source, 0, "grammar is empty")),
        }
    }
}

/// Parses PEG grammar source with the bootstrap parser.
pub fn parse_grammar(source: &str) -> Result<Node, GrammarSyntaxError> {
    PestPegParser::default().parse(source)
}

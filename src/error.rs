//! Error types shared by the grammar parser, the generators and the compiler

use std::fmt;
use thiserror::Error;

use crate::node::Node;

/// Source text did not match the expected production rules.
/// Position is the furthest point the parser reached before giving up.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("syntax error at {line}:{column}: {message}")]
pub struct GrammarSyntaxError {
    pub line: usize,
    pub column: usize,
    pub position: usize,
    pub message: String,
}

impl GrammarSyntaxError {
    /// Builds an error for a byte offset within source, resolving line and column.
    pub fn at(source: &str, position: usize, message: impl Into<String>) -> Self {
        let position = position.min(source.len());
        let before = &source[..floor_char_boundary(source, position)];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };

        Self {
            line,
            column,
            position,
            message: message.into(),
        }
    }
}

fn floor_char_boundary(source: &str, mut position: usize) -> usize {
    while !source.is_char_boundary(position) {
        position -= 1;
    }
    position
}

impl<R: pest::RuleType> From<pest::error::Error<R>> for GrammarSyntaxError {
    fn from(error: pest::error::Error<R>) -> Self {
        let position = match error.location {
            pest::error::InputLocation::Pos(position) => position,
            pest::error::InputLocation::Span((begin, _)) => begin,
        };
        let (line, column) = match error.line_col {
            pest::error::LineColLocation::Pos(line_col) => line_col,
            pest::error::LineColLocation::Span(line_col, _) => line_col,
        };

        Self {
            line,
            column,
            position,
            message: error.variant.message().into_owned(),
        }
    }
}

/// Location of a node that broke a structural contract.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLocation {
    pub name: String,
    pub position: usize,
}

impl From<&Node> for NodeLocation {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name().to_owned(),
            position: node.span().begin,
        }
    }
}

impl fmt::Display for NodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` at {}", self.name, self.position)
    }
}

/// Errors that can occur while generating a parser from a grammar tree
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("unknown generator variant `{0}`")]
    UnknownVariant(String),

    #[error("invalid generator settings: {0}")]
    InvalidSettings(String),

    #[error("custom action registered for rule `{0}` which the grammar does not define")]
    UnknownRule(String),

    #[error("malformed grammar tree, node {node}: expected {expected}")]
    StructuralContractViolation {
        node: NodeLocation,
        expected: String,
    },

    #[error("failed to write `{file}`: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Syntax(#[from] GrammarSyntaxError),
}

impl GenerationError {
    pub(crate) fn malformed(node: &Node, expected: impl Into<String>) -> Self {
        GenerationError::StructuralContractViolation {
            node: node.into(),
            expected: expected.into(),
        }
    }
}

/// Errors raised by the tree-to-source pipeline
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] GrammarSyntaxError),

    #[error("malformed node {node}: {reason}")]
    MalformedNode {
        node: NodeLocation,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

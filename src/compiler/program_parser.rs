use pest::Parser;

use crate::error::GrammarSyntaxError;
use crate::grammar::{node_from_pair, NodeParser};
use crate::node::Node;

/// Pest parser for the mini-language, rules are defined in src/compiler/program.pest.
#[derive(Parser)]
#[grammar = "compiler/program.pest"]
struct ProgramParser;

/// PestProgramParser is a concrete NodeParser for mini-language programs.
/// The root of the produced tree is named `Program`; its children are the top level classes and
/// function declarations.
pub struct PestProgramParser;

impl NodeParser for PestProgramParser {
    fn default() -> Self {
        Self
    }

    fn parse(self, source: &str) -> Result<Node, GrammarSyntaxError> {
        let mut pairs = ProgramParser::parse(Rule::Program, source)?;
        match pairs.next() {
            Some(pair) => Ok(node_from_pair(pair)),
            None => Err(GrammarSyntaxError::at(source, 0, "program is empty")),
        }
    }
}

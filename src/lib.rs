// External Modules
extern crate pest;
#[macro_use]
extern crate pest_derive;

// Internal Modules
pub mod compiler;
pub mod error;
pub mod formatter;
pub mod generator;
pub mod grammar;
pub mod node;

pub use compiler::{Compiler, CompileContext, PestProgramParser, Pipeline};
pub use error::{CompileError, GenerationError, GrammarSyntaxError};
pub use formatter::CodeFormatter;
pub use generator::{
    create_generator, generate_parser, run_self_test,
    CustomAction, CustomActions, Generator, GeneratorSettings, GeneratorVariant,
};
pub use grammar::{parse_grammar, GrammarInterpreter, NodeParser, PestPegParser};
pub use node::{Node, Span};


/// Parses PEG grammar source and generates a parser for it with the named backend.
/// The backend is looked up before the grammar is parsed.
pub fn generate(grammar_source: &str, variant: &str, actions: CustomActions, settings: &GeneratorSettings) -> Result<(), GenerationError> {
    let mut generator = create_generator(variant)?;
    let root = parse_grammar(grammar_source)?;
    generator.set_custom_actions(actions);
    generate_parser(&root, generator.as_ref(), settings)
}

/// Compiles mini-language source to output source.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let pipeline: Pipeline<PestProgramParser> = Pipeline::default();
    pipeline.compile_str(source)
}

pub mod primitives;
pub mod program_parser;
mod recurse;

#[cfg(test)]
mod test;

use std::fs;
use std::path::Path;

// Interface Definitions
use crate::error::CompileError;
use crate::grammar::NodeParser;

// Concrete Definitions Re-Export
pub use self::primitives::Primitive;
pub use self::program_parser::PestProgramParser;
pub use self::recurse::{CompileContext, Compiler};


/// Pipeline parses mini-language source with a NodeParser and compiles the tree to output source.
pub struct Pipeline<P: NodeParser> {
    parser: P,
    compiler: Compiler,
}

impl<P: NodeParser> Pipeline<P> {
    pub fn default() -> Self {
        Pipeline {
            parser: P::default(),
            compiler: Compiler::new(),
        }
    }

    pub fn new(parser: P, compiler: Compiler) -> Self {
        Pipeline {
            parser,
            compiler,
        }
    }

    pub fn compile_str(self, source: &str) -> Result<String, CompileError> {
        let tree = self.parser.parse(source)?;
        self.compiler.try_compile(&tree)
    }

    pub fn compile(self, source_filename: &Path) -> Result<String, CompileError> {
        let source_str = fs::read_to_string(source_filename)?;
        self.compile_str(source_str.as_str())
    }

    pub fn compile_and_save(self, source_filename: &Path, dest_filename: &Path) -> Result<(), CompileError> {
        let compiled_program = self.compile(source_filename)?;
        fs::write(dest_filename, compiled_program)?;
        log::info!("wrote {}", dest_filename.display());
        Ok(())
    }
}

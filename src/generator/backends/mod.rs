mod c;
mod cpp;
mod java;
mod native;
mod python;

// Concrete Definition Export
pub use self::c::CGenerator;
pub use self::cpp::CppGenerator;
pub use self::java::JavaGenerator;
pub use self::native::NativeGenerator;
pub use self::python::PythonGenerator;

use crate::error::GenerationError;
use crate::node::Node;
use super::emitter::{Dialect, ParserModel};
use super::{Generator, GeneratorSettings};

/// Generated file as (file name, content)
pub(crate) type OutputFile = (String, String);

/// File layout of a backend.
/// Every backend renders its files from the same ParserModel, only the templates differ.
pub(crate) trait Backend: Dialect + Generator {
    fn parser_files(&self, model: &ParserModel) -> Vec<OutputFile>;

    fn test_file(&self, model: &ParserModel, test_name: &str) -> OutputFile;

    fn bench_file(&self, model: &ParserModel) -> OutputFile;

    /// Self contained program running the instrumented parser and printing rule counts
    fn heatmap_file(&self, model: &ParserModel) -> OutputFile;
}

pub(crate) fn generate<B: Backend>(backend: &B, root: &Node, settings: &GeneratorSettings) -> Result<(), GenerationError> {
    let model = ParserModel::build(backend, backend, root, settings, false)?;
    let mut files = backend.parser_files(&model);
    if let Some(test_name) = &model.test_name {
        files.push(backend.test_file(&model, test_name));
    }
    write_all(settings, &model, files)
}

pub(crate) fn generate_benchmark<B: Backend>(backend: &B, root: &Node, settings: &GeneratorSettings) -> Result<(), GenerationError> {
    let model = ParserModel::build(backend, backend, root, settings, false)?;
    let file = backend.bench_file(&model);
    write_all(settings, &model, vec![file])
}

pub(crate) fn generate_heatmap<B: Backend>(backend: &B, root: &Node, settings: &GeneratorSettings) -> Result<(), GenerationError> {
    let model = ParserModel::build(backend, backend, root, settings, true)?;
    let file = backend.heatmap_file(&model);
    write_all(settings, &model, vec![file])
}

/// Writes files in order, stopping at the first failure.
fn write_all(settings: &GeneratorSettings, model: &ParserModel, files: Vec<OutputFile>) -> Result<(), GenerationError> {
    for (name, content) in files {
        settings.write(&name, &with_header(model, &content))?;
    }
    Ok(())
}

fn with_header(model: &ParserModel, content: &str) -> String {
    if model.header.is_empty() {
        return content.to_owned();
    }
    let mut text = model.header.clone();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(content);
    text
}

/// Turns a file base name into something usable as an identifier in every target language.
pub(crate) fn identifier(base: &str) -> String {
    let mut id: String = base.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if id.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        id.insert(0, '_');
    }
    id
}

/// File the generated test and benchmark harnesses read their input from
pub(crate) fn input_file(model: &ParserModel) -> &str {
    model.test_name.as_deref().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!("peg", identifier("peg"));
        assert_eq!("my_grammar_v2", identifier("my-grammar.v2"));
        assert_eq!("_2peg", identifier("2peg"));
    }
}

pub mod backends;
pub mod custom_action;
pub mod emitter;
pub mod orchestrator;
pub mod settings;

use std::str::FromStr;

use strum_macros::{Display, EnumIter, EnumString};

use crate::error::GenerationError;
use crate::node::Node;
use self::backends::{CGenerator, CppGenerator, JavaGenerator, NativeGenerator, PythonGenerator};

pub use self::custom_action::{ActionHandler, ActionKind, CustomAction, CustomActions};
pub use self::orchestrator::{generate_parser, run_self_test};
pub use self::settings::{GeneratorSettings, WriteFile};

/// Generator turns a parsed grammar tree into parser source code for one target language.
/// Generated files are handed to the settings' write callback, a Generator never touches the
/// file system itself.
pub trait Generator {
    fn variant(&self) -> GeneratorVariant;

    /// Replaces the custom actions consulted before default rule generation
    fn set_custom_actions(&mut self, actions: CustomActions);

    fn custom_actions(&self) -> &CustomActions;

    /// Transforms a rule fragment so the rule is matched but contributes no node
    fn ignore(&self, fragment: &str) -> String;

    /// Transforms a rule fragment so the rule is matched by direct invocation without a node of
    /// its own
    fn call(&self, fragment: &str) -> String;

    /// Generates the parser, plus its test harness when the settings name a test file
    fn generate(&self, root: &Node, settings: &GeneratorSettings) -> Result<(), GenerationError>;

    fn generate_benchmark(&self, root: &Node, settings: &GeneratorSettings) -> Result<(), GenerationError>;

    /// Generates a variant of the parser counting invocations per rule
    fn generate_heatmap(&self, root: &Node, settings: &GeneratorSettings) -> Result<(), GenerationError>;

    /// Program and arguments building and running the generated test harness, executed from the
    /// output directory
    fn test_command(&self, settings: &GeneratorSettings) -> Vec<String>;
}

/// Backend variants known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
pub enum GeneratorVariant {
    #[strum(serialize = "native")]
    Native,

    #[strum(serialize = "c")]
    C,

    #[strum(to_string = "cpp", serialize = "c++")]
    Cpp,

    #[strum(serialize = "java")]
    Java,

    #[strum(to_string = "py", serialize = "python")]
    Python,
}

type Constructor = fn() -> Box<dyn Generator>;

static REGISTRY: &[(GeneratorVariant, Constructor)] = &[
    (GeneratorVariant::Native, native),
    (GeneratorVariant::C, c),
    (GeneratorVariant::Cpp, cpp),
    (GeneratorVariant::Java, java),
    (GeneratorVariant::Python, python),
];

fn native() -> Box<dyn Generator> { Box::new(NativeGenerator::default()) }
fn c() -> Box<dyn Generator> { Box::new(CGenerator::default()) }
fn cpp() -> Box<dyn Generator> { Box::new(CppGenerator::default()) }
fn java() -> Box<dyn Generator> { Box::new(JavaGenerator::default()) }
fn python() -> Box<dyn Generator> { Box::new(PythonGenerator::default()) }

impl GeneratorVariant {
    pub fn create(self) -> Box<dyn Generator> {
        let (_, constructor) = REGISTRY.iter()
            .find(|(variant, _)| *variant == self)
            .copied()
            .unwrap_or_else(|| panic!("generator variant {} is not registered", self));
        constructor()
    }
}

/// Looks up a backend by variant name, unknown names fail before anything is generated.
pub fn create_generator(name: &str) -> Result<Box<dyn Generator>, GenerationError> {
    let variant = GeneratorVariant::from_str(name)
        .map_err(|_| GenerationError::UnknownVariant(name.to_owned()))?;
    Ok(variant.create())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_variant_is_registered() {
        for variant in GeneratorVariant::iter() {
            assert_eq!(variant, variant.create().variant());
        }
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(GeneratorVariant::Cpp, "c++".parse().unwrap());
        assert_eq!(GeneratorVariant::Python, "python".parse().unwrap());
        assert_eq!("py", GeneratorVariant::Python.to_string());
        assert_eq!("native", GeneratorVariant::Native.to_string());
    }

    #[test]
    fn test_unknown_variant() {
        match create_generator("rust") {
            Err(GenerationError::UnknownVariant(name)) => assert_eq!("rust", name),
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("`rust` is not a registered variant"),
        }
    }
}

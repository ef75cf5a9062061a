use std::fs;
use std::path::Path;

use pegforge::{
    create_generator, generate, generate_parser, parse_grammar, CustomAction, CustomActions,
    GenerationError, GeneratorSettings, GeneratorVariant,
};
use strum::IntoEnumIterator;

const CALC: &str = "Expr <- Term (Op Term)* EndOfFile\nTerm <- [0-9]+ / '(' Expr ')'\nOp <- '+' / '-'\nSpace <- ' '\nEndOfFile <- !.\n";

fn disk_settings(name: &str, directory: &Path) -> GeneratorSettings {
    let directory = directory.to_path_buf();
    GeneratorSettings::new(name, Box::new(move |file: &str, content: &str| {
        fs::write(directory.join(file), content)
    }))
}

#[test]
fn test_every_backend_writes_its_files() {
    let root = parse_grammar(CALC).unwrap();
    for variant in GeneratorVariant::iter() {
        let directory = tempfile::tempdir().unwrap();
        let generator = variant.create();
        let settings = disk_settings("Calc", directory.path()).with_test_name("input.txt");

        generate_parser(&root, generator.as_ref(), &settings).unwrap();

        let written: Vec<_> = fs::read_dir(directory.path()).unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(written.len() >= 2, "{} wrote {:?}", variant, written);
        for file in written {
            let content = fs::read_to_string(directory.path().join(&file)).unwrap();
            assert!(!content.is_empty(), "{} wrote an empty {}", variant, file);
        }
    }
}

#[test]
fn test_grammar_without_end_of_file_still_generates() {
    let directory = tempfile::tempdir().unwrap();
    let settings = disk_settings("Calc", directory.path());

    generate("A <- 'a'\n<- 'b'\n", "native", CustomActions::default(), &settings).unwrap();
    assert!(directory.path().join("calc.rs").exists());
}

#[test]
fn test_grammar_syntax_error_is_reported() {
    let directory = tempfile::tempdir().unwrap();
    let settings = disk_settings("Calc", directory.path());

    let result = generate("<- 'a'\n", "native", CustomActions::default(), &settings);
    assert!(matches!(result, Err(GenerationError::Syntax(_))));
}

#[test]
fn test_unknown_variant_is_rejected() {
    assert!(matches!(create_generator("rust"), Err(GenerationError::UnknownVariant(name)) if name == "rust"));

    let directory = tempfile::tempdir().unwrap();
    let result = generate(CALC, "rust", CustomActions::default(), &disk_settings("Calc", directory.path()));
    assert!(matches!(result, Err(GenerationError::UnknownVariant(_))));
    assert_eq!(0, fs::read_dir(directory.path()).unwrap().count());

    // The backend is checked before the grammar, a broken grammar still reports the variant.
    let result = generate("<- 'a'\n", "rust", CustomActions::default(), &disk_settings("Calc", directory.path()));
    assert!(matches!(result, Err(GenerationError::UnknownVariant(name)) if name == "rust"));
}

#[test]
fn test_ignored_rules_get_no_node_code() {
    let directory = tempfile::tempdir().unwrap();
    let settings = disk_settings("Calc", directory.path());
    let actions = CustomActions::new(vec![CustomAction::ignore("Space"), CustomAction::call("Op")]);

    generate(CALC, "py", actions, &settings).unwrap();
    let parser = fs::read_to_string(directory.path().join("calc.py")).unwrap();
    assert!(parser.contains("def rule_Space(self):"));
    assert!(!parser.contains("class SpaceNode"));
    assert!(!parser.contains("class OpNode"));
    assert!(parser.contains("class TermNode"));
}

use std::cell::RefCell;
use std::fs;
use std::process::Command;
use std::rc::Rc;

use pegforge::grammar::{Grammar, GrammarInterpreter};
use pegforge::{
    create_generator, generate_parser, parse_grammar, run_self_test, CustomAction, CustomActions,
    GeneratorSettings, GeneratorVariant, Node,
};
use regex::Regex;
use strum::IntoEnumIterator;

const PEG_GRAMMAR: &str = include_str!("../grammars/peg.peg");

fn peg_actions() -> CustomActions {
    let ignored = ["Spacing", "Space", "Comment", "EndOfLine", "LEFTARROW", "SLASH", "OPEN", "CLOSE"]
        .into_iter()
        .map(CustomAction::ignore);
    let called = ["Grammar", "IdentStart", "IdentCont"]
        .into_iter()
        .map(CustomAction::call);
    CustomActions::new(ignored.chain(called))
}

fn interpret(grammar_source: &str, input: &str) -> Node {
    let root = parse_grammar(grammar_source).unwrap();
    let grammar = Grammar::from_node(&root).unwrap();
    GrammarInterpreter::new(&grammar, "Peg", &peg_actions()).parse(input).unwrap()
}

/// Rule names of every node below the root, with their depth.
fn shape(node: &Node, depth: usize, out: &mut Vec<(usize, String)>) {
    for child in node.children() {
        out.push((depth + 1, child.name().to_owned()));
        shape(child, depth + 1, out);
    }
}

fn generate_peg_parser(variant: GeneratorVariant) -> Vec<(String, String)> {
    let files = Rc::new(RefCell::new(Vec::new()));
    let sink = files.clone();
    let settings = GeneratorSettings::new("Peg", Box::new(move |file: &str, content: &str| {
        sink.borrow_mut().push((file.to_owned(), content.to_owned()));
        Ok(())
    })).with_test_name("peg.peg");

    let mut generator = variant.create();
    generator.set_custom_actions(peg_actions());
    generate_parser(&parse_grammar(PEG_GRAMMAR).unwrap(), generator.as_ref(), &settings).unwrap();
    let written = files.borrow().clone();
    written
}

#[test]
fn test_peg_grammar_describes_itself() {
    let bootstrap = parse_grammar(PEG_GRAMMAR).unwrap();
    let described = interpret(PEG_GRAMMAR, PEG_GRAMMAR);

    assert!(bootstrap.last_child().unwrap().is("EndOfFile"));
    assert!(
        bootstrap.is_equivalent(&described),
        "bootstrap tree:\n{}\ninterpreted tree:\n{}",
        bootstrap,
        described
    );
}

#[test]
fn test_peg_grammar_parses_other_grammars_like_the_bootstrap() {
    let grammar = "# arithmetic\nSum <- Num (('+' / '-') Num)*\nNum <- [0-9]+ / '(' Sum ')'\n";
    let bootstrap = parse_grammar(grammar).unwrap();
    let described = interpret(PEG_GRAMMAR, grammar);

    assert!(bootstrap.is_equivalent(&described));
    let definitions: Vec<&str> = described.children().iter()
        .filter(|child| child.is("Definition"))
        .map(|definition| definition.children()[0].data())
        .collect();
    assert_eq!(vec!["Sum", "Num"], definitions);
}

#[test]
fn test_trailing_garbage_leaves_out_end_of_file() {
    let grammar = "A <- 'a'\n<- 'b'\n";
    let bootstrap = parse_grammar(grammar).unwrap();
    let described = interpret(PEG_GRAMMAR, grammar);

    assert!(!bootstrap.last_child().unwrap().is("EndOfFile"));
    assert!(bootstrap.is_equivalent(&described));
}

#[test]
fn test_generated_peg_parsers_are_reproducible() {
    for variant in GeneratorVariant::iter() {
        let first = generate_peg_parser(variant);
        let second = generate_peg_parser(variant);
        assert!(!first.is_empty(), "{} wrote nothing", variant);
        assert_eq!(first, second, "{} output differs between runs", variant);
    }
}

#[test]
fn test_generated_python_parser_describes_itself() {
    if Command::new("python3").arg("--version").output().is_err() {
        eprintln!("python3 not found, not running the generated parser");
        return;
    }

    let directory = tempfile::tempdir().unwrap();
    fs::write(directory.path().join("peg.peg"), PEG_GRAMMAR).unwrap();
    let target = directory.path().to_path_buf();
    let settings = GeneratorSettings::new("Peg", Box::new(move |file: &str, content: &str| {
        fs::write(target.join(file), content)
    })).with_test_name("peg.peg").with_debug(true);

    let mut generator = create_generator("py").unwrap();
    generator.set_custom_actions(peg_actions());
    let bootstrap = parse_grammar(PEG_GRAMMAR).unwrap();
    generate_parser(&bootstrap, generator.as_ref(), &settings).unwrap();
    let output = run_self_test(generator.as_ref(), &settings, directory.path()).unwrap();

    let line = Regex::new(r#"^(\t*)\d+-\d+: "([^"]+)""#).unwrap();
    let dumped: Vec<(usize, String)> = output.lines()
        .filter_map(|text| line.captures(text))
        .map(|captures| (captures[1].len(), captures[2].to_owned()))
        .filter(|(depth, _)| *depth > 0)
        .collect();

    let mut expected = Vec::new();
    shape(&bootstrap, 0, &mut expected);
    assert!(!expected.is_empty());
    assert_eq!(expected, dumped, "generated parser output:\n{}", output);
}

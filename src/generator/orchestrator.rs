use std::io;
use std::path::Path;
use std::process::Command;

use crate::error::GenerationError;
use crate::node::Node;
use super::{Generator, GeneratorSettings};

/// Generates the parser for a grammar tree and, when requested, its benchmark harness and
/// heatmap variant. A grammar tree that does not end in `EndOfFile` was not parsed to the end,
/// this is reported as a warning only.
///
/// Output is a pure function of the tree, the generator's custom actions and the settings:
/// files are produced in rule declaration order without timestamps, so two runs with the same
/// inputs write identical bytes.
pub fn generate_parser(root: &Node, generator: &dyn Generator, settings: &GeneratorSettings) -> Result<(), GenerationError> {
    match root.last_child() {
        Some(last) if last.is("EndOfFile") => {}
        last => log::warn!(
            "grammar did not parse to the end of the file, last definition ends at {}",
            last.map_or(0, |node| node.span().end)
        ),
    }

    settings.validate()?;
    log::info!("generating {} parser `{}`", generator.variant(), settings.name);

    generator.generate(root, settings)?;
    if settings.bench {
        generator.generate_benchmark(root, settings)?;
    }
    if settings.heatmap {
        generator.generate_heatmap(root, settings)?;
    }
    Ok(())
}

/// Runs the generator's test command inside `directory`, returning combined stdout and stderr.
/// A failing test is reported through the output, only a failure to launch is an error.
pub fn run_self_test(generator: &dyn Generator, settings: &GeneratorSettings, directory: &Path) -> io::Result<String> {
    let command = generator.test_command(settings);
    let (program, arguments) = command.split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty test command"))?;

    log::info!("running `{}` in {}", command.join(" "), directory.display());
    let output = Command::new(program)
        .args(arguments)
        .current_dir(directory)
        .output()?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    if !output.status.success() {
        log::warn!("test command exited with {}", output.status);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{create_generator, CustomAction, CustomActions};
    use crate::grammar::parse_grammar;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Files = Rc<RefCell<Vec<(String, String)>>>;

    fn settings(files: &Files) -> GeneratorSettings {
        let sink = files.clone();
        GeneratorSettings::new("Calc", Box::new(move |name, content| {
            sink.borrow_mut().push((name.to_owned(), content.to_owned()));
            Ok(())
        }))
    }

    const GRAMMAR: &str = "Sum <- Num (Plus Num)*\nNum <- [0-9]+\nPlus <- '+'\n";

    #[test]
    fn test_bench_and_heatmap_follow_the_parser() {
        let files = Files::default();
        let settings = settings(&files).with_bench(true).with_heatmap(true).with_test_name("input.txt");
        let generator = create_generator("py").unwrap();
        generate_parser(&parse_grammar(GRAMMAR).unwrap(), generator.as_ref(), &settings).unwrap();

        let names: Vec<String> = files.borrow().iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(vec!["calc.py", "calc_test.py", "calc_bench.py", "calc_heatmap.py"], names);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let root = parse_grammar(GRAMMAR).unwrap();
        for variant in ["native", "c", "cpp", "java", "py"] {
            let first = Files::default();
            let second = Files::default();
            let generator = create_generator(variant).unwrap();
            generate_parser(&root, generator.as_ref(), &settings(&first).with_heatmap(true)).unwrap();
            generate_parser(&root, generator.as_ref(), &settings(&second).with_heatmap(true)).unwrap();
            assert_eq!(*first.borrow(), *second.borrow(), "{} output differs between runs", variant);
        }
    }

    #[test]
    fn test_unknown_custom_action_rule_writes_nothing() {
        let files = Files::default();
        let mut generator = create_generator("c").unwrap();
        generator.set_custom_actions(CustomActions::new(vec![CustomAction::ignore("Minus")]));

        let result = generate_parser(&parse_grammar(GRAMMAR).unwrap(), generator.as_ref(), &settings(&files));
        assert!(matches!(result, Err(GenerationError::UnknownRule(rule)) if rule == "Minus"));
        assert!(files.borrow().is_empty());
    }

    #[test]
    fn test_missing_end_of_file_is_not_an_error() {
        let files = Files::default();
        let root = parse_grammar("Sum <- Num\nNum <- [0-9]\n<- trailing").unwrap();
        assert!(!root.last_child().unwrap().is("EndOfFile"));

        let generator = create_generator("native").unwrap();
        generate_parser(&root, generator.as_ref(), &settings(&files)).unwrap();
        assert_eq!(1, files.borrow().len());
    }

    #[test]
    fn test_write_failure_stops_generation() {
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        let settings = GeneratorSettings::new("Calc", Box::new(move |_, _| {
            *counter.borrow_mut() += 1;
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read only"))
        }));

        let generator = create_generator("c").unwrap();
        let result = generate_parser(&parse_grammar(GRAMMAR).unwrap(), generator.as_ref(), &settings);
        assert!(matches!(result, Err(GenerationError::Io { ref file, .. }) if file == "calc.h"));
        assert_eq!(1, *calls.borrow());
    }

    #[test]
    fn test_custom_action_precedence() {
        let root = parse_grammar(GRAMMAR).unwrap();
        let default_files = Files::default();
        let mut generator = create_generator("native").unwrap();
        generate_parser(&root, generator.as_ref(), &settings(&default_files)).unwrap();
        assert!(default_files.borrow()[0].1.contains("self.add_node(\"Plus\", rule_begin, rule_mark);"));

        let custom_files = Files::default();
        generator.set_custom_actions(CustomActions::new(vec![
            CustomAction::custom("Plus", |generator, fragment| {
                format!("// plus\n{}", generator.call(fragment))
            }),
        ]));
        generate_parser(&root, generator.as_ref(), &settings(&custom_files)).unwrap();
        let written = custom_files.borrow();
        let parser = &written[0].1;
        assert!(parser.contains("// plus\n"));
        assert!(!parser.contains("self.add_node(\"Plus\""));
        assert!(!parser.contains("pub struct PlusNode"));
    }

    #[test]
    fn test_self_test_reports_output() {
        let directory = tempfile::tempdir().unwrap();
        let files = Files::default();
        let generator = create_generator("py").unwrap();
        let settings = settings(&files);

        // No python harness exists in the empty directory, the command still launches.
        match run_self_test(generator.as_ref(), &settings, directory.path()) {
            Ok(output) => assert!(output.contains("calc_test.py")),
            Err(error) => assert_eq!(io::ErrorKind::NotFound, error.kind()),
        }
    }
}

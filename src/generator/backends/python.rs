use crate::error::GenerationError;
use crate::formatter::CodeFormatter;
use crate::generator::emitter::{self, escape_with, fill, snake_case, upper_camel_case, Dialect, ParserModel};
use crate::generator::{CustomActions, Generator, GeneratorSettings, GeneratorVariant};
use crate::node::Node;
use super::{input_file, Backend, OutputFile};

const PARSER: &str = r#""""Parser for the {{NAME}} grammar."""

import sys


class Node:
    """Node of the parse tree, named after the rule that matched it."""

    def __init__(self, name, begin, end, children):
        self.name = name
        self.begin = begin
        self.end = end
        self.children = children

    def dump(self, text, depth=0):
        lines = ["%s%d-%d: \"%s\" - Data: %r" % ("\t" * depth, self.begin, self.end, self.name, text[self.begin:self.end])]
        for child in self.children:
            lines.append(child.dump(text, depth + 1))
        return "\n".join(lines)


class {{TYPE}}:
    def __init__(self, text):
        self.text = text
        self.pos = 0
        self.nodes = []{{EXTRA_FIELDS}}

    def parse(self):
        """Parses from the entry rule, True when it matched."""
        self.restore(0, 0)
        return self.rule_{{ENTRY}}()

    def position(self):
        return self.pos

    def root(self):
        return Node("{{NAME}}", 0, self.pos, list(self.nodes))

    def match_literal(self, literal):
        if self.text.startswith(literal, self.pos):
            self.pos += len(literal)
            return True
        return False

    def match_range(self, low, high):
        if self.pos < len(self.text) and low <= ord(self.text[self.pos]) <= high:
            self.pos += 1
            return True
        return False

    def match_any(self):
        if self.pos < len(self.text):
            self.pos += 1
            return True
        return False

    def restore(self, pos, mark):
        self.pos = pos
        del self.nodes[mark:]

    def discard(self, mark):
        del self.nodes[mark:]

    def add_node(self, name, begin, mark):
        children = self.nodes[mark:]
        del self.nodes[mark:]
        self.nodes.append(Node(name, begin, self.pos, children))

"#;

const READ_FILE: &str = r#"def read_file(path):
    with open(path, encoding="utf-8") as source:
        return source.read()
"#;

const TEST: &str = r#"import importlib
import sys

{{READ_FILE}}

def main():
    text = read_file("{{INPUT}}")
    parser = getattr(importlib.import_module("{{BASE}}"), "{{TYPE}}")(text)
    if not parser.parse() or parser.position() != len(text):
        print("{{NAME}} stopped at %d of %d" % (parser.position(), len(text)), file=sys.stderr)
        sys.exit(1)
{{DUMP}}

if __name__ == "__main__":
    main()
"#;

const BENCH: &str = r#"import importlib
import sys
import time

ROUNDS = 100

{{READ_FILE}}

def main():
    path = sys.argv[1] if len(sys.argv) > 1 else "{{INPUT}}"
    text = read_file(path)
    parser_type = getattr(importlib.import_module("{{BASE}}"), "{{TYPE}}")
    start = time.perf_counter()
    for _ in range(ROUNDS):
        if not parser_type(text).parse():
            print("{{NAME}} failed to parse %s" % path, file=sys.stderr)
            sys.exit(1)
    elapsed = time.perf_counter() - start
    print("{{NAME}}: %d rounds in %.3fs, %.3fms per parse" % (ROUNDS, elapsed, elapsed * 1000 / ROUNDS))


if __name__ == "__main__":
    main()
"#;

const HEATMAP_DRIVER: &str = r#"

RULE_NAMES = [{{RULE_NAMES}}]

{{READ_FILE}}

def main():
    path = sys.argv[1] if len(sys.argv) > 1 else "{{INPUT}}"
    parser = {{TYPE}}(read_file(path))
    accepted = parser.parse()
    for count, rule in sorted(zip(parser.counts, RULE_NAMES), reverse=True):
        print("%12d %s" % (count, rule))
    sys.exit(0 if accepted else 1)


if __name__ == "__main__":
    main()
"#;

/// Generates a Python module, the parser is a class and typed nodes are module level classes.
#[derive(Debug, Default)]
pub struct PythonGenerator {
    actions: CustomActions,
}

impl PythonGenerator {
    fn render_parser(&self, model: &ParserModel) -> String {
        let fields = if model.heatmap {
            format!("\n        self.counts = [0] * {}", model.rules.len())
        } else {
            String::new()
        };

        let runtime = fill(PARSER, &[
            ("EXTRA_FIELDS", &fields),
            ("TYPE", &model.name),
            ("NAME", &model.name),
            ("ENTRY", &model.entry),
        ]);
        tabs(&runtime) + &model.functions(1) + &self.typed_nodes(model)
    }

    fn typed_nodes(&self, model: &ParserModel) -> String {
        let mut out = CodeFormatter::new();
        for (rule, fields) in model.typed_rules() {
            out.add("\n\n");
            out.line(&format!("class {}Node:", upper_camel_case(rule)));
            out.inc();
            out.line(&format!("\"\"\"Typed view of a {} node.\"\"\"", rule));
            out.add("\n");
            out.line("def __init__(self, node):");
            out.inc();
            out.line("self.node = node");
            for field in fields {
                out.line(&format!(
                    "self.{}_nodes = [child for child in node.children if child.name == \"{}\"]",
                    snake_case(field), field
                ));
            }
            out.dec();
            out.dec();
        }
        out.finish()
    }

    fn harness(&self, template: &str, model: &ParserModel, input: &str) -> String {
        let dump = if model.dump_tree { "    print(parser.root().dump(text))\n" } else { "" };
        tabs(&fill(template, &[
            ("READ_FILE", READ_FILE),
            ("DUMP", dump),
            ("BASE", &model.base),
            ("TYPE", &model.name),
            ("NAME", &model.name),
            ("INPUT", &python_string(input)),
        ]))
    }
}

/// Replaces leading groups of four spaces with tabs so templates match the generated rules.
fn tabs(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| {
            let trimmed = line.trim_start_matches(' ');
            let depth = (line.len() - trimmed.len()) / 4;
            let rest = &line[depth * 4..];
            "\t".repeat(depth) + rest
        })
        .collect()
}

fn python_string(text: &str) -> String {
    escape_with(text, |c| format!("\\U{:08x}", c as u32))
}

impl Dialect for PythonGenerator {
    fn match_literal(&self, text: &str) -> String {
        format!("self.match_literal(\"{}\")", python_string(text))
    }

    fn match_range(&self, low: char, high: char) -> String {
        format!("self.match_range(0x{:x}, 0x{:x})", low as u32, high as u32)
    }

    fn match_any(&self) -> String {
        "self.match_any()".to_owned()
    }

    fn invoke_rule(&self, rule: &str) -> String {
        format!("self.rule_{}()", rule)
    }

    fn or_operator(&self) -> &'static str {
        " or "
    }

    fn negate(&self, condition: &str) -> String {
        format!("not {}", condition)
    }

    fn boolean(&self, value: bool) -> &'static str {
        if value { "True" } else { "False" }
    }

    fn set_accept(&self, value: &str) -> String {
        format!("accept = {}", value)
    }

    fn save(&self, id: usize) -> String {
        format!("save_pos_{0}, save_mark_{0} = self.pos, len(self.nodes)", id)
    }

    fn restore(&self, id: usize) -> String {
        format!("self.restore(save_pos_{0}, save_mark_{0})", id)
    }

    fn unmoved(&self, id: usize) -> String {
        format!("self.pos == save_pos_{}", id)
    }

    fn declare_counter(&self, id: usize) -> String {
        format!("count_{} = 0", id)
    }

    fn increment_counter(&self, id: usize) -> String {
        format!("count_{} += 1", id)
    }

    fn counter_positive(&self, id: usize) -> String {
        format!("count_{} > 0", id)
    }

    fn open_if(&self, condition: &str) -> String {
        format!("if {}:", condition)
    }

    fn open_loop(&self) -> String {
        "while True:".to_owned()
    }

    fn close_block(&self) -> Option<&'static str> {
        None
    }

    fn break_loop(&self) -> &'static str {
        "break"
    }

    fn mark_begin(&self) -> String {
        "rule_begin = self.pos".to_owned()
    }

    fn mark_nodes(&self) -> String {
        "rule_mark = len(self.nodes)".to_owned()
    }

    fn add_node(&self, rule: &str) -> String {
        format!("self.add_node(\"{}\", rule_begin, rule_mark)", rule)
    }

    fn discard_nodes(&self) -> String {
        "self.discard(rule_mark)".to_owned()
    }

    fn open_rule(&self, rule: &str) -> String {
        format!("def rule_{}(self):", rule)
    }

    fn declare_accept(&self) -> String {
        "accept = False".to_owned()
    }

    fn return_accept(&self) -> String {
        "return accept".to_owned()
    }

    fn trace_enter(&self, rule: &str) -> String {
        format!("print(\"> {} at %d\" % self.pos, file=sys.stderr)", rule)
    }

    fn trace_exit(&self, rule: &str) -> String {
        format!(
            "print(\"< {} %s at %d\" % (\"accepted\" if accept else \"rejected\", self.pos), file=sys.stderr)",
            rule
        )
    }

    fn count_invocation(&self, index: usize) -> String {
        format!("self.counts[{}] += 1", index)
    }
}

impl Backend for PythonGenerator {
    fn parser_files(&self, model: &ParserModel) -> Vec<OutputFile> {
        vec![(format!("{}.py", model.base), self.render_parser(model))]
    }

    fn test_file(&self, model: &ParserModel, test_name: &str) -> OutputFile {
        (format!("{}_test.py", model.base), self.harness(TEST, model, test_name))
    }

    fn bench_file(&self, model: &ParserModel) -> OutputFile {
        (format!("{}_bench.py", model.base), self.harness(BENCH, model, input_file(model)))
    }

    fn heatmap_file(&self, model: &ParserModel) -> OutputFile {
        let names = model.rules.iter()
            .map(|rule| format!("\"{}\"", rule.name))
            .collect::<Vec<_>>()
            .join(", ");
        let driver = fill(HEATMAP_DRIVER, &[
            ("READ_FILE", READ_FILE),
            ("RULE_NAMES", &names),
            ("TYPE", &model.name),
            ("INPUT", &python_string(input_file(model))),
        ]);
        (format!("{}_heatmap.py", model.base), self.render_parser(model) + &tabs(&driver))
    }
}

impl Generator for PythonGenerator {
    fn variant(&self) -> GeneratorVariant {
        GeneratorVariant::Python
    }

    fn set_custom_actions(&mut self, actions: CustomActions) {
        self.actions = actions;
    }

    fn custom_actions(&self) -> &CustomActions {
        &self.actions
    }

    fn ignore(&self, fragment: &str) -> String {
        emitter::ignore_fragment(self, fragment)
    }

    fn call(&self, fragment: &str) -> String {
        fragment.to_owned()
    }

    fn generate(&self, root: &Node, settings: &GeneratorSettings) -> Result<(), GenerationError> {
        super::generate(self, root, settings)
    }

    fn generate_benchmark(&self, root: &Node, settings: &GeneratorSettings) -> Result<(), GenerationError> {
        super::generate_benchmark(self, root, settings)
    }

    fn generate_heatmap(&self, root: &Node, settings: &GeneratorSettings) -> Result<(), GenerationError> {
        super::generate_heatmap(self, root, settings)
    }

    fn test_command(&self, settings: &GeneratorSettings) -> Vec<String> {
        vec!["python3".to_owned(), format!("{}_test.py", settings.base_name())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse_grammar;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_tabs() {
        assert_eq!("def f():\n\treturn 1\n\t\tx  y\n", tabs("def f():\n    return 1\n        x  y\n"));
    }

    #[test]
    fn test_blocks_are_indented_with_tabs_only() {
        let files = Rc::new(RefCell::new(Vec::new()));
        let sink = files.clone();
        let settings = GeneratorSettings::new("Calc", Box::new(move |name, content| {
            sink.borrow_mut().push((name.to_owned(), content.to_owned()));
            Ok(())
        })).with_debug_level(2);

        let root = parse_grammar("Sum <- Num ('+' Num)*\nNum <- [0-9]+\n").unwrap();
        PythonGenerator::default().generate(&root, &settings).unwrap();

        let files = files.borrow();
        let (name, parser) = &files[0];
        assert_eq!("calc.py", name);
        assert!(parser.lines().all(|line| !line.starts_with(' ')));
        assert!(parser.contains("\tdef rule_Sum(self):\n\t\taccept = False\n\t\tprint(\"> Sum at %d\" % self.pos, file=sys.stderr)\n"));
        assert!(parser.contains("while True:"));
        assert!(parser.contains("class SumNode:"));
    }
}

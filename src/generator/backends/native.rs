use crate::error::GenerationError;
use crate::formatter::CodeFormatter;
use crate::generator::emitter::{self, escape_with, fill, snake_case, upper_camel_case, Dialect, ParserModel};
use crate::generator::{CustomActions, Generator, GeneratorSettings, GeneratorVariant};
use crate::node::Node;
use super::{identifier, input_file, Backend, OutputFile};

const RUNTIME: &str = r#"#![allow(dead_code, unused_assignments, unused_mut, unused_variables, non_snake_case)]
//! Parser for the {{NAME}} grammar.

use std::fmt;

/// Node of the parse tree, named after the rule that matched it
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub begin: usize,
    pub end: usize,
    pub data: String,
    pub children: Vec<Node>,
}

impl Node {
    fn dump(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{}{}-{}: \"{}\" - Data: {:?}", "\t".repeat(depth), self.begin, self.end, self.name, self.data)?;
        for child in &self.children {
            child.dump(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f, 0)
    }
}

pub struct {{TYPE}}<'a> {
    input: &'a str,
    pos: usize,
    nodes: Vec<Node>,{{EXTRA_FIELDS}}
}

impl<'a> {{TYPE}}<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            nodes: Vec::new(),{{EXTRA_INIT}}
        }
    }

    /// Parses from the entry rule, true when it matched
    pub fn parse(&mut self) -> bool {
        self.pos = 0;
        self.nodes.clear();
        self.rule_{{ENTRY}}()
    }

    /// How much input the last parse consumed
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn root(&self) -> Node {
        Node {
            name: "{{NAME}}".to_owned(),
            begin: 0,
            end: self.pos,
            data: self.input[..self.pos].to_owned(),
            children: self.nodes.clone(),
        }
    }

    fn match_literal(&mut self, text: &str) -> bool {
        if self.input[self.pos..].starts_with(text) {
            self.pos += text.len();
            true
        } else {
            false
        }
    }

    fn match_range(&mut self, low: char, high: char) -> bool {
        match self.input[self.pos..].chars().next() {
            Some(c) if low <= c && c <= high => {
                self.pos += c.len_utf8();
                true
            }
            _ => false,
        }
    }

    fn match_any(&mut self) -> bool {
        match self.input[self.pos..].chars().next() {
            Some(c) => {
                self.pos += c.len_utf8();
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, pos: usize, mark: usize) {
        self.pos = pos;
        self.nodes.truncate(mark);
    }

    fn discard(&mut self, mark: usize) {
        self.nodes.truncate(mark);
    }

    fn add_node(&mut self, name: &str, begin: usize, mark: usize) {
        let children = self.nodes.split_off(mark);
        self.nodes.push(Node {
            name: name.to_owned(),
            begin,
            end: self.pos,
            data: self.input[begin..self.pos].to_owned(),
            children,
        });
    }

{{RULES}}}
"#;

const TEST: &str = r#"#[path = "{{BASE}}.rs"]
mod {{MODULE}};

#[test]
fn test_parse_input() {
    let input = std::fs::read_to_string("{{INPUT}}").expect("test input must be readable");
    let mut parser = {{MODULE}}::{{TYPE}}::new(&input);
    assert!(parser.parse(), "{{NAME}} failed to parse {{INPUT}}");
{{DUMP}}    assert_eq!(input.len(), parser.position(), "{{NAME}} did not consume all of {{INPUT}}");
}
"#;

const BENCH: &str = r#"#[path = "{{BASE}}.rs"]
mod {{MODULE}};

use std::time::Instant;

const ROUNDS: u32 = 100;

fn main() {
    let path = std::env::args().nth(1).unwrap_or_else(|| "{{INPUT}}".to_owned());
    let input = std::fs::read_to_string(&path).expect("benchmark input must be readable");

    let start = Instant::now();
    for _ in 0..ROUNDS {
        let mut parser = {{MODULE}}::{{TYPE}}::new(&input);
        assert!(parser.parse(), "{{NAME}} failed to parse {}", path);
    }
    let elapsed = start.elapsed();
    println!("{{NAME}}: {} rounds in {:?}, {:?} per parse", ROUNDS, elapsed, elapsed / ROUNDS);
}
"#;

const HEATMAP_DRIVER: &str = r#"
const RULE_NAMES: [&str; {{RULE_COUNT}}] = [{{RULE_NAMES}}];

fn main() {
    let path = std::env::args().nth(1).unwrap_or_else(|| "{{INPUT}}".to_owned());
    let input = std::fs::read_to_string(&path).expect("heatmap input must be readable");

    let mut parser = {{TYPE}}::new(&input);
    let accepted = parser.parse();

    let mut counts: Vec<(&str, u64)> = RULE_NAMES.iter().copied().zip(parser.counts.iter().copied()).collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    for (rule, count) in counts {
        println!("{:>12} {}", count, rule);
    }
    if !accepted {
        std::process::exit(1);
    }
}
"#;

/// Generates a Rust module holding the parser.
#[derive(Debug, Default)]
pub struct NativeGenerator {
    actions: CustomActions,
}

impl NativeGenerator {
    fn render_parser(&self, model: &ParserModel) -> String {
        let (fields, init) = if model.heatmap {
            let count = model.rules.len();
            (format!("\n    pub counts: [u64; {}],", count), format!("\n            counts: [0; {}],", count))
        } else {
            (String::new(), String::new())
        };

        let mut text = fill(RUNTIME, &[
            ("EXTRA_FIELDS", &fields),
            ("EXTRA_INIT", &init),
            ("TYPE", &model.name),
            ("NAME", &model.name),
            ("ENTRY", &model.entry),
        ]);
        text = text.replace("{{RULES}}", &model.functions(1));
        text.push_str(&self.typed_nodes(model));
        text
    }

    fn typed_nodes(&self, model: &ParserModel) -> String {
        let mut out = CodeFormatter::new();
        for (rule, fields) in model.typed_rules() {
            let type_name = format!("{}Node", upper_camel_case(rule));
            out.add("\n");
            out.line(&format!("/// Typed view of a `{}` node", rule));
            out.line("#[derive(Debug, Clone)]");
            out.line(&format!("pub struct {}<'n> {{", type_name));
            out.inc();
            out.line("pub node: &'n Node,");
            for field in fields {
                out.line(&format!("pub {}_nodes: Vec<&'n Node>,", snake_case(field)));
            }
            out.dec();
            out.line("}");
            out.add("\n");
            out.line(&format!("impl<'n> {}<'n> {{", type_name));
            out.inc();
            out.line("pub fn new(node: &'n Node) -> Self {");
            out.inc();
            out.line("Self {");
            out.inc();
            out.line("node,");
            for field in fields {
                out.line(&format!(
                    "{}_nodes: node.children.iter().filter(|child| child.name == \"{}\").collect(),",
                    snake_case(field), field
                ));
            }
            out.dec();
            out.line("}");
            out.dec();
            out.line("}");
            out.dec();
            out.line("}");
        }
        out.finish()
    }
}

impl Dialect for NativeGenerator {
    fn match_literal(&self, text: &str) -> String {
        format!("self.match_literal(\"{}\")", escape_with(text, |c| format!("\\u{{{:x}}}", c as u32)))
    }

    fn match_range(&self, low: char, high: char) -> String {
        format!("self.match_range('\\u{{{:x}}}', '\\u{{{:x}}}')", low as u32, high as u32)
    }

    fn match_any(&self) -> String {
        "self.match_any()".to_owned()
    }

    fn invoke_rule(&self, rule: &str) -> String {
        format!("self.rule_{}()", rule)
    }

    fn or_operator(&self) -> &'static str {
        " || "
    }

    fn negate(&self, condition: &str) -> String {
        format!("!{}", condition)
    }

    fn boolean(&self, value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }

    fn set_accept(&self, value: &str) -> String {
        format!("accept = {};", value)
    }

    fn save(&self, id: usize) -> String {
        format!("let save_pos_{0} = self.pos; let save_mark_{0} = self.nodes.len();", id)
    }

    fn restore(&self, id: usize) -> String {
        format!("self.restore(save_pos_{0}, save_mark_{0});", id)
    }

    fn unmoved(&self, id: usize) -> String {
        format!("self.pos == save_pos_{}", id)
    }

    fn declare_counter(&self, id: usize) -> String {
        format!("let mut count_{} = 0usize;", id)
    }

    fn increment_counter(&self, id: usize) -> String {
        format!("count_{} += 1;", id)
    }

    fn counter_positive(&self, id: usize) -> String {
        format!("count_{} > 0", id)
    }

    fn open_if(&self, condition: &str) -> String {
        format!("if {} {{", condition)
    }

    fn open_loop(&self) -> String {
        "loop {".to_owned()
    }

    fn close_block(&self) -> Option<&'static str> {
        Some("}")
    }

    fn break_loop(&self) -> &'static str {
        "break;"
    }

    fn mark_begin(&self) -> String {
        "let rule_begin = self.pos;".to_owned()
    }

    fn mark_nodes(&self) -> String {
        "let rule_mark = self.nodes.len();".to_owned()
    }

    fn add_node(&self, rule: &str) -> String {
        format!("self.add_node(\"{}\", rule_begin, rule_mark);", rule)
    }

    fn discard_nodes(&self) -> String {
        "self.discard(rule_mark);".to_owned()
    }

    fn open_rule(&self, rule: &str) -> String {
        format!("fn rule_{}(&mut self) -> bool {{", rule)
    }

    fn declare_accept(&self) -> String {
        "let mut accept = false;".to_owned()
    }

    fn return_accept(&self) -> String {
        "accept".to_owned()
    }

    fn trace_enter(&self, rule: &str) -> String {
        format!("eprintln!(\"> {} at {{}}\", self.pos);", rule)
    }

    fn trace_exit(&self, rule: &str) -> String {
        format!("eprintln!(\"< {} {{}} at {{}}\", if accept {{ \"accepted\" }} else {{ \"rejected\" }}, self.pos);", rule)
    }

    fn count_invocation(&self, index: usize) -> String {
        format!("self.counts[{}] += 1;", index)
    }
}

impl Backend for NativeGenerator {
    fn parser_files(&self, model: &ParserModel) -> Vec<OutputFile> {
        vec![(format!("{}.rs", model.base), self.render_parser(model))]
    }

    fn test_file(&self, model: &ParserModel, test_name: &str) -> OutputFile {
        let dump = if model.dump_tree { "    println!(\"{}\", parser.root());\n" } else { "" };
        let content = fill(TEST, &[
            ("DUMP", dump),
            ("BASE", &model.base),
            ("MODULE", &identifier(&model.base)),
            ("TYPE", &model.name),
            ("NAME", &model.name),
            ("INPUT", &escape_with(test_name, |c| c.to_string())),
        ]);
        (format!("{}_test.rs", model.base), content)
    }

    fn bench_file(&self, model: &ParserModel) -> OutputFile {
        let content = fill(BENCH, &[
            ("BASE", &model.base),
            ("MODULE", &identifier(&model.base)),
            ("TYPE", &model.name),
            ("NAME", &model.name),
            ("INPUT", &escape_with(input_file(model), |c| c.to_string())),
        ]);
        (format!("{}_bench.rs", model.base), content)
    }

    fn heatmap_file(&self, model: &ParserModel) -> OutputFile {
        let names = model.rules.iter()
            .map(|rule| format!("\"{}\"", rule.name))
            .collect::<Vec<_>>()
            .join(", ");
        let driver = fill(HEATMAP_DRIVER, &[
            ("RULE_COUNT", &model.rules.len().to_string()),
            ("RULE_NAMES", &names),
            ("TYPE", &model.name),
            ("INPUT", &escape_with(input_file(model), |c| c.to_string())),
        ]);
        (format!("{}_heatmap.rs", model.base), self.render_parser(model) + &driver)
    }
}

impl Generator for NativeGenerator {
    fn variant(&self) -> GeneratorVariant {
        GeneratorVariant::Native
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
        let base = settings.base_name();
        vec![
            "sh".to_owned(),
            "-c".to_owned(),
            format!("rustc --edition 2021 --test -o {0}_test {0}_test.rs && ./{0}_test", base),
        ]
    }
}

use crate::error::GenerationError;
use crate::formatter::CodeFormatter;
use crate::generator::emitter::{self, escape_with, fill, snake_case, upper_camel_case, Dialect, ParserModel};
use crate::generator::{CustomActions, Generator, GeneratorSettings, GeneratorVariant};
use crate::node::Node;
use super::{identifier, input_file, Backend, OutputFile};

const HEADER: &str = r#"#ifndef {{GUARD}}
#define {{GUARD}}

#include <cstddef>
#include <iostream>
#include <string>
#include <vector>

namespace {{MODULE}} {

// Node of the parse tree, named after the rule that matched it
struct Node {
    std::string name;
    std::size_t begin;
    std::size_t end;
    std::vector<Node> children;
};

void dump(std::ostream &out, const Node &node, const std::string &input, int depth = 0);

class {{TYPE}} {
public:
    explicit {{TYPE}}(const std::string &input);

    // Parses from the entry rule, true when it matched
    bool parse();

    // How much input the last parse consumed
    std::size_t position() const { return pos; }

    Node root() const;{{EXTRA_FIELDS}}

private:
    std::string input;
    std::size_t pos;
    std::vector<Node> nodes;

    bool match_literal(const char *text, std::size_t length);
    bool match_range(unsigned long low, unsigned long high);
    bool match_any();
    std::size_t decode(unsigned long &code) const;
    void restore(std::size_t position, std::size_t mark);
    void discard(std::size_t mark);
    void add_node(const char *name, std::size_t begin, std::size_t mark);

{{RULES}}};
{{TYPED}}
} // namespace {{MODULE}}

#endif
"#;

const SOURCE: &str = r#"{{INCLUDE}}
namespace {{MODULE}} {

{{TYPE}}::{{TYPE}}(const std::string &input) : input(input), pos(0) {}

bool {{TYPE}}::parse() {
    restore(0, 0);
    return rule_{{ENTRY}}();
}

Node {{TYPE}}::root() const {
    Node root;
    root.name = "{{NAME}}";
    root.begin = 0;
    root.end = pos;
    root.children = nodes;
    return root;
}

bool {{TYPE}}::match_literal(const char *text, std::size_t length) {
    if (input.size() - pos < length || input.compare(pos, length, text, length) != 0) {
        return false;
    }
    pos += length;
    return true;
}

// Decodes the UTF-8 sequence at the current position, returns its length, 0 at the end of input
std::size_t {{TYPE}}::decode(unsigned long &code) const {
    std::size_t left = input.size() - pos, length;
    if (left == 0) {
        return 0;
    }
    unsigned char first = static_cast<unsigned char>(input[pos]);
    if (first < 0x80) {
        code = first;
        return 1;
    } else if ((first & 0xE0) == 0xC0) {
        code = first & 0x1F;
        length = 2;
    } else if ((first & 0xF0) == 0xE0) {
        code = first & 0x0F;
        length = 3;
    } else if ((first & 0xF8) == 0xF0) {
        code = first & 0x07;
        length = 4;
    } else {
        code = first;
        return 1;
    }
    if (length > left) {
        code = first;
        return 1;
    }
    for (std::size_t i = 1; i < length; i++) {
        code = (code << 6) | (static_cast<unsigned char>(input[pos + i]) & 0x3F);
    }
    return length;
}

bool {{TYPE}}::match_range(unsigned long low, unsigned long high) {
    unsigned long code = 0;
    std::size_t length = decode(code);
    if (length == 0 || code < low || code > high) {
        return false;
    }
    pos += length;
    return true;
}

bool {{TYPE}}::match_any() {
    unsigned long code = 0;
    std::size_t length = decode(code);
    pos += length;
    return length != 0;
}

void {{TYPE}}::restore(std::size_t position, std::size_t mark) {
    pos = position;
    nodes.erase(nodes.begin() + mark, nodes.end());
}

void {{TYPE}}::discard(std::size_t mark) {
    nodes.erase(nodes.begin() + mark, nodes.end());
}

void {{TYPE}}::add_node(const char *name, std::size_t begin, std::size_t mark) {
    Node node;
    node.name = name;
    node.begin = begin;
    node.end = pos;
    node.children.assign(nodes.begin() + mark, nodes.end());
    nodes.erase(nodes.begin() + mark, nodes.end());
    nodes.push_back(node);
}

void dump(std::ostream &out, const Node &node, const std::string &input, int depth) {
    out << std::string(depth, '\t') << node.begin << "-" << node.end << ": \"" << node.name
        << "\" - Data: \"" << input.substr(node.begin, node.end - node.begin) << "\"\n";
    for (const Node &child : node.children) {
        dump(out, child, input, depth + 1);
    }
}

} // namespace {{MODULE}}
"#;

const READ_FILE: &str = r#"#include <fstream>
#include <sstream>

static bool read_file(const char *path, std::string &data) {
    std::ifstream file(path, std::ios::binary);
    if (!file) {
        return false;
    }
    std::stringstream buffer;
    buffer << file.rdbuf();
    data = buffer.str();
    return true;
}
"#;

const TEST: &str = r#"#include "{{BASE}}.h"
{{READ_FILE}}
int main() {
    std::string input;
    if (!read_file("{{INPUT}}", input)) {
        std::cerr << "cannot read {{INPUT}}\n";
        return 1;
    }
    {{MODULE}}::{{TYPE}} parser(input);
    if (!parser.parse() || parser.position() != input.size()) {
        std::cerr << "{{NAME}} stopped at " << parser.position() << " of " << input.size() << " bytes\n";
        return 1;
    }
{{DUMP}}    return 0;
}
"#;

const BENCH: &str = r#"#include <chrono>
#include "{{BASE}}.h"
{{READ_FILE}}
int main(int argc, char **argv) {
    const int rounds = 100;
    const char *path = argc > 1 ? argv[1] : "{{INPUT}}";
    std::string input;
    if (!read_file(path, input)) {
        std::cerr << "cannot read " << path << "\n";
        return 1;
    }
    auto start = std::chrono::steady_clock::now();
    for (int round = 0; round < rounds; round++) {
        {{MODULE}}::{{TYPE}} parser(input);
        if (!parser.parse()) {
            std::cerr << "{{NAME}} failed to parse " << path << "\n";
            return 1;
        }
    }
    std::chrono::duration<double, std::milli> elapsed = std::chrono::steady_clock::now() - start;
    std::cout << "{{NAME}}: " << rounds << " rounds in " << elapsed.count() << "ms, "
              << elapsed.count() / rounds << "ms per parse\n";
    return 0;
}
"#;

const HEATMAP_DRIVER: &str = r#"
{{READ_FILE}}
static const char *rule_names[{{RULE_COUNT}}] = { {{RULE_NAMES}} };

int main(int argc, char **argv) {
    const char *path = argc > 1 ? argv[1] : "{{INPUT}}";
    std::string input;
    if (!read_file(path, input)) {
        std::cerr << "cannot read " << path << "\n";
        return 1;
    }
    {{MODULE}}::{{TYPE}} parser(input);
    bool accepted = parser.parse();
    for (int i = 0; i < {{RULE_COUNT}}; i++) {
        std::cout << parser.counts[i] << "\t" << rule_names[i] << "\n";
    }
    return accepted ? 0 : 1;
}
"#;

/// Generates a C++ parser class, rules are inline members of the class in the header.
#[derive(Debug, Default)]
pub struct CppGenerator {
    actions: CustomActions,
}

impl CppGenerator {
    fn module(model: &ParserModel) -> String {
        identifier(&model.base).to_lowercase()
    }

    fn render_header(&self, model: &ParserModel) -> String {
        let fields = if model.heatmap {
            format!("\n\n    unsigned long counts[{}] = {{}};", model.rules.len())
        } else {
            String::new()
        };

        let mut text = fill(HEADER, &[
            ("GUARD", &format!("{}_HPP", Self::module(model).to_uppercase())),
            ("EXTRA_FIELDS", &fields),
            ("MODULE", &Self::module(model)),
            ("TYPE", &model.name),
        ]);
        text = text.replace("{{TYPED}}", &self.typed_nodes(model));
        text.replace("{{RULES}}", &model.functions(1))
    }

    fn typed_nodes(&self, model: &ParserModel) -> String {
        let mut out = CodeFormatter::new();
        for (rule, fields) in model.typed_rules() {
            let type_name = format!("{}Node", upper_camel_case(rule));
            out.add("\n");
            out.line(&format!("// Typed view of a {} node", rule));
            out.line(&format!("struct {} {{", type_name));
            out.inc();
            out.line("const Node *node;");
            for field in fields {
                out.line(&format!("std::vector<const Node *> {}_nodes;", snake_case(field)));
            }
            out.add("\n");
            out.line(&format!("explicit {}(const Node &node) : node(&node) {{", type_name));
            out.inc();
            if !fields.is_empty() {
                out.line("for (const Node &child : node.children) {");
                out.inc();
                for field in fields {
                    out.line(&format!("if (child.name == \"{}\") {{", field));
                    out.inc();
                    out.line(&format!("{}_nodes.push_back(&child);", snake_case(field)));
                    out.dec();
                    out.line("}");
                }
                out.dec();
                out.line("}");
            }
            out.dec();
            out.line("}");
            out.dec();
            out.line("};");
        }
        out.finish()
    }

    fn render_source(&self, model: &ParserModel, include: bool) -> String {
        let include = if include { format!("#include \"{}.h\"\n", model.base) } else { String::new() };
        fill(SOURCE, &[
            ("INCLUDE", &include),
            ("MODULE", &Self::module(model)),
            ("TYPE", &model.name),
            ("NAME", &model.name),
            ("ENTRY", &model.entry),
        ])
    }

    fn harness(&self, template: &str, model: &ParserModel, input: &str) -> String {
        let dump = if model.dump_tree {
            format!("    {}::dump(std::cout, parser.root(), input);\n", Self::module(model))
        } else {
            String::new()
        };
        fill(template, &[
            ("READ_FILE", READ_FILE),
            ("DUMP", &dump),
            ("BASE", &model.base),
            ("MODULE", &Self::module(model)),
            ("TYPE", &model.name),
            ("NAME", &model.name),
            ("INPUT", &cpp_string(input)),
        ])
    }
}

fn cpp_string(text: &str) -> String {
    escape_with(text, |c| {
        let mut buffer = [0; 4];
        c.encode_utf8(&mut buffer).bytes().map(|byte| format!("\\{:03o}", byte)).collect()
    })
}

impl Dialect for CppGenerator {
    fn match_literal(&self, text: &str) -> String {
        format!("match_literal(\"{}\", {})", cpp_string(text), text.len())
    }

    fn match_range(&self, low: char, high: char) -> String {
        format!("match_range(0x{:x}, 0x{:x})", low as u32, high as u32)
    }

    fn match_any(&self) -> String {
        "match_any()".to_owned()
    }

    fn invoke_rule(&self, rule: &str) -> String {
        format!("rule_{}()", rule)
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
        format!("std::size_t save_pos_{0} = pos, save_mark_{0} = nodes.size();", id)
    }

    fn restore(&self, id: usize) -> String {
        format!("restore(save_pos_{0}, save_mark_{0});", id)
    }

    fn unmoved(&self, id: usize) -> String {
        format!("pos == save_pos_{}", id)
    }

    fn declare_counter(&self, id: usize) -> String {
        format!("std::size_t count_{} = 0;", id)
    }

    fn increment_counter(&self, id: usize) -> String {
        format!("count_{}++;", id)
    }

    fn counter_positive(&self, id: usize) -> String {
        format!("count_{} > 0", id)
    }

    fn open_if(&self, condition: &str) -> String {
        format!("if ({}) {{", condition)
    }

    fn open_loop(&self) -> String {
        "for (;;) {".to_owned()
    }

    fn close_block(&self) -> Option<&'static str> {
        Some("}")
    }

    fn break_loop(&self) -> &'static str {
        "break;"
    }

    fn mark_begin(&self) -> String {
        "std::size_t rule_begin = pos;".to_owned()
    }

    fn mark_nodes(&self) -> String {
        "std::size_t rule_mark = nodes.size();".to_owned()
    }

    fn add_node(&self, rule: &str) -> String {
        format!("add_node(\"{}\", rule_begin, rule_mark);", rule)
    }

    fn discard_nodes(&self) -> String {
        "discard(rule_mark);".to_owned()
    }

    fn open_rule(&self, rule: &str) -> String {
        format!("bool rule_{}() {{", rule)
    }

    fn declare_accept(&self) -> String {
        "bool accept = false;".to_owned()
    }

    fn return_accept(&self) -> String {
        "return accept;".to_owned()
    }

    fn trace_enter(&self, rule: &str) -> String {
        format!("std::cerr << \"> {} at \" << pos << \"\\n\";", rule)
    }

    fn trace_exit(&self, rule: &str) -> String {
        format!(
            "std::cerr << \"< {} \" << (accept ? \"accepted\" : \"rejected\") << \" at \" << pos << \"\\n\";",
            rule
        )
    }

    fn count_invocation(&self, index: usize) -> String {
        format!("counts[{}]++;", index)
    }
}

impl Backend for CppGenerator {
    fn parser_files(&self, model: &ParserModel) -> Vec<OutputFile> {
        vec![
            (format!("{}.h", model.base), self.render_header(model)),
            (format!("{}.cpp", model.base), self.render_source(model, true)),
        ]
    }

    fn test_file(&self, model: &ParserModel, test_name: &str) -> OutputFile {
        (format!("{}_test.cpp", model.base), self.harness(TEST, model, test_name))
    }

    fn bench_file(&self, model: &ParserModel) -> OutputFile {
        (format!("{}_bench.cpp", model.base), self.harness(BENCH, model, input_file(model)))
    }

    fn heatmap_file(&self, model: &ParserModel) -> OutputFile {
        let names = model.rules.iter()
            .map(|rule| format!("\"{}\"", rule.name))
            .collect::<Vec<_>>()
            .join(", ");
        let driver = fill(HEATMAP_DRIVER, &[
            ("READ_FILE", READ_FILE),
            ("RULE_COUNT", &model.rules.len().to_string()),
            ("RULE_NAMES", &names),
            ("MODULE", &Self::module(model)),
            ("TYPE", &model.name),
            ("INPUT", &cpp_string(input_file(model))),
        ]);
        let content = self.render_header(model) + &self.render_source(model, false) + &driver;
        (format!("{}_heatmap.cpp", model.base), content)
    }
}

impl Generator for CppGenerator {
    fn variant(&self) -> GeneratorVariant {
        GeneratorVariant::Cpp
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
            format!("c++ -std=c++11 -o {0}_test {0}_test.cpp {0}.cpp && ./{0}_test", base),
        ]
    }
}

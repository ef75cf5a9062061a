use crate::error::GenerationError;
use crate::formatter::CodeFormatter;
use crate::generator::emitter::{self, escape_with, fill, upper_camel_case, Dialect, ParserModel};
use crate::generator::{CustomActions, Generator, GeneratorSettings, GeneratorVariant};
use crate::node::Node;
use super::{input_file, Backend, OutputFile};

const PARSER: &str = r#"import java.util.ArrayList;
import java.util.List;

/** Parser for the {{NAME}} grammar. */
public class {{TYPE}} {
    /** Node of the parse tree, named after the rule that matched it. */
    public static class Node {
        public final String name;
        public final int begin;
        public final int end;
        public final List<Node> children;

        Node(String name, int begin, int end, List<Node> children) {
            this.name = name;
            this.begin = begin;
            this.end = end;
            this.children = children;
        }

        public String dump(String input) {
            StringBuilder out = new StringBuilder();
            dump(input, out, 0);
            return out.toString();
        }

        private void dump(String input, StringBuilder out, int depth) {
            for (int i = 0; i < depth; i++) {
                out.append('\t');
            }
            out.append(begin).append('-').append(end).append(": \"").append(name)
                .append("\" - Data: \"").append(input, begin, end).append("\"\n");
            for (Node child : children) {
                child.dump(input, out, depth + 1);
            }
        }
    }
{{EXTRA_FIELDS}}
    private final String input;
    private int pos;
    private final List<Node> nodes = new ArrayList<>();

    public {{TYPE}}(String input) {
        this.input = input;
    }

    /** Parses from the entry rule, true when it matched. */
    public boolean parse() {
        restore(0, 0);
        return rule_{{ENTRY}}();
    }

    /** How much input the last parse consumed. */
    public int position() {
        return pos;
    }

    public Node root() {
        return new Node("{{NAME}}", 0, pos, new ArrayList<>(nodes));
    }

    private boolean matchLiteral(String text) {
        if (!input.startsWith(text, pos)) {
            return false;
        }
        pos += text.length();
        return true;
    }

    private boolean matchRange(int low, int high) {
        if (pos >= input.length()) {
            return false;
        }
        int c = input.codePointAt(pos);
        if (c < low || c > high) {
            return false;
        }
        pos += Character.charCount(c);
        return true;
    }

    private boolean matchAny() {
        if (pos >= input.length()) {
            return false;
        }
        pos += Character.charCount(input.codePointAt(pos));
        return true;
    }

    private void restore(int position, int mark) {
        pos = position;
        discard(mark);
    }

    private void discard(int mark) {
        nodes.subList(mark, nodes.size()).clear();
    }

    private void addNode(String name, int begin, int mark) {
        List<Node> tail = nodes.subList(mark, nodes.size());
        List<Node> children = new ArrayList<>(tail);
        tail.clear();
        nodes.add(new Node(name, begin, pos, children));
    }

{{RULES}}{{TYPED}}{{MAIN}}}
"#;

const READ_FILE: &str = r#"    private static String readFile(String path) throws java.io.IOException {
        return new String(java.nio.file.Files.readAllBytes(java.nio.file.Paths.get(path)), java.nio.charset.StandardCharsets.UTF_8);
    }
"#;

const TEST: &str = r#"public class {{TYPE}}Test {
{{READ_FILE}}
    public static void main(String[] args) throws java.io.IOException {
        String input = readFile("{{INPUT}}");
        {{TYPE}} parser = new {{TYPE}}(input);
        if (!parser.parse() || parser.position() != input.length()) {
            System.err.println("{{NAME}} stopped at " + parser.position() + " of " + input.length());
            System.exit(1);
        }
{{DUMP}}    }
}
"#;

const BENCH: &str = r#"public class {{TYPE}}Bench {
{{READ_FILE}}
    public static void main(String[] args) throws java.io.IOException {
        final int rounds = 100;
        String path = args.length > 0 ? args[0] : "{{INPUT}}";
        String input = readFile(path);
        long start = System.nanoTime();
        for (int round = 0; round < rounds; round++) {
            if (!new {{TYPE}}(input).parse()) {
                System.err.println("{{NAME}} failed to parse " + path);
                System.exit(1);
            }
        }
        double millis = (System.nanoTime() - start) / 1e6;
        System.out.println("{{NAME}}: " + rounds + " rounds in " + millis + "ms, " + (millis / rounds) + "ms per parse");
    }
}
"#;

const HEATMAP_MAIN: &str = r#"
    private static final String[] RULE_NAMES = { {{RULE_NAMES}} };

{{READ_FILE}}
    public static void main(String[] args) throws java.io.IOException {
        String path = args.length > 0 ? args[0] : "{{INPUT}}";
        {{TYPE}} parser = new {{TYPE}}(readFile(path));
        boolean accepted = parser.parse();
        for (int i = 0; i < RULE_NAMES.length; i++) {
            System.out.println(parser.counts[i] + "\t" + RULE_NAMES[i]);
        }
        System.exit(accepted ? 0 : 1);
    }
"#;

/// Generates a single Java class, typed nodes become nested static classes.
#[derive(Debug, Default)]
pub struct JavaGenerator {
    actions: CustomActions,
}

impl JavaGenerator {
    fn render_parser(&self, model: &ParserModel, type_name: &str, main: &str) -> String {
        let fields = if model.heatmap {
            format!("\n    public final long[] counts = new long[{}];\n", model.rules.len())
        } else {
            String::new()
        };

        let text = fill(PARSER, &[
            ("EXTRA_FIELDS", &fields),
            ("MAIN", main),
            ("TYPE", type_name),
            ("NAME", &model.name),
            ("ENTRY", &model.entry),
        ]);
        text.replace("{{TYPED}}", &self.typed_nodes(model))
            .replace("{{RULES}}", &model.functions(1))
    }

    fn typed_nodes(&self, model: &ParserModel) -> String {
        let mut out = CodeFormatter::new();
        out.inc();
        for (rule, fields) in model.typed_rules() {
            let type_name = format!("{}Node", upper_camel_case(rule));
            out.add("\n");
            out.line(&format!("/** Typed view of a {} node. */", rule));
            out.line(&format!("public static class {} {{", type_name));
            out.inc();
            out.line("public final Node node;");
            for field in fields {
                out.line(&format!("public final List<Node> {}Nodes = new ArrayList<>();", lower_camel_case(field)));
            }
            out.add("\n");
            out.line(&format!("public {}(Node node) {{", type_name));
            out.inc();
            out.line("this.node = node;");
            if !fields.is_empty() {
                out.line("for (Node child : node.children) {");
                out.inc();
                for field in fields {
                    out.line(&format!("if (child.name.equals(\"{}\")) {{", field));
                    out.inc();
                    out.line(&format!("{}Nodes.add(child);", lower_camel_case(field)));
                    out.dec();
                    out.line("}");
                }
                out.dec();
                out.line("}");
            }
            out.dec();
            out.line("}");
            out.dec();
            out.line("}");
        }
        out.finish()
    }

    fn harness(&self, template: &str, model: &ParserModel, input: &str) -> String {
        let dump = if model.dump_tree {
            "        System.out.print(parser.root().dump(input));\n"
        } else {
            ""
        };
        fill(template, &[
            ("READ_FILE", READ_FILE),
            ("DUMP", dump),
            ("TYPE", &model.name),
            ("NAME", &model.name),
            ("INPUT", &java_string(input)),
        ])
    }
}

fn lower_camel_case(rule: &str) -> String {
    let mut chars = rule.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Escapes text for a Java string literal, non-ASCII characters become UTF-16 `\u` escapes.
fn java_string(text: &str) -> String {
    escape_with(text, |c| {
        let mut buffer = [0; 2];
        c.encode_utf16(&mut buffer).iter().map(|unit| format!("\\u{:04x}", unit)).collect()
    })
}

impl Dialect for JavaGenerator {
    fn match_literal(&self, text: &str) -> String {
        format!("matchLiteral(\"{}\")", java_string(text))
    }

    fn match_range(&self, low: char, high: char) -> String {
        format!("matchRange(0x{:x}, 0x{:x})", low as u32, high as u32)
    }

    fn match_any(&self) -> String {
        "matchAny()".to_owned()
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
        format!("int save_pos_{0} = pos, save_mark_{0} = nodes.size();", id)
    }

    fn restore(&self, id: usize) -> String {
        format!("restore(save_pos_{0}, save_mark_{0});", id)
    }

    fn unmoved(&self, id: usize) -> String {
        format!("pos == save_pos_{}", id)
    }

    fn declare_counter(&self, id: usize) -> String {
        format!("int count_{} = 0;", id)
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
        "while (true) {".to_owned()
    }

    fn close_block(&self) -> Option<&'static str> {
        Some("}")
    }

    fn break_loop(&self) -> &'static str {
        "break;"
    }

    fn mark_begin(&self) -> String {
        "int rule_begin = pos;".to_owned()
    }

    fn mark_nodes(&self) -> String {
        "int rule_mark = nodes.size();".to_owned()
    }

    fn add_node(&self, rule: &str) -> String {
        format!("addNode(\"{}\", rule_begin, rule_mark);", rule)
    }

    fn discard_nodes(&self) -> String {
        "discard(rule_mark);".to_owned()
    }

    fn open_rule(&self, rule: &str) -> String {
        format!("private boolean rule_{}() {{", rule)
    }

    fn declare_accept(&self) -> String {
        "boolean accept = false;".to_owned()
    }

    fn return_accept(&self) -> String {
        "return accept;".to_owned()
    }

    fn trace_enter(&self, rule: &str) -> String {
        format!("System.err.println(\"> {} at \" + pos);", rule)
    }

    fn trace_exit(&self, rule: &str) -> String {
        format!("System.err.println(\"< {} \" + (accept ? \"accepted\" : \"rejected\") + \" at \" + pos);", rule)
    }

    fn count_invocation(&self, index: usize) -> String {
        format!("counts[{}]++;", index)
    }
}

impl Backend for JavaGenerator {
    fn parser_files(&self, model: &ParserModel) -> Vec<OutputFile> {
        vec![(format!("{}.java", model.name), self.render_parser(model, &model.name, ""))]
    }

    fn test_file(&self, model: &ParserModel, test_name: &str) -> OutputFile {
        (format!("{}Test.java", model.name), self.harness(TEST, model, test_name))
    }

    fn bench_file(&self, model: &ParserModel) -> OutputFile {
        (format!("{}Bench.java", model.name), self.harness(BENCH, model, input_file(model)))
    }

    fn heatmap_file(&self, model: &ParserModel) -> OutputFile {
        let type_name = format!("{}Heatmap", model.name);
        let names = model.rules.iter()
            .map(|rule| format!("\"{}\"", rule.name))
            .collect::<Vec<_>>()
            .join(", ");
        let main = fill(HEATMAP_MAIN, &[
            ("READ_FILE", READ_FILE),
            ("RULE_NAMES", &names),
            ("TYPE", &type_name),
            ("INPUT", &java_string(input_file(model))),
        ]);
        (format!("{}.java", type_name), self.render_parser(model, &type_name, &main))
    }
}

impl Generator for JavaGenerator {
    fn variant(&self) -> GeneratorVariant {
        GeneratorVariant::Java
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
        vec![
            "sh".to_owned(),
            "-c".to_owned(),
            format!("javac *.java && java {}Test", settings.name),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_string_uses_utf16_escapes() {
        assert_eq!("\\u00e9", java_string("é"));
        assert_eq!("\\ud83d\\ude00", java_string("\u{1f600}"));
        assert_eq!("tab\\t", java_string("tab\t"));
    }

    #[test]
    fn test_lower_camel_case() {
        assert_eq!("identCont", lower_camel_case("IdentCont"));
        assert_eq!("lEFTARROW", lower_camel_case("LEFTARROW"));
    }

    #[test]
    fn test_rule_functions() {
        let generator = JavaGenerator::default();
        assert_eq!("private boolean rule_Sum() {", generator.open_rule("Sum"));
        assert_eq!("int save_pos_4 = pos, save_mark_4 = nodes.size();", generator.save(4));
        assert_eq!("matchLiteral(\"\\u00e9\")", generator.match_literal("é"));
    }
}

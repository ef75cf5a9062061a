use crate::error::GenerationError;
use crate::formatter::CodeFormatter;
use crate::generator::emitter::{self, escape_with, fill, snake_case, Dialect, ParserModel};
use crate::generator::{CustomActions, Generator, GeneratorSettings, GeneratorVariant};
use crate::node::Node;
use super::{identifier, input_file, Backend, OutputFile};

const HEADER: &str = r#"#ifndef {{GUARD}}
#define {{GUARD}}

#include <stddef.h>

/* Node of the parse tree, named after the rule that matched it */
typedef struct {{PREFIX}}_node {
    const char *name;
    size_t begin;
    size_t end;
    struct {{PREFIX}}_node *children;
    size_t child_count;
} {{PREFIX}}_node;

typedef struct {
    const char *input;
    size_t length;
    size_t pos;
    {{PREFIX}}_node *nodes;
    size_t count;
    size_t capacity;{{EXTRA_FIELDS}}
} {{PREFIX}}_parser;

void {{PREFIX}}_init({{PREFIX}}_parser *p, const char *input, size_t length);

/* Parses from the entry rule, returns 1 when it matched */
int {{PREFIX}}_parse({{PREFIX}}_parser *p);

/* Root node named after the grammar, valid until {{PREFIX}}_free */
{{PREFIX}}_node {{PREFIX}}_root(const {{PREFIX}}_parser *p);

void {{PREFIX}}_dump(const {{PREFIX}}_node *node, const char *input, int depth);

void {{PREFIX}}_free({{PREFIX}}_parser *p);
{{TYPED}}
#endif
"#;

const SOURCE: &str = r#"{{INCLUDE}}#include <stdio.h>
#include <stdlib.h>
#include <string.h>

typedef {{PREFIX}}_parser parser;
typedef {{PREFIX}}_node node;

static void free_children(node *n) {
    size_t i;
    for (i = 0; i < n->child_count; i++) {
        free_children(&n->children[i]);
    }
    free(n->children);
    n->children = NULL;
    n->child_count = 0;
}

static void *checked(void *memory) {
    if (!memory) {
        fprintf(stderr, "{{NAME}}: out of memory\n");
        exit(1);
    }
    return memory;
}

static void push_node(parser *p, node n) {
    if (p->count == p->capacity) {
        p->capacity = p->capacity ? p->capacity * 2 : 64;
        p->nodes = checked(realloc(p->nodes, p->capacity * sizeof(node)));
    }
    p->nodes[p->count++] = n;
}

static void restore(parser *p, size_t pos, size_t mark) {
    while (p->count > mark) {
        free_children(&p->nodes[--p->count]);
    }
    p->pos = pos;
}

static void discard(parser *p, size_t mark) {
    restore(p, p->pos, mark);
}

static void add_node(parser *p, const char *name, size_t begin, size_t mark) {
    node n;
    n.name = name;
    n.begin = begin;
    n.end = p->pos;
    n.child_count = p->count - mark;
    n.children = NULL;
    if (n.child_count) {
        n.children = checked(malloc(n.child_count * sizeof(node)));
        memcpy(n.children, &p->nodes[mark], n.child_count * sizeof(node));
    }
    p->count = mark;
    push_node(p, n);
}

static int match_literal(parser *p, const char *text, size_t length) {
    if (p->length - p->pos < length || memcmp(p->input + p->pos, text, length) != 0) {
        return 0;
    }
    p->pos += length;
    return 1;
}

/* Decodes the UTF-8 sequence at the current position, returns its length, 0 at the end of input */
static size_t decode(const parser *p, unsigned long *code) {
    const unsigned char *s = (const unsigned char *) p->input + p->pos;
    size_t left = p->length - p->pos, length, i;
    if (left == 0) {
        return 0;
    }
    if (s[0] < 0x80) {
        *code = s[0];
        return 1;
    } else if ((s[0] & 0xE0) == 0xC0) {
        *code = s[0] & 0x1F;
        length = 2;
    } else if ((s[0] & 0xF0) == 0xE0) {
        *code = s[0] & 0x0F;
        length = 3;
    } else if ((s[0] & 0xF8) == 0xF0) {
        *code = s[0] & 0x07;
        length = 4;
    } else {
        *code = s[0];
        return 1;
    }
    if (length > left) {
        *code = s[0];
        return 1;
    }
    for (i = 1; i < length; i++) {
        *code = (*code << 6) | (s[i] & 0x3F);
    }
    return length;
}

static int match_range(parser *p, unsigned long low, unsigned long high) {
    unsigned long code = 0;
    size_t length = decode(p, &code);
    if (length == 0 || code < low || code > high) {
        return 0;
    }
    p->pos += length;
    return 1;
}

static int match_any(parser *p) {
    unsigned long code = 0;
    size_t length = decode(p, &code);
    p->pos += length;
    return length != 0;
}

{{PROTOTYPES}}
{{RULES}}
void {{PREFIX}}_init(parser *p, const char *input, size_t length) {
    memset(p, 0, sizeof(*p));
    p->input = input;
    p->length = length;
}

int {{PREFIX}}_parse(parser *p) {
    restore(p, 0, 0);
    return rule_{{ENTRY}}(p);
}

node {{PREFIX}}_root(const parser *p) {
    node root;
    root.name = "{{NAME}}";
    root.begin = 0;
    root.end = p->pos;
    root.children = p->nodes;
    root.child_count = p->count;
    return root;
}

void {{PREFIX}}_dump(const node *n, const char *input, int depth) {
    size_t i;
    for (i = 0; i < (size_t) depth; i++) {
        putchar('\t');
    }
    printf("%lu-%lu: \"%s\" - Data: \"%.*s\"\n", (unsigned long) n->begin, (unsigned long) n->end,
           n->name, (int) (n->end - n->begin), input + n->begin);
    for (i = 0; i < n->child_count; i++) {
        {{PREFIX}}_dump(&n->children[i], input, depth + 1);
    }
}

void {{PREFIX}}_free(parser *p) {
    restore(p, 0, 0);
    free(p->nodes);
    p->nodes = NULL;
    p->capacity = 0;
}
"#;

const READ_FILE: &str = r#"#include <stdio.h>
#include <stdlib.h>

static char *read_file(const char *path, size_t *length) {
    FILE *file = fopen(path, "rb");
    char *data;
    long size;
    if (!file) {
        return NULL;
    }
    fseek(file, 0, SEEK_END);
    size = ftell(file);
    fseek(file, 0, SEEK_SET);
    data = malloc((size_t) size + 1);
    if (data && fread(data, 1, (size_t) size, file) != (size_t) size) {
        free(data);
        data = NULL;
    }
    fclose(file);
    if (data) {
        data[size] = '\0';
        *length = (size_t) size;
    }
    return data;
}
"#;

const TEST: &str = r#"#include "{{BASE}}.h"
{{READ_FILE}}
int main(void) {
    size_t length = 0;
    int accepted;
    {{PREFIX}}_parser parser;
    char *input = read_file("{{INPUT}}", &length);
    if (!input) {
        fprintf(stderr, "cannot read {{INPUT}}\n");
        return 1;
    }
    {{PREFIX}}_init(&parser, input, length);
    accepted = {{PREFIX}}_parse(&parser);
    if (!accepted || parser.pos != length) {
        fprintf(stderr, "{{NAME}} stopped at %lu of %lu bytes\n", (unsigned long) parser.pos, (unsigned long) length);
        {{PREFIX}}_free(&parser);
        free(input);
        return 1;
    }
{{DUMP}}    {{PREFIX}}_free(&parser);
    free(input);
    return 0;
}
"#;

const BENCH: &str = r#"#include <time.h>
#include "{{BASE}}.h"
{{READ_FILE}}
#define ROUNDS 100

int main(int argc, char **argv) {
    const char *path = argc > 1 ? argv[1] : "{{INPUT}}";
    size_t length = 0;
    int round;
    double seconds;
    clock_t start;
    char *input = read_file(path, &length);
    if (!input) {
        fprintf(stderr, "cannot read %s\n", path);
        return 1;
    }
    start = clock();
    for (round = 0; round < ROUNDS; round++) {
        {{PREFIX}}_parser parser;
        {{PREFIX}}_init(&parser, input, length);
        if (!{{PREFIX}}_parse(&parser)) {
            fprintf(stderr, "{{NAME}} failed to parse %s\n", path);
            return 1;
        }
        {{PREFIX}}_free(&parser);
    }
    seconds = (double) (clock() - start) / CLOCKS_PER_SEC;
    printf("{{NAME}}: %d rounds in %.3fs, %.3fms per parse\n", ROUNDS, seconds, seconds * 1000.0 / ROUNDS);
    free(input);
    return 0;
}
"#;

const HEATMAP_DRIVER: &str = r#"
{{READ_FILE}}
static const char *rule_names[{{RULE_COUNT}}] = { {{RULE_NAMES}} };

int main(int argc, char **argv) {
    const char *path = argc > 1 ? argv[1] : "{{INPUT}}";
    size_t length = 0, i;
    int accepted;
    parser p;
    char *input = read_file(path, &length);
    if (!input) {
        fprintf(stderr, "cannot read %s\n", path);
        return 1;
    }
    {{PREFIX}}_init(&p, input, length);
    accepted = {{PREFIX}}_parse(&p);
    for (i = 0; i < {{RULE_COUNT}}; i++) {
        printf("%12lu %s\n", p.counts[i], rule_names[i]);
    }
    {{PREFIX}}_free(&p);
    free(input);
    return accepted ? 0 : 1;
}
"#;

/// Generates a C header and source pair.
/// Runtime helpers and rule functions are static, only `<prefix>_*` symbols are exported.
#[derive(Debug, Default)]
pub struct CGenerator {
    actions: CustomActions,
}

impl CGenerator {
    fn prefix(model: &ParserModel) -> String {
        identifier(&model.base).to_lowercase()
    }

    fn render_header(&self, model: &ParserModel) -> String {
        let prefix = Self::prefix(model);
        let fields = if model.heatmap {
            format!("\n    unsigned long counts[{}];", model.rules.len())
        } else {
            String::new()
        };

        let mut typed = CodeFormatter::new();
        for (rule, fields) in model.typed_rules() {
            typed.add("\n");
            typed.line(&format!("/* Typed view of a {} node, each field is the first child of that rule */", rule));
            typed.line("typedef struct {");
            typed.inc();
            typed.line(&format!("const {}_node *node;", prefix));
            for field in fields {
                typed.line(&format!("const {}_node *{}_node;", prefix, snake_case(field)));
            }
            typed.dec();
            typed.line(&format!("}} {}_{}_node;", prefix, snake_case(rule)));
            typed.line(&format!("{0}_{1}_node {0}_{1}_node_from(const {0}_node *node);", prefix, snake_case(rule)));
        }

        fill(HEADER, &[
            ("GUARD", &format!("{}_H", prefix.to_uppercase())),
            ("EXTRA_FIELDS", &fields),
            ("TYPED", &typed.finish()),
            ("PREFIX", &prefix),
        ])
    }

    fn render_source(&self, model: &ParserModel, include: bool) -> String {
        let prefix = Self::prefix(model);
        let include = if include { format!("#include \"{}.h\"\n", model.base) } else { String::new() };
        let prototypes = model.rules.iter()
            .map(|rule| format!("static int rule_{}(parser *p);\n", rule.name))
            .collect::<String>();

        let mut text = fill(SOURCE, &[
            ("INCLUDE", &include),
            ("PREFIX", &prefix),
            ("NAME", &model.name),
            ("ENTRY", &model.entry),
            ("PROTOTYPES", &prototypes),
        ]);
        text = text.replace("{{RULES}}", &(model.functions(0) + "\n"));
        text.push_str(&self.typed_definitions(model, &prefix));
        text
    }

    fn typed_definitions(&self, model: &ParserModel, prefix: &str) -> String {
        let mut out = CodeFormatter::new();
        for (rule, fields) in model.typed_rules() {
            let typed = format!("{}_{}_node", prefix, snake_case(rule));
            out.add("\n");
            out.line(&format!("{0} {0}_from(const node *n) {{", typed));
            out.inc();
            out.line(&format!("{} typed;", typed));
            if !fields.is_empty() {
                out.line("size_t i;");
            }
            out.line("memset(&typed, 0, sizeof(typed));");
            out.line("typed.node = n;");
            if !fields.is_empty() {
                out.line("for (i = 0; i < n->child_count; i++) {");
                out.inc();
                out.line("const node *child = &n->children[i];");
                for field in fields {
                    let member = format!("{}_node", snake_case(field));
                    out.line(&format!("if (!typed.{0} && strcmp(child->name, \"{1}\") == 0) {{", member, field));
                    out.inc();
                    out.line(&format!("typed.{} = child;", member));
                    out.dec();
                    out.line("}");
                }
                out.dec();
                out.line("}");
            }
            out.line("return typed;");
            out.dec();
            out.line("}");
        }
        out.finish()
    }

    fn harness(&self, template: &str, model: &ParserModel, input: &str) -> String {
        let dump = if model.dump_tree {
            format!("    {{\n        {0}_node root = {0}_root(&parser);\n        {0}_dump(&root, input, 0);\n    }}\n", Self::prefix(model))
        } else {
            String::new()
        };
        fill(template, &[
            ("READ_FILE", READ_FILE),
            ("DUMP", &dump),
            ("BASE", &model.base),
            ("PREFIX", &Self::prefix(model)),
            ("NAME", &model.name),
            ("INPUT", &c_string(input)),
        ])
    }
}

/// Escapes text for a C string literal, non-ASCII characters become octal UTF-8 bytes.
fn c_string(text: &str) -> String {
    escape_with(text, |c| {
        let mut buffer = [0; 4];
        c.encode_utf8(&mut buffer).bytes().map(|byte| format!("\\{:03o}", byte)).collect()
    })
}

impl Dialect for CGenerator {
    fn match_literal(&self, text: &str) -> String {
        format!("match_literal(p, \"{}\", {})", c_string(text), text.len())
    }

    fn match_range(&self, low: char, high: char) -> String {
        format!("match_range(p, 0x{:x}, 0x{:x})", low as u32, high as u32)
    }

    fn match_any(&self) -> String {
        "match_any(p)".to_owned()
    }

    fn invoke_rule(&self, rule: &str) -> String {
        format!("rule_{}(p)", rule)
    }

    fn or_operator(&self) -> &'static str {
        " || "
    }

    fn negate(&self, condition: &str) -> String {
        format!("!{}", condition)
    }

    fn boolean(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    fn set_accept(&self, value: &str) -> String {
        format!("accept = {};", value)
    }

    fn save(&self, id: usize) -> String {
        format!("size_t save_pos_{0} = p->pos, save_mark_{0} = p->count;", id)
    }

    fn restore(&self, id: usize) -> String {
        format!("restore(p, save_pos_{0}, save_mark_{0});", id)
    }

    fn unmoved(&self, id: usize) -> String {
        format!("p->pos == save_pos_{}", id)
    }

    fn declare_counter(&self, id: usize) -> String {
        format!("size_t count_{} = 0;", id)
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
        "size_t rule_begin = p->pos;".to_owned()
    }

    fn mark_nodes(&self) -> String {
        "size_t rule_mark = p->count;".to_owned()
    }

    fn add_node(&self, rule: &str) -> String {
        format!("add_node(p, \"{}\", rule_begin, rule_mark);", rule)
    }

    fn discard_nodes(&self) -> String {
        "discard(p, rule_mark);".to_owned()
    }

    fn open_rule(&self, rule: &str) -> String {
        format!("static int rule_{}(parser *p) {{", rule)
    }

    fn declare_accept(&self) -> String {
        "int accept = 0;".to_owned()
    }

    fn return_accept(&self) -> String {
        "return accept;".to_owned()
    }

    fn trace_enter(&self, rule: &str) -> String {
        format!("fprintf(stderr, \"> {} at %lu\\n\", (unsigned long) p->pos);", rule)
    }

    fn trace_exit(&self, rule: &str) -> String {
        format!(
            "fprintf(stderr, \"< {} %s at %lu\\n\", accept ? \"accepted\" : \"rejected\", (unsigned long) p->pos);",
            rule
        )
    }

    fn count_invocation(&self, index: usize) -> String {
        format!("p->counts[{}]++;", index)
    }
}

impl Backend for CGenerator {
    fn parser_files(&self, model: &ParserModel) -> Vec<OutputFile> {
        vec![
            (format!("{}.h", model.base), self.render_header(model)),
            (format!("{}.c", model.base), self.render_source(model, true)),
        ]
    }

    fn test_file(&self, model: &ParserModel, test_name: &str) -> OutputFile {
        (format!("{}_test.c", model.base), self.harness(TEST, model, test_name))
    }

    fn bench_file(&self, model: &ParserModel) -> OutputFile {
        (format!("{}_bench.c", model.base), self.harness(BENCH, model, input_file(model)))
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
            ("PREFIX", &Self::prefix(model)),
            ("INPUT", &c_string(input_file(model))),
        ]);
        let content = self.render_header(model) + &self.render_source(model, false) + &driver;
        (format!("{}_heatmap.c", model.base), content)
    }
}

impl Generator for CGenerator {
    fn variant(&self) -> GeneratorVariant {
        GeneratorVariant::C
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
            format!("cc -std=c99 -o {0}_test {0}_test.c {0}.c && ./{0}_test", base),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse_grammar;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_header_and_source() {
        let files = Rc::new(RefCell::new(Vec::new()));
        let sink = files.clone();
        let settings = GeneratorSettings::new("Calc", Box::new(move |name, content| {
            sink.borrow_mut().push((name.to_owned(), content.to_owned()));
            Ok(())
        }));

        let root = parse_grammar("Sum <- Num '+' Num\nNum <- [0-9]\n").unwrap();
        CGenerator::default().generate(&root, &settings).unwrap();

        let files = files.borrow();
        assert_eq!("calc.h", files[0].0);
        assert_eq!("calc.c", files[1].0);
        assert!(files[0].1.contains("int calc_parse(calc_parser *p);"));
        assert!(files[0].1.contains("const calc_node *num_node;"));
        assert!(files[1].1.contains("static int rule_Num(parser *p);"));
        assert!(files[1].1.contains("accept = match_literal(p, \"+\", 1);"));
        assert!(files[1].1.contains("accept = match_range(p, 0x30, 0x39);"));
    }

    #[test]
    fn test_c_string_escapes_utf8_bytes() {
        assert_eq!("\\303\\251", c_string("é"));
        assert_eq!("a\\\"b", c_string("a\"b"));
    }
}

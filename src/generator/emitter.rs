//! Language independent rule emission
//!
//! Every backend generates the same recursive descent structure: one function per rule
//! returning whether the rule matched, with a local `accept` flag threaded through straight line
//! code. Sequences nest ifs and rewind on failure, choices try alternatives while nothing was
//! accepted, repetitions loop until a match fails or stops consuming input.
//! A backend only supplies the syntax of each building block through `Dialect`.

use crate::error::GenerationError;
use crate::formatter::CodeFormatter;
use crate::grammar::{Expression, Grammar};
use crate::node::Node;
use super::{Generator, GeneratorSettings};

/// Name of the flag every generated rule function keeps its match result in
pub(crate) const ACCEPT: &str = "accept";

/// Syntax of the building blocks a backend's generated rule functions are made of.
/// Methods returning statements return them without a trailing newline.
pub(crate) trait Dialect {
    /// Expression consuming `text` when the input continues with it
    fn match_literal(&self, text: &str) -> String;

    /// Expression consuming one character within the inclusive code point range
    fn match_range(&self, low: char, high: char) -> String;

    /// Expression consuming any one character
    fn match_any(&self) -> String;

    /// Expression invoking the function generated for `rule`
    fn invoke_rule(&self, rule: &str) -> String;

    fn or_operator(&self) -> &'static str;

    fn negate(&self, condition: &str) -> String;

    fn boolean(&self, value: bool) -> &'static str;

    fn set_accept(&self, value: &str) -> String;

    /// Remembers input position and node count under `id`
    fn save(&self, id: usize) -> String;

    /// Rewinds input position and node count to what was saved under `id`
    fn restore(&self, id: usize) -> String;

    /// Condition holding when no input was consumed since the save under `id`
    fn unmoved(&self, id: usize) -> String;

    fn declare_counter(&self, id: usize) -> String;

    fn increment_counter(&self, id: usize) -> String;

    fn counter_positive(&self, id: usize) -> String;

    fn open_if(&self, condition: &str) -> String;

    fn open_loop(&self) -> String;

    /// Closes a block opened by `open_if`, `open_loop` or `open_rule`.
    /// None for languages delimiting blocks by indentation alone.
    fn close_block(&self) -> Option<&'static str>;

    fn break_loop(&self) -> &'static str;

    /// Remembers where the current rule started in the input
    fn mark_begin(&self) -> String;

    /// Remembers how many nodes existed when the current rule started
    fn mark_nodes(&self) -> String;

    /// Wraps the nodes produced since `mark_nodes` into a node named `rule`
    fn add_node(&self, rule: &str) -> String;

    /// Drops the nodes produced since `mark_nodes`
    fn discard_nodes(&self) -> String;

    /// Header of the function generated for `rule`, including the opening of its body
    fn open_rule(&self, rule: &str) -> String;

    fn declare_accept(&self) -> String;

    fn return_accept(&self) -> String;

    fn trace_enter(&self, rule: &str) -> String;

    fn trace_exit(&self, rule: &str) -> String;

    /// Bumps the invocation counter of the rule with the given index
    fn count_invocation(&self, index: usize) -> String;
}

struct ExpressionEmitter<'d, D: Dialect + ?Sized> {
    dialect: &'d D,
    out: CodeFormatter,
    next_id: usize,
}

impl<'d, D: Dialect + ?Sized> ExpressionEmitter<'d, D> {
    fn new(dialect: &'d D) -> Self {
        Self {
            dialect,
            out: CodeFormatter::new(),
            next_id: 0,
        }
    }

    fn id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    fn open(&mut self, text: String) {
        self.out.line(&text);
        self.out.inc();
    }

    fn close(&mut self) {
        self.out.dec();
        if let Some(close) = self.dialect.close_block() {
            self.out.line(close);
        }
    }

    fn accept(&mut self, value: &str) {
        let statement = self.dialect.set_accept(value);
        self.out.line(&statement);
    }

    fn emit(&mut self, expression: &Expression) {
        let d = self.dialect;
        match expression {
            Expression::Literal(text) => self.accept(&d.match_literal(text)),
            Expression::Class(items) => {
                if items.is_empty() {
                    self.accept(d.boolean(false));
                } else {
                    let condition = items.iter()
                        .map(|item| {
                            let (low, high) = item.bounds();
                            d.match_range(low, high)
                        })
                        .collect::<Vec<_>>()
                        .join(d.or_operator());
                    self.accept(&condition);
                }
            }
            Expression::Any => self.accept(&d.match_any()),
            Expression::Rule(rule) => self.accept(&d.invoke_rule(rule)),
            Expression::Sequence(items) => self.sequence(items),
            Expression::Choice(alternatives) => {
                let (first, rest) = match alternatives.split_first() {
                    Some(split) => split,
                    None => return self.accept(d.boolean(false)),
                };
                self.emit(first);
                for alternative in rest {
                    self.open(d.open_if(&d.negate(ACCEPT)));
                    self.emit(alternative);
                }
                for _ in rest {
                    self.close();
                }
            }
            Expression::Optional(inner) => {
                self.emit(inner);
                self.accept(d.boolean(true));
            }
            Expression::ZeroOrMore(inner) => {
                self.repeat(inner, None);
                self.accept(d.boolean(true));
            }
            Expression::OneOrMore(inner) => {
                let counter = self.id();
                self.out.line(&d.declare_counter(counter));
                self.repeat(inner, Some(counter));
                self.accept(&d.counter_positive(counter));
            }
            Expression::And(inner) => self.lookahead(inner, false),
            Expression::Not(inner) => self.lookahead(inner, true),
        }
    }

    fn sequence(&mut self, items: &[Expression]) {
        let d = self.dialect;
        let (first, rest) = match items.split_first() {
            Some(split) => split,
            None => return self.accept(d.boolean(true)),
        };

        let id = self.id();
        self.out.line(&d.save(id));
        self.emit(first);
        for item in rest {
            self.open(d.open_if(ACCEPT));
            self.emit(item);
        }
        for _ in rest {
            self.close();
        }
        self.open(d.open_if(&d.negate(ACCEPT)));
        self.out.line(&d.restore(id));
        self.close();
    }

    fn repeat(&mut self, inner: &Expression, counter: Option<usize>) {
        let d = self.dialect;
        let id = self.id();
        self.open(d.open_loop());
        self.out.line(&d.save(id));
        self.emit(inner);
        self.open(d.open_if(&d.negate(ACCEPT)));
        self.out.line(d.break_loop());
        self.close();
        if let Some(counter) = counter {
            self.out.line(&d.increment_counter(counter));
        }
        self.open(d.open_if(&d.unmoved(id)));
        self.out.line(d.break_loop());
        self.close();
        self.close();
    }

    fn lookahead(&mut self, inner: &Expression, negate: bool) {
        let d = self.dialect;
        let id = self.id();
        self.out.line(&d.save(id));
        self.emit(inner);
        self.out.line(&d.restore(id));
        if negate {
            self.accept(&d.negate(ACCEPT));
        }
    }
}

/// Statements matching `expression`, leaving the result in the `accept` flag.
/// This is the default fragment custom actions receive.
pub(crate) fn emit_expression<D: Dialect + ?Sized>(dialect: &D, expression: &Expression) -> String {
    let mut emitter = ExpressionEmitter::new(dialect);
    emitter.emit(expression);
    emitter.out.finish()
}

/// Default rule action, a node named after the rule wraps everything matched inside it.
pub(crate) fn node_fragment<D: Dialect + ?Sized>(dialect: &D, rule: &str, fragment: &str) -> String {
    let mut out = CodeFormatter::new();
    out.line(&dialect.mark_begin());
    out.line(&dialect.mark_nodes());
    out.add(fragment);
    out.line(&dialect.open_if(ACCEPT));
    out.inc();
    out.line(&dialect.add_node(rule));
    out.dec();
    if let Some(close) = dialect.close_block() {
        out.line(close);
    }
    out.finish()
}

pub(crate) fn ignore_fragment<D: Dialect + ?Sized>(dialect: &D, fragment: &str) -> String {
    let mut out = CodeFormatter::new();
    out.line(&dialect.mark_nodes());
    out.add(fragment);
    out.line(&dialect.discard_nodes());
    out.finish()
}

fn rule_function<D: Dialect + ?Sized>(dialect: &D, rule: &str, index: usize, body: &str,
                                      debug_level: u32, heatmap: bool) -> String {
    let mut out = CodeFormatter::new();
    out.line(&dialect.open_rule(rule));
    out.inc();
    out.line(&dialect.declare_accept());
    if heatmap {
        out.line(&dialect.count_invocation(index));
    }
    if debug_level >= 2 {
        out.line(&dialect.trace_enter(rule));
    }
    out.add(body);
    if debug_level >= 1 {
        out.line(&dialect.trace_exit(rule));
    }
    out.line(&dialect.return_accept());
    out.dec();
    if let Some(close) = dialect.close_block() {
        out.line(close);
    }
    out.finish()
}

/// Generated code for one grammar rule
#[derive(Debug, Clone)]
pub(crate) struct RuleModel {
    pub name: String,

    /// Complete rule function
    pub function: String,

    /// Rules the typed node of this rule has fields for, None when a custom action replaces
    /// the default node
    pub fields: Option<Vec<String>>,
}

/// Everything a backend's templates are filled from
#[derive(Debug, Clone)]
pub(crate) struct ParserModel {
    pub name: String,
    pub base: String,
    pub header: String,
    pub entry: String,
    pub rules: Vec<RuleModel>,
    pub test_name: Option<String>,
    pub dump_tree: bool,
    pub heatmap: bool,
}

impl ParserModel {
    /// Lowers the grammar tree and resolves every rule, custom actions first.
    pub fn build<D: Dialect + ?Sized>(generator: &dyn Generator, dialect: &D, root: &Node,
                                      settings: &GeneratorSettings, heatmap: bool) -> Result<Self, GenerationError> {
        settings.validate()?;
        let grammar = Grammar::from_node(root)?;
        let actions = generator.custom_actions();
        actions.validate(&grammar)?;

        for rule in grammar.undefined_rules() {
            log::warn!("rule `{}` is referenced but never defined", rule);
        }

        let rules = grammar.definitions.iter()
            .enumerate()
            .map(|(index, definition)| {
                let name = definition.name.as_str();
                let fragment = emit_expression(dialect, &definition.expression);
                let (body, fields) = match actions.get(name) {
                    Some(action) => {
                        log::debug!("rule `{}` resolved by custom action {:?}", name, action);
                        (action.apply(generator, &fragment), None)
                    }
                    None => {
                        log::debug!("rule `{}` resolved to a default node", name);
                        let fields = definition.expression.referenced_rules()
                            .into_iter()
                            .filter(|rule| grammar.contains(rule) && !actions.contains(rule))
                            .map(str::to_owned)
                            .collect();
                        (node_fragment(dialect, name, &fragment), Some(fields))
                    }
                };

                RuleModel {
                    name: name.to_owned(),
                    function: rule_function(dialect, name, index, &body, settings.debug_level, heatmap),
                    fields,
                }
            })
            .collect();

        Ok(Self {
            name: settings.name.clone(),
            base: settings.base_name(),
            header: settings.header.clone(),
            entry: grammar.entry().name.clone(),
            rules,
            test_name: settings.test_name.clone(),
            dump_tree: settings.debug,
            heatmap,
        })
    }

    /// Rule functions in declaration order, indented `level` tabs deep
    pub fn functions(&self, level: usize) -> String {
        let mut out = CodeFormatter::new();
        for _ in 0..level {
            out.inc();
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                out.add("\n");
            }
            out.add(&rule.function);
        }
        out.finish()
    }

    /// Rules that get a typed node, with their fields
    pub fn typed_rules(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.rules.iter()
            .filter_map(|rule| rule.fields.as_deref().map(|fields| (rule.name.as_str(), fields)))
    }
}

/// `IdentCont` becomes `ident_cont`, `EndOfLINE` becomes `end_of_line`.
pub(crate) fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let previous = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            if previous.is_lowercase() || previous.is_ascii_digit() || (previous.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// `end_of_line` and `endOfLine` become `EndOfLine`.
pub(crate) fn upper_camel_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Escapes text for a double quoted string literal.
/// Quotes, backslashes and common whitespace escapes are shared by every target language,
/// everything else outside printable ASCII goes through `other`.
pub(crate) fn escape_with(text: &str, other: impl Fn(char) -> String) -> String {
    let mut out = String::new();
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' '..='~' => out.push(c),
            _ => out.push_str(&other(c)),
        }
    }
    out
}

/// Fills `{{KEY}}` placeholders of a template.
pub(crate) fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_owned(), |text, (key, value)| {
        text.replace(&format!("{{{{{}}}}}", key), value)
    })
}

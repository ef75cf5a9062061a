//! Runtime interpreter for lowered grammars
//!
//! Executes a `Grammar` directly against input text without generating code, building exactly
//! the node shape a generated parser would build:
//!   + default rules produce a node named after the rule holding the nodes produced inside it
//!   + ignored rules produce no node and drop every node produced inside them
//!   + call-through rules produce no node, nodes produced inside them go to the caller
//!
//! The root node is named after the parser and holds the nodes produced by the entry rule.

use std::collections::HashMap;

use crate::error::GrammarSyntaxError;
use crate::generator::{ActionKind, CustomActions};
use crate::node::{Node, Span};
use super::expression::{Expression, Grammar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleMode {
    Node,
    Ignore,
    Call,
}

/// Runtime interpreter for a Grammar
pub struct GrammarInterpreter<'g> {
    grammar: &'g Grammar,
    name: String,
    modes: HashMap<&'g str, RuleMode>,
}

struct State<'i> {
    input: &'i str,
    pos: usize,
    nodes: Vec<Node>,
    furthest: usize,
}

impl<'i> State<'i> {
    fn fail(&mut self) -> bool {
        self.furthest = self.furthest.max(self.pos);
        false
    }

    fn restore(&mut self, pos: usize, mark: usize) {
        self.pos = pos;
        self.nodes.truncate(mark);
    }

    fn next_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }
}

impl<'g> GrammarInterpreter<'g> {
    /// Creates an interpreter whose root nodes are called `name`.
    /// Custom actions decide which rules are ignored or called through. Custom transforms only
    /// make sense for generated code and are interpreted as default rules.
    pub fn new(grammar: &'g Grammar, name: &str, actions: &CustomActions) -> Self {
        let modes = grammar.rule_names()
            .map(|rule| {
                let mode = match actions.get(rule) {
                    Some(ActionKind::Ignore) => RuleMode::Ignore,
                    Some(ActionKind::Call) => RuleMode::Call,
                    Some(ActionKind::Custom(_)) => {
                        log::debug!("custom action for `{}` is interpreted as a default rule", rule);
                        RuleMode::Node
                    }
                    None => RuleMode::Node,
                };
                (rule, mode)
            })
            .collect();

        Self {
            grammar,
            name: name.to_owned(),
            modes,
        }
    }

    /// Parses input from the entry rule.
    /// Succeeds when the entry rule matches, trailing input is left for the caller to judge.
    pub fn parse(&self, input: &str) -> Result<Node, GrammarSyntaxError> {
        let mut state = State {
            input,
            pos: 0,
            nodes: Vec::new(),
            furthest: 0,
        };

        if !self.call_rule(&self.grammar.entry().name, &mut state) {
            let message = format!("no alternative of `{}` matches", self.grammar.entry().name);
            return Err(GrammarSyntaxError::at(input, state.furthest, message));
        }

        let span = Span::new(0, state.pos);
        Ok(Node::new(self.name.clone(), &input[..state.pos], span, state.nodes))
    }

    fn call_rule(&self, rule: &str, state: &mut State) -> bool {
        let definition = match self.grammar.get(rule) {
            Some(definition) => definition,
            None => {
                log::warn!("reference to undefined rule `{}`", rule);
                return state.fail();
            }
        };

        let begin = state.pos;
        let mark = state.nodes.len();
        let accept = self.execute(&definition.expression, state);
        if !accept {
            return false;
        }

        match self.modes.get(rule).copied().unwrap_or(RuleMode::Node) {
            RuleMode::Node => {
                let children = state.nodes.split_off(mark);
                let span = Span::new(begin, state.pos);
                state.nodes.push(Node::new(rule, &state.input[begin..state.pos], span, children));
            }
            RuleMode::Ignore => state.nodes.truncate(mark),
            RuleMode::Call => {}
        }
        true
    }

    fn execute(&self, expression: &Expression, state: &mut State) -> bool {
        match expression {
            Expression::Literal(text) => {
                if state.input[state.pos..].starts_with(text.as_str()) {
                    state.pos += text.len();
                    true
                } else {
                    state.fail()
                }
            }
            Expression::Class(items) => match state.next_char() {
                Some(c) if items.iter().any(|item| item.contains(c)) => {
                    state.pos += c.len_utf8();
                    true
                }
                _ => state.fail(),
            },
            Expression::Any => match state.next_char() {
                Some(c) => {
                    state.pos += c.len_utf8();
                    true
                }
                None => state.fail(),
            },
            Expression::Rule(rule) => self.call_rule(rule, state),
            Expression::Sequence(items) => {
                let (pos, mark) = (state.pos, state.nodes.len());
                for item in items {
                    if !self.execute(item, state) {
                        state.restore(pos, mark);
                        return false;
                    }
                }
                true
            }
            Expression::Choice(alternatives) => {
                alternatives.iter().any(|alternative| self.execute(alternative, state))
            }
            Expression::Optional(inner) => {
                self.execute(inner, state);
                true
            }
            Expression::ZeroOrMore(inner) => {
                self.repeat(inner, state);
                true
            }
            Expression::OneOrMore(inner) => self.repeat(inner, state) > 0,
            Expression::And(inner) => {
                let (pos, mark) = (state.pos, state.nodes.len());
                let accept = self.execute(inner, state);
                state.restore(pos, mark);
                accept
            }
            Expression::Not(inner) => {
                let (pos, mark) = (state.pos, state.nodes.len());
                let accept = self.execute(inner, state);
                state.restore(pos, mark);
                !accept
            }
        }
    }

    /// Matches inner as often as possible, stopping as soon as a match consumes nothing.
    fn repeat(&self, inner: &Expression, state: &mut State) -> usize {
        let mut count = 0;
        loop {
            let pos = state.pos;
            if !self.execute(inner, state) {
                break;
            }
            count += 1;
            if state.pos == pos {
                break;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::CustomAction;
    use crate::grammar::parse_grammar;

    fn grammar(source: &str) -> Grammar {
        Grammar::from_node(&parse_grammar(source).unwrap()).unwrap()
    }

    fn names(node: &Node) -> Vec<&str> {
        node.children().iter().map(Node::name).collect()
    }

    #[test]
    fn test_default_rules_build_nodes() {
        let grammar = grammar("List <- Item (',' Item)*\nItem <- [0-9]+\n");
        let interpreter = GrammarInterpreter::new(&grammar, "Numbers", &CustomActions::default());
        let root = interpreter.parse("1,22,333").unwrap();

        assert_eq!("Numbers", root.name());
        assert_eq!(vec!["List"], names(&root));
        let list = &root.children()[0];
        assert_eq!(vec!["Item", "Item", "Item"], names(list));
        assert_eq!("22", list.children()[1].data());
        assert_eq!(Span::new(2, 4), list.children()[1].span());
    }

    #[test]
    fn test_ignore_drops_nodes_and_call_hoists_them() {
        let grammar = grammar("Top <- Wrap Skip\nWrap <- Item\nSkip <- ' ' Item\nItem <- 'x'\n");
        let actions = CustomActions::new(vec![
            CustomAction::ignore("Skip"),
            CustomAction::call("Wrap"),
        ]);
        let interpreter = GrammarInterpreter::new(&grammar, "Root", &actions);
        let root = interpreter.parse("x x").unwrap();

        let top = &root.children()[0];
        assert_eq!(vec!["Item"], names(top));
        assert_eq!("x x", top.data());
    }

    #[test]
    fn test_failed_alternatives_leave_no_nodes() {
        let grammar = grammar("Top <- A 'b' / A 'c'\nA <- 'a'\n");
        let interpreter = GrammarInterpreter::new(&grammar, "Root", &CustomActions::default());
        let root = interpreter.parse("ac").unwrap();
        assert_eq!(vec!["A"], names(&root.children()[0]));
    }

    #[test]
    fn test_predicates_do_not_consume() {
        let grammar = grammar("Top <- &A A !A\nA <- 'a'\n");
        let interpreter = GrammarInterpreter::new(&grammar, "Root", &CustomActions::default());
        let root = interpreter.parse("ab").unwrap();
        assert_eq!(1, root.span().end);
        assert_eq!(vec!["A"], names(&root.children()[0]));
    }

    #[test]
    fn test_repetition_of_empty_match_terminates() {
        let grammar = grammar("Top <- ('a'?)*\n");
        let interpreter = GrammarInterpreter::new(&grammar, "Root", &CustomActions::default());
        assert_eq!(0, interpreter.parse("b").unwrap().span().end);
    }

    #[test]
    fn test_failure_reports_furthest_position() {
        let grammar = grammar("Top <- 'ab' 'cd' / 'x'\n");
        let interpreter = GrammarInterpreter::new(&grammar, "Root", &CustomActions::default());
        let error = interpreter.parse("abce").unwrap_err();
        assert_eq!(2, error.position);
        assert_eq!(3, error.column);
    }

    #[test]
    fn test_non_ascii_input() {
        let grammar = grammar("Top <- . [a-z] 'é'\n");
        let interpreter = GrammarInterpreter::new(&grammar, "Root", &CustomActions::default());
        let root = interpreter.parse("ñaé").unwrap();
        assert_eq!("ñaé".len(), root.span().end);
    }
}

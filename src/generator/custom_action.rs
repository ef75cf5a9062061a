use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::GenerationError;
use crate::grammar::Grammar;
use super::Generator;

/// Transform applied to the fragment generated for a rule.
/// Receives the active generator and the default generated fragment, returns the replacement.
pub type ActionHandler = Arc<dyn Fn(&dyn Generator, &str) -> String + Send + Sync>;

/// What a custom action does with a rule
#[derive(Clone)]
pub enum ActionKind {
    /// Match the rule but produce no node, dropping the nodes produced inside it
    Ignore,

    /// Match the rule without a node of its own, nodes produced inside it go to the caller
    Call,

    /// Replace the generated fragment with the handler's result
    Custom(ActionHandler),
}

impl ActionKind {
    pub fn apply(&self, generator: &dyn Generator, fragment: &str) -> String {
        match self {
            ActionKind::Ignore => generator.ignore(fragment),
            ActionKind::Call => generator.call(fragment),
            ActionKind::Custom(handler) => handler(generator, fragment),
        }
    }
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Ignore => write!(f, "Ignore"),
            ActionKind::Call => write!(f, "Call"),
            ActionKind::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A rule name paired with the action overriding its generated code
#[derive(Clone, Debug)]
pub struct CustomAction {
    pub rule: String,
    pub kind: ActionKind,
}

impl CustomAction {
    pub fn ignore(rule: impl Into<String>) -> Self {
        Self { rule: rule.into(), kind: ActionKind::Ignore }
    }

    pub fn call(rule: impl Into<String>) -> Self {
        Self { rule: rule.into(), kind: ActionKind::Call }
    }

    pub fn custom<F>(rule: impl Into<String>, handler: F) -> Self
        where F: Fn(&dyn Generator, &str) -> String + Send + Sync + 'static {
        Self { rule: rule.into(), kind: ActionKind::Custom(Arc::new(handler)) }
    }
}

/// Immutable rule name to action table, built once per generation run.
/// When a rule is registered more than once the first registration wins.
#[derive(Clone, Debug, Default)]
pub struct CustomActions {
    actions: BTreeMap<String, ActionKind>,
}

impl CustomActions {
    pub fn new(actions: impl IntoIterator<Item = CustomAction>) -> Self {
        let mut table = BTreeMap::new();
        for action in actions {
            if table.contains_key(&action.rule) {
                log::warn!("custom action for `{}` registered twice, keeping the first", action.rule);
                continue;
            }
            table.insert(action.rule, action.kind);
        }
        Self { actions: table }
    }

    pub fn get(&self, rule: &str) -> Option<&ActionKind> {
        self.actions.get(rule)
    }

    pub fn contains(&self, rule: &str) -> bool {
        self.actions.contains_key(rule)
    }

    /// Registered rule names in sorted order
    pub fn rules(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Every registered rule must be defined by the grammar.
    pub fn validate(&self, grammar: &Grammar) -> Result<(), GenerationError> {
        match self.rules().find(|rule| !grammar.contains(rule)) {
            Some(rule) => Err(GenerationError::UnknownRule(rule.to_owned())),
            None => Ok(()),
        }
    }
}

use std::str::FromStr;

use crate::error::{CompileError, NodeLocation};
use crate::formatter::CodeFormatter;
use crate::node::Node;
use super::primitives::Primitive;

/// Element type written into the loop variable declaration of a `For`. The mini-language does
/// not declare the element type of a collection so the output keeps a marker for it.
const UNRESOLVED_ELEMENT_TYPE: &str = "TODO";

/// Names of the enclosing class and function while compiling a subtree.
/// Passed down by value, every construct that opens a scope hands a modified copy to its body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileContext {
    pub current_class: Option<String>,
    pub current_function: Option<String>,
}

impl CompileContext {
    fn in_class(&self, name: &str) -> Self {
        Self {
            current_class: Some(name.to_owned()),
            current_function: None,
        }
    }

    fn in_function(&self, name: &str) -> Self {
        Self {
            current_class: self.current_class.clone(),
            current_function: Some(name.to_owned()),
        }
    }
}

/// Compiler translates a mini-language program tree into formatted output source.
///
/// Each node name has a fixed template composing the compiled text of its children. Names
/// without a template are structural wrappers and compile to the concatenation of their
/// children. Leaf operators and keywords are looked up in the [`Primitive`] table first.
#[derive(Debug, Default, Clone, Copy)]
pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Self
    }

    /// Compiles a whole tree. The tree is assumed well formed, see [`Compiler::try_compile`].
    pub fn compile(&self, root: &Node) -> String {
        self.recurse(root, &CompileContext::default())
    }

    /// Checks the tree against the child layouts the templates index into, then compiles it.
    pub fn try_compile(&self, root: &Node) -> Result<String, CompileError> {
        self.validate(root)?;
        Ok(self.compile(root))
    }

    /// Returns the type text of a `Type` node.
    ///
    /// # Panics
    /// When `node` is not a `Type` node; the tree then does not come from the program grammar.
    pub fn resolve_type<'n>(&self, node: &'n Node) -> &'n str {
        assert!(node.is("Type"), "resolve_type called on `{}` at {}", node.name(), node.span().begin);
        node.data()
    }

    /// Walks the whole tree and reports the first node whose children do not have the layout
    /// its template expects.
    pub fn validate(&self, node: &Node) -> Result<(), CompileError> {
        if let Some(reason) = layout_violation(node) {
            return Err(CompileError::MalformedNode {
                node: NodeLocation::from(node),
                reason,
            });
        }
        node.children().iter().try_for_each(|child| self.validate(child))
    }

    pub fn recurse(&self, node: &Node, context: &CompileContext) -> String {
        if let Ok(primitive) = Primitive::from_str(node.name()) {
            return primitive.text().to_owned();
        }

        log::trace!("compiling {} at {}", node.name(), node.span().begin);
        let children = node.children();
        match node.name() {
            "Identifier" | "Boolean" | "Float" | "Integer" => node.data().to_owned(),
            "Text" => format!("\"{}\"", node.data()),

            "Comparison" => self.concat(children, context),
            "While" => format!("while ({})\n{}", self.recurse(&children[0], context), self.recurse(&children[1], context)),
            "If" => format!("if ({})\n{}", self.recurse(&children[0], context), self.recurse(&children[1], context)),
            "ElseIf" => format!("else {}", self.concat(children, context)),
            "Else" => format!("else\n{}", self.concat(children, context)),
            "For" => self.for_loop(children, context),
            "Parenthesized" => format!("({})", self.concat(children, context)),

            "NewStatement" => format!("new {}", self.recurse(&children[0], context)),
            "ReturnStatement" => {
                log::trace!("return from {}", context.current_function.as_deref().unwrap_or("<none>"));
                format!("return {}", self.recurse(&children[0], context))
            }
            "PostInc" => format!("{}++", self.recurse(&children[0], context)),
            "PostDec" => format!("{}--", self.recurse(&children[0], context)),

            "ArrayIndexing" => format!("{}[{}]", self.recurse(&children[0], context), self.recurse(&children[1], context)),
            "ArraySlicing" => self.slicing(children, context),
            "FunctionCall" => {
                let arguments: Vec<String> = children[1..].iter()
                    .map(|argument| self.recurse(argument, context))
                    .collect();
                format!("{}({})", children[0].data(), arguments.join(", "))
            }

            "Assignment" => format!("{} = {}", children[0].data(), self.recurse(&children[1], context)),
            "PlusEquals" => format!("{} += {}", children[0].data(), self.recurse(&children[1], context)),
            "VariableDeclaration" => {
                let target = &children[1];
                let name = if target.is("Assignment") {
                    self.recurse(target, context)
                } else {
                    target.data().to_owned()
                };
                format!("{} {}", self.resolve_type(&children[0]), name)
            }

            "Class" => self.class(children, context),
            "Block" => self.block(children, context),
            "Destructor" => {
                let class = context.current_class.as_deref().unwrap_or_else(|| children[0].data());
                let body = self.recurse(&children[1], &context.in_function(&format!("~{}", class)));
                format!("~{}()\n{}", class, body)
            }
            "FunctionDeclaration" => self.function(children, context),

            _ => self.concat(children, context),
        }
    }

    fn concat(&self, children: &[Node], context: &CompileContext) -> String {
        children.iter().map(|child| self.recurse(child, context)).collect()
    }

    fn for_loop(&self, children: &[Node], context: &CompileContext) -> String {
        let variable = self.recurse(&children[0], context);
        let array = self.recurse(&children[1], context);
        let block = self.recurse(&children[2], context);
        let body = block.strip_prefix("{\n").unwrap_or(&block);

        format!(
            "for (int i = 0; i < {array}.size(); i++)\n{{\n\t{ty} {variable} = {array}[i];\n{body}",
            array = array,
            ty = UNRESOLVED_ELEMENT_TYPE,
            variable = variable,
            body = body,
        )
    }

    fn slicing(&self, children: &[Node], context: &CompileContext) -> String {
        let collection = self.recurse(&children[0], context);
        let begin = match &children[1] {
            bound if bound.is("colon") => String::from("0"),
            bound => self.recurse(bound, context),
        };
        let end = match children.last() {
            Some(bound) if !bound.is("colon") => self.recurse(bound, context),
            _ => format!("{}.size()", collection),
        };
        format!("{}.slice({}, {})", collection, begin, end)
    }

    fn class(&self, children: &[Node], context: &CompileContext) -> String {
        let name = children[0].data();
        let context = context.in_class(name);

        let mut formatter = CodeFormatter::new();
        formatter.add(&format!("class {}\n{{\npublic:\n", name));
        formatter.inc();
        for member in &children[1..] {
            let mut text = self.recurse(member, &context);
            if member.is("VariableDeclaration") {
                text.push_str(";\n");
            }
            formatter.add(&text);
        }
        formatter.dec();
        formatter.add("};\n");
        formatter.finish()
    }

    fn block(&self, children: &[Node], context: &CompileContext) -> String {
        let mut formatter = CodeFormatter::new();
        formatter.add("{\n");
        formatter.inc();
        for statement in children {
            let mut text = self.recurse(statement, context);
            if !text.ends_with("}\n") {
                text.push_str(";\n");
            }
            formatter.add(&text);
        }
        formatter.dec();
        formatter.add("}\n");
        formatter.finish()
    }

    fn function(&self, children: &[Node], context: &CompileContext) -> String {
        let name = children[1].data();
        let context = context.in_function(name);
        let last = children.len() - 1;

        let parameters: Vec<String> = children[2..last].iter()
            .map(|parameter| self.recurse(parameter, &context))
            .collect();
        format!(
            "{} {}({})\n{}",
            self.resolve_type(&children[0]),
            name,
            parameters.join(", "),
            self.recurse(&children[last], &context),
        )
    }
}

/// Describes how `node`'s children break the layout its template indexes into, if they do.
fn layout_violation(node: &Node) -> Option<String> {
    let children = node.children();
    let count = children.len();
    let at_least = |minimum: usize| {
        (count < minimum).then(|| format!("expected at least {} children, found {}", minimum, count))
    };
    let named = |index: usize, name: &str| match children.get(index) {
        Some(child) if child.is(name) => None,
        Some(child) => Some(format!("child {} is `{}`, expected `{}`", index, child.name(), name)),
        None => Some(format!("missing `{}` child at {}", name, index)),
    };

    match node.name() {
        "Comparison" => (count != 3).then(|| format!("expected 3 children, found {}", count)),
        "While" | "If" | "ArrayIndexing" | "Assignment" | "PlusEquals" => at_least(2),
        "NewStatement" | "ReturnStatement" | "PostInc" | "PostDec" | "FunctionCall" | "Class" => at_least(1),
        "For" => at_least(3),
        "VariableDeclaration" => at_least(2).or_else(|| named(0, "Type")),
        "Destructor" => at_least(2),
        "FunctionDeclaration" => at_least(3).or_else(|| named(0, "Type")),
        "ArraySlicing" => slicing_violation(children),
        _ => None,
    }
}

fn slicing_violation(children: &[Node]) -> Option<String> {
    if children.len() < 2 {
        return Some(format!("expected at least 2 children, found {}", children.len()));
    }
    if children.len() > 4 {
        return Some(format!("expected at most 4 children, found {}", children.len()));
    }

    let colons: Vec<usize> = children.iter()
        .enumerate()
        .filter(|(_, child)| child.is("colon"))
        .map(|(index, _)| index)
        .collect();
    match colons.as_slice() {
        [] => Some(String::from("slice has no colon")),
        // At most one bound on each side of the colon, after the collection.
        [position] if (1..=2).contains(position) && children.len() - position <= 2 => None,
        [position] => Some(format!("colon at {} leaves no room for the bounds", position)),
        _ => Some(format!("slice has {} colons", colons.len())),
    }
}

use crate::compiler::{CompileContext, Compiler};
use crate::error::CompileError;
use crate::node::Node;

fn leaf(name: &str, data: &str) -> Node {
    Node::leaf(name, data)
}

fn id(name: &str) -> Node {
    leaf("Identifier", name)
}

fn branch(name: &str, children: Vec<Node>) -> Node {
    Node::branch(name, children)
}

fn compile(node: &Node) -> String {
    Compiler::new().compile(node)
}

#[test]
fn test_comparison() {
    let comparison = branch("Comparison", vec![id("x"), leaf("ge", ">="), leaf("Integer", "5")]);
    assert_eq!("x >= 5", compile(&comparison));
}

#[test]
fn test_for_each_loop() {
    let for_loop = branch("For", vec![id("item"), id("list"), branch("Block", vec![])]);
    assert_eq!(
        "for (int i = 0; i < list.size(); i++)\n{\n\tTODO item = list[i];\n}\n",
        compile(&for_loop)
    );
}

#[test]
fn test_for_each_loop_keeps_body_statements() {
    let body = branch("Block", vec![branch("PostInc", vec![id("n")])]);
    let for_loop = branch("For", vec![id("item"), id("list"), body]);
    assert_eq!(
        "for (int i = 0; i < list.size(); i++)\n{\n\tTODO item = list[i];\n\tn++;\n}\n",
        compile(&for_loop)
    );
}

#[test]
fn test_slicing_shapes() {
    let colon = || leaf("colon", ":");
    let right_bound = branch("ArraySlicing", vec![id("arr"), colon(), leaf("Integer", "3")]);
    let left_bound = branch("ArraySlicing", vec![id("arr"), leaf("Integer", "1"), colon()]);
    let full = branch("ArraySlicing", vec![id("arr"), colon()]);
    let both = branch("ArraySlicing", vec![id("arr"), leaf("Integer", "1"), colon(), leaf("Integer", "3")]);

    assert_eq!("arr.slice(0, 3)", compile(&right_bound));
    assert_eq!("arr.slice(1, arr.size())", compile(&left_bound));
    assert_eq!("arr.slice(0, arr.size())", compile(&full));
    assert_eq!("arr.slice(1, 3)", compile(&both));
}

#[test]
fn test_block_does_not_terminate_nested_blocks_twice() {
    let condition = branch("If", vec![id("ready"), branch("Block", vec![])]);
    let assignment = branch("Assignment", vec![id("x"), leaf("Integer", "1")]);
    let block = branch("Block", vec![condition, assignment]);

    assert_eq!("{\n\tif (ready)\n\t{\n\t}\n\tx = 1;\n}\n", compile(&block));
}

#[test]
fn test_nested_blocks_indent() {
    let inner = branch("Block", vec![branch("BreakStatement", vec![])]);
    let outer = branch("Block", vec![branch("While", vec![leaf("Boolean", "true"), inner])]);
    assert_eq!("{\n\twhile (true)\n\t{\n\t\tbreak;\n\t}\n}\n", compile(&outer));
}

#[test]
fn test_class_with_member_and_destructor() {
    let class = branch("Class", vec![
        id("Foo"),
        branch("VariableDeclaration", vec![leaf("Type", "int"), id("x")]),
        branch("Destructor", vec![id("Bar"), branch("Block", vec![])]),
    ]);
    assert_eq!("class Foo\n{\npublic:\n\tint x;\n\t~Foo()\n\t{\n\t}\n};\n", compile(&class));
}

#[test]
fn test_destructor_outside_class_uses_its_own_name() {
    let destructor = branch("Destructor", vec![id("Bar"), branch("Block", vec![])]);
    assert_eq!("~Bar()\n{\n}\n", compile(&destructor));
}

#[test]
fn test_function_declaration() {
    let function = branch("FunctionDeclaration", vec![
        leaf("Type", "int"),
        id("add"),
        branch("VariableDeclaration", vec![leaf("Type", "int"), id("a")]),
        branch("VariableDeclaration", vec![leaf("Type", "int"), id("b")]),
        branch("Block", vec![branch("ReturnStatement", vec![id("a")])]),
    ]);
    assert_eq!("int add(int a, int b)\n{\n\treturn a;\n}\n", compile(&function));
}

#[test]
fn test_every_construct_emits_its_fixed_fragments() {
    let block = || branch("Block", vec![]);
    let cases = vec![
        (branch("If", vec![id("c"), block()]), "if ("),
        (branch("While", vec![id("c"), block()]), "while ("),
        (branch("ElseIf", vec![branch("If", vec![id("c"), block()])]), "else if ("),
        (branch("Else", vec![block()]), "else\n{"),
        (branch("NewStatement", vec![branch("FunctionCall", vec![id("Foo")])]), "new Foo()"),
        (branch("ReturnStatement", vec![id("r")]), "return r"),
        (branch("PostInc", vec![id("i")]), "i++"),
        (branch("PostDec", vec![id("i")]), "i--"),
        (branch("ArrayIndexing", vec![id("a"), leaf("Integer", "2")]), "a[2]"),
        (branch("FunctionCall", vec![id("f"), id("a"), leaf("Float", "1.5")]), "f(a, 1.5)"),
        (branch("Assignment", vec![id("a"), leaf("Boolean", "false")]), "a = false"),
        (branch("PlusEquals", vec![id("a"), leaf("Integer", "1")]), "a += 1"),
        (branch("VariableDeclaration", vec![
            leaf("Type", "int[]"),
            branch("Assignment", vec![id("a"), id("b")]),
        ]), "int[] a = b"),
        (branch("Parenthesized", vec![id("a")]), "(a)"),
        (branch("TextLiteral", vec![leaf("Text", "hi")]), "\"hi\""),
        (branch("MemberChain", vec![id("a"), leaf("MemberAccess", "."), id("b")]), "a.b"),
        (branch("Logical", vec![id("a"), leaf("and", "&&"), id("b"), leaf("or", "||"), id("c")]), "a && b || c"),
        (branch("Sum", vec![id("a"), leaf("plus", "+"), id("b"), leaf("minus", "-"), id("c")]), "a + b - c"),
        (branch("Negation", vec![leaf("not", "!"), id("a")]), "!a"),
        (branch("BreakStatement", vec![]), "break"),
    ];

    for (node, fragment) in cases {
        let output = compile(&node);
        assert!(output.starts_with(fragment), "{} compiled to {:?}", node.name(), output);
    }
}

#[test]
fn test_comparators() {
    for (name, text) in [("ge", " >= "), ("le", " <= "), ("eq", " == "), ("ne", " != "), ("lt", " < "), ("gt", " > ")] {
        let comparison = branch("Comparison", vec![id("a"), leaf(name, ""), id("b")]);
        assert_eq!(format!("a{}b", text), compile(&comparison));
    }
}

#[test]
fn test_unknown_names_concatenate_children() {
    let wrapper = branch("Wrapper", vec![id("a"), branch("Other", vec![id("b"), id("c")])]);
    assert_eq!("abc", compile(&wrapper));
}

#[test]
fn test_context_defaults_to_no_scope() {
    assert_eq!(CompileContext { current_class: None, current_function: None }, CompileContext::default());
}

#[test]
#[should_panic(expected = "resolve_type called on `Identifier`")]
fn test_resolve_type_rejects_other_nodes() {
    Compiler::new().resolve_type(&id("int"));
}

#[test]
fn test_validate_rejects_malformed_slicing() {
    let compiler = Compiler::new();
    let too_short = branch("ArraySlicing", vec![id("arr")]);
    let no_colon = branch("ArraySlicing", vec![id("arr"), id("a"), id("b")]);
    let misplaced = branch("ArraySlicing", vec![id("arr"), leaf("colon", ":"), id("a"), id("b")]);

    for node in [too_short, no_colon, misplaced] {
        let nested = branch("Block", vec![node]);
        assert!(matches!(compiler.try_compile(&nested), Err(CompileError::MalformedNode { .. })));
    }
}

#[test]
fn test_validate_reports_non_type_declaration() {
    let declaration = branch("VariableDeclaration", vec![id("int"), id("x")]);
    match Compiler::new().try_compile(&declaration) {
        Err(CompileError::MalformedNode { node, reason }) => {
            assert_eq!("VariableDeclaration", node.name);
            assert!(reason.contains("expected `Type`"), "{}", reason);
        }
        other => panic!("expected a malformed node, got {:?}", other),
    }
}

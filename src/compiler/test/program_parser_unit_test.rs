use crate::compiler::{Pipeline, PestProgramParser};
use crate::error::CompileError;
use crate::grammar::NodeParser;

fn compile(source: &str) -> Result<String, CompileError> {
    Pipeline::<PestProgramParser>::default().compile_str(source)
}

#[test]
fn test_class_program() {
    let source = "
class Counter {
    int count;
    ~Counter() { }
    void tick(int step) {
        count += step;
        if (count >= 10) {
            count = 0;
        }
    }
}
";
    let expected = "class Counter\n{\npublic:\n\tint count;\n\t~Counter()\n\t{\n\t}\n\tvoid tick(int step)\n\t{\n\t\tcount += step;\n\t\tif (count >= 10)\n\t\t{\n\t\t\tcount = 0;\n\t\t}\n\t}\n};\n";
    assert_eq!(expected, compile(source).unwrap());
}

#[test]
fn test_control_flow_program() {
    let source = r#"
int main() {
    for (item : items[:3]) {
        print(item);
    }
    if (x == 1) { y = 2; } else if (x != 2) { y = 3; } else { break; }
    return new Foo(1, "hi");
}
"#;
    let output = compile(source).unwrap();
    let expected_lines = [
        "int main()",
        "\tfor (int i = 0; i < items.slice(0, 3).size(); i++)",
        "\t\tTODO item = items.slice(0, 3)[i];",
        "\t\tprint(item);",
        "\tif (x == 1)",
        "\telse if (x != 2)",
        "\telse",
        "\t\tbreak;",
        "\treturn new Foo(1, \"hi\");",
    ];
    for line in expected_lines {
        assert!(output.lines().any(|candidate| candidate == line), "missing {:?} in\n{}", line, output);
    }
}

#[test]
fn test_tree_shape() {
    let tree = PestProgramParser::default().parse("int f(int a) { return a[1:]; }").unwrap();
    assert_eq!("Program", tree.name());

    let function = &tree.children()[0];
    let names: Vec<&str> = function.children().iter().map(|child| child.name()).collect();
    assert_eq!(vec!["FunctionDeclaration"], vec![function.name()]);
    assert_eq!(vec!["Type", "Identifier", "VariableDeclaration", "Block"], names);
}

#[test]
fn test_keywords_are_not_identifiers() {
    assert!(matches!(compile("int if() { }"), Err(CompileError::Syntax(_))));
    assert_eq!("int iffy()\n{\n}\n", compile("int iffy() { }").unwrap());
}

#[test]
fn test_empty_program() {
    assert_eq!("", compile("  // nothing here\n").unwrap());
}

#[test]
fn test_syntax_error_has_position() {
    match compile("int main( {") {
        Err(CompileError::Syntax(error)) => assert_eq!(1, error.line),
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn test_compile_and_save() {
    let directory = tempfile::tempdir().unwrap();
    let source = directory.path().join("main.rc");
    let destination = directory.path().join("main.cpp");
    std::fs::write(&source, "void run() { go(); }").unwrap();

    Pipeline::<PestProgramParser>::default().compile_and_save(&source, &destination).unwrap();
    assert_eq!("void run()\n{\n\tgo();\n}\n", std::fs::read_to_string(&destination).unwrap());
}

#[test]
fn test_missing_source_is_io_error() {
    let result = Pipeline::<PestProgramParser>::default().compile(std::path::Path::new("/nonexistent/main.rc"));
    assert!(matches!(result, Err(CompileError::Io(_))));
}

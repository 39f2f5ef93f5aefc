use folders::{
    compile,
    error::Error,
    eval::{self, Evaluator, StreamIo, Value},
};

fn run(source: &str, input: &str) -> Result<String, Error> {
    let (ctr, root) = compile(source).expect("program should parse");
    let io = eval::execute(&ctr, root, StreamIo::new(input.as_bytes(), Vec::new()))?;
    let (_, output) = io.into_parts();
    Ok(String::from_utf8(output).expect("output should be utf-8"))
}

fn output(source: &str) -> String {
    run(source, "").unwrap()
}

#[test]
fn int_arithmetic_wraps() {
    assert_eq!(output("print(2147483647 + 1)\n"), "-2147483648");
    assert_eq!(output("print(-2147483647 - 2)\n"), "2147483647");
    assert_eq!(output("print(65536 * 65536)\n"), "0");
    assert_eq!(output("print(4294967295)\n"), "-1");
}

#[test]
fn int_division_floors() {
    assert_eq!(output("print(7 / 2)\n"), "3");
    assert_eq!(output("print(-7 / 2)\n"), "-4");
    assert!(matches!(run("print(1 / 0)\n", ""), Err(Error::DivisionByZero)));
}

#[test]
fn floats() {
    assert_eq!(output("print(1.5)\n"), "1.5");
    assert_eq!(output("print(1.5 + 2.5)\n"), "4.0");
    assert_eq!(output("print(1.0 / 0.0)\n"), "inf");
}

#[test]
fn char_arithmetic_wraps_on_the_byte() {
    assert_eq!(output("print('a' + 'b')\n"), "\u{c3}");
    assert_eq!(output("print('z' - 'a')\n"), "\u{19}");
    assert_eq!(output("print('a' - 'b')\n"), "\u{ff}");
    assert_eq!(output("print('a' * 'b')\n"), "\"");
    assert_eq!(output("print('d' / 'b')\n"), "\u{1}");
    assert_eq!(output("char c\nprint(c + 'A')\n"), "A");
    assert!(matches!(
        run("print('a' / '\\0')\n", ""),
        Err(Error::DivisionByZero)
    ));
}

#[test]
fn string_and_char_concatenate_both_ways() {
    assert_eq!(output("print(\"ab\" + 'c')\n"), "abc");
    assert_eq!(output("print('c' + \"ab\")\n"), "cab");
}

#[test]
fn strings_only_add() {
    assert!(matches!(
        run("print(\"a\" - \"b\")\n", ""),
        Err(Error::InvalidOperation(_))
    ));
    assert!(matches!(
        run("print(\"a\" < 1)\n", ""),
        Err(Error::InvalidOperation(_))
    ));
}

#[test]
fn comparisons_mix_numbers_and_chars() {
    assert_eq!(output("print(100 > 'a')\n"), "1");
    assert_eq!(output("print(97 == 'a')\n"), "1");
    assert_eq!(output("print(1 < 1.5)\n"), "1");
    assert_eq!(output("print(\"abc\" < \"abd\")\n"), "1");
    assert_eq!(output("print(2 < 1)\n"), "0");
}

#[test]
fn cached_literals_do_not_freeze_variables() {
    let source = "\
int i
while i < 3:
    print(2 + 2)
    i = i + 1
";
    let (ctr, root) = compile(source).unwrap();
    let mut evaluator = Evaluator::new(&ctr, StreamIo::new("".as_bytes(), Vec::new()));
    evaluator.run(root).unwrap();
    assert_eq!(evaluator.value_of("i"), Some(&Value::Int(3)));

    let (_, output) = evaluator.into_io().into_parts();
    assert_eq!(String::from_utf8(output).unwrap(), "444");
}

#[test]
fn nested_control_flow() {
    let source = "\
int n
n = 5
while n > 0:
    if n == 3:
        print(\"three \")
    print(n)
    n = n - 1
print('!')
";
    assert_eq!(output(source), "54three 321!");
}

#[test]
fn declared_variables_start_at_zero() {
    let source = "\
int i
float f
string s
print(i)
print(f)
print(s + 'x')
";
    assert_eq!(output(source), "00.0x");
}

#[test]
fn declarations_are_checked() {
    assert!(matches!(
        run("int x\nint x\n", ""),
        Err(Error::DuplicateDeclaration(name)) if name == "x"
    ));
    assert!(matches!(
        run("y = 1\n", ""),
        Err(Error::UndeclaredVariable(name)) if name == "y"
    ));
    assert!(matches!(
        run("print(z)\n", ""),
        Err(Error::UndeclaredVariable(name)) if name == "z"
    ));
    assert!(matches!(
        run("input(w)\n", "1\n"),
        Err(Error::UndeclaredVariable(name)) if name == "w"
    ));
}

#[test]
fn assignment_keeps_declared_type_for_arithmetic() {
    let source = "\
int x
x = 2.5
print(x)
print(x + 1)
";
    assert_eq!(output(source), "2.53");
}

#[test]
fn input_is_converted_to_declared_type() {
    let source = "\
int n
string name
char c
input(n)
input(name)
input(c)
print(n * 2)
print(name + c)
";
    assert_eq!(run(source, "21\nBob\r\nyes\n").unwrap(), "42Boby");
}

#[test]
fn bad_input_is_rejected() {
    assert!(matches!(
        run("int n\ninput(n)\n", "many\n"),
        Err(Error::InvalidInput(line, _)) if line == "many"
    ));
    assert!(matches!(run("int n\ninput(n)\n", ""), Err(Error::Io(_))));
}

#[test]
fn output_before_a_failure_is_kept() {
    let (ctr, root) = compile("print(1)\nprint(1 / 0)\nprint(2)\n").unwrap();
    let mut evaluator = Evaluator::new(&ctr, StreamIo::new("".as_bytes(), Vec::new()));
    assert!(evaluator.run(root).is_err());
    let (_, output) = evaluator.into_io().into_parts();
    assert_eq!(output, b"1");
}

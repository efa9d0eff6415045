use nom::{
    branch::alt,
    bytes::complete::{is_a, tag, take_till1},
    character::{
        complete::{digit1, space1},
        is_digit,
    },
    combinator::{all_consuming, map, map_res, verify},
    sequence::tuple,
    IResult,
};

use crate::{
    ast::{Command::*, *},
    error::{ParseError, ParseErrorKind},
};

fn integer(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |c: &str| c.parse())(input)
}

#[test]
fn test_integer_rejects_overflow() {
    assert_eq!(integer("32767"), Ok(("", 32767)));
    assert!(integer("70000").is_err());
}

fn word(input: &str) -> IResult<&str, &str> {
    take_till1(char::is_whitespace)(input)
}

/// `push`/`pop` with the segment left as a raw word, so an unknown segment
/// can be told apart from a malformed line.
fn memory_access(input: &str) -> IResult<&str, (&str, &str, u16)> {
    map(
        tuple((alt((tag("push"), tag("pop"))), space1, word, space1, integer)),
        |(op, _, segment, _, index)| (op, segment, index),
    )(input)
}

#[test]
fn test_memory_access() {
    assert_eq!(
        memory_access("push  pointer  32"),
        Ok(("", ("push", "pointer", 32)))
    );
    assert_eq!(
        memory_access("pop\tlocal 0"),
        Ok(("", ("pop", "local", 0)))
    );
}

fn prim(input: &str) -> IResult<&str, Command> {
    map_res(word, |op: &str| op.parse::<ArithmeticOp>().map(Arithmetic))(input)
}

#[test]
fn test_prim() {
    assert_eq!(prim("neg"), Ok(("", Arithmetic(ArithmeticOp::Neg))));
    assert!(prim("negate").is_err());
}

fn symbol(input: &str) -> IResult<&str, String> {
    map(
        verify(
            is_a("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_.$:0123456789"),
            |c: &str| !is_digit(c.as_bytes()[0]),
        ),
        |sym: &str| sym.to_string(),
    )(input)
}

#[test]
fn test_symbol() {
    assert_eq!(
        symbol("Main.fibonacci$IF_TRUE"),
        Ok(("", "Main.fibonacci$IF_TRUE".to_string()))
    );
    assert!(symbol("9lives").is_err());
}

fn branching(input: &str) -> IResult<&str, Command> {
    map(
        tuple((
            alt((tag("label"), tag("goto"), tag("if-goto"))),
            space1,
            symbol,
        )),
        |(op, _, sym)| match op {
            "label" => Label(sym),
            "goto" => Goto(sym),
            _ => IfGoto(sym),
        },
    )(input)
}

fn function_call(input: &str) -> IResult<&str, Command> {
    map(
        tuple((
            alt((tag("function"), tag("call"))),
            space1,
            symbol,
            space1,
            integer,
        )),
        |(op, _, name, _, count)| match op {
            "function" => Function(name, count),
            _ => Call(name, count),
        },
    )(input)
}

#[test]
fn test_function_call() {
    assert_eq!(
        function_call("function Sys.init 0"),
        Ok(("", Function("Sys.init".to_string(), 0)))
    );
    assert_eq!(
        function_call("call Math.multiply 2"),
        Ok(("", Call("Math.multiply".to_string(), 2)))
    );
}

fn ret(input: &str) -> IResult<&str, Command> {
    map(tag("return"), |_| Return)(input)
}

/// Runs `parser` over the whole line; leftovers count as a failure.
fn whole_line<'a>(
    parser: impl FnMut(&'a str) -> IResult<&'a str, Command>,
    line: &'a str,
) -> Option<Command> {
    all_consuming(parser)(line).ok().map(|(_, command)| command)
}

/// Classifies one comment-free, trimmed, non-empty line.
fn command(line: &str) -> Result<Command, ParseErrorKind> {
    let mnemonic = line.split_whitespace().next().unwrap_or_default();
    let malformed = || ParseErrorKind::MalformedOperands {
        mnemonic: mnemonic.to_string(),
        text: line.to_string(),
    };

    match mnemonic {
        "push" | "pop" => {
            let (_, (op, segment, index)) =
                all_consuming(memory_access)(line).map_err(|_| malformed())?;
            let segment = segment
                .parse::<Segment>()
                .map_err(|_| ParseErrorKind::UnknownSegment(segment.to_string()))?;
            Ok(if op == "push" {
                Push(segment, index)
            } else {
                Pop(segment, index)
            })
        }
        "label" | "goto" | "if-goto" => whole_line(branching, line).ok_or_else(malformed),
        "function" | "call" => whole_line(function_call, line).ok_or_else(malformed),
        "return" => whole_line(ret, line).ok_or_else(malformed),
        _ if mnemonic.parse::<ArithmeticOp>().is_ok() => {
            whole_line(prim, line).ok_or_else(malformed)
        }
        _ => Err(ParseErrorKind::UnrecognizedMnemonic(mnemonic.to_string())),
    }
}

/// Parses a unit, pairing each command with its 1-based source line.
pub fn parse_lines(input: &str) -> Result<Vec<(usize, Command)>, ParseError> {
    let mut commands = vec![];

    for (index, line) in input.lines().enumerate() {
        let line = line.split_once("//").map(|(s, _)| s).unwrap_or(line).trim();
        if line.is_empty() {
            continue;
        }

        let number = index + 1;
        let command = command(line).map_err(|kind| ParseError { line: number, kind })?;
        commands.push((number, command));
    }

    Ok(commands)
}

pub fn parse(input: &str) -> Result<Vec<Command>, ParseError> {
    Ok(parse_lines(input)?
        .into_iter()
        .map(|(_, command)| command)
        .collect())
}

#[test]
fn test_parse_skips_blank_and_comment_lines() {
    let source = "// header\n\npush constant 7   // seven\r\n   \n\tpush constant 8\nadd\n";
    assert_eq!(
        parse_lines(source),
        Ok(vec![
            (3, Push(Segment::Constant, 7)),
            (5, Push(Segment::Constant, 8)),
            (6, Arithmetic(ArithmeticOp::Add)),
        ])
    );
}

#[test]
fn test_parse_every_kind() {
    let source = "\
function Main.main 2
push argument 1
pop that 0
label LOOP
if-goto LOOP
goto END
call Math.max 2
not
return";
    assert_eq!(
        parse(source),
        Ok(vec![
            Function("Main.main".to_string(), 2),
            Push(Segment::Argument, 1),
            Pop(Segment::That, 0),
            Label("LOOP".to_string()),
            IfGoto("LOOP".to_string()),
            Goto("END".to_string()),
            Call("Math.max".to_string(), 2),
            Arithmetic(ArithmeticOp::Not),
            Return,
        ])
    );
}

#[test]
fn test_pop_constant_is_left_to_codegen() {
    assert_eq!(parse("pop constant 0"), Ok(vec![Pop(Segment::Constant, 0)]));
}

#[test]
fn test_unrecognized_mnemonic() {
    assert_eq!(
        parse("push constant 1\njump LOOP"),
        Err(ParseError {
            line: 2,
            kind: ParseErrorKind::UnrecognizedMnemonic("jump".to_string()),
        })
    );
}

#[test]
fn test_malformed_operands() {
    for (source, mnemonic) in [
        ("push constant", "push"),
        ("push constant x", "push"),
        ("pop local 1 2", "pop"),
        ("add 1", "add"),
        ("label", "label"),
        ("goto 1ABC", "goto"),
        ("function Foo.bar", "function"),
        ("call Foo.bar -1", "call"),
        ("return 0", "return"),
        ("push constant 99999", "push"),
    ] {
        match parse(source) {
            Err(ParseError {
                line: 1,
                kind: ParseErrorKind::MalformedOperands { mnemonic: m, .. },
            }) => assert_eq!(m, mnemonic, "{}", source),
            other => panic!("{}: unexpected {:?}", source, other),
        }
    }
}

#[test]
fn test_unknown_segment() {
    assert_eq!(
        parse("\n\npush heap 3"),
        Err(ParseError {
            line: 3,
            kind: ParseErrorKind::UnknownSegment("heap".to_string()),
        })
    );
}

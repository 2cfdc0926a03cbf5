use chumsky::{prelude::*, regex::regex, text::ascii::ident};

use super::error::{CommandError, CommandResult};
use crate::record::DataType;

#[derive(Debug, Clone, PartialEq)]
pub enum Selectors {
    All,
    List(Vec<String>),
}

/// One shell command. Literals are kept as text until the type of the
/// column they are meant for is known.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // column Identifier ( int | char ( n ) )
    Column(String, DataType),

    // select * | select Identifier, ...
    Select(Selectors),

    // insert literal, ...
    Insert(Vec<String>),

    // find literal
    Find(String),

    // update literal set Identifier = literal
    Update {
        primary: String,
        column: String,
        value: String,
    },

    // load 'csv path'
    Load(String),

    Begin,
    Commit,
    Abort,
    Recover,
    Flush,
    Schema,
    Exit,
}

/// Drop the backslash in front of every escaped character
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

pub fn parser<'a>() -> impl Parser<'a, &'a str, Command, extra::Err<Rich<'a, char>>> {
    fn quoted<'a>() -> impl Parser<'a, &'a str, String, extra::Err<Rich<'a, char>>> {
        regex(r#"'([^'\\]|\\.)*'"#)
            .map(|s: &str| unescape(&s[1..s.len() - 1]))
            .padded()
    }

    fn literal<'a>() -> impl Parser<'a, &'a str, String, extra::Err<Rich<'a, char>>> {
        let integer = regex(r"-?\d+").map(|s: &str| s.to_string()).padded();
        let word = ident().map(|s: &str| s.to_string()).padded();
        choice((integer, quoted(), word))
    }

    fn column_type<'a>() -> impl Parser<'a, &'a str, DataType, extra::Err<Rich<'a, char>>> {
        let width = regex(r"\d+")
            .try_map(|s: &str, span| match s.parse::<usize>() {
                Ok(0) => Err(Rich::custom(span, "char width must be positive")),
                Ok(n) => Ok(n),
                Err(e) => Err(Rich::custom(span, format!("invalid width '{}': {}", s, e))),
            })
            .padded()
            .delimited_by(just('(').padded(), just(')').padded());

        choice((
            just("int").to(DataType::Integer),
            just("char").ignore_then(width).map(DataType::Char),
        ))
        .padded()
    }

    let column = just("column")
        .padded()
        .ignore_then(ident().padded())
        .then(column_type())
        .map(|(name, data_type): (&str, DataType)| Command::Column(name.into(), data_type));

    let selectors = choice((
        just('*').padded().to(Selectors::All),
        ident()
            .padded()
            .separated_by(just(',').padded())
            .at_least(1)
            .collect()
            .map(|columns: Vec<&str>| {
                Selectors::List(columns.into_iter().map(|s| s.into()).collect())
            }),
    ));
    let select = just("select")
        .padded()
        .ignore_then(selectors)
        .map(Command::Select);

    let insert = just("insert")
        .padded()
        .ignore_then(
            literal()
                .separated_by(just(',').padded())
                .at_least(1)
                .collect(),
        )
        .map(Command::Insert);

    let find = just("find").padded().ignore_then(literal()).map(Command::Find);

    let update = just("update")
        .padded()
        .ignore_then(literal())
        // set Identifier = literal
        .then_ignore(just("set").padded())
        .then(ident().padded())
        .then_ignore(just('=').padded())
        .then(literal())
        .map(
            |((primary, column), value): ((String, &str), String)| Command::Update {
                primary,
                column: column.into(),
                value,
            },
        );

    let load = just("load").padded().ignore_then(quoted()).map(Command::Load);

    let control = choice((
        just("begin").to(Command::Begin),
        just("commit").to(Command::Commit),
        just("abort").to(Command::Abort),
        just("recover").to(Command::Recover),
        just("flush").to(Command::Flush),
        just("schema").to(Command::Schema),
        just("exit").to(Command::Exit),
        just("quit").to(Command::Exit),
    ))
    .padded();

    choice((column, select, insert, find, update, load, control))
        .then_ignore(just(';').padded().or_not())
        .then_ignore(end())
}

/// Parse one input line
pub fn parse(line: &str) -> CommandResult<Command> {
    parser().parse(line).into_result().map_err(|errors| {
        CommandError::Parse(
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    })
}

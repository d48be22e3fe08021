//! Parser for the rowlang surface syntax, built with the combine
//! parser-combinator library.
//!
//! The grammar, loosest binding first:
//!
//! ```text
//! module   := decl* expr?
//! decl     := ident '=' expr
//! expr     := concat ('&>' concat)*
//! concat   := add (('^' | '++') add)*
//! add      := mul ('+' mul)*
//! mul      := postfix ('*' postfix)*
//! postfix  := primary ('.' ident | '(' expr,* ')')*
//! primary  := number | string | list | record | tag | lambda | when
//!           | ident | '(' expr ')'
//! ```
//!
//! Infix operators desugar to applications of the identically named
//! primitive. Identifiers start with a lowercase letter, tags with an
//! uppercase one. Spans are byte offsets into the source.

use crate::ast::{Expr, ExprKind, PatKind, Pattern, Span};
use combine::error::StreamError;
use combine::parser::char::{alpha_num, digit, spaces, string};
use combine::stream::position::{IndexPositioner, Stream as PositionStream};
use combine::stream::StreamErrorFor;
use combine::{
    attempt, between, choice, eof, many, many1, not_followed_by, optional, parser, position,
    satisfy, sep_by, sep_by1, token, EasyParser, ParseError, Parser, Stream,
};
use std::collections::HashSet;

/// A parsed source file: top-level declarations plus an optional trailing
/// expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub decls: Vec<(String, Expr)>,
    pub body: Option<Expr>,
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplInput {
    Decl(String, Expr),
    Expr(Expr),
}

const KEYWORDS: &[&str] = &["when", "is", "else"];

/// Wrap a shape parser with begin/end positions into a spanned expression.
fn spanned<Input, P>(p: P) -> impl Parser<Input, Output = Expr>
where
    Input: Stream<Token = char, Position = usize>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
    P: Parser<Input, Output = ExprKind>,
{
    (position(), p, position()).map(|(lo, kind, hi)| Expr::new(kind, Span::new(lo, hi)))
}

fn spanned_pat<Input, P>(p: P) -> impl Parser<Input, Output = Pattern>
where
    Input: Stream<Token = char, Position = usize>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
    P: Parser<Input, Output = PatKind>,
{
    (position(), p, position()).map(|(lo, kind, hi)| Pattern::new(kind, Span::new(lo, hi)))
}

/// Numeric literal as an f64; an optional leading minus is part of the
/// literal since there is no unary minus operator.
fn number<Input>() -> impl Parser<Input, Output = f64>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    (
        optional(token('-')),
        many1(digit()),
        optional(attempt((token('.'), many1(digit())))),
    )
        .map(
            |(sign, int_part, frac): (Option<char>, String, Option<(char, String)>)| {
                let mut text = int_part;
                if let Some((_, digits)) = frac {
                    text.push('.');
                    text.push_str(&digits);
                }
                // Digit strings always parse
                let value: f64 = text.parse().unwrap_or_default();
                if sign.is_some() {
                    -value
                } else {
                    value
                }
            },
        )
}

/// String literal body between double quotes, with \" \\ \n \t escapes.
fn string_body<Input>() -> impl Parser<Input, Output = String>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    let escaped = (token('\\'), satisfy(|_| true)).map(|(_, c): (char, char)| match c {
        'n' => '\n',
        't' => '\t',
        other => other,
    });
    let plain = satisfy(|c: char| c != '"' && c != '\\');
    between(token('"'), token('"'), many(choice((escaped, plain))))
}

fn lower_name<Input>() -> impl Parser<Input, Output = String>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    (
        satisfy(|c: char| c.is_ascii_lowercase()),
        many(alpha_num().or(token('_'))),
    )
        .map(|(first, rest): (char, String)| {
            let mut name = String::new();
            name.push(first);
            name.push_str(&rest);
            name
        })
}

fn upper_name<Input>() -> impl Parser<Input, Output = String>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    (
        satisfy(|c: char| c.is_ascii_uppercase()),
        many(alpha_num().or(token('_'))),
    )
        .map(|(first, rest): (char, String)| {
            let mut name = String::new();
            name.push(first);
            name.push_str(&rest);
            name
        })
}

/// An identifier; keywords are rejected.
fn identifier<Input>() -> impl Parser<Input, Output = String>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    lower_name().and_then(|name: String| {
        if KEYWORDS.contains(&name.as_str()) {
            Err(StreamErrorFor::<Input>::unexpected_static_message("keyword"))
        } else {
            Ok(name)
        }
    })
}

/// A whole-word keyword.
fn keyword<Input>(word: &'static str) -> impl Parser<Input, Output = ()>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    attempt(string(word).skip(not_followed_by(alpha_num().or(token('_'))))).map(|_| ())
}

/// Postfix pieces chained onto a primary expression.
#[derive(Debug)]
enum Trailer {
    Acc(String),
    Call(Vec<Expr>),
}

parser! {
    fn trailer[Input]()(Input) -> Trailer
    where [Input: Stream<Token = char, Position = usize>]
    {
        choice((
            (token('.').skip(spaces()), lower_name()).map(|(_, prop)| Trailer::Acc(prop)),
            between(
                token('(').skip(spaces()),
                token(')'),
                sep_by(expr(), token(',').skip(spaces())),
            )
            .map(Trailer::Call),
        ))
    }
}

parser! {
    fn postfix_expr[Input]()(Input) -> Expr
    where [Input: Stream<Token = char, Position = usize>]
    {
        (primary(), many((trailer(), position()).skip(spaces())))
            .map(|(base, trailers): (Expr, Vec<(Trailer, usize)>)| {
                trailers.into_iter().fold(base, |acc, (piece, hi)| {
                    let span = Span::new(acc.span.lo, hi);
                    match piece {
                        Trailer::Acc(prop) => {
                            Expr::new(ExprKind::Acc(Box::new(acc), prop), span)
                        }
                        Trailer::Call(args) => {
                            Expr::new(ExprKind::App(Box::new(acc), args), span)
                        }
                    }
                })
            })
    }
}

/// Desugar an infix operator into a binary call of the named primitive.
fn binop_call(op: &str, left: Expr, right: Expr) -> Expr {
    let span = Span::new(left.span.lo, right.span.hi);
    let callee = Expr::new(ExprKind::Id(op.to_string()), span);
    Expr::new(ExprKind::App(Box::new(callee), vec![left, right]), span)
}

fn fold_binops(first: Expr, rest: Vec<(&'static str, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |left, (op, right)| binop_call(op, left, right))
}

parser! {
    fn mul_expr[Input]()(Input) -> Expr
    where [Input: Stream<Token = char, Position = usize>]
    {
        let op = token('*').map(|_| "*").skip(spaces());
        (postfix_expr(), many((op, postfix_expr())))
            .map(|(first, rest): (Expr, Vec<(&'static str, Expr)>)| fold_binops(first, rest))
    }
}

parser! {
    fn add_expr[Input]()(Input) -> Expr
    where [Input: Stream<Token = char, Position = usize>]
    {
        // A lone '+', not the start of '++'
        let op = attempt(token('+').skip(not_followed_by(token('+'))))
            .map(|_| "+")
            .skip(spaces());
        (mul_expr(), many((op, mul_expr())))
            .map(|(first, rest): (Expr, Vec<(&'static str, Expr)>)| fold_binops(first, rest))
    }
}

parser! {
    fn concat_expr[Input]()(Input) -> Expr
    where [Input: Stream<Token = char, Position = usize>]
    {
        let op = choice((
            attempt(string("++")).map(|_| "++"),
            token('^').map(|_| "^"),
        ))
        .skip(spaces());
        (add_expr(), many((op, add_expr())))
            .map(|(first, rest): (Expr, Vec<(&'static str, Expr)>)| fold_binops(first, rest))
    }
}

parser! {
    fn expr[Input]()(Input) -> Expr
    where [Input: Stream<Token = char, Position = usize>]
    {
        let op = attempt(string("&>")).map(|_| "&>").skip(spaces());
        (concat_expr(), many((op, concat_expr())))
            .map(|(first, rest): (Expr, Vec<(&'static str, Expr)>)| fold_binops(first, rest))
    }
}

parser! {
    fn record_expr[Input]()(Input) -> Expr
    where [Input: Stream<Token = char, Position = usize>]
    {
        spanned(
            between(
                token('{').skip(spaces()),
                token('}'),
                sep_by(
                    (lower_name().skip(spaces()), token(':').skip(spaces()), expr())
                        .map(|(key, _, value)| (key, value)),
                    token(',').skip(spaces()),
                ),
            )
            .and_then(|fields: Vec<(String, Expr)>| {
                let mut seen = HashSet::new();
                for (key, _) in &fields {
                    if !seen.insert(key.clone()) {
                        return Err(StreamErrorFor::<Input>::message_static_message(
                            "duplicate record key",
                        ));
                    }
                }
                Ok(ExprKind::Rec(fields))
            }),
        )
    }
}

parser! {
    fn list_expr[Input]()(Input) -> Expr
    where [Input: Stream<Token = char, Position = usize>]
    {
        spanned(
            between(
                token('[').skip(spaces()),
                token(']'),
                sep_by(expr(), token(',').skip(spaces())),
            )
            .map(ExprKind::List),
        )
    }
}

parser! {
    fn tag_expr[Input]()(Input) -> Expr
    where [Input: Stream<Token = char, Position = usize>]
    {
        spanned(
            (
                upper_name(),
                optional(between(token('(').skip(spaces()), token(')'), expr())),
            )
                .map(|(name, payload)| ExprKind::Cons(name, payload.map(Box::new))),
        )
    }
}

parser! {
    fn lambda[Input]()(Input) -> Expr
    where [Input: Stream<Token = char, Position = usize>]
    {
        let params = choice((
            identifier().map(|name| vec![name]),
            between(
                token('(').skip(spaces()),
                token(')'),
                sep_by1(identifier().skip(spaces()), token(',').skip(spaces())),
            ),
        ));
        spanned(
            (
                token('\\').skip(spaces()),
                params.skip(spaces()),
                string("->").skip(spaces()),
                expr(),
            )
                .map(|(_, params, _, body)| ExprKind::Lam(params, Box::new(body))),
        )
    }
}

parser! {
    fn pattern[Input]()(Input) -> Pattern
    where [Input: Stream<Token = char, Position = usize>]
    {
        choice((
            spanned_pat(number().map(PatKind::Num)),
            spanned_pat(string_body().map(PatKind::Str)),
            tag_pattern(),
            record_pattern(),
            list_pattern(),
            spanned_pat(identifier().map(PatKind::Id)),
        ))
        .skip(spaces())
    }
}

parser! {
    fn tag_pattern[Input]()(Input) -> Pattern
    where [Input: Stream<Token = char, Position = usize>]
    {
        spanned_pat(
            (
                upper_name(),
                optional(between(token('(').skip(spaces()), token(')'), pattern())),
            )
                .map(|(name, payload)| PatKind::Cons(name, payload.map(Box::new))),
        )
    }
}

parser! {
    fn record_pattern[Input]()(Input) -> Pattern
    where [Input: Stream<Token = char, Position = usize>]
    {
        spanned_pat(
            between(
                token('{').skip(spaces()),
                token('}'),
                sep_by(
                    (lower_name().skip(spaces()), token(':').skip(spaces()), pattern())
                        .map(|(key, _, inner)| (key, inner)),
                    token(',').skip(spaces()),
                ),
            )
            .map(PatKind::Rec),
        )
    }
}

parser! {
    fn list_pattern[Input]()(Input) -> Pattern
    where [Input: Stream<Token = char, Position = usize>]
    {
        spanned_pat(
            between(
                token('[').skip(spaces()),
                token(']'),
                sep_by(pattern(), token(',').skip(spaces())),
            )
            .map(PatKind::List),
        )
    }
}

parser! {
    fn match_case[Input]()(Input) -> (Pattern, Expr)
    where [Input: Stream<Token = char, Position = usize>]
    {
        (
            tag_pattern().skip(spaces()),
            string("->").skip(spaces()),
            expr(),
        )
            .map(|(pattern, _, body)| (pattern, body))
    }
}

parser! {
    fn when_expr[Input]()(Input) -> Expr
    where [Input: Stream<Token = char, Position = usize>]
    {
        spanned(
            (
                keyword("when").skip(spaces()),
                expr(),
                keyword("is").skip(spaces()),
                (
                    match_case(),
                    many(attempt(token(',').skip(spaces()).with(match_case()))),
                )
                    .map(|(first, rest): ((Pattern, Expr), Vec<(Pattern, Expr)>)| {
                        let mut cases = vec![first];
                        cases.extend(rest);
                        cases
                    }),
                optional(keyword("else").skip(spaces()).with(expr())),
            )
                .map(|(_, scrutinee, _, cases, otherwise)| ExprKind::Match {
                    scrutinee: Box::new(scrutinee),
                    cases,
                    otherwise: otherwise.map(Box::new),
                }),
        )
    }
}

parser! {
    fn primary[Input]()(Input) -> Expr
    where [Input: Stream<Token = char, Position = usize>]
    {
        choice((
            when_expr(),
            lambda(),
            spanned(number().map(ExprKind::Num)),
            spanned(string_body().map(ExprKind::Str)),
            list_expr(),
            record_expr(),
            tag_expr(),
            spanned(identifier().map(ExprKind::Id)),
            between(token('(').skip(spaces()), token(')'), expr()),
        ))
        .skip(spaces())
    }
}

parser! {
    fn decl[Input]()(Input) -> (String, Expr)
    where [Input: Stream<Token = char, Position = usize>]
    {
        (
            identifier().skip(spaces()),
            token('=').skip(spaces()),
            expr(),
        )
            .map(|(name, _, value)| (name, value))
    }
}

parser! {
    fn module[Input]()(Input) -> Module
    where [Input: Stream<Token = char, Position = usize>]
    {
        (many(attempt(decl())), optional(expr()))
            .map(|(decls, body): (Vec<(String, Expr)>, Option<Expr>)| Module { decls, body })
    }
}

fn source_stream(input: &str) -> PositionStream<&str, IndexPositioner> {
    PositionStream::with_positioner(input, IndexPositioner::new())
}

/// Parse a single expression.
pub fn parse(input: &str) -> Result<Expr, String> {
    match spaces()
        .with(expr())
        .skip(eof())
        .easy_parse(source_stream(input))
    {
        Ok((expr, _)) => Ok(expr),
        Err(err) => Err(format!("parse error: {err}")),
    }
}

/// Parse a source file: declarations plus an optional trailing expression.
pub fn parse_module(input: &str) -> Result<Module, String> {
    match spaces()
        .with(module())
        .skip(eof())
        .easy_parse(source_stream(input))
    {
        Ok((module, _)) => Ok(module),
        Err(err) => Err(format!("parse error: {err}")),
    }
}

/// Parse one line of interactive input: a declaration or an expression.
pub fn parse_repl(input: &str) -> Result<ReplInput, String> {
    let line = choice((
        attempt(decl()).map(|(name, value)| ReplInput::Decl(name, value)),
        expr().map(ReplInput::Expr),
    ));
    match spaces().with(line).skip(eof()).easy_parse(source_stream(input)) {
        Ok((parsed, _)) => Ok(parsed),
        Err(err) => Err(format!("parse error: {err}")),
    }
}

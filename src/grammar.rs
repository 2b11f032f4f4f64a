use std::ops::Range;

use chumsky::{prelude::*, select, Stream};

use crate::{
    body::{AcceptanceSignature, StateConjunction},
    error::{ParseError, ParseErrorKind},
    lexer::{Position, Token, TokenKind},
};

/// The error type shared by all token grammars.
pub(crate) type TokenError = Simple<TokenKind>;

/// Parentheses in a formula may not be nested deeper than this.
pub(crate) const MAX_NESTING: usize = 100;

pub(crate) fn integer() -> impl Parser<TokenKind, u32, Error = TokenError> + Clone {
    select! {
        TokenKind::Int(n) => n,
    }
    .labelled("integer")
}

pub(crate) fn boolean() -> impl Parser<TokenKind, bool, Error = TokenError> + Clone {
    select! {
        TokenKind::Identifier(id) if id == "t" => true,
        TokenKind::Identifier(id) if id == "f" => false,
    }
    .labelled("`t` or `f`")
}

pub(crate) fn text() -> impl Parser<TokenKind, String, Error = TokenError> + Clone {
    select! {
        TokenKind::Text(txt) => txt,
    }
    .labelled("string")
}

pub(crate) fn identifier() -> impl Parser<TokenKind, String, Error = TokenError> + Clone {
    select! { TokenKind::Identifier(ident) => ident }.labelled("identifier")
}

pub(crate) fn alias_name() -> impl Parser<TokenKind, String, Error = TokenError> + Clone {
    select! { TokenKind::Alias(name) => name }.labelled("alias name")
}

/// `INT (& INT)*`
pub(crate) fn state_conjunction(
) -> impl Parser<TokenKind, StateConjunction, Error = TokenError> + Clone {
    integer()
        .separated_by(just(TokenKind::Op('&')))
        .at_least(1)
        .map(StateConjunction)
}

/// `{INT*}`
pub(crate) fn acceptance_signature(
) -> impl Parser<TokenKind, AcceptanceSignature, Error = TokenError> + Clone {
    integer()
        .repeated()
        .delimited_by(just(TokenKind::Paren('{')), just(TokenKind::Paren('}')))
        .map(AcceptanceSignature::from_iter)
}

/// Drops leading line breaks.
pub(crate) fn skip_newlines<'t, 'a>(tokens: &'t [Token<'a>]) -> &'t [Token<'a>] {
    let start = tokens
        .iter()
        .position(|token| token.kind != TokenKind::Newline)
        .unwrap_or(tokens.len());
    &tokens[start..]
}

/// Fails unless `tokens` consists of line breaks only.
pub(crate) fn finish(tokens: &[Token<'_>]) -> Result<(), ParseError> {
    match skip_newlines(tokens).first() {
        None => Ok(()),
        Some(token) => Err(ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: "end of input".to_string(),
                found: token.kind.to_string(),
            },
            token.position,
        )),
    }
}

fn describe(kind: Option<&TokenKind>) -> String {
    match kind {
        Some(kind) => kind.to_string(),
        None => "end of input".to_string(),
    }
}

fn expected(error: &TokenError) -> String {
    if let Some(label) = error.label() {
        return label.to_string();
    }
    let mut expected: Vec<String> = error
        .expected()
        .map(|kind| describe(kind.as_ref()))
        .collect();
    expected.sort();
    expected.dedup();
    if expected.is_empty() {
        "something else".to_string()
    } else {
        expected.join(" or ")
    }
}

/// Rejects formulas whose parentheses nest deeper than [`MAX_NESTING`], pointing at the
/// first `(` that goes too deep.
fn check_nesting(tokens: &[Token<'_>]) -> Result<(), ParseError> {
    let mut depth = 0usize;
    for token in tokens {
        match token.kind {
            TokenKind::Paren('(') => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(ParseError::new(
                        ParseErrorKind::MalformedFormula {
                            expected: format!("at most {MAX_NESTING} nested parentheses"),
                            found: token.kind.to_string(),
                        },
                        token.position,
                    ));
                }
            }
            TokenKind::Paren(')') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

/// Runs `parser` on `tokens`, skipping line breaks. Errors are reported at the position of
/// the offending token, or at `eoi` if the tokens ended early. Errors at token indices
/// within `formula` (the index `tokens.len()` stands for the end) become
/// [`ParseErrorKind::MalformedFormula`], all others [`ParseErrorKind::UnexpectedToken`].
pub(crate) fn parse_tokens<O, P>(
    parser: &P,
    tokens: &[Token<'_>],
    eoi: Position,
    formula: Range<usize>,
) -> Result<O, ParseError>
where
    P: Parser<TokenKind, O, Error = TokenError>,
{
    let len = tokens.len();
    if !formula.is_empty() {
        check_nesting(&tokens[formula.start.min(len)..formula.end.min(len)])?;
    }

    let stream = Stream::from_iter(
        len..len + 1,
        tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.kind != TokenKind::Newline)
            .map(|(i, token)| (token.kind.clone(), i..i + 1)),
    );

    parser.parse(stream).map_err(|errors| {
        let Some(error) = errors.into_iter().next() else {
            return ParseError::new(
                ParseErrorKind::UnexpectedToken {
                    expected: "something else".to_string(),
                    found: "nothing".to_string(),
                },
                eoi,
            );
        };
        let index = error.span().start;
        let position = tokens.get(index).map(|token| token.position).unwrap_or(eoi);
        let expected = expected(&error);
        let found = describe(error.found());
        let kind = if formula.contains(&index) {
            ParseErrorKind::MalformedFormula { expected, found }
        } else {
            ParseErrorKind::UnexpectedToken { expected, found }
        };
        ParseError::new(kind, position)
    })
}

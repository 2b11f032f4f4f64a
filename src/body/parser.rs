use std::ops::Range;

use chumsky::prelude::*;
use tracing::trace;

use crate::{
    automaton::AutomatonBuilder,
    error::{ParseError, ParseErrorKind},
    formula::{parser::formula, Formula, FormulaContext},
    grammar::{
        acceptance_signature, integer, parse_tokens, skip_newlines, state_conjunction, text,
        TokenError,
    },
    lexer::{Position, Token, TokenKind},
};

use super::{Edge, State};

/// A single line of the body.
#[derive(Debug)]
enum Line {
    State(State),
    Edge(Edge),
}

/// `[formula]`
fn label() -> impl Parser<TokenKind, Formula, Error = TokenError> + Clone {
    formula(FormulaContext::Label)
        .delimited_by(just(TokenKind::Paren('[')), just(TokenKind::Paren(']')))
}

/// `State: label? INT STRING? signature?`
fn state() -> impl Parser<TokenKind, State, Error = TokenError> {
    just(TokenKind::Header("State".to_string()))
        .ignore_then(label().or_not())
        .then(integer())
        .then(text().or_not())
        .then(acceptance_signature().or_not())
        .map(|(((label, index), name), acceptance)| State {
            index,
            name,
            label,
            acceptance,
            edges: vec![],
        })
}

/// `label? state-conjunction signature?`
fn edge() -> impl Parser<TokenKind, Edge, Error = TokenError> {
    label()
        .or_not()
        .then(state_conjunction())
        .then(acceptance_signature().or_not())
        .map(|((label, target), acceptance)| Edge {
            target,
            label,
            acceptance,
        })
}

fn line() -> impl Parser<TokenKind, Line, Error = TokenError> {
    state()
        .map(Line::State)
        .or(edge().map(Line::Edge))
        .then_ignore(end())
}

/// The token indices covered by the label of `line`, if it has one. The range reaches up
/// to and including the closing bracket, or to the end of the line if there is none.
fn label_span(line: &[Token<'_>]) -> Range<usize> {
    let open = match line {
        [first, ..] if first.kind == TokenKind::Paren('[') => 0,
        [first, second, ..]
            if first.kind.is_header("State") && second.kind == TokenKind::Paren('[') =>
        {
            1
        }
        _ => return 0..0,
    };
    let close = line[open..]
        .iter()
        .position(|token| token.kind == TokenKind::Paren(']'))
        .map_or(line.len(), |offset| open + offset);
    open + 1..close + 1
}

fn ends_line(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Newline | TokenKind::End | TokenKind::Abort
    )
}

/// Parses the body of a document up to and including `--END--` and returns the tokens
/// behind it. States and edges are pushed into `builder` in the order they appear.
pub(crate) fn parse_body<'t, 'a>(
    tokens: &'t [Token<'a>],
    eoi: Position,
    builder: &mut AutomatonBuilder,
) -> Result<&'t [Token<'a>], ParseError> {
    let line = line();
    let mut rest = tokens;
    loop {
        rest = skip_newlines(rest);
        let Some(first) = rest.first() else {
            return Err(ParseError::new(ParseErrorKind::MissingEnd, eoi));
        };
        let position = first.position;
        match &first.kind {
            TokenKind::End => {
                trace!("reached end of body at {position}");
                return Ok(&rest[1..]);
            }
            TokenKind::Abort => {
                return Err(ParseError::new(ParseErrorKind::Aborted, position));
            }
            kind if kind.is_header("HOA") => {
                return Err(ParseError::new(ParseErrorKind::MissingEnd, position));
            }
            _ => {}
        }

        let len = rest
            .iter()
            .position(|token| ends_line(&token.kind))
            .unwrap_or(rest.len());
        let (tokens, tail) = rest.split_at(len);
        let end = tail.first().map_or(eoi, |token| token.position);
        match parse_tokens(&line, tokens, end, label_span(tokens))? {
            Line::State(state) => builder.push_state_at(state, position),
            Line::Edge(edge) => builder.push_edge_at(edge, position)?,
        }
        rest = tail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grammar::finish, lexer::tokenize};

    fn body(input: &str) -> Result<AutomatonBuilder, ParseError> {
        let tokens = tokenize(input).unwrap();
        let mut builder = AutomatonBuilder::new(0);
        let rest = parse_body(&tokens, Position::new(99, 1, input.len()), &mut builder)?;
        finish(rest)?;
        Ok(builder)
    }

    #[test]
    fn parses_states_and_edges() {
        let builder = body(
            "State: [0 & !1] 0 \"init\" {0 1}\n1 {0}\n0 & 1\nState: 1\n[t] 1\n--END--",
        )
        .unwrap();
        let states = builder.states();
        assert_eq!(states.len(), 2);

        assert_eq!(states[0].name(), Some("init"));
        assert_eq!(states[0].label().unwrap().to_string(), "0 & !1");
        assert_eq!(states[0].acceptance().unwrap().to_string(), "{0 1}");
        assert_eq!(states[0].edges().len(), 2);
        assert_eq!(states[0].edges()[0].target().get_singleton(), Some(1));
        assert_eq!(states[0].edges()[0].acceptance().unwrap().to_string(), "{0}");
        assert_eq!(states[0].edges()[1].target().states(), &[0, 1]);

        assert_eq!(states[1].index(), 1);
        assert_eq!(states[1].edges()[0].label(), Some(&Formula::True));
    }

    #[test]
    fn closing_keywords_end_lines() {
        let builder = body("State: 0 {0}\n[t] 0 --END--").unwrap();
        assert_eq!(builder.states()[0].edges().len(), 1);
        assert!(body("State: 0 --END--").is_ok());
    }

    #[test]
    fn empty_body() {
        assert!(body("--END--").unwrap().states().is_empty());
    }

    #[test]
    fn edge_before_state() {
        let err = body("[0] 1\nState: 0\n--END--").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::EdgeBeforeState);
        assert_eq!(err.position, Position::new(1, 1, 0));
    }

    #[test]
    fn missing_end() {
        let err = body("State: 0\n0\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingEnd);
        assert_eq!(err.position.line, 99);

        let err = body("State: 0\nHOA: v1\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingEnd);
        assert_eq!(err.position.line, 2);
    }

    #[test]
    fn aborted() {
        let err = body("State: 0\n--ABORT--").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Aborted);
    }

    #[test]
    fn malformed_lines() {
        let err = body("State: 0 1\n--END--").unwrap_err();
        assert_eq!(err.position, Position::new(1, 10, 9));
        match err.kind {
            ParseErrorKind::UnexpectedToken { found, .. } => assert_eq!(found, "integer `1`"),
            other => panic!("unexpected error {other:?}"),
        }

        let err = body("State: 0\n[0 1\n--END--").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::MalformedFormula { .. }));

        let err = body("State: [0 | ] 0\n--END--").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::MalformedFormula { .. }));
        assert_eq!(err.position, Position::new(1, 13, 12));

        let err = body("State: 0\n[0] 1 {0\n--END--").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
        assert_eq!(err.position, Position::new(2, 9, 17));

        let err = body("State: 0\nStates: 1\n--END--").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
        assert_eq!(err.position.line, 2);

        let err = body("State: 0\n--END--\n0").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
    }
}

use tracing::{debug, trace};

use crate::{
    automaton::{Automaton, AutomatonBuilder},
    body::parser::parse_body,
    error::{ErrorReport, LexError},
    grammar::finish,
    header::parser::parse_header,
    lexer::{Lexer, Position, Token, TokenKind},
    options::ParseOptions,
};

/// Parses the tokens of exactly one document and validates the result.
fn parse_tokens(
    tokens: &[Token<'_>],
    eoi: Position,
    options: &ParseOptions,
) -> Result<Automaton, ErrorReport> {
    let (header, positions, body) = parse_header(tokens, eoi)?;
    let mut builder = AutomatonBuilder::from_header(header, positions);
    let rest = parse_body(body, eoi, &mut builder)?;
    finish(rest)?;
    builder.build_with(options)
}

/// Parses `text`, which must contain exactly one automaton.
///
/// ```
/// let hoa = r#"
/// HOA: v1
/// States: 1
/// Start: 0
/// AP: 1 "a"
/// Acceptance: 1 Inf(0)
/// --BODY--
/// State: 0 {0}
/// [0] 0
/// --END--
/// "#;
/// let automaton = hoars::parse(hoa).unwrap();
/// assert_eq!(automaton.num_states(), 1);
/// ```
pub fn parse(text: &str) -> Result<Automaton, ErrorReport> {
    parse_with(text, &ParseOptions::default())
}

/// Like [`parse`], but with the given options.
pub fn parse_with(text: &str, options: &ParseOptions) -> Result<Automaton, ErrorReport> {
    let mut lexer = Lexer::new(text);
    let tokens = lexer.by_ref().collect::<Result<Vec<_>, _>>()?;
    parse_tokens(&tokens, lexer.position(), options)
}

/// The tokens of a single document, split off a stream of concatenated documents but not
/// yet parsed.
#[derive(Debug, Clone)]
pub(crate) struct RawDocument<'a> {
    index: usize,
    tokens: Vec<Token<'a>>,
    eoi: Position,
    lex_error: Option<LexError>,
}

impl RawDocument<'_> {
    fn parse(&self, options: &ParseOptions) -> Result<Automaton, ErrorReport> {
        let result = match &self.lex_error {
            Some(error) => Err(ErrorReport::from(error.clone())),
            None => parse_tokens(&self.tokens, self.eoi, options),
        };
        result.map_err(|report| {
            debug!("document {} is invalid: {}", self.index, report.first());
            report.in_document(self.index)
        })
    }
}

/// Splits a token stream into documents. A document ends with `--END--` or `--ABORT--`.
/// It also ends right before a `HOA:` header if it already reached its body, or if it
/// does not start with `HOA:` itself, so that a broken document never swallows the next one.
#[derive(Debug, Clone)]
struct Splitter<'a> {
    lexer: Lexer<'a>,
    pending: Option<Token<'a>>,
    index: usize,
}

impl<'a> Splitter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lexer: Lexer::new(text),
            pending: None,
            index: 0,
        }
    }
}

impl<'a> Iterator for Splitter<'a> {
    type Item = RawDocument<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut tokens: Vec<Token<'a>> = self.pending.take().into_iter().collect();
        let mut lex_error = None;
        let mut seen_hoa = !tokens.is_empty();
        let mut in_body = false;

        let eoi = loop {
            match self.lexer.next() {
                None => break self.lexer.position(),
                Some(Err(error)) => {
                    lex_error.get_or_insert(error);
                }
                Some(Ok(token)) => {
                    if token.kind.is_header("HOA") {
                        let has_content = tokens.iter().any(|t| t.kind != TokenKind::Newline);
                        if in_body || (!seen_hoa && has_content) {
                            let position = token.position;
                            self.pending = Some(token);
                            break position;
                        }
                        seen_hoa = true;
                    }
                    in_body |= token.kind == TokenKind::BodyStart;
                    let closes = matches!(token.kind, TokenKind::End | TokenKind::Abort);
                    tokens.push(token);
                    if closes {
                        break self.lexer.position();
                    }
                }
            }
        };

        if lex_error.is_none() && tokens.iter().all(|t| t.kind == TokenKind::Newline) {
            return None;
        }
        let index = self.index;
        self.index += 1;
        trace!("split off document {index} with {} tokens", tokens.len());
        Some(RawDocument {
            index,
            tokens,
            eoi,
            lex_error,
        })
    }
}

/// Lazily parses a stream of concatenated documents, see [`parse_all`].
#[derive(Debug, Clone)]
pub struct Documents<'a> {
    splitter: Splitter<'a>,
    options: ParseOptions,
}

impl Iterator for Documents<'_> {
    type Item = Result<Automaton, ErrorReport>;

    fn next(&mut self) -> Option<Self::Item> {
        self.splitter
            .next()
            .map(|document| document.parse(&self.options))
    }
}

/// Parses a stream of concatenated documents. Documents are only read when the iterator is
/// advanced, and an invalid document (including one ended by `--ABORT--`) produces an
/// [`ErrorReport`] without affecting the documents around it.
///
/// ```
/// let stream = "HOA: v1 States: 0 AP: 0 Acceptance: 0 t --BODY-- --END--\n\
///               HOA: v1 States: 1 AP: 0 Acceptance: 0 t --BODY-- --ABORT--\n\
///               HOA: v1 States: 0 AP: 0 Acceptance: 0 f --BODY-- --END--";
/// let results: Vec<_> = hoars::parse_all(stream).collect();
/// assert_eq!(results.len(), 3);
/// assert!(results[0].is_ok() && results[2].is_ok());
/// assert_eq!(results[1].as_ref().unwrap_err().document(), 1);
/// ```
pub fn parse_all(text: &str) -> Documents<'_> {
    parse_all_with(text, ParseOptions::default())
}

/// Like [`parse_all`], but with the given options.
pub fn parse_all_with(text: &str, options: ParseOptions) -> Documents<'_> {
    Documents {
        splitter: Splitter::new(text),
        options,
    }
}

/// Parses a stream of concatenated documents on the rayon thread pool. The stream is split
/// into documents first, which are then parsed independently. Results are returned in input
/// order.
#[cfg(feature = "parallel")]
pub fn parse_all_parallel(text: &str) -> Vec<Result<Automaton, ErrorReport>> {
    parse_all_parallel_with(text, &ParseOptions::default())
}

/// Like [`parse_all_parallel`], but with the given options.
#[cfg(feature = "parallel")]
pub fn parse_all_parallel_with(
    text: &str,
    options: &ParseOptions,
) -> Vec<Result<Automaton, ErrorReport>> {
    use rayon::prelude::*;

    let documents: Vec<_> = Splitter::new(text).collect();
    debug!("parsing {} documents in parallel", documents.len());
    documents
        .par_iter()
        .map(|document| document.parse(options))
        .collect()
}

use crate::error::{LexError, LexErrorKind};

/// A position in the source text. Lines and columns start at 1, columns count characters
/// rather than bytes. The byte `offset` is kept so that slices of the source can be recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// The line, starting at 1.
    pub line: usize,
    /// The column, starting at 1.
    pub column: usize,
    /// Byte offset into the source.
    pub offset: usize,
}

impl Position {
    /// Creates a new position.
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The different kinds of tokens that make up a HOA document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A header name such as `States:`, stored without the colon.
    Header(String),
    /// An identifier like `Inf`, `t` or `trans-labels`.
    Identifier(String),
    /// An alias name such as `@a`, stored without the `@`.
    Alias(String),
    /// A non-negative integer.
    Int(u32),
    /// A double-quoted string with escapes already resolved.
    Text(String),
    /// One of the boolean operators `!`, `&` and `|`.
    Op(char),
    /// One of `(`, `)`, `[`, `]`, `{` and `}`.
    Paren(char),
    /// `--BODY--`
    BodyStart,
    /// `--END--`
    End,
    /// `--ABORT--`
    Abort,
    /// A line break, which terminates state and edge lines.
    Newline,
}

impl TokenKind {
    /// Returns `true` if this is a header token with the given name.
    pub fn is_header(&self, name: &str) -> bool {
        matches!(self, TokenKind::Header(h) if h == name)
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Header(name) => write!(f, "`{name}:`"),
            TokenKind::Identifier(ident) => write!(f, "identifier `{ident}`"),
            TokenKind::Alias(name) => write!(f, "alias `@{name}`"),
            TokenKind::Int(n) => write!(f, "integer `{n}`"),
            TokenKind::Text(txt) => write!(f, "string {txt:?}"),
            TokenKind::Op(op) => write!(f, "`{op}`"),
            TokenKind::Paren(paren) => write!(f, "`{paren}`"),
            TokenKind::BodyStart => write!(f, "`--BODY--`"),
            TokenKind::End => write!(f, "`--END--`"),
            TokenKind::Abort => write!(f, "`--ABORT--`"),
            TokenKind::Newline => write!(f, "end of line"),
        }
    }
}

/// A single token together with the slice of source it was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// The kind of the token, including its value.
    pub kind: TokenKind,
    /// The raw source text of the token.
    pub raw: &'a str,
    /// Where the token starts.
    pub position: Position,
}

const KEYWORDS: [(&str, TokenKind); 3] = [
    ("--BODY--", TokenKind::BodyStart),
    ("--END--", TokenKind::End),
    ("--ABORT--", TokenKind::Abort),
];

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Lazily splits a HOA text into [`Token`]s. The lexer never looks further ahead than the
/// token it is currently producing. After an error it continues behind the offending
/// input, which allows callers to resynchronise. Cloning a lexer yields an independent
/// copy that continues from the same position, and [`Lexer::new`] on the same text
/// restarts from the beginning.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    position: Position,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer positioned at the start of `source`.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            position: Position::default(),
        }
    }

    /// The position of the next character that will be looked at.
    pub fn position(&self) -> Position {
        self.position
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position.offset += c.len_utf8();
        if c == '\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.bump();
        }
    }

    /// Skips whitespace (but not line breaks) and comments.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            self.bump_while(|c| c != '\n' && c.is_whitespace());
            if !self.rest().starts_with("/*") {
                return Ok(());
            }
            let start = self.position;
            let mut depth = 0usize;
            loop {
                if self.rest().starts_with("/*") {
                    self.bump();
                    self.bump();
                    depth += 1;
                } else if self.rest().starts_with("*/") {
                    self.bump();
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                } else if self.bump().is_none() {
                    return Err(LexError::new(LexErrorKind::UnterminatedComment, start));
                }
            }
        }
    }

    fn string(&mut self, start: Position) -> Result<TokenKind, LexError> {
        // opening quote
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(LexError::new(LexErrorKind::UnterminatedString, start)),
                Some('"') => return Ok(TokenKind::Text(text)),
                Some('\\') => match self.bump() {
                    None => return Err(LexError::new(LexErrorKind::UnterminatedString, start)),
                    Some(escaped @ ('"' | '\\')) => text.push(escaped),
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                },
                Some(c) => text.push(c),
            }
        }
    }

    fn token_kind(&mut self, c: char, start: Position) -> Result<TokenKind, LexError> {
        match c {
            '\n' => {
                self.bump();
                Ok(TokenKind::Newline)
            }
            '"' => self.string(start),
            '!' | '&' | '|' => {
                self.bump();
                Ok(TokenKind::Op(c))
            }
            '(' | ')' | '[' | ']' | '{' | '}' => {
                self.bump();
                Ok(TokenKind::Paren(c))
            }
            '-' => {
                for (keyword, kind) in KEYWORDS {
                    if self.rest().starts_with(keyword) {
                        for _ in 0..keyword.len() {
                            self.bump();
                        }
                        return Ok(kind);
                    }
                }
                self.bump();
                Err(LexError::new(LexErrorKind::UnexpectedChar(c), start))
            }
            '@' => {
                self.bump();
                let name_start = self.position.offset;
                self.bump_while(is_identifier_char);
                let name = &self.source[name_start..self.position.offset];
                if name.is_empty() {
                    Err(LexError::new(LexErrorKind::UnexpectedChar('@'), start))
                } else {
                    Ok(TokenKind::Alias(name.to_string()))
                }
            }
            c if c.is_ascii_digit() => {
                self.bump_while(|c| c.is_ascii_digit());
                self.source[start.offset..self.position.offset]
                    .parse()
                    .map(TokenKind::Int)
                    .map_err(|_| LexError::new(LexErrorKind::IntegerOverflow, start))
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                self.bump_while(is_identifier_char);
                let ident = self.source[start.offset..self.position.offset].to_string();
                if self.peek() == Some(':') {
                    self.bump();
                    Ok(TokenKind::Header(ident))
                } else {
                    Ok(TokenKind::Identifier(ident))
                }
            }
            c => {
                self.bump();
                Err(LexError::new(LexErrorKind::UnexpectedChar(c), start))
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.skip_trivia() {
            return Some(Err(e));
        }
        let c = self.peek()?;

        let start = self.position;
        Some(self.token_kind(c, start).map(|kind| Token {
            kind,
            raw: &self.source[start.offset..self.position.offset],
            position: start,
        }))
    }
}

/// Lexes the complete `source`, stopping at the first error.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lex_header_line() {
        assert_eq!(
            kinds("AP: 2 \"a\" \"b\"\n"),
            vec![
                TokenKind::Header("AP".into()),
                TokenKind::Int(2),
                TokenKind::Text("a".into()),
                TokenKind::Text("b".into()),
                TokenKind::Newline,
            ]
        );
        assert_eq!(
            kinds("acc-name: generalized-Buchi 2"),
            vec![
                TokenKind::Header("acc-name".into()),
                TokenKind::Identifier("generalized-Buchi".into()),
                TokenKind::Int(2),
            ]
        );
    }

    #[test]
    fn lex_operators_and_brackets() {
        assert_eq!(
            kinds("[!0&@a|t] 1&2 {0 3}"),
            vec![
                TokenKind::Paren('['),
                TokenKind::Op('!'),
                TokenKind::Int(0),
                TokenKind::Op('&'),
                TokenKind::Alias("a".into()),
                TokenKind::Op('|'),
                TokenKind::Identifier("t".into()),
                TokenKind::Paren(']'),
                TokenKind::Int(1),
                TokenKind::Op('&'),
                TokenKind::Int(2),
                TokenKind::Paren('{'),
                TokenKind::Int(0),
                TokenKind::Int(3),
                TokenKind::Paren('}'),
            ]
        );
    }

    #[test]
    fn lex_keywords_and_positions() {
        let tokens = tokenize("--BODY--\n  State: 0\n--END--").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::BodyStart);
        assert_eq!(tokens[0].raw, "--BODY--");
        assert_eq!(tokens[2].kind, TokenKind::Header("State".into()));
        assert_eq!(tokens[2].position, Position::new(2, 3, 11));
        assert_eq!(tokens[2].raw, "State:");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::End);
        assert_eq!(tokens.last().unwrap().position.line, 3);
    }

    #[test]
    fn lex_string_escapes() {
        assert_eq!(
            kinds(r#""a \"quoted\" \\ word" "keep\n""#),
            vec![
                TokenKind::Text("a \"quoted\" \\ word".into()),
                TokenKind::Text("keep\\n".into()),
            ]
        );
    }

    #[test]
    fn lex_skips_nested_comments() {
        assert_eq!(
            kinds("States: /* outer /* inner */ still comment */ 3"),
            vec![TokenKind::Header("States".into()), TokenKind::Int(3)]
        );
    }

    #[test]
    fn lex_errors() {
        let err = tokenize("name: \"open").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.position, Position::new(1, 7, 6));

        let err = tokenize("States: 1\n  %").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedChar('%'));
        assert_eq!(err.position, Position::new(2, 3, 12));

        let err = tokenize("/* never closed").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedComment);

        let err = tokenize("States: 99999999999").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::IntegerOverflow);
    }

    #[test]
    fn lexer_resumes_after_error() {
        let results: Vec<_> = Lexer::new("1 % 2").collect();
        assert_eq!(results.len(), 3);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().kind, TokenKind::Int(2));
    }

    #[test]
    fn lexer_is_restartable() {
        let mut lexer = Lexer::new("HOA: v1\nStates: 2");
        lexer.next();
        let copy = lexer.clone();
        assert_eq!(
            lexer.map(|t| t.unwrap().kind).collect::<Vec<_>>(),
            copy.map(|t| t.unwrap().kind).collect::<Vec<_>>()
        );
    }
}

use chumsky::{prelude::*, select};

use crate::{
    error::ParseError,
    grammar::{self, integer, parse_tokens, TokenError},
    lexer::{Position, Token, TokenKind},
};

use super::{AcceptanceAtom, AcceptanceKind, Formula, FormulaContext};

fn open() -> impl Parser<TokenKind, TokenKind, Error = TokenError> + Clone {
    just(TokenKind::Paren('('))
}

fn close() -> impl Parser<TokenKind, TokenKind, Error = TokenError> + Clone {
    just(TokenKind::Paren(')'))
}

/// The constants `t` and `f`.
pub fn boolean() -> impl Parser<TokenKind, Formula, Error = TokenError> + Clone {
    grammar::boolean().map(Formula::from)
}

/// Atoms that may appear in labels: proposition indices and alias references.
pub fn label_atom() -> impl Parser<TokenKind, Formula, Error = TokenError> + Clone {
    select! {
        TokenKind::Int(n) => Formula::Proposition(n),
        TokenKind::Alias(name) => Formula::Alias(name),
    }
    .labelled("proposition or alias")
}

/// Atoms that may appear in acceptance conditions, i.e. `Fin(i)`, `Inf(i)` and their
/// variants over complemented sets `Fin(!i)`, `Inf(!i)`.
pub fn acceptance_atom() -> impl Parser<TokenKind, Formula, Error = TokenError> + Clone {
    let kind = select! {
        TokenKind::Identifier(id) if id == "Fin" => AcceptanceKind::Fin,
        TokenKind::Identifier(id) if id == "Inf" => AcceptanceKind::Inf,
    }
    .labelled("`Fin` or `Inf`");

    let set = just(TokenKind::Op('!'))
        .or_not()
        .then(integer())
        .delimited_by(open(), close());

    kind.then(set).map(|(kind, (negation, set))| {
        Formula::AcceptanceSet(AcceptanceAtom {
            kind,
            set,
            negated: negation.is_some(),
        })
    })
}

fn context_atom(context: FormulaContext) -> BoxedParser<'static, TokenKind, Formula, TokenError> {
    match context {
        FormulaContext::Label => label_atom().boxed(),
        FormulaContext::Acceptance => acceptance_atom().boxed(),
    }
}

/// The grammar for formulas in the given `context`. Precedence from lowest to highest is
/// disjunction, conjunction, negation and finally atoms or parenthesized subformulas.
/// Chains of `&` and `|` are collected into single n-ary nodes.
pub fn formula(
    context: FormulaContext,
) -> impl Parser<TokenKind, Formula, Error = TokenError> + Clone {
    recursive(move |formula| {
        let atom = boolean()
            .or(context_atom(context))
            .or(formula.delimited_by(open(), close()));

        // Negations cancel out pairwise, so chains of `!` never nest.
        let unary = match context {
            FormulaContext::Label => just(TokenKind::Op('!'))
                .repeated()
                .then(atom)
                .map(|(negations, inner)| {
                    if negations.len() % 2 == 1 {
                        Formula::not(inner)
                    } else {
                        inner
                    }
                })
                .boxed(),
            FormulaContext::Acceptance => atom.boxed(),
        };

        let conjunction = unary
            .clone()
            .then(just(TokenKind::Op('&')).ignore_then(unary).repeated())
            .map(|(first, rest)| {
                if rest.is_empty() {
                    first
                } else {
                    Formula::and(std::iter::once(first).chain(rest))
                }
            });

        conjunction
            .clone()
            .then(just(TokenKind::Op('|')).ignore_then(conjunction).repeated())
            .map(|(first, rest)| {
                if rest.is_empty() {
                    first
                } else {
                    Formula::or(std::iter::once(first).chain(rest))
                }
            })
    })
}

/// Parses a single formula from `tokens`, which must contain exactly that formula (line
/// breaks are ignored). `eoi` is the position reported when the formula ends prematurely,
/// typically the position of the delimiter that follows it.
pub fn parse_formula(
    tokens: &[Token<'_>],
    context: FormulaContext,
    eoi: Position,
) -> Result<Formula, ParseError> {
    parse_tokens(
        &formula(context).then_ignore(end()),
        tokens,
        eoi,
        0..tokens.len() + 1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ParseErrorKind, lexer::tokenize};

    fn label(input: &str) -> Result<Formula, ParseError> {
        let tokens = tokenize(input).unwrap();
        parse_formula(&tokens, FormulaContext::Label, Position::default())
    }

    fn acceptance(input: &str) -> Result<Formula, ParseError> {
        let tokens = tokenize(input).unwrap();
        parse_formula(&tokens, FormulaContext::Acceptance, Position::default())
    }

    #[test]
    fn label_precedence() {
        assert_eq!(
            label("0 & !1 | 2").unwrap(),
            Formula::Or(vec![
                Formula::And(vec![
                    Formula::Proposition(0),
                    Formula::not(Formula::Proposition(1))
                ]),
                Formula::Proposition(2),
            ])
        );
        assert_eq!(
            label("!(0 | @a) & t").unwrap(),
            Formula::And(vec![
                Formula::not(Formula::Or(vec![
                    Formula::Proposition(0),
                    Formula::alias("a")
                ])),
                Formula::True,
            ])
        );
        assert_eq!(label("!!f").unwrap(), Formula::False);
        assert_eq!(label("!!!(0)").unwrap(), Formula::not(Formula::Proposition(0)));
    }

    #[test]
    fn chains_are_flattened() {
        let flat = label("0 | 1 | 2").unwrap();
        assert_eq!(flat, label("(0 | 1) | 2").unwrap());
        assert_eq!(flat, label("0 | (1 | 2)").unwrap());
        assert_eq!(
            flat,
            Formula::Or(vec![
                Formula::Proposition(0),
                Formula::Proposition(1),
                Formula::Proposition(2)
            ])
        );
        assert_eq!(
            label("0 & (1 & 2) & 3").unwrap(),
            Formula::And((0..4).map(Formula::Proposition).collect())
        );
    }

    #[test]
    fn acceptance_conditions() {
        assert_eq!(
            acceptance("Inf(0) | Fin(!1) & (Inf(2) | t)").unwrap(),
            Formula::Or(vec![
                Formula::inf(0),
                Formula::And(vec![
                    Formula::AcceptanceSet(AcceptanceAtom {
                        kind: AcceptanceKind::Fin,
                        set: 1,
                        negated: true
                    }),
                    Formula::Or(vec![Formula::inf(2), Formula::True]),
                ]),
            ])
        );
        assert_eq!(acceptance("f").unwrap(), Formula::False);
    }

    #[test]
    fn context_restricts_atoms() {
        assert!(matches!(
            acceptance("0").unwrap_err().kind,
            ParseErrorKind::MalformedFormula { .. }
        ));
        assert!(acceptance("!Inf(0)").is_err());
        assert!(label("Inf(0)").is_err());
    }

    #[test]
    fn malformed_formulas_point_at_offending_token() {
        let tokens = tokenize("0 & & 1").unwrap();
        let err = parse_formula(&tokens, FormulaContext::Label, Position::default()).unwrap_err();
        assert_eq!(err.position, tokens[2].position);
        match err.kind {
            ParseErrorKind::MalformedFormula { found, .. } => assert_eq!(found, "`&`"),
            other => panic!("unexpected error {other:?}"),
        }

        let tokens = tokenize("(0 | 1").unwrap();
        let eoi = Position::new(1, 7, 6);
        let err = parse_formula(&tokens, FormulaContext::Label, eoi).unwrap_err();
        assert_eq!(err.position, eoi);

        let err = parse_formula(&[], FormulaContext::Label, eoi).unwrap_err();
        assert_eq!(err.position, eoi);
    }

    #[test]
    fn deep_negations_and_nesting() {
        let deep = format!("{}0", "!".repeat(200_000));
        assert_eq!(label(&deep).unwrap(), Formula::Proposition(0));
        assert_eq!(
            label(&format!("!{deep}")).unwrap().to_string(),
            "!0"
        );

        let nested = format!("{}0{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(matches!(
            label(&nested).unwrap_err().kind,
            ParseErrorKind::MalformedFormula { .. }
        ));
        let shallow = format!("{}0{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(label(&shallow).unwrap(), Formula::Proposition(0));
    }

    #[test]
    fn line_breaks_are_ignored() {
        assert_eq!(
            acceptance("Inf(0)\n& Inf(1)").unwrap(),
            Formula::And(vec![Formula::inf(0), Formula::inf(1)])
        );
    }
}

use std::iter;

use chumsky::{prelude::*, select};
use itertools::Itertools;
use tracing::{trace, warn};

use crate::{
    error::{ParseError, ParseErrorKind},
    formula::{parser::formula, FormulaContext},
    grammar::{
        alias_name, identifier, integer, parse_tokens, skip_newlines, state_conjunction, text,
        TokenError,
    },
    lexer::{Position, Token, TokenKind},
    math::InsertionMap,
};

use super::{
    Acceptance, AcceptanceName, AcceptanceParameter, CustomHeader, Header, HeaderPositions,
    HeaderValue, Property, Tool,
};

const MANDATORY: [&str; 3] = ["States", "AP", "Acceptance"];
const EXCLUSIVE: [&str; 7] = [
    "HOA",
    "States",
    "AP",
    "Acceptance",
    "acc-name",
    "tool",
    "name",
];

/// A header item as it appears in the input, before its values are interpreted.
#[derive(Debug)]
struct RawItem<'t, 'a> {
    name: &'t str,
    position: Position,
    /// The tokens following the name, line breaks included.
    tokens: &'t [Token<'a>],
    /// The position of whatever follows the item.
    end: Position,
}

impl RawItem<'_, '_> {
    /// Parses the values of the item, which must be consumed entirely.
    fn parse<O>(
        &self,
        values: impl Parser<TokenKind, O, Error = TokenError>,
    ) -> Result<O, ParseError> {
        parse_tokens(&values.then_ignore(end()), self.tokens, self.end, 0..0)
    }

    /// Like [`RawItem::parse`] for items whose first value is followed by a formula. Errors
    /// behind the first value are reported as malformed formulas.
    fn parse_with_formula<O>(
        &self,
        values: impl Parser<TokenKind, O, Error = TokenError>,
    ) -> Result<O, ParseError> {
        let len = self.tokens.len();
        let first = len - skip_newlines(self.tokens).len();
        parse_tokens(&values.then_ignore(end()), self.tokens, self.end, first + 1..len + 1)
    }
}

fn acceptance_parameter() -> impl Parser<TokenKind, AcceptanceParameter, Error = TokenError> {
    select! {
        TokenKind::Int(n) => AcceptanceParameter::Int(n),
        TokenKind::Identifier(id) if id == "t" => AcceptanceParameter::Boolean(true),
        TokenKind::Identifier(id) if id == "f" => AcceptanceParameter::Boolean(false),
        TokenKind::Identifier(id) => AcceptanceParameter::Identifier(id),
    }
    .labelled("a boolean, integer or identifier")
}

fn header_value() -> impl Parser<TokenKind, HeaderValue, Error = TokenError> {
    select! {
        TokenKind::Int(n) => HeaderValue::Int(n),
        TokenKind::Text(txt) => HeaderValue::Text(txt),
        TokenKind::Identifier(id) if id == "t" => HeaderValue::Boolean(true),
        TokenKind::Identifier(id) if id == "f" => HeaderValue::Boolean(false),
        TokenKind::Identifier(id) => HeaderValue::Identifier(id),
    }
    .labelled("a boolean, integer, string or identifier")
}

/// Parses the header of a document, which has to start with `HOA:` and ends with
/// `--BODY--`. Returns the tokens behind `--BODY--`.
pub(crate) fn parse_header<'t, 'a>(
    tokens: &'t [Token<'a>],
    eoi: Position,
) -> Result<(Header, HeaderPositions, &'t [Token<'a>]), ParseError> {
    let tokens = skip_newlines(tokens);
    match tokens.first() {
        Some(token) if token.kind.is_header("HOA") => {}
        other => {
            return Err(ParseError::new(
                ParseErrorKind::MissingRequiredHeader("HOA".to_string()),
                other.map(|token| token.position).unwrap_or(eoi),
            ))
        }
    }

    let Some(body) = tokens.iter().position(|token| {
        matches!(
            token.kind,
            TokenKind::BodyStart | TokenKind::End | TokenKind::Abort
        )
    }) else {
        return Err(ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: "`--BODY--`".to_string(),
                found: "end of input".to_string(),
            },
            eoi,
        ));
    };
    let marker = &tokens[body];
    match marker.kind {
        TokenKind::Abort => return Err(ParseError::new(ParseErrorKind::Aborted, marker.position)),
        TokenKind::End => {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedToken {
                    expected: "a header item or `--BODY--`".to_string(),
                    found: marker.kind.to_string(),
                },
                marker.position,
            ))
        }
        _ => {}
    }

    let items: Vec<RawItem<'_, '_>> = (0..body)
        .filter(move |&i| matches!(tokens[i].kind, TokenKind::Header(_)))
        .chain(iter::once(body))
        .tuple_windows()
        .filter_map(move |(start, next)| match &tokens[start].kind {
            TokenKind::Header(name) => Some(RawItem {
                name: name.as_str(),
                position: tokens[start].position,
                tokens: &tokens[start + 1..next],
                end: tokens[next].position,
            }),
            _ => None,
        })
        .collect();
    trace!("collected {} header items", items.len());

    let mut occurrences: InsertionMap<&str, Vec<&RawItem<'_, '_>>> = InsertionMap::default();
    for item in &items {
        occurrences.entry(item.name).or_default().push(item);
    }

    if let Some(duplicate) = occurrences
        .iter()
        .filter(|(name, found)| EXCLUSIVE.contains(*name) && found.len() > 1)
        .map(|(_, found)| found[1])
        .min_by_key(|item| item.position)
    {
        return Err(ParseError::new(
            ParseErrorKind::DuplicateExclusiveHeader(duplicate.name.to_string()),
            duplicate.position,
        ));
    }
    if let Some(missing) = MANDATORY
        .into_iter()
        .find(|name| !occurrences.contains_key(name))
    {
        return Err(ParseError::new(
            ParseErrorKind::MissingRequiredHeader(missing.to_string()),
            marker.position,
        ));
    }

    let mut header = Header::new(0);
    let mut positions = HeaderPositions::default();
    for item in &items {
        parse_item(item, &mut header, &mut positions)?;
    }
    Ok((header, positions, &tokens[body + 1..]))
}

fn parse_item(
    item: &RawItem<'_, '_>,
    header: &mut Header,
    positions: &mut HeaderPositions,
) -> Result<(), ParseError> {
    match item.name {
        "HOA" => {
            header.version = item.parse(identifier())?;
            if header.version != "v1" {
                warn!(
                    "unsupported format version {}, continuing as if it was v1",
                    header.version
                );
            }
        }
        "States" => {
            header.states = item.parse(integer())?;
            positions.states = Some(item.position);
        }
        "Start" => {
            header.start.push(item.parse(state_conjunction())?);
            positions.start.push(item.position);
        }
        "AP" => {
            let (count, names) = item.parse(integer().then(text().repeated()))?;
            header.ap_count = count;
            header.aps = names;
            positions.ap = Some(item.position);
        }
        "Alias" => {
            let (name, formula) =
                item.parse_with_formula(alias_name().then(formula(FormulaContext::Label)))?;
            if header.aliases.contains_key(&name) {
                return Err(ParseError::new(
                    ParseErrorKind::DuplicateAlias(name),
                    item.position,
                ));
            }
            header.aliases.insert(name, formula);
            positions.aliases.push(item.position);
        }
        "Acceptance" => {
            let (sets, condition) =
                item.parse_with_formula(integer().then(formula(FormulaContext::Acceptance)))?;
            header.acceptance = Acceptance::new(sets, condition);
            positions.acceptance = Some(item.position);
        }
        "acc-name" => {
            let (name, parameters) =
                item.parse(identifier().then(acceptance_parameter().repeated()))?;
            header.acceptance_name = Some(AcceptanceName { name, parameters });
        }
        "tool" => {
            let (name, version) = item.parse(text().then(text().or_not()))?;
            header.tool = Some(Tool { name, version });
        }
        "name" => {
            header.name = Some(item.parse(text())?);
        }
        "properties" => {
            for name in item.parse(identifier().repeated())? {
                header.properties.push(Property::from_name(&name));
            }
            positions.properties.get_or_insert(item.position);
        }
        name => {
            if name.starts_with(|c: char| c.is_ascii_uppercase()) {
                warn!("unknown header item `{name}:` may change the semantics of the automaton, it is kept but ignored");
            }
            header.custom.push(CustomHeader {
                name: name.to_string(),
                values: item.parse(header_value().repeated())?,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{body::StateConjunction, formula::Formula, lexer::tokenize};

    fn header(input: &str) -> Result<(Header, HeaderPositions), ParseError> {
        let tokens = tokenize(input).unwrap();
        parse_header(&tokens, Position::default()).map(|(header, positions, _)| (header, positions))
    }

    #[test_log::test]
    fn parses_all_items() {
        let (header, positions) = header(
            r#"HOA: v1
States: 3
Start: 0
Start: 1 & 2
AP: 2 "a" "b"
Alias: @a 0
Alias: @both @a & 1
Acceptance: 2 Inf(0) & Fin(!1)
acc-name: generalized-Buchi 2 t
tool: "ltl3ba" "1.1"
name: "a \"quoted\" name"
properties: trans-labels explicit-labels
properties: my-flag
spot-extra: 1 "x" t ident
--BODY--"#,
        )
        .unwrap();

        assert_eq!(header.version(), "v1");
        assert_eq!(header.states(), 3);
        assert_eq!(
            header.start(),
            &[StateConjunction::singleton(0), StateConjunction(vec![1, 2])]
        );
        assert_eq!(header.ap_count(), 2);
        assert_eq!(header.aps(), &["a".to_string(), "b".to_string()]);
        assert_eq!(header.alias("a"), Some(&Formula::Proposition(0)));
        assert_eq!(
            header.alias("both"),
            Some(&Formula::And(vec![Formula::alias("a"), Formula::Proposition(1)]))
        );
        assert_eq!(header.acceptance().sets, 2);
        assert_eq!(header.acceptance().condition.to_string(), "Inf(0) & Fin(!1)");
        assert_eq!(
            header.acceptance_name(),
            Some(&AcceptanceName {
                name: "generalized-Buchi".into(),
                parameters: vec![
                    AcceptanceParameter::Int(2),
                    AcceptanceParameter::Boolean(true)
                ],
            })
        );
        assert_eq!(header.tool().unwrap().version.as_deref(), Some("1.1"));
        assert_eq!(header.name(), Some("a \"quoted\" name"));
        assert_eq!(
            header.properties().iter().cloned().collect::<Vec<_>>(),
            vec![
                Property::TransLabels,
                Property::ExplicitLabels,
                Property::Unknown("my-flag".into())
            ]
        );
        assert_eq!(
            header.custom(),
            &[CustomHeader {
                name: "spot-extra".into(),
                values: vec![
                    HeaderValue::Int(1),
                    HeaderValue::Text("x".into()),
                    HeaderValue::Boolean(true),
                    HeaderValue::Identifier("ident".into()),
                ],
            }]
        );

        assert_eq!(positions.states.unwrap().line, 2);
        assert_eq!(positions.start.iter().map(|p| p.line).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(positions.aliases.len(), 2);
        assert_eq!(positions.properties.unwrap().line, 12);
    }

    #[test]
    fn items_may_span_lines() {
        let (header, _) = header(
            "HOA: v1 States: 1\nAP: 2\n  \"a\"\n  \"b\"\nAcceptance: 2\n Inf(0)\n | Inf(1)\n--BODY--",
        )
        .unwrap();
        assert_eq!(header.aps().len(), 2);
        assert_eq!(
            header.acceptance().condition,
            Formula::Or(vec![Formula::inf(0), Formula::inf(1)])
        );
    }

    #[test]
    fn hoa_must_come_first() {
        let err = header("States: 1\nHOA: v1\n--BODY--").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::MissingRequiredHeader("HOA".into())
        );
        assert_eq!(err.position, Position::new(1, 1, 0));
    }

    #[test]
    fn missing_mandatory_items() {
        let err = header("HOA: v1\nStates: 1\nAcceptance: 0 t\n--BODY--").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingRequiredHeader("AP".into()));
        assert_eq!(err.position.line, 4);

        let err = header("HOA: v1\nAP: 0\nAcceptance: 0 t\n--BODY--").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::MissingRequiredHeader("States".into())
        );
    }

    #[test]
    fn exclusive_items() {
        let err = header(
            "HOA: v1\nStates: 1\nAP: 0\nname: \"x\"\nAcceptance: 0 t\nname: \"y\"\nStates: 2\n--BODY--",
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::DuplicateExclusiveHeader("name".into())
        );
        assert_eq!(err.position.line, 6);
    }

    #[test]
    fn duplicate_alias() {
        let err = header("HOA: v1\nStates: 1\nAP: 1 \"a\"\nAlias: @x 0\nAlias: @x !0\nAcceptance: 0 t\n--BODY--")
            .unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::DuplicateAlias("x".into()));
        assert_eq!(err.position.line, 5);
    }

    #[test]
    fn malformed_items() {
        let err = header("HOA: v1\nStates: many\nAP: 0\nAcceptance: 0 t\n--BODY--").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
        assert_eq!(err.position, Position::new(2, 9, 16));

        let err = header("HOA: v1\nStates: 1\nAP: 0\nAcceptance: 1 Inf(0) &\n--BODY--").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::MalformedFormula { .. }));
        assert_eq!(err.position.line, 5);

        let err = header("HOA: v1\nStates: 1 2\nAP: 0\nAcceptance: 0 t\n--BODY--").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));

        let err = header("HOA: v1\nStates: 1\nAP: 0\nAcceptance: 0 t\n").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));

        let err = header("HOA: v1\nStates: 1\n--ABORT--").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Aborted);
    }

    #[test]
    fn values_are_checked_per_item() {
        const MINIMAL: &str = "HOA: v1\nStates: 1\nAP: 0\nAcceptance: 0 t\n";

        let err = header(&format!("{MINIMAL}acc-name: Buchi \"x\"\n--BODY--")).unwrap_err();
        assert_eq!(err.position, Position::new(5, 17, 56));
        match err.kind {
            ParseErrorKind::UnexpectedToken { found, .. } => assert_eq!(found, "string \"x\""),
            other => panic!("unexpected error {other:?}"),
        }

        let err = header(&format!("{MINIMAL}tool: \"a\" \"b\" \"c\"\n--BODY--")).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));

        let err = header(&format!("{MINIMAL}Alias: x 0\n--BODY--")).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
        assert_eq!(err.position.line, 5);

        let err = header(&format!("{MINIMAL}Alias: @x 0 &\n--BODY--")).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::MalformedFormula { .. }));

        let err = header(&format!("{MINIMAL}properties: \"deterministic\"\n--BODY--"))
            .unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));

        let (header, _) = header(&format!("{MINIMAL}acc-name: none\ntool: \"a\"\n--BODY--")).unwrap();
        assert_eq!(header.tool().unwrap().version, None);
        assert!(header.acceptance_name().unwrap().parameters.is_empty());
    }
}

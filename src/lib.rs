//! Parser and validator for the Hanoi Omega-Automata (HOA) format.
//!
//! A HOA document consists of a header, which declares the number of states, the start states, the atomic propositions, aliases for labels, the acceptance condition and a number of optional items, followed by a body that lists the states together with their outgoing edges. Labels are boolean formulas over atomic propositions, acceptance conditions are positive boolean combinations of `Fin` and `Inf` atoms over acceptance sets. Automata may be labeled on states, on transitions or implicitly, and acceptance sets may be placed on states or on transitions.
//!
//! Parsing happens in three stages. The [`lexer`] turns text into a stream of [`Token`]s, the header and body parsers assemble an [`AutomatonBuilder`] from the tokens and finally the builder is validated and sealed into an immutable [`Automaton`]. Validation runs in a fixed order (index ranges, aliases, consistency of labels and acceptance placement together with declared properties, cardinalities) and stops after the first stage that finds problems, reporting all of them at once in an [`ErrorReport`].
//!
//! The most important entry points are
//! - [`parse`] which expects exactly one document,
//! - [`parse_all`] which lazily splits a stream of concatenated documents and parses them one by one, such that an invalid document does not affect the ones around it,
//! - [`AutomatonBuilder`] for constructing automata programmatically, which then go through the same validation,
//! - [`WriteHoa`] which prints automata (and their parts) back into the format, so that parsing the output yields the same automaton again.
//!
//! Declared properties that describe the placement of labels and acceptance sets are always checked, structural ones like `deterministic` and `complete` by default as well. The latter relies on BDDs for comparing labels and is gated behind the `bdd` feature. The `parallel` feature adds [`parse_all_parallel`] which parses documents on the rayon thread pool and `random` enables the generation of random automata.
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude is supposed to make using this package easier. Including everything, i.e.
/// `use hoars::prelude::*;` should be enough to use the package.
pub mod prelude {
    pub use super::{
        automaton::{AcceptancePlacement, Automaton, AutomatonBuilder, LabelingMode, WriteHoa},
        body::{AcceptanceSignature, Edge, State, StateConjunction},
        error::{Error, ErrorReport},
        formula::{AcceptanceAtom, AcceptanceKind, Formula},
        header::{Acceptance, Header, Properties, Property},
        parse, parse_all, parse_with, ParseOptions, UnknownPropertyPolicy,
    };
}

/// Type aliases for the collections used throughout the crate.
pub mod math;

/// Errors of all stages, from lexing up to validation.
pub mod error;
pub use error::{
    Cardinality, Error, ErrorReport, LexError, LexErrorKind, ParseError, ParseErrorKind,
    RangeKind, ValidationError, ValidationErrorKind,
};

/// Turns text into tokens.
pub mod lexer;
pub use lexer::{tokenize, Lexer, Position, Token, TokenKind};

/// Label expressions and acceptance conditions.
pub mod formula;
pub use formula::{AcceptanceAtom, AcceptanceKind, Formula, FormulaContext};

mod grammar;

/// The items that may appear in the header of a document.
pub mod header;
pub use header::{
    Acceptance, AcceptanceName, AcceptanceParameter, CustomHeader, Header, HeaderValue,
    Properties, Property, Tool,
};

/// States and edges, as they appear in the body of a document.
pub mod body;
pub use body::{AcceptanceSignature, Edge, State, StateConjunction};

/// Defines the validated automaton together with its builder and the output in HOA format.
pub mod automaton;
pub use automaton::{AcceptancePlacement, Automaton, AutomatonBuilder, LabelingMode, WriteHoa};

mod validate;

mod options;
pub use options::{ParseOptions, UnknownPropertyPolicy};

mod document;
pub use document::{parse, parse_all, parse_all_with, parse_with, Documents};
#[cfg(feature = "parallel")]
pub use document::{parse_all_parallel, parse_all_parallel_with};

/// Implements the generation of random automata. This is feature gated behind the `random` feature.
#[cfg(feature = "random")]
pub mod random;

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "HOA: v1\nStates: 1\nStart: 0\nAP: 1 \"a\"\nAcceptance: 1 Inf(0)\n--BODY--\nState: 0 {0}\n[0] 0\n--END--\n";

    fn validation_errors(text: &str) -> Vec<ValidationErrorKind> {
        parse(text)
            .unwrap_err()
            .validation_errors()
            .cloned()
            .collect()
    }

    #[test_log::test]
    fn single_state_automaton() {
        let automaton = parse(SIMPLE).unwrap();
        assert_eq!(automaton.num_states(), 1);
        assert_eq!(automaton.start(), &[StateConjunction::singleton(0)]);
        assert_eq!(automaton.aps(), &["a".to_string()]);

        let state = automaton.state(0).unwrap();
        assert_eq!(state.acceptance(), Some(&AcceptanceSignature::from_iter([0])));
        assert_eq!(state.edges().len(), 1);
        let edge = &state.edges()[0];
        assert_eq!(edge.target().get_singleton(), Some(0));
        assert_eq!(edge.label(), Some(&Formula::Proposition(0)));
        assert_eq!(automaton.labeling_mode(), LabelingMode::Transition);
        assert_eq!(automaton.acceptance_placement(), AcceptancePlacement::State);
    }

    #[test]
    fn start_state_out_of_range() {
        assert_eq!(
            validation_errors(&SIMPLE.replace("Start: 0", "Start: 1")),
            vec![ValidationErrorKind::RangeViolation {
                kind: RangeKind::StartState,
                index: 1,
                bound: 1
            }]
        );
    }

    #[test]
    fn missing_end() {
        let report = parse(&SIMPLE.replace("--END--\n", "")).unwrap_err();
        match report.first() {
            Error::Parse(e) => assert_eq!(e.kind, ParseErrorKind::MissingEnd),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn undefined_alias() {
        let text = "HOA: v1\nStates: 1\nStart: 0\nAP: 2 \"a\" \"b\"\nAlias: @x 0 & 1\nAcceptance: 1 Inf(0)\n--BODY--\nState: 0\n[@y] 0 {0}\n--END--\n";
        assert_eq!(
            validation_errors(text),
            vec![ValidationErrorKind::UnresolvedAlias { name: "y".into() }]
        );
        assert!(parse(&text.replace("@y", "@x")).is_ok());
    }

    #[test]
    fn no_states() {
        let automaton =
            parse("HOA: v1\nStates: 0\nAP: 0\nAcceptance: 0 t\n--BODY--\n--END--\n").unwrap();
        assert_eq!(automaton.num_states(), 0);
        assert!(automaton.start().is_empty());
        assert_eq!(
            validation_errors("HOA: v1\nStates: 0\nStart: 0\nAP: 0\nAcceptance: 0 t\n--BODY--\n--END--\n"),
            vec![ValidationErrorKind::RangeViolation {
                kind: RangeKind::StartState,
                index: 0,
                bound: 0
            }]
        );
    }

    #[test]
    fn label_checks_need_a_bdd_sized_alphabet() {
        let text = "HOA: v1\nStates: 1\nStart: 0\nAP: 65535\nAcceptance: 0 t\nproperties: complete deterministic\n--BODY--\nState: 0\n[0] 0\n--END--\n";
        assert_eq!(
            validation_errors(text),
            vec![ValidationErrorKind::CardinalityMismatch {
                what: Cardinality::AtomicPropositions,
                declared: 65535,
                actual: 0
            }]
        );
    }

    #[test]
    fn huge_acceptance_set_index() {
        assert_eq!(
            validation_errors(&SIMPLE.replace("[0] 0", "[0] 0 {4294967295}")),
            vec![ValidationErrorKind::RangeViolation {
                kind: RangeKind::AcceptanceSet,
                index: u32::MAX,
                bound: 1
            }]
        );
    }

    #[test]
    fn long_negation_chains() {
        let label = format!("{}0", "!".repeat(100_001));
        let automaton = parse(&SIMPLE.replace("[0] 0", &format!("[{label}] 0"))).unwrap();
        let edge = &automaton.state(0).unwrap().edges()[0];
        assert_eq!(edge.label(), Some(&Formula::not(Formula::Proposition(0))));
    }

    #[test]
    fn mixed_labeling_is_rejected() {
        let text = "HOA: v1\nStates: 2\nStart: 0\nAP: 1 \"a\"\nAcceptance: 0 t\n--BODY--\nState: [0] 0\n1\nState: 1\n[!0] 0\n--END--\n";
        let errors = validation_errors(text);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ValidationErrorKind::InconsistentLabeling { .. })));
    }

    #[test_log::test]
    fn printing_is_idempotent() {
        let text = "HOA: v1\n/* comment */ States: 3\nStart: 0 & 2\nAP: 2 \"a\" \"b\"\nAlias: @both 0&1\nAcceptance: 2 (Fin(0) & Inf(1)) | t\nacc-name: Rabin 1\ntool: \"tool\" \"1.0\"\nname: \"escaped \\\"name\\\"\"\nproperties: trans-labels explicit-labels\nproperties: trans-acc\n--BODY--\nState: 0 \"zero\"\n[@both] 1 {0}\n[!0 | (1 & !@both)] 0 & 2\nState: 1\n[t] 1 {1}\nState: 2\n--END--\n";
        let automaton = parse(text).unwrap();
        assert!(automaton.has_universal_branching());

        let printed = automaton.to_hoa();
        let reparsed = parse(&printed).unwrap();
        assert_eq!(automaton, reparsed);
        assert_eq!(printed, reparsed.to_hoa());
    }

    #[test_log::test]
    fn stream_with_broken_documents() {
        let broken = SIMPLE.replace("[0] 0", "[0] 3");
        let aborted = "HOA: v1\nStates: 1\nStart: 0\nAP: 0\nAcceptance: 0 t\n--BODY--\nState: 0\n--ABORT--\n";
        let stream = format!("{SIMPLE}{broken}{aborted}{SIMPLE}");

        let results: Vec<_> = parse_all(&stream).collect();
        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        assert!(results[3].is_ok());

        let report = results[1].as_ref().unwrap_err();
        assert_eq!(report.document(), 1);
        assert_eq!(
            report.validation_errors().cloned().collect::<Vec<_>>(),
            vec![ValidationErrorKind::RangeViolation {
                kind: RangeKind::EdgeTarget,
                index: 3,
                bound: 1
            }]
        );
        assert_eq!(report.first().position().map(|p| p.line), Some(17));

        let report = results[2].as_ref().unwrap_err();
        assert_eq!(report.document(), 2);
        match report.first() {
            Error::Parse(e) => assert_eq!(e.kind, ParseErrorKind::Aborted),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

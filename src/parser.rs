//! This module provides the parser for `.dtm` machine descriptions, utilizing the `pest` crate.
//! The grammar lives in `grammar.pest`; this module turns its parse tree into a `Machine`.

use crate::{
    analyzer::analyze,
    table::TransitionTable,
    types::{
        Action, Direction, DtmError, Machine, Mode, State, Symbol, DEFAULT_BLANK_SYMBOL,
        MAX_PROGRAM_SIZE,
    },
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::collections::{BTreeSet, HashSet};

/// Derives a `PestParser` for the machine description grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct MachineParser;

/// Parses the given input string into a `Machine`.
///
/// The parsed machine is analyzed before being returned, so a successful result always has a
/// consistent 6-tuple.
///
/// # Returns
///
/// * `Ok(Machine)` if the input is successfully parsed and validated.
/// * `Err(DtmError::ParseError)` if there are any syntax errors.
/// * `Err(DtmError::ValidationError)` if the machine fails validation.
pub fn parse(input: &str) -> Result<Machine, DtmError> {
    if input.len() > MAX_PROGRAM_SIZE {
        return Err(DtmError::ValidationError(format!(
            "Program is {} bytes, the limit is {}",
            input.len(),
            MAX_PROGRAM_SIZE
        )));
    }

    let input = input.trim();
    let root = MachineParser::parse(Rule::program, input)
        .map_err(|e| DtmError::ParseError(e.into()))?
        .next()
        .ok_or_else(|| DtmError::ValidationError("Empty program".to_string()))?;

    let machine = parse_machine(root)?;
    analyze(&machine)?;

    tracing::debug!(
        "parsed machine '{}' with {} states and {} transitions",
        machine.name,
        machine.states.len(),
        machine.transitions.len()
    );

    Ok(machine)
}

/// Parses the top-level sections of a description from a `Pair<Rule::program>`.
fn parse_machine(pair: Pair<Rule>) -> Result<Machine, DtmError> {
    let mut name: Option<String> = None;
    let mut states: Option<BTreeSet<State>> = None;
    let mut input_alphabet: Option<BTreeSet<Symbol>> = None;
    let mut tape_alphabet: Option<BTreeSet<Symbol>> = None;
    let mut blank: Option<Symbol> = None;
    let mut start_state: Option<State> = None;
    let mut halting_states: Option<BTreeSet<State>> = None;
    let mut mode: Option<Mode> = None;
    let mut sentinel: Option<Symbol> = None;
    let mut transitions: Option<TransitionTable> = None;
    let mut seen = HashSet::new();

    for p in pair.into_inner() {
        let span = p.as_span();
        let rule = p.as_rule();

        check_unique_rule(rule, span, &mut seen)?;

        match rule {
            Rule::name => name = Some(first_inner(p)?.as_str().trim().to_string()),
            Rule::states => states = Some(parse_identifiers(first_inner(p)?)),
            Rule::input => input_alphabet = Some(parse_symbols(first_inner(p)?)),
            Rule::tape => tape_alphabet = Some(parse_symbols(first_inner(p)?)),
            Rule::blank => blank = Some(parse_symbol(first_inner(p)?.as_str())),
            Rule::start => start_state = Some(first_inner(p)?.as_str().to_string()),
            Rule::halt => halting_states = Some(parse_identifiers(first_inner(p)?)),
            Rule::mode => mode = Some(parse_mode(first_inner(p)?)?),
            Rule::sentinel => sentinel = Some(parse_symbol(first_inner(p)?.as_str())),
            Rule::rules => transitions = Some(parse_rules(p)?),
            _ => {} // EOI
        }
    }

    Ok(Machine {
        name: check_required_rule(name, "name")?,
        states: check_required_rule(states, "states")?,
        input_alphabet: check_required_rule(input_alphabet, "input")?,
        tape_alphabet: check_required_rule(tape_alphabet, "tape")?,
        blank: blank.unwrap_or(DEFAULT_BLANK_SYMBOL),
        start_state: check_required_rule(start_state, "start")?,
        halting_states: check_required_rule(halting_states, "halt")?,
        transitions: check_required_rule(transitions, "rules")?,
        mode: mode.unwrap_or_default(),
        sentinel,
    })
}

/// Parses the `rules:` section into a `TransitionTable`.
///
/// Every state block declares its state in the table, even when it has no transitions.
fn parse_rules(pair: Pair<Rule>) -> Result<TransitionTable, DtmError> {
    let mut table = TransitionTable::new();
    let mut blocks = HashSet::new();

    for block in pair.into_inner() {
        let span = block.as_span();
        let mut pairs = block.into_inner();
        let state = next_pair(&mut pairs, span)?.as_str().to_string();

        // Prevent duplicated state blocks
        if !blocks.insert(state.clone()) {
            return Err(parse_error(
                &format!("Duplicate transition rule: {state}"),
                span,
            ));
        }

        table.declare(state.clone());

        for transition in pairs {
            let span = transition.as_span();
            let (read, action) = parse_transition(transition)?;

            table
                .insert(state.clone(), read, action)
                .map_err(|e| parse_error(&e.to_string(), span))?;
        }
    }

    Ok(table)
}

/// Parses `read -> write, direction, next` or `read, direction, next`.
///
/// When `write` is omitted the read symbol is written back.
fn parse_transition(pair: Pair<Rule>) -> Result<(Symbol, Action), DtmError> {
    let span = pair.as_span();
    let mut pairs = pair.into_inner();
    let read = parse_symbol(next_pair(&mut pairs, span)?.as_str());

    let write = match pairs.peek().map(|p| p.as_rule()) {
        Some(Rule::symbol) => parse_symbol(next_pair(&mut pairs, span)?.as_str()),
        _ => read,
    };

    let direction = parse_direction(next_pair(&mut pairs, span)?)?;
    let next_state = next_pair(&mut pairs, span)?.as_str().to_string();

    Ok((
        read,
        Action {
            next_state,
            write,
            direction,
        },
    ))
}

/// Parses a single direction from a `Pair<Rule::direction>`.
///
/// Supports '<' or 'L' for Left and '>' or 'R' for Right.
fn parse_direction(pair: Pair<Rule>) -> Result<Direction, DtmError> {
    let span = pair.as_span();
    match pair.as_str() {
        "<" | "L" => Ok(Direction::Left),
        ">" | "R" => Ok(Direction::Right),
        _ => Err(parse_error(
            &format!("Unsupported direction: {}", pair.as_str()),
            span,
        )),
    }
}

/// Parses `strict` or `reject <state>`.
fn parse_mode(pair: Pair<Rule>) -> Result<Mode, DtmError> {
    let span = pair.as_span();
    match pair.as_rule() {
        Rule::reject => {
            let state = first_inner(pair)?.as_str().to_string();
            Ok(Mode::Reject(state))
        }
        Rule::strict => Ok(Mode::Strict),
        _ => Err(parse_error("Unsupported mode", span)),
    }
}

fn parse_identifiers(pair: Pair<Rule>) -> BTreeSet<State> {
    pair.into_inner().map(|p| p.as_str().to_string()).collect()
}

fn parse_symbols(pair: Pair<Rule>) -> BTreeSet<Symbol> {
    pair.into_inner().map(|p| parse_symbol(p.as_str())).collect()
}

/// Parses a single character symbol from a string, handling quoted and unquoted symbols.
fn parse_symbol(input: &str) -> Symbol {
    let inner = input
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(input);

    inner.chars().next().unwrap_or(DEFAULT_BLANK_SYMBOL)
}

/// Returns the first child of `pair`.
fn first_inner(pair: Pair<Rule>) -> Result<Pair<Rule>, DtmError> {
    let span = pair.as_span();
    next_pair(&mut pair.into_inner(), span)
}

/// Returns the next pair, reporting a parse error at `span` if the tree ends early.
fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, span: Span<'i>) -> Result<Pair<'i, Rule>, DtmError> {
    pairs
        .next()
        .ok_or_else(|| parse_error("Incomplete declaration", span))
}

/// Creates a `DtmError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> DtmError {
    DtmError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Checks if a given section has already been declared.
fn check_unique_rule(rule: Rule, span: Span, seen: &mut HashSet<Rule>) -> Result<(), DtmError> {
    if rule == Rule::EOI {
        return Ok(());
    }

    if !seen.insert(rule) {
        return Err(parse_error(
            &format!("Duplicate \"{rule:?}:\" declaration"),
            span,
        ));
    }

    Ok(())
}

/// Checks if a required section is present, returning an `Err` if it's missing.
fn check_required_rule<T>(value: Option<T>, name: &str) -> Result<T, DtmError> {
    value.ok_or_else(|| DtmError::ValidationError(format!("Missing '{name}' section")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::engine::Run;
    use crate::types::{FaultKind, Lookup};

    const CLASSIFIER: &str = r#"
name: Binary Suffix Classifier
states: q0, q1, q2, q3, qY, qN
input: 0, 1
tape: 0, 1, b
blank: b
start: q0
halt: qY, qN
rules:
  q0:
    0 -> 0, R, q0
    1 -> 1, R, q0
    b -> b, L, q1
  q1:
    0 -> b, L, q2
    1 -> b, L, q3
    b -> b, L, qN
  qY:
  qN:
"#;

    #[test]
    fn test_parse_machine() {
        let machine = parse(CLASSIFIER).unwrap();

        assert_eq!(machine.name, "Binary Suffix Classifier");
        assert_eq!(machine.states.len(), 6);
        assert_eq!(machine.input_alphabet, ['0', '1'].into());
        assert_eq!(machine.tape_alphabet, ['0', '1', 'b'].into());
        assert_eq!(machine.blank, 'b');
        assert_eq!(machine.start_state, "q0");
        assert_eq!(machine.halting_states, ["qY", "qN"].map(String::from).into());
        assert_eq!(machine.mode, Mode::Strict);
        assert_eq!(machine.sentinel, None);
        assert_eq!(machine.transitions.len(), 6);
        assert_eq!(
            machine.lookup("q1", '1'),
            Lookup::Found(&Action::new("q3", 'b', Direction::Left))
        );
        assert!(machine.transitions.row("qY").is_some());
    }

    #[test]
    fn test_parse_omitted_write_symbol() {
        let input = r#"
name: Omitted Write
states: q0, qY
input: a
tape: a, b
start: q0
halt: qY
rules:
  q0:
    a, R, qY
"#;
        let machine = parse(input).unwrap();

        assert_eq!(
            machine.lookup("q0", 'a'),
            Lookup::Found(&Action::new("qY", 'a', Direction::Right))
        );
    }

    #[test]
    fn test_parse_arrow_directions_and_quoted_symbols() {
        let input = r#"
name: Quoted
states: q0, done
input: x
tape: x, ' '
blank: ' '
start: q0
halt: done
rules:
  q0:
    x -> ' ', >, q0
    ' ' -> x, <, done
"#;
        let machine = parse(input).unwrap();

        assert_eq!(machine.blank, ' ');
        assert_eq!(
            machine.lookup("q0", 'x'),
            Lookup::Found(&Action::new("q0", ' ', Direction::Right))
        );
        assert_eq!(
            machine.lookup("q0", ' '),
            Lookup::Found(&Action::new("done", 'x', Direction::Left))
        );
    }

    #[test]
    fn test_parse_default_blank() {
        let input = CLASSIFIER.replace("blank: b\n", "");
        let machine = parse(&input).unwrap();

        assert_eq!(machine.blank, DEFAULT_BLANK_SYMBOL);
    }

    #[test]
    fn test_parse_reject_mode_and_sentinel() {
        let input = CLASSIFIER
            .replace("tape: 0, 1, b", "tape: 0, 1, b, S")
            .replace("rules:", "mode: reject qN\nsentinel: S\nrules:");
        let machine = parse(&input).unwrap();

        assert_eq!(machine.mode, Mode::Reject("qN".to_string()));
        assert_eq!(machine.sentinel, Some('S'));
    }

    #[test]
    fn test_parsed_reject_mode_drives_the_run() {
        // CLASSIFIER has no rows for q2 and q3.
        let strict = parse(CLASSIFIER).unwrap();
        let fault = Run::new(&strict, "10100", RunConfig::default())
            .unwrap()
            .run()
            .unwrap_err();

        assert_eq!(
            fault.kind,
            FaultKind::UndefinedTransition {
                state: "q2".to_string(),
                symbol: '0',
            }
        );

        let input = CLASSIFIER.replace("rules:", "mode: reject qN\nrules:");
        let lenient = parse(&input).unwrap();
        let mut run = Run::new(&lenient, "10100", RunConfig::default()).unwrap();

        assert_eq!(run.run(), Ok("qN".to_string()));
        assert_eq!(run.step_count(), 7);
        assert_eq!(run.tape().to_string(), "bbbbbbbbbb1010bbbbbb");
    }

    #[test]
    fn test_parse_comments() {
        let input = r#"
# A machine that accepts immediately
name: Comments # trailing comment
states: q0, qY
input: 1
tape: 1, b
start: q0
halt: qY

rules:   # the table
  q0:
    # only one entry
    1 -> 1, R, qY
"#;
        let machine = parse(input).unwrap();

        assert_eq!(machine.name, "Comments");
        assert_eq!(machine.transitions.len(), 1);
    }

    #[test]
    fn test_parse_duplicate_section() {
        let input = CLASSIFIER.replace("start: q0", "start: q0\nstart: q1");
        let error = parse(&input).unwrap_err();

        assert!(matches!(error, DtmError::ParseError(_)));
        assert!(error
            .to_string()
            .contains("Duplicate \"start:\" declaration"));
    }

    #[test]
    fn test_parse_missing_section() {
        let input = CLASSIFIER.replace("halt: qY, qN\n", "");
        let error = parse(&input).unwrap_err();

        assert_eq!(
            error.to_string(),
            "Program validation error: Missing 'halt' section"
        );
    }

    #[test]
    fn test_parse_missing_rules() {
        let input = r#"
name: No Rules
states: q0
input: 1
tape: 1, b
start: q0
halt: q0
"#;
        let error = parse(input).unwrap_err();

        assert_eq!(
            error.to_string(),
            "Program validation error: Missing 'rules' section"
        );
    }

    #[test]
    fn test_parse_duplicate_state_block() {
        let input = CLASSIFIER.replace("  qN:\n", "  qN:\n  q1:\n    0 -> 0, R, q1\n");
        let error = parse(&input).unwrap_err();

        assert!(matches!(error, DtmError::ParseError(_)));
        assert!(error.to_string().contains("Duplicate transition rule: q1"));
    }

    #[test]
    fn test_parse_duplicate_transition() {
        let input = CLASSIFIER.replace("    b -> b, L, qN\n", "    b -> b, L, qN\n    0, R, q1\n");
        let error = parse(&input).unwrap_err();

        assert!(matches!(error, DtmError::ParseError(_)));
        assert!(error
            .to_string()
            .contains("Duplicate transition for state q1 and symbol '0'"));
    }

    #[test]
    fn test_parse_stay_direction_is_rejected() {
        let input = CLASSIFIER.replace("b -> b, L, q1", "b -> b, S, q1");
        let error = parse(&input).unwrap_err();

        assert!(matches!(error, DtmError::ParseError(_)));
    }

    #[test]
    fn test_parse_runs_analysis() {
        let input = CLASSIFIER.replace("start: q0", "start: q7");
        let error = parse(&input).unwrap_err();

        assert_eq!(
            error.to_string(),
            "Program validation error: Invalid start state: q7"
        );
    }

    #[test]
    fn test_parse_rejects_oversized_program() {
        let input = format!("{}#{}", CLASSIFIER, "x".repeat(MAX_PROGRAM_SIZE));
        let error = parse(&input).unwrap_err();

        assert!(matches!(error, DtmError::ValidationError(_)));
    }

    #[test]
    fn test_parse_garbage() {
        let error = parse("This is not a machine").unwrap_err();
        assert!(matches!(error, DtmError::ParseError(_)));
    }
}

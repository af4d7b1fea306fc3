//! Test harness for running fixture cases with stochastic variations

use crate::common::{EventSpec, Gen, TestCase};
use cedoc_rules::{DocumentValidator, Event, MethodLog, RuleError, RuleOptions, SessionError};

/// Result of running a test
#[derive(Debug)]
pub struct TestResult {
    pub passed: bool,
    pub events: Vec<String>,
    pub outcome: String,
    pub depths: Vec<usize>,
    pub seed: u64,
    pub errors: Vec<String>,
}

/// What a session did with a sequence of events
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Stack depth after each accepted event
    pub depths: Vec<usize>,
    /// Methods the downstream receiver saw
    pub forwarded: Vec<&'static str>,
    /// Padding events inserted by variations
    pub padded: usize,
    /// First error, from feeding or from finishing the session
    pub error: Option<RuleError>,
}

impl Outcome {
    /// `ok` or the snake_case name of the error.
    pub fn kind(&self) -> &'static str {
        self.error.as_ref().map_or("ok", error_kind)
    }

    /// Friendly rule name of a structural violation.
    pub fn rule(&self) -> Option<&'static str> {
        match self.error {
            Some(RuleError::StructuralViolation { rule, .. }) => Some(rule),
            _ => None,
        }
    }
}

pub fn error_kind(err: &RuleError) -> &'static str {
    match err {
        RuleError::StructuralViolation { .. } => "structural_violation",
        RuleError::StackUnderflow { .. } => "stack_underflow",
        RuleError::UnsupportedVersion { .. } => "unsupported_version",
        RuleError::InvalidIdentifier { .. } => "invalid_identifier",
        RuleError::InvalidText { .. } => "invalid_text",
        RuleError::DuplicateMarker(_) => "duplicate_marker",
        RuleError::UnresolvedReference(_) => "unresolved_reference",
        RuleError::DuplicateRecordType(_) => "duplicate_record_type",
        RuleError::UndefinedRecordType(_) => "undefined_record_type",
        RuleError::ArrayLengthMismatch { .. } => "array_length_mismatch",
        RuleError::ChunkOverrun { .. } => "chunk_overrun",
        RuleError::LimitExceeded { .. } => "limit_exceeded",
        RuleError::IncompleteDocument { .. } => "incomplete_document",
        RuleError::Aborted => "aborted",
    }
}

/// Feed events through a fresh session, optionally inserting padding
/// wherever the current rule allows it.
fn drive(events: &[Event<'_>], options: &RuleOptions, mut pad: impl FnMut() -> bool) -> Outcome {
    let mut session = DocumentValidator::with_options(MethodLog::default(), options.clone());
    let mut depths = Vec::with_capacity(events.len());
    let mut padded = 0;

    for event in events {
        if pad() && session.context().current_rule().allows(cedoc_rules::Method::Padding) {
            // Padding never changes depth, so it is not recorded.
            if let Err(err) = session.feed(&Event::Padding) {
                return failed(session.receiver(), depths, padded, err);
            }
            padded += 1;
        }
        if let Err(err) = session.feed(event) {
            return failed(session.receiver(), depths, padded, err);
        }
        depths.push(session.context().depth());
    }

    let forwarded = session.receiver().methods.clone();
    Outcome {
        depths,
        forwarded,
        padded,
        error: session.finish().err(),
    }
}

fn failed(
    log: &MethodLog,
    depths: Vec<usize>,
    padded: usize,
    err: SessionError<std::convert::Infallible>,
) -> Outcome {
    let error = match err {
        SessionError::Rules(err) => err,
        SessionError::Receiver(never) => match never {},
    };
    Outcome {
        depths,
        forwarded: log.methods.clone(),
        padded,
        error: Some(error),
    }
}

/// Run a sequence of events with no variations
pub fn run_events(events: &[Event<'_>], options: &RuleOptions) -> Outcome {
    drive(events, options, || false)
}

/// Run owned event specs with no variations
pub fn run_specs(specs: &[EventSpec], options: &RuleOptions) -> Outcome {
    let events: Vec<Event<'_>> = specs.iter().map(EventSpec::event).collect();
    run_events(&events, options)
}

fn format_spec(spec: &EventSpec) -> String {
    match spec.content() {
        Some(content) => format!("{} {:?}", spec.name(), content),
        None => spec.name().to_string(),
    }
}

fn compare(case: &TestCase, outcome: &Outcome, check_depths: bool) -> Vec<String> {
    let mut errors = Vec::new();

    if outcome.kind() != case.expect {
        errors.push(format!(
            "Outcome mismatch: expected {}, got {} ({:?})",
            case.expect,
            outcome.kind(),
            outcome.error
        ));
    }

    if let Some(rule) = &case.rule {
        if outcome.rule() != Some(rule.as_str()) {
            errors.push(format!("Rule mismatch: expected {:?}, got {:?}", rule, outcome.rule()));
        }
    }

    if check_depths {
        if let Some(depths) = &case.depths {
            if &outcome.depths != depths {
                errors.push(format!("Depths: expected {:?}, got {:?}", depths, outcome.depths));
            }
        }
    }

    // Rejected events never reach the receiver.
    let forwarded = outcome.forwarded.len() - outcome.padded;
    let accepted = outcome.depths.len();
    if forwarded != accepted {
        errors.push(format!(
            "Receiver saw {} events but {} were accepted",
            forwarded, accepted
        ));
    }

    errors
}

fn result(case: &TestCase, outcome: Outcome, seed: u64, errors: Vec<String>) -> TestResult {
    TestResult {
        passed: errors.is_empty(),
        events: case.events.iter().map(format_spec).collect(),
        outcome: outcome.kind().to_string(),
        depths: outcome.depths,
        seed,
        errors,
    }
}

/// Run a single test case (canonical, no variations)
pub fn run_test(case: &TestCase) -> TestResult {
    let outcome = run_specs(&case.events, &case.options);
    let errors = compare(case, &outcome, true);
    result(case, outcome, 0, errors)
}

/// Run test with stochastic variations
///
/// Inserts padding before events with probability 0.3, wherever the rule
/// on top of the stack accepts it. The outcome must not change.
pub fn run_with_variations(case: &TestCase, gen: &mut Gen) -> TestResult {
    let events: Vec<Event<'_>> = case.events.iter().map(EventSpec::event).collect();
    let outcome = drive(&events, &case.options, || gen.chance(0.3));
    let errors = compare(case, &outcome, false);
    result(case, outcome, gen.seed, errors)
}

impl TestResult {
    /// Print detailed failure info
    pub fn print_failure(&self, case_id: &str) {
        eprintln!("\n=== FAILED: {} ===", case_id);
        eprintln!("Seed: {} (set CEDOC_TEST_SEED={} to reproduce)", self.seed, self.seed);
        eprintln!("\nEvents:");
        for (i, e) in self.events.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nOutcome: {}", self.outcome);
        eprintln!("Depths: {:?}", self.depths);
        eprintln!("\nErrors:");
        for e in &self.errors {
            eprintln!("  - {}", e);
        }
    }
}

//! Declarative transition tables, one per loan-category script.
//!
//! A table maps `(step, response)` to a [`Row`] describing what the assistant
//! says next, which answer to capture, where the conversation goes, and
//! whether control passes to an external capability. Tables are pure data;
//! the engine is the only interpreter.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use super::model::{FlowKind, Handoff, MessageSpec};
use super::state::{StepId, fields};
use crate::error::FlowError;

/// Reply shown when the completion service fails.
pub const AI_FALLBACK_REPLY: &str =
    "I'd love to help you with that! To give you accurate information, could you tell me a bit more?";

/// Labels on the signup offer that follows a quote-like AI answer.
pub const SIGNUP_CHOICE: &str = "Create Account";
pub const GUEST_CHOICE: &str = "Continue as Guest";

/// Delay before the signup offer is revealed.
pub const SIGNUP_OFFER_DELAY_MS: u64 = 2000;

/// The signup offer appended after an AI answer whose intent calls for it.
pub fn signup_offer() -> MessageSpec {
    MessageSpec::say(
        "Great! To save your progress and see personalized quotes, would you like to create a quick account? It takes just 30 seconds. 😊",
    )
    .with_choices([SIGNUP_CHOICE, GUEST_CHOICE])
    .after_ms(SIGNUP_OFFER_DELAY_MS)
    .as_signup_offer()
}

/// What a row matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Choice(String),
    /// Any offered label.
    AnyChoice,
    /// Free text.
    Text,
}

/// The value written by a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureValue {
    /// The button label or text the visitor supplied.
    Response,
    /// A constant chosen by the script.
    Fixed(String),
    /// Parse the reply as a full name into `firstName` and `lastName`.
    FullName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub field: String,
    pub value: CaptureValue,
}

/// A destination step together with the messages shown on arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goto {
    pub step: StepId,
    pub messages: Vec<MessageSpec>,
}

impl Goto {
    pub fn to(step: &str) -> Self {
        Self {
            step: StepId::from(step),
            messages: Vec::new(),
        }
    }

    pub fn say(mut self, message: MessageSpec) -> Self {
        self.messages.push(message);
        self
    }
}

/// Where a row leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    Goto(Goto),
    /// Pick the destination from a previously captured answer.
    Branch {
        field: String,
        arms: Vec<(String, Goto)>,
        otherwise: Goto,
    },
}

impl Next {
    /// Every destination this transition can reach.
    pub fn targets(&self) -> Vec<&Goto> {
        match self {
            Self::Goto(goto) => vec![goto],
            Self::Branch {
                arms, otherwise, ..
            } => arms
                .iter()
                .map(|(_, goto)| goto)
                .chain(std::iter::once(otherwise))
                .collect(),
        }
    }

    /// Resolve the destination against the current answers.
    pub fn resolve<'a>(&'a self, answers: &BTreeMap<String, String>) -> &'a Goto {
        match self {
            Self::Goto(goto) => goto,
            Self::Branch {
                field,
                arms,
                otherwise,
            } => {
                let value = answers.get(field).map(String::as_str);
                arms.iter()
                    .find(|(expected, _)| Some(expected.as_str()) == value)
                    .map(|(_, goto)| goto)
                    .unwrap_or(otherwise)
            }
        }
    }
}

/// One transition table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Acknowledgement messages, shown before the destination's messages.
    pub messages: Vec<MessageSpec>,
    pub capture: Option<Capture>,
    pub next: Next,
    pub defer_to: Option<Handoff>,
}

impl Row {
    pub fn to(step: &str) -> Self {
        Self::new(Next::Goto(Goto::to(step)))
    }

    pub fn branch(field: &str, arms: Vec<(&str, Goto)>, otherwise: Goto) -> Self {
        Self::new(Next::Branch {
            field: field.to_string(),
            arms: arms
                .into_iter()
                .map(|(value, goto)| (value.to_string(), goto))
                .collect(),
            otherwise,
        })
    }

    fn new(next: Next) -> Self {
        Self {
            messages: Vec::new(),
            capture: None,
            next,
            defer_to: None,
        }
    }

    pub fn say(mut self, message: MessageSpec) -> Self {
        self.messages.push(message);
        self
    }

    /// Store the visitor's response under `field`.
    pub fn capture(mut self, field: &str) -> Self {
        self.capture = Some(Capture {
            field: field.to_string(),
            value: CaptureValue::Response,
        });
        self
    }

    pub fn capture_fixed(mut self, field: &str, value: &str) -> Self {
        self.capture = Some(Capture {
            field: field.to_string(),
            value: CaptureValue::Fixed(value.to_string()),
        });
        self
    }

    pub fn capture_name(mut self) -> Self {
        self.capture = Some(Capture {
            field: fields::FIRST_NAME.to_string(),
            value: CaptureValue::FullName,
        });
        self
    }

    pub fn defer(mut self, handoff: Handoff) -> Self {
        self.defer_to = Some(handoff);
        self
    }

    /// Messages shown when this row resolves to `goto`.
    pub fn messages_for<'a>(&'a self, goto: &'a Goto) -> impl Iterator<Item = &'a MessageSpec> {
        self.messages.iter().chain(goto.messages.iter())
    }
}

/// All rows for a single step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepRows {
    choices: Vec<(String, Row)>,
    any_choice: Option<Row>,
    text: Option<Row>,
}

impl StepRows {
    fn rows(&self) -> impl Iterator<Item = &Row> {
        self.choices
            .iter()
            .map(|(_, row)| row)
            .chain(self.any_choice.iter())
            .chain(self.text.iter())
    }

    fn is_empty(&self) -> bool {
        self.choices.is_empty() && self.any_choice.is_none() && self.text.is_none()
    }
}

/// A transition table problem found by [`TransitionTable::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadEnd {
    /// A button is offered on arrival at `step` but no row handles it.
    UnhandledChoice { step: StepId, label: String },
    /// `step` is entered with no buttons and does not accept free text.
    NoInput { step: StepId },
}

impl fmt::Display for DeadEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnhandledChoice { step, label } => {
                write!(f, "choice '{label}' offered at '{step}' has no row")
            }
            Self::NoInput { step } => {
                write!(f, "step '{step}' is entered without buttons and takes no text")
            }
        }
    }
}

/// A complete script for one loan category.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    pub flow: FlowKind,
    pub initial_step: StepId,
    /// Messages appended when a conversation starts.
    pub opening: Vec<MessageSpec>,
    steps: BTreeMap<StepId, StepRows>,
}

impl TransitionTable {
    pub fn builder(flow: FlowKind, initial_step: &str) -> TableBuilder {
        TableBuilder {
            table: TransitionTable {
                flow,
                initial_step: StepId::from(initial_step),
                opening: Vec::new(),
                steps: BTreeMap::new(),
            },
        }
    }

    /// Row for a button press: exact label first, then the step's catch-all.
    pub fn choice_row(&self, step: &StepId, label: &str) -> Option<&Row> {
        let rows = self.steps.get(step)?;
        rows.choices
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, row)| row)
            .or(rows.any_choice.as_ref())
    }

    pub fn text_row(&self, step: &StepId) -> Option<&Row> {
        self.steps.get(step)?.text.as_ref()
    }

    pub fn accepts_text(&self, step: &StepId) -> bool {
        self.text_row(step).is_some()
    }

    /// A terminal step has no outgoing rows.
    pub fn is_terminal(&self, step: &StepId) -> bool {
        self.steps.get(step).is_none_or(StepRows::is_empty)
    }

    /// Every step reachable from the initial step, including terminal ones.
    pub fn reachable_steps(&self) -> BTreeSet<StepId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([self.initial_step.clone()]);
        while let Some(step) = queue.pop_front() {
            if !seen.insert(step.clone()) {
                continue;
            }
            if let Some(rows) = self.steps.get(&step) {
                for row in rows.rows() {
                    for goto in row.next.targets() {
                        if !seen.contains(&goto.step) {
                            queue.push_back(goto.step.clone());
                        }
                    }
                }
            }
        }
        seen
    }

    /// Find every way a conversation started from the initial step can
    /// deadlock. An empty result means the table is sound.
    pub fn validate(&self) -> Vec<DeadEnd> {
        let mut problems = Vec::new();
        let mut check = |step: &StepId, last: Option<&MessageSpec>| {
            let offered = last.map(|m| m.choices.as_slice()).unwrap_or(&[]);
            if offered.is_empty() {
                if !self.is_terminal(step) && !self.accepts_text(step) {
                    problems.push(DeadEnd::NoInput { step: step.clone() });
                }
                return;
            }
            for label in offered {
                if self.choice_row(step, label).is_none() {
                    problems.push(DeadEnd::UnhandledChoice {
                        step: step.clone(),
                        label: label.clone(),
                    });
                }
            }
        };

        check(&self.initial_step, self.opening.last());

        for step in self.reachable_steps() {
            let Some(rows) = self.steps.get(&step) else {
                continue;
            };
            for row in rows.rows() {
                match row.defer_to {
                    // The host navigates away; nothing further is offered locally.
                    Some(Handoff::Auth(_)) => continue,
                    Some(Handoff::Ai) => {
                        let signup = signup_offer();
                        check(&step, Some(&signup));
                        check(&step, None);
                        continue;
                    }
                    _ => {}
                }
                for goto in row.next.targets() {
                    check(&goto.step, row.messages_for(goto).last());
                }
            }
        }

        problems.dedup();
        problems
    }

    /// Fail with a [`FlowError::DeadEnds`] if the table can deadlock.
    pub fn ensure_valid(&self) -> Result<(), FlowError> {
        let problems = self.validate();
        match problems.first() {
            None => Ok(()),
            Some(first) => Err(FlowError::DeadEnds {
                flow: self.flow.slug(),
                count: problems.len(),
                first: first.to_string(),
            }),
        }
    }
}

/// Incremental construction of a [`TransitionTable`].
pub struct TableBuilder {
    table: TransitionTable,
}

impl TableBuilder {
    pub fn opening(mut self, message: MessageSpec) -> Self {
        self.table.opening.push(message);
        self
    }

    pub fn on(mut self, step: &str, pattern: Pattern, row: Row) -> Self {
        let rows = self.table.steps.entry(StepId::from(step)).or_default();
        match pattern {
            Pattern::Choice(label) => {
                rows.choices.retain(|(l, _)| *l != label);
                rows.choices.push((label, row));
            }
            Pattern::AnyChoice => rows.any_choice = Some(row),
            Pattern::Text => rows.text = Some(row),
        }
        self
    }

    pub fn on_choice(self, step: &str, label: &str, row: Row) -> Self {
        self.on(step, Pattern::Choice(label.to_string()), row)
    }

    pub fn on_any_choice(self, step: &str, row: Row) -> Self {
        self.on(step, Pattern::AnyChoice, row)
    }

    pub fn on_text(self, step: &str, row: Row) -> Self {
        self.on(step, Pattern::Text, row)
    }

    /// Free text at `step` goes to the AI completion service.
    pub fn on_text_ai(self, step: &str) -> Self {
        self.on(step, Pattern::Text, Row::to(step).defer(Handoff::Ai))
    }

    pub fn build(self) -> TransitionTable {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::model::AuthAction;

    fn yes_no(text: &str) -> MessageSpec {
        MessageSpec::say(text).with_choices(["Yes", "No"])
    }

    fn tiny() -> TransitionTable {
        TransitionTable::builder(FlowKind::Jumbo, "start")
            .opening(yes_no("Ready?"))
            .on_choice("start", "Yes", Row::to("amount").say(MessageSpec::say("How much?")))
            .on_choice("start", "No", Row::to("end").say(MessageSpec::say("Bye")))
            .on_text(
                "amount",
                Row::to("confirm").capture(fields::BUDGET).say(yes_no("Sure?")),
            )
            .on_any_choice("confirm", Row::to("end").say(MessageSpec::say("Done")))
            .build()
    }

    #[test]
    fn choice_lookup_prefers_exact_label() {
        let table = TransitionTable::builder(FlowKind::Jumbo, "s")
            .on_choice("s", "A", Row::to("a"))
            .on_any_choice("s", Row::to("other"))
            .build();
        let step = StepId::from("s");
        assert_eq!(
            table.choice_row(&step, "A").unwrap().next,
            Next::Goto(Goto::to("a"))
        );
        assert_eq!(
            table.choice_row(&step, "B").unwrap().next,
            Next::Goto(Goto::to("other"))
        );
        assert!(table.choice_row(&StepId::from("nope"), "A").is_none());
    }

    #[test]
    fn sound_table_validates() {
        let table = tiny();
        assert!(table.validate().is_empty(), "{:?}", table.validate());
        assert!(table.ensure_valid().is_ok());
        let reachable: Vec<String> = table
            .reachable_steps()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(reachable, ["amount", "confirm", "end", "start"]);
    }

    #[test]
    fn missing_choice_row_is_reported() {
        let table = TransitionTable::builder(FlowKind::Jumbo, "start")
            .opening(yes_no("Ready?"))
            .on_choice("start", "Yes", Row::to("end"))
            .build();
        assert_eq!(
            table.validate(),
            vec![DeadEnd::UnhandledChoice {
                step: StepId::from("start"),
                label: "No".to_string()
            }]
        );
        assert!(matches!(
            table.ensure_valid(),
            Err(FlowError::DeadEnds { count: 1, .. })
        ));
    }

    #[test]
    fn buttons_into_terminal_step_are_dead_ends() {
        let table = TransitionTable::builder(FlowKind::Jumbo, "start")
            .opening(yes_no("Ready?"))
            .on_any_choice("start", Row::to("end").say(yes_no("Again?")))
            .build();
        assert_eq!(table.validate().len(), 2);
    }

    #[test]
    fn silent_arrival_without_text_row_is_reported() {
        let table = TransitionTable::builder(FlowKind::Jumbo, "start")
            .opening(yes_no("Ready?"))
            .on_any_choice("start", Row::to("menu").say(MessageSpec::say("Hmm.")))
            .on_choice("menu", "Yes", Row::to("end"))
            .build();
        assert_eq!(
            table.validate(),
            vec![DeadEnd::NoInput {
                step: StepId::from("menu")
            }]
        );
    }

    #[test]
    fn ai_steps_must_handle_signup_buttons() {
        let table = TransitionTable::builder(FlowKind::Jumbo, "chat")
            .opening(MessageSpec::say("Ask away"))
            .on_text_ai("chat")
            .build();
        assert_eq!(table.validate().len(), 2);

        let fixed = TransitionTable::builder(FlowKind::Jumbo, "chat")
            .opening(MessageSpec::say("Ask away"))
            .on_text_ai("chat")
            .on_choice(
                "chat",
                SIGNUP_CHOICE,
                Row::to("chat").defer(Handoff::Auth(AuthAction::CreateAccount)),
            )
            .on_choice("chat", GUEST_CHOICE, Row::to("chat"))
            .build();
        assert!(fixed.validate().is_empty());
    }

    #[test]
    fn branch_resolves_on_answer() {
        let row = Row::branch(
            fields::PROGRAM,
            vec![("FHA", Goto::to("fha")), ("VA", Goto::to("va"))],
            Goto::to("property"),
        );
        let mut answers = BTreeMap::new();
        assert_eq!(row.next.resolve(&answers).step, "property");
        answers.insert(fields::PROGRAM.to_string(), "VA".to_string());
        assert_eq!(row.next.resolve(&answers).step, "va");
        assert_eq!(row.next.targets().len(), 3);
    }
}

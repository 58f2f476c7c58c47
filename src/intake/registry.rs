//! Step registry: the closed set of intake questions and their branching.
//!
//! Forward graph:
//!
//! ```text
//! gender -> religion -> religious-importance -> lgbtq-preference -> age -> location -> therapy-needs -> complete
//!                   \-> lgbtq-preference   (not applicable / prefer not to say)
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::session::model::{ChoiceOption, Field, Gender, ProfilePatch, Religion, TherapyNeed};

/// One question page in the intake flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    Gender,
    Religion,
    ReligiousImportance,
    LgbtqPreference,
    Age,
    Location,
    TherapyNeeds,
}

/// Where the branching function sends the user after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "step", rename_all = "snake_case")]
pub enum Transition {
    Step(StepId),
    /// The questionnaire is finished; hand off to the completion route.
    Complete,
}

impl StepId {
    /// Every step, in default forward order.
    pub const ALL: [StepId; 7] = [
        Self::Gender,
        Self::Religion,
        Self::ReligiousImportance,
        Self::LgbtqPreference,
        Self::Age,
        Self::Location,
        Self::TherapyNeeds,
    ];

    /// The step a new flow starts on.
    pub fn first() -> StepId {
        Self::Gender
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gender => "gender",
            Self::Religion => "religion",
            Self::ReligiousImportance => "religious-importance",
            Self::LgbtqPreference => "lgbtq-preference",
            Self::Age => "age",
            Self::Location => "location",
            Self::TherapyNeeds => "therapy-needs",
        }
    }

    /// Profile fields this step answers.
    pub fn fields(&self) -> &'static [Field] {
        match self {
            Self::Gender => &[Field::Gender],
            Self::Religion => &[Field::Religion],
            Self::ReligiousImportance => &[Field::IsReligiousTherapistPreference],
            Self::LgbtqPreference => &[Field::IsLgbtqTherapistPreference],
            Self::Age => &[Field::Age],
            Self::Location => &[Field::PostalCode],
            Self::TherapyNeeds => &[Field::TherapyNeeds],
        }
    }

    /// Branching function. Pure: the result depends only on `self` and
    /// `answer`. With no answer the default successor is returned.
    pub fn next(self, answer: Option<&ProfilePatch>) -> Transition {
        match self {
            Self::Gender => Transition::Step(Self::Religion),
            Self::Religion => match answer.and_then(|a| a.religion) {
                Some(religion) if !religion.has_preference_question() => {
                    Transition::Step(Self::LgbtqPreference)
                }
                _ => Transition::Step(Self::ReligiousImportance),
            },
            Self::ReligiousImportance => Transition::Step(Self::LgbtqPreference),
            Self::LgbtqPreference => Transition::Step(Self::Age),
            Self::Age => Transition::Step(Self::Location),
            Self::Location => Transition::Step(Self::TherapyNeeds),
            Self::TherapyNeeds => Transition::Complete,
        }
    }

    /// Registry entry for this step.
    pub fn definition(self) -> &'static StepDefinition {
        // REGISTRY is laid out in `StepId::ALL` order.
        &REGISTRY[self as usize]
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| FlowError::UnknownStep(s.to_string()))
    }
}

/// Set of options offered by a choice step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSet {
    Gender,
    Religion,
    TherapyNeed,
}

/// A single option as the rendering layer shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    pub key: &'static str,
    pub label: &'static str,
}

impl OptionSet {
    pub fn options(self) -> Vec<ChoiceView> {
        match self {
            Self::Gender => views::<Gender>(),
            Self::Religion => views::<Religion>(),
            Self::TherapyNeed => views::<TherapyNeed>(),
        }
    }
}

fn views<T: ChoiceOption>() -> Vec<ChoiceView> {
    T::ALL
        .iter()
        .map(|o| ChoiceView {
            key: o.key(),
            label: o.label(),
        })
        .collect()
}

/// What kind of input a step renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    SingleChoice(OptionSet),
    MultiChoice(OptionSet),
    YesNo,
    Number { placeholder: &'static str },
    Text { placeholder: &'static str },
}

/// Serializable form of [`InputKind`] handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepInput {
    SingleChoice { options: Vec<ChoiceView> },
    MultiChoice { options: Vec<ChoiceView> },
    YesNo,
    Number { placeholder: &'static str },
    Text { placeholder: &'static str },
}

impl From<InputKind> for StepInput {
    fn from(kind: InputKind) -> Self {
        match kind {
            InputKind::SingleChoice(set) => Self::SingleChoice {
                options: set.options(),
            },
            InputKind::MultiChoice(set) => Self::MultiChoice {
                options: set.options(),
            },
            InputKind::YesNo => Self::YesNo,
            InputKind::Number { placeholder } => Self::Number { placeholder },
            InputKind::Text { placeholder } => Self::Text { placeholder },
        }
    }
}

/// Static description of one step.
#[derive(Debug)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: &'static str,
    pub input: InputKind,
}

impl StepDefinition {
    pub fn fields(&self) -> &'static [Field] {
        self.id.fields()
    }

    pub fn next(&self, answer: Option<&ProfilePatch>) -> Transition {
        self.id.next(answer)
    }

    /// Reject an answer that is empty or carries fields another step owns.
    pub fn check_answer(&self, patch: &ProfilePatch) -> Result<(), FlowError> {
        if patch.is_empty() {
            return Err(FlowError::InvalidAnswer {
                step: self.id,
                reason: "no answer given".to_string(),
            });
        }
        let foreign: Vec<Field> = patch
            .fields()
            .into_iter()
            .filter(|field| !self.fields().contains(field))
            .collect();
        if !foreign.is_empty() {
            return Err(FlowError::InvalidAnswer {
                step: self.id,
                reason: format!("fields not asked by this step: {foreign:?}"),
            });
        }
        Ok(())
    }
}

static REGISTRY: [StepDefinition; 7] = [
    StepDefinition {
        id: StepId::Gender,
        title: "What is your gender identity?",
        input: InputKind::SingleChoice(OptionSet::Gender),
    },
    StepDefinition {
        id: StepId::Religion,
        title: "What is your religion?",
        input: InputKind::SingleChoice(OptionSet::Religion),
    },
    StepDefinition {
        id: StepId::ReligiousImportance,
        title: "Is it important that your therapist shares your religion?",
        input: InputKind::YesNo,
    },
    StepDefinition {
        id: StepId::LgbtqPreference,
        title: "Would you prefer a therapist who identifies as LGBTQ+?",
        input: InputKind::YesNo,
    },
    StepDefinition {
        id: StepId::Age,
        title: "What is your age?",
        input: InputKind::Number {
            placeholder: "e.g. 27",
        },
    },
    StepDefinition {
        id: StepId::Location,
        title: "What is your postal code?",
        input: InputKind::Text {
            placeholder: "e.g., M5A 4L1",
        },
    },
    StepDefinition {
        id: StepId::TherapyNeeds,
        title: "What led you to consider therapy today?",
        input: InputKind::MultiChoice(OptionSet::TherapyNeed),
    },
];

/// Look up a step by its route name. `None` means "step does not exist".
pub fn lookup(name: &str) -> Option<&'static StepDefinition> {
    REGISTRY.iter().find(|def| def.id.as_str() == name)
}

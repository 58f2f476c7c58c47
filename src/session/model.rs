//! Profile data model: the session entity, its enumerated answers, and
//! partial patches.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An enumerated answer with a stable wire key and a display label.
pub trait ChoiceOption: Sized + Copy + 'static {
    /// Every option, in display order.
    const ALL: &'static [Self];

    fn key(self) -> &'static str;

    fn label(self) -> &'static str;

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|o| o.key() == key)
    }
}

/// Gender identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Other,
    PreferNotToSay,
}

impl ChoiceOption for Gender {
    const ALL: &'static [Self] = &[
        Self::Male,
        Self::Female,
        Self::NonBinary,
        Self::Other,
        Self::PreferNotToSay,
    ];

    fn key(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::NonBinary => "non_binary",
            Self::Other => "other",
            Self::PreferNotToSay => "prefer_not_to_say",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::NonBinary => "Non-binary",
            Self::Other => "Other",
            Self::PreferNotToSay => "Prefer not to say",
        }
    }
}

/// Religion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Religion {
    Jewish,
    Muslim,
    Hindu,
    Buddhist,
    Christian,
    Sikh,
    NotApplicable,
    PreferNotToSay,
}

impl Religion {
    /// Whether a follow-up about the therapist sharing this religion makes sense.
    pub fn has_preference_question(self) -> bool {
        !matches!(self, Self::NotApplicable | Self::PreferNotToSay)
    }
}

impl ChoiceOption for Religion {
    const ALL: &'static [Self] = &[
        Self::Jewish,
        Self::Muslim,
        Self::Hindu,
        Self::Buddhist,
        Self::Christian,
        Self::Sikh,
        Self::NotApplicable,
        Self::PreferNotToSay,
    ];

    fn key(self) -> &'static str {
        match self {
            Self::Jewish => "jewish",
            Self::Muslim => "muslim",
            Self::Hindu => "hindu",
            Self::Buddhist => "buddhist",
            Self::Christian => "christian",
            Self::Sikh => "sikh",
            Self::NotApplicable => "not_applicable",
            Self::PreferNotToSay => "prefer_not_to_say",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Jewish => "Jewish",
            Self::Muslim => "Muslim",
            Self::Hindu => "Hindu",
            Self::Buddhist => "Buddhist",
            Self::Christian => "Christian",
            Self::Sikh => "Sikh",
            Self::NotApplicable => "Not applicable",
            Self::PreferNotToSay => "Prefer not to say",
        }
    }
}

/// Reasons a patient is looking for therapy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TherapyNeed {
    Anxiety,
    Depression,
    TraumaPtsd,
    Relationships,
    LifeTransitions,
    Grief,
    SubstanceAbuse,
    SelfEsteem,
    Stress,
    CopingMechanisms,
    EatingDisorders,
    AngerManagement,
    Adhd,
    Insomnia,
    MoodDisorders,
    PersonalityDisorders,
    AttentionFocus,
}

impl ChoiceOption for TherapyNeed {
    const ALL: &'static [Self] = &[
        Self::Anxiety,
        Self::Depression,
        Self::TraumaPtsd,
        Self::Relationships,
        Self::LifeTransitions,
        Self::Grief,
        Self::SubstanceAbuse,
        Self::SelfEsteem,
        Self::Stress,
        Self::CopingMechanisms,
        Self::EatingDisorders,
        Self::AngerManagement,
        Self::Adhd,
        Self::Insomnia,
        Self::MoodDisorders,
        Self::PersonalityDisorders,
        Self::AttentionFocus,
    ];

    fn key(self) -> &'static str {
        match self {
            Self::Anxiety => "anxiety",
            Self::Depression => "depression",
            Self::TraumaPtsd => "trauma_ptsd",
            Self::Relationships => "relationships",
            Self::LifeTransitions => "life_transitions",
            Self::Grief => "grief",
            Self::SubstanceAbuse => "substance_abuse",
            Self::SelfEsteem => "self_esteem",
            Self::Stress => "stress",
            Self::CopingMechanisms => "coping_mechanisms",
            Self::EatingDisorders => "eating_disorders",
            Self::AngerManagement => "anger_management",
            Self::Adhd => "adhd",
            Self::Insomnia => "insomnia",
            Self::MoodDisorders => "mood_disorders",
            Self::PersonalityDisorders => "personality_disorders",
            Self::AttentionFocus => "attention_focus",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Anxiety => "Anxiety",
            Self::Depression => "Depression",
            Self::TraumaPtsd => "Trauma and PTSD",
            Self::Relationships => "Relationship problems",
            Self::LifeTransitions => "Major life transitions",
            Self::Grief => "Grief and loss",
            Self::SubstanceAbuse => "Substance abuse and addiction",
            Self::SelfEsteem => "Low self-esteem",
            Self::Stress => "Stress",
            Self::CopingMechanisms => "Unhealthy coping mechanisms",
            Self::EatingDisorders => "Eating disorder",
            Self::AngerManagement => "Anger management",
            Self::Adhd => "ADHD",
            Self::Insomnia => "Insomnia",
            Self::MoodDisorders => "Depression/Mood disorders",
            Self::PersonalityDisorders => "Personality Disorders",
            Self::AttentionFocus => "Attention and focus issues",
        }
    }
}

macro_rules! display_via_key {
    ($($ty:ty),*) => {
        $(impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.key())
            }
        })*
    };
}

display_via_key!(Gender, Religion, TherapyNeed);

/// A patchable profile field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    TherapyNeeds,
    PersonalityTestId,
    Description,
    Age,
    Gender,
    Religion,
    IsLgbtqTherapistPreference,
    IsReligiousTherapistPreference,
    PostalCode,
}

/// The remote-backed anonymous patient profile.
///
/// Every field stays `None` until answered. Unknown keys in the store's
/// response are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEntity {
    pub id: Option<Uuid>,
    pub therapy_needs: Option<Vec<TherapyNeed>>,
    pub personality_test_id: Option<Uuid>,
    pub description: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub religion: Option<Religion>,
    pub is_lgbtq_therapist_preference: Option<bool>,
    pub is_religious_therapist_preference: Option<bool>,
    pub postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl SessionEntity {
    /// Apply a partial update. Fields absent from the patch are untouched.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(needs) = &patch.therapy_needs {
            self.therapy_needs = Some(needs.clone());
        }
        if let Some(id) = patch.personality_test_id {
            self.personality_test_id = Some(id);
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(age) = patch.age {
            self.age = Some(age);
        }
        if let Some(gender) = patch.gender {
            self.gender = Some(gender);
        }
        if let Some(religion) = patch.religion {
            self.religion = Some(religion);
        }
        if let Some(pref) = patch.is_lgbtq_therapist_preference {
            self.is_lgbtq_therapist_preference = Some(pref);
        }
        if let Some(pref) = patch.is_religious_therapist_preference {
            self.is_religious_therapist_preference = Some(pref);
        }
        if let Some(code) = &patch.postal_code {
            self.postal_code = Some(code.clone());
        }
    }

    /// The currently stored values of `fields`, as a patch.
    ///
    /// This is what a step shows as its pre-filled answer on revisit.
    pub fn project(&self, fields: &[Field]) -> ProfilePatch {
        let mut patch = ProfilePatch::default();
        for field in fields {
            match field {
                Field::TherapyNeeds => patch.therapy_needs = self.therapy_needs.clone(),
                Field::PersonalityTestId => patch.personality_test_id = self.personality_test_id,
                Field::Description => patch.description = self.description.clone(),
                Field::Age => patch.age = self.age,
                Field::Gender => patch.gender = self.gender,
                Field::Religion => patch.religion = self.religion,
                Field::IsLgbtqTherapistPreference => {
                    patch.is_lgbtq_therapist_preference = self.is_lgbtq_therapist_preference
                }
                Field::IsReligiousTherapistPreference => {
                    patch.is_religious_therapist_preference =
                        self.is_religious_therapist_preference
                }
                Field::PostalCode => patch.postal_code = self.postal_code.clone(),
            }
        }
        patch
    }
}

/// A partial profile update. Only the fields that are `Some` go over the
/// wire, so unrelated fields are never clobbered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub therapy_needs: Option<Vec<TherapyNeed>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality_test_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub religion: Option<Religion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_lgbtq_therapist_preference: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_religious_therapist_preference: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Fields carried by this patch.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.therapy_needs.is_some() {
            fields.push(Field::TherapyNeeds);
        }
        if self.personality_test_id.is_some() {
            fields.push(Field::PersonalityTestId);
        }
        if self.description.is_some() {
            fields.push(Field::Description);
        }
        if self.age.is_some() {
            fields.push(Field::Age);
        }
        if self.gender.is_some() {
            fields.push(Field::Gender);
        }
        if self.religion.is_some() {
            fields.push(Field::Religion);
        }
        if self.is_lgbtq_therapist_preference.is_some() {
            fields.push(Field::IsLgbtqTherapistPreference);
        }
        if self.is_religious_therapist_preference.is_some() {
            fields.push(Field::IsReligiousTherapistPreference);
        }
        if self.postal_code.is_some() {
            fields.push(Field::PostalCode);
        }
        fields
    }

    /// Fields whose submitted value differs from what `entity` holds.
    ///
    /// Therapy needs compare as a set; an unanswered list equals an empty one.
    pub fn changed_fields(&self, entity: &SessionEntity) -> Vec<Field> {
        self.fields()
            .into_iter()
            .filter(|field| match field {
                Field::TherapyNeeds => {
                    let submitted: HashSet<TherapyNeed> =
                        self.therapy_needs.iter().flatten().copied().collect();
                    let stored: HashSet<TherapyNeed> =
                        entity.therapy_needs.iter().flatten().copied().collect();
                    submitted != stored
                }
                Field::PersonalityTestId => {
                    self.personality_test_id != entity.personality_test_id
                }
                Field::Description => self.description != entity.description,
                Field::Age => self.age != entity.age,
                Field::Gender => self.gender != entity.gender,
                Field::Religion => self.religion != entity.religion,
                Field::IsLgbtqTherapistPreference => {
                    self.is_lgbtq_therapist_preference != entity.is_lgbtq_therapist_preference
                }
                Field::IsReligiousTherapistPreference => {
                    self.is_religious_therapist_preference
                        != entity.is_religious_therapist_preference
                }
                Field::PostalCode => self.postal_code != entity.postal_code,
            })
            .collect()
    }
}

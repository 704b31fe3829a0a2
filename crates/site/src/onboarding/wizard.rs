//! Wizard state machine.
//!
//! Holds the current step, the draft answers and the username availability
//! state. Availability checks are sequenced by a generation counter: every
//! username edit bumps it, a check remembers the generation it was issued
//! for, and only a result for the latest generation is applied.

use chrono::{DateTime, Utc};

use a2a_labs_core::{Intent, MAX_INTENTS, OnboardingProfile, Username};

use super::{OnboardingError, ProfileDraft, Selection, Step, StepKind};
use crate::services::StoredProfile;

/// Username availability as last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Availability {
    #[default]
    Unknown,
    Checking,
    Available,
    Taken,
}

impl Availability {
    /// Key used by templates and the availability fragment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Checking => "checking",
            Self::Available => "available",
            Self::Taken => "taken",
        }
    }
}

/// An availability query to run outside the wizard lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityCheck {
    pub generation: u64,
    pub username: Username,
}

/// Outcome of toggling an intent tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentToggle {
    Added,
    Removed,
    /// Already at the maximum; nothing changed.
    Ignored,
}

/// Per-user wizard state.
#[derive(Debug, Clone, Default)]
pub struct WizardState {
    step: Step,
    draft: ProfileDraft,
    availability: Availability,
    generation: u64,
    username_locked: bool,
}

impl WizardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from what is already stored for the user.
    ///
    /// A stored username is locked in and counts as available.
    #[must_use]
    pub fn resume(stored: &StoredProfile, display_name: Option<&str>) -> Self {
        let mut state = Self::new();
        state.draft.full_name = stored
            .full_name
            .clone()
            .or_else(|| display_name.map(str::to_string))
            .unwrap_or_default();
        if let Some(username) = &stored.username {
            state.draft.username = username.as_str().to_string();
            state.username_locked = true;
            state.availability = Availability::Available;
        }
        state
    }

    #[must_use]
    pub const fn step(&self) -> Step {
        self.step
    }

    #[must_use]
    pub const fn draft(&self) -> &ProfileDraft {
        &self.draft
    }

    #[must_use]
    pub const fn availability(&self) -> Availability {
        self.availability
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn username_locked(&self) -> bool {
        self.username_locked
    }

    /// Move forward one step without validation, clamped at 9.
    pub fn next_step(&mut self) {
        self.step = self.step.next();
    }

    /// Move back one step, clamped at 1. Answers are kept.
    pub fn prev_step(&mut self) {
        self.step = self.step.prev();
    }

    /// Jump back to an earlier step. Later steps are ignored.
    pub fn return_to(&mut self, step: Step) {
        if step < self.step {
            self.step = step;
        }
    }

    pub fn set_full_name(&mut self, raw: &str) {
        raw.trim().clone_into(&mut self.draft.full_name);
    }

    /// Record username input.
    ///
    /// The input is normalized first. Returns the check to run when the
    /// normalized value is a well-formed username; shorter input resets
    /// availability to unknown without a check.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::UsernameLocked` when a stored username would
    /// change.
    pub fn set_username(&mut self, raw: &str) -> Result<Option<AvailabilityCheck>, OnboardingError> {
        let normalized = Username::normalize(raw);

        if self.username_locked {
            return if normalized == self.draft.username {
                Ok(None)
            } else {
                Err(OnboardingError::UsernameLocked)
            };
        }

        self.generation += 1;
        self.draft.username = normalized;

        if let Ok(username) = Username::parse(&self.draft.username) {
            self.availability = Availability::Checking;
            Ok(Some(AvailabilityCheck {
                generation: self.generation,
                username,
            }))
        } else {
            self.availability = Availability::Unknown;
            Ok(None)
        }
    }

    /// Apply a check result. Returns false (and changes nothing) if the
    /// username was edited after the check was issued.
    pub fn resolve_availability(&mut self, check: &AvailabilityCheck, available: bool) -> bool {
        if check.generation != self.generation {
            return false;
        }
        self.availability = if available {
            Availability::Available
        } else {
            Availability::Taken
        };
        true
    }

    /// Record a failed check. Stale failures are ignored.
    pub fn availability_failed(&mut self, check: &AvailabilityCheck) {
        if check.generation == self.generation {
            self.availability = Availability::Unknown;
        }
    }

    /// Store a single-choice answer and advance exactly one step.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::WrongStep` if the selection doesn't answer
    /// the current step.
    pub fn select(&mut self, selection: Selection) -> Result<(), OnboardingError> {
        if selection.step() != self.step {
            return Err(OnboardingError::WrongStep {
                step: self.step.number(),
            });
        }
        self.draft.apply(selection);
        self.next_step();
        Ok(())
    }

    /// Add or remove an intent tag. A new tag beyond the maximum is dropped.
    pub fn toggle_intent(&mut self, intent: Intent) -> IntentToggle {
        if let Some(pos) = self.draft.intent.iter().position(|i| *i == intent) {
            self.draft.intent.remove(pos);
            IntentToggle::Removed
        } else if self.draft.intent.len() >= MAX_INTENTS {
            IntentToggle::Ignored
        } else {
            self.draft.intent.push(intent);
            IntentToggle::Added
        }
    }

    /// Whether `step` has a usable answer. Drives the Continue control.
    #[must_use]
    pub fn is_step_valid(&self, step: Step) -> bool {
        match step.kind() {
            StepKind::Identity => {
                !self.draft.full_name.trim().is_empty()
                    && Username::parse(&self.draft.username).is_ok()
                    && self.availability == Availability::Available
            }
            StepKind::SingleChoice => self.draft.selected_key(step).is_some(),
            StepKind::MultiChoice => !self.draft.intent.is_empty(),
            StepKind::Review => self.first_incomplete_step().is_none(),
        }
    }

    /// First step before review without a valid answer.
    #[must_use]
    pub fn first_incomplete_step(&self) -> Option<Step> {
        Step::ALL
            .into_iter()
            .filter(|s| *s != Step::Review)
            .find(|s| !self.is_step_valid(*s))
    }

    /// Continue: advance if the current step is valid.
    pub fn advance(&mut self) -> bool {
        if self.step == Step::LAST || !self.is_step_valid(self.step) {
            return false;
        }
        self.next_step();
        true
    }

    /// The profile to save on finish.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::Incomplete` for the first unanswered step.
    pub fn build_profile(&self, now: DateTime<Utc>) -> Result<OnboardingProfile, OnboardingError> {
        if let Some(step) = self.first_incomplete_step() {
            return Err(OnboardingError::Incomplete { step });
        }
        self.draft.to_profile(now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use a2a_labs_core::{DiscoverySource, Priority, Role, TeamSize, TechnicalComfort, Urgency};

    use super::*;

    /// Walk a fresh wizard to `step` with every earlier answer filled in.
    fn wizard_at(step: Step) -> WizardState {
        let mut wizard = WizardState::new();
        wizard.set_full_name("Ada Lovelace");
        let check = wizard.set_username("ada").unwrap().unwrap();
        wizard.resolve_availability(&check, true);

        let answers = [
            Selection::Role(Role::Engineer),
            Selection::TeamSize(TeamSize::Medium),
            Selection::Urgency(Urgency::ThisQuarter),
            Selection::TechnicalComfort(TechnicalComfort::Expert),
            Selection::Discovery(DiscoverySource::Search),
            Selection::Priority(Priority::Security),
        ];
        while wizard.step() < step {
            match wizard.step().kind() {
                StepKind::Identity => assert!(wizard.advance()),
                StepKind::MultiChoice => {
                    wizard.toggle_intent(Intent::CoordinateAgents);
                    assert!(wizard.advance());
                }
                StepKind::SingleChoice => {
                    let current = wizard.step();
                    let answer = answers.iter().find(|a| a.step() == current).unwrap();
                    wizard.select(*answer).unwrap();
                }
                StepKind::Review => break,
            }
        }
        wizard
    }

    #[test]
    fn test_step_stays_in_bounds_for_any_sequence() {
        let mut wizard = WizardState::new();
        // Deterministic pseudo-random walk of next/prev presses.
        let mut seed: u32 = 0x9E37_79B9;
        for _ in 0..1_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            if seed % 3 == 0 {
                wizard.prev_step();
            } else {
                wizard.next_step();
            }
            let n = wizard.step().number();
            assert!((1..=9).contains(&n), "step {n} out of range");
        }

        for _ in 0..20 {
            wizard.next_step();
        }
        assert_eq!(wizard.step(), Step::Review);
        for _ in 0..20 {
            wizard.prev_step();
        }
        assert_eq!(wizard.step(), Step::Identity);
    }

    #[test]
    fn test_single_choice_stores_value_and_advances_by_one() {
        for (step, selection) in [
            (Step::Role, Selection::Role(Role::Founder)),
            (Step::TeamSize, Selection::TeamSize(TeamSize::Enterprise)),
            (Step::Urgency, Selection::Urgency(Urgency::Immediately)),
            (
                Step::TechnicalComfort,
                Selection::TechnicalComfort(TechnicalComfort::NonTechnical),
            ),
            (Step::Discovery, Selection::Discovery(DiscoverySource::Social)),
            (Step::Priorities, Selection::Priority(Priority::Cost)),
        ] {
            let mut wizard = wizard_at(step);
            assert_eq!(wizard.step(), step);

            wizard.select(selection).unwrap();

            assert_eq!(wizard.step().number(), step.number() + 1);
            assert!(wizard.draft().selected_key(step).is_some());
            assert!(wizard.is_step_valid(step));
        }
    }

    #[test]
    fn test_selection_for_other_step_is_rejected() {
        let mut wizard = wizard_at(Step::Role);
        let err = wizard
            .select(Selection::Priority(Priority::Speed))
            .unwrap_err();
        assert!(matches!(err, OnboardingError::WrongStep { step: 2 }));
        assert_eq!(wizard.step(), Step::Role);
        assert_eq!(wizard.draft().priority, None);
    }

    #[test]
    fn test_intent_caps_at_three_and_toggles_off() {
        let mut wizard = wizard_at(Step::Intent);
        assert_eq!(wizard.toggle_intent(Intent::BuildAgents), IntentToggle::Added);
        assert_eq!(wizard.toggle_intent(Intent::Research), IntentToggle::Added);
        assert_eq!(wizard.toggle_intent(Intent::Evaluate), IntentToggle::Added);

        let before = wizard.draft().intent.clone();
        assert_eq!(wizard.toggle_intent(Intent::Explore), IntentToggle::Ignored);
        assert_eq!(wizard.draft().intent, before);

        assert_eq!(wizard.toggle_intent(Intent::Research), IntentToggle::Removed);
        assert_eq!(
            wizard.draft().intent,
            vec![Intent::BuildAgents, Intent::Evaluate]
        );
        // Toggling never moves the wizard.
        assert_eq!(wizard.step(), Step::Intent);
    }

    #[test]
    fn test_short_username_resets_without_check() {
        let mut wizard = WizardState::new();
        assert_eq!(wizard.set_username("ab").unwrap(), None);
        assert_eq!(wizard.availability(), Availability::Unknown);

        let check = wizard.set_username("abc").unwrap().unwrap();
        assert_eq!(check.username.as_str(), "abc");
        assert_eq!(wizard.availability(), Availability::Checking);
    }

    #[test]
    fn test_username_input_is_normalized() {
        let mut wizard = WizardState::new();
        let check = wizard.set_username("Ada Lovelace!").unwrap().unwrap();
        assert_eq!(check.username.as_str(), "adalovelace");
        assert_eq!(wizard.draft().username, "adalovelace");
    }

    #[test]
    fn test_stale_availability_result_is_discarded() {
        let mut wizard = WizardState::new();
        let first = wizard.set_username("ada").unwrap().unwrap();
        let second = wizard.set_username("adal").unwrap().unwrap();

        // The newer check resolves first, then the older one arrives late.
        assert!(wizard.resolve_availability(&second, true));
        assert!(!wizard.resolve_availability(&first, false));
        assert_eq!(wizard.availability(), Availability::Available);

        wizard.availability_failed(&first);
        assert_eq!(wizard.availability(), Availability::Available);
    }

    #[test]
    fn test_identity_requires_available_username() {
        let mut wizard = WizardState::new();
        wizard.set_full_name("Ada");
        let check = wizard.set_username("ada").unwrap().unwrap();
        assert!(!wizard.is_step_valid(Step::Identity));
        assert!(!wizard.advance());

        wizard.resolve_availability(&check, false);
        assert_eq!(wizard.availability(), Availability::Taken);
        assert!(!wizard.is_step_valid(Step::Identity));

        let check = wizard.set_username("ada_l").unwrap().unwrap();
        wizard.resolve_availability(&check, true);
        assert!(wizard.advance());
        assert_eq!(wizard.step(), Step::Role);
    }

    #[test]
    fn test_prev_step_keeps_answers() {
        let mut wizard = wizard_at(Step::Urgency);
        wizard.prev_step();
        wizard.prev_step();
        assert_eq!(wizard.step(), Step::TeamSize);
        assert_eq!(wizard.draft().role, Some(Role::Engineer));
        assert_eq!(wizard.draft().intent, vec![Intent::CoordinateAgents]);
    }

    #[test]
    fn test_stored_username_is_locked() {
        let stored = StoredProfile {
            full_name: None,
            username: Some(Username::parse("ada").unwrap()),
            onboarding_complete: false,
        };
        let mut wizard = WizardState::resume(&stored, Some("Ada Lovelace"));

        assert_eq!(wizard.draft().full_name, "Ada Lovelace");
        assert!(wizard.username_locked());
        assert_eq!(wizard.availability(), Availability::Available);
        assert_eq!(wizard.set_username("ADA").unwrap(), None);
        assert!(matches!(
            wizard.set_username("grace"),
            Err(OnboardingError::UsernameLocked)
        ));
        assert_eq!(wizard.draft().username, "ada");
    }

    #[test]
    fn test_build_profile_after_full_walk() {
        let wizard = wizard_at(Step::Review);
        assert_eq!(wizard.step(), Step::Review);
        assert!(wizard.is_step_valid(Step::Review));

        let profile = wizard.build_profile(Utc::now()).unwrap();
        assert_eq!(profile.full_name, "Ada Lovelace");
        assert_eq!(profile.intent, vec![Intent::CoordinateAgents]);
        assert!(profile.onboarding_complete);
    }

    #[test]
    fn test_build_profile_names_missing_step() {
        let mut wizard = wizard_at(Step::Review);
        let check = wizard.set_username("someone_else").unwrap().unwrap();
        wizard.resolve_availability(&check, false);

        assert!(matches!(
            wizard.build_profile(Utc::now()),
            Err(OnboardingError::Incomplete {
                step: Step::Identity
            })
        ));
        wizard.return_to(Step::Identity);
        assert_eq!(wizard.step(), Step::Identity);
    }
}

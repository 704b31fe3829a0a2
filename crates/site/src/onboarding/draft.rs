//! Answers collected so far.

use chrono::{DateTime, Utc};

use a2a_labs_core::{
    DiscoverySource, Intent, OnboardingProfile, Priority, Role, TeamSize, TechnicalComfort,
    Urgency, Username,
};

use super::{OnboardingError, Step};

/// A single-choice answer, tagged with the step it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Role(Role),
    TeamSize(TeamSize),
    Urgency(Urgency),
    TechnicalComfort(TechnicalComfort),
    Discovery(DiscoverySource),
    Priority(Priority),
}

impl Selection {
    /// Parse a submitted option key for `step`.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::WrongStep` if `step` isn't a single-choice
    /// step, or `OnboardingError::UnknownChoice` for an unknown key.
    pub fn parse(step: Step, value: &str) -> Result<Self, OnboardingError> {
        Ok(match step {
            Step::Role => Self::Role(value.parse()?),
            Step::TeamSize => Self::TeamSize(value.parse()?),
            Step::Urgency => Self::Urgency(value.parse()?),
            Step::TechnicalComfort => Self::TechnicalComfort(value.parse()?),
            Step::Discovery => Self::Discovery(value.parse()?),
            Step::Priorities => Self::Priority(value.parse()?),
            Step::Identity | Step::Intent | Step::Review => {
                return Err(OnboardingError::WrongStep {
                    step: step.number(),
                });
            }
        })
    }

    /// The step this selection answers.
    #[must_use]
    pub const fn step(self) -> Step {
        match self {
            Self::Role(_) => Step::Role,
            Self::TeamSize(_) => Step::TeamSize,
            Self::Urgency(_) => Step::Urgency,
            Self::TechnicalComfort(_) => Step::TechnicalComfort,
            Self::Discovery(_) => Step::Discovery,
            Self::Priority(_) => Step::Priorities,
        }
    }
}

/// Profile fields gathered by the wizard.
///
/// `username` holds the normalized input, which may not yet be a valid
/// [`Username`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub full_name: String,
    pub username: String,
    pub role: Option<Role>,
    pub team_size: Option<TeamSize>,
    pub intent: Vec<Intent>,
    pub urgency: Option<Urgency>,
    pub technical_comfort: Option<TechnicalComfort>,
    pub discovery_source: Option<DiscoverySource>,
    pub priority: Option<Priority>,
}

impl ProfileDraft {
    /// Store a single-choice answer.
    pub fn apply(&mut self, selection: Selection) {
        match selection {
            Selection::Role(v) => self.role = Some(v),
            Selection::TeamSize(v) => self.team_size = Some(v),
            Selection::Urgency(v) => self.urgency = Some(v),
            Selection::TechnicalComfort(v) => self.technical_comfort = Some(v),
            Selection::Discovery(v) => self.discovery_source = Some(v),
            Selection::Priority(v) => self.priority = Some(v),
        }
    }

    /// Persisted key of the answer stored for a single-choice step.
    #[must_use]
    pub fn selected_key(&self, step: Step) -> Option<&'static str> {
        match step {
            Step::Role => self.role.map(Role::as_str),
            Step::TeamSize => self.team_size.map(TeamSize::as_str),
            Step::Urgency => self.urgency.map(Urgency::as_str),
            Step::TechnicalComfort => self.technical_comfort.map(TechnicalComfort::as_str),
            Step::Discovery => self.discovery_source.map(DiscoverySource::as_str),
            Step::Priorities => self.priority.map(Priority::as_str),
            Step::Identity | Step::Intent | Step::Review => None,
        }
    }

    /// Build the completed profile, stamped with `now`.
    ///
    /// # Errors
    ///
    /// Returns `OnboardingError::Incomplete` naming the first step without a
    /// usable answer.
    pub fn to_profile(&self, now: DateTime<Utc>) -> Result<OnboardingProfile, OnboardingError> {
        let missing = |step| OnboardingError::Incomplete { step };

        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            return Err(missing(Step::Identity));
        }
        let username = Username::parse(&self.username).map_err(|_| missing(Step::Identity))?;
        let role = self.role.ok_or_else(|| missing(Step::Role))?;
        let team_size = self.team_size.ok_or_else(|| missing(Step::TeamSize))?;
        if self.intent.is_empty() {
            return Err(missing(Step::Intent));
        }

        Ok(OnboardingProfile {
            full_name: full_name.to_string(),
            username,
            role,
            team_size,
            intent: self.intent.clone(),
            urgency: self.urgency.ok_or_else(|| missing(Step::Urgency))?,
            technical_comfort: self
                .technical_comfort
                .ok_or_else(|| missing(Step::TechnicalComfort))?,
            discovery_source: self
                .discovery_source
                .ok_or_else(|| missing(Step::Discovery))?,
            priority: self.priority.ok_or_else(|| missing(Step::Priorities))?,
            onboarding_complete: true,
            updated_at: now,
        })
    }
}

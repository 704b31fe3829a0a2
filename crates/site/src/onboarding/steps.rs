//! The nine wizard steps.

use core::fmt;

/// How a step collects its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Full name and username.
    Identity,
    /// One option; selecting it advances.
    SingleChoice,
    /// Up to three options; no auto-advance.
    MultiChoice,
    /// Summary and finish.
    Review,
}

/// A wizard step, numbered 1 to 9.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    #[default]
    Identity = 1,
    Role = 2,
    TeamSize = 3,
    Intent = 4,
    Urgency = 5,
    TechnicalComfort = 6,
    Discovery = 7,
    Priorities = 8,
    Review = 9,
}

impl Step {
    pub const FIRST: Self = Self::Identity;
    pub const LAST: Self = Self::Review;

    /// Every step in order.
    pub const ALL: [Self; 9] = [
        Self::Identity,
        Self::Role,
        Self::TeamSize,
        Self::Intent,
        Self::Urgency,
        Self::TechnicalComfort,
        Self::Discovery,
        Self::Priorities,
        Self::Review,
    ];

    /// 1-based step number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    #[must_use]
    pub const fn kind(self) -> StepKind {
        match self {
            Self::Identity => StepKind::Identity,
            Self::Intent => StepKind::MultiChoice,
            Self::Review => StepKind::Review,
            Self::Role
            | Self::TeamSize
            | Self::Urgency
            | Self::TechnicalComfort
            | Self::Discovery
            | Self::Priorities => StepKind::SingleChoice,
        }
    }

    /// Heading shown above the step.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Identity => "Who are you?",
            Self::Role => "What do you do?",
            Self::TeamSize => "How big is your team?",
            Self::Intent => "What brings you here?",
            Self::Urgency => "How soon do you need it?",
            Self::TechnicalComfort => "How technical are you?",
            Self::Discovery => "How did you find us?",
            Self::Priorities => "What matters most?",
            Self::Review => "Review your answers",
        }
    }

    /// Short name used in summaries and errors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Role => "role",
            Self::TeamSize => "team size",
            Self::Intent => "intent",
            Self::Urgency => "urgency",
            Self::TechnicalComfort => "technical comfort",
            Self::Discovery => "discovery",
            Self::Priorities => "priorities",
            Self::Review => "review",
        }
    }

    /// The following step, clamped at the last.
    #[must_use]
    pub fn next(self) -> Self {
        Self::from_number(self.number() + 1).unwrap_or(Self::LAST)
    }

    /// The preceding step, clamped at the first.
    #[must_use]
    pub fn prev(self) -> Self {
        self.number()
            .checked_sub(1)
            .and_then(Self::from_number)
            .unwrap_or(Self::FIRST)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//! Onboarding profile and its choice enums.
//!
//! The string keys are what gets persisted to the document store; labels are
//! what the wizard shows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::username::Username;

/// Maximum number of intent tags a profile may carry.
pub const MAX_INTENTS: usize = 3;

/// Error returned when a string does not name a known choice.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} option: {value}")]
pub struct UnknownChoice {
    /// The choice type that was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Macro to define a closed set of wizard options.
///
/// Each variant gets a persisted key and a display label. Generates
/// `ALL`, `as_str()`, `label()`, `Display` and `FromStr`.
macro_rules! define_choice {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => ($key:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl $name {
            /// Every option, in display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The persisted key.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                }
            }

            /// Human-readable label.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($key => Ok(Self::$variant),)+
                    other => Err(UnknownChoice {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

define_choice! {
    /// What the user does.
    Role, "role" {
        Founder => ("founder", "Founder / executive"),
        Engineer => ("engineer", "Engineer"),
        Researcher => ("researcher", "Researcher"),
        Product => ("product", "Product / design"),
        Operations => ("operations", "Operations"),
        Other => ("other", "Something else"),
    }
}

define_choice! {
    /// Size of the user's team.
    TeamSize, "team size" {
        Solo => ("solo", "Just me"),
        Small => ("2-10", "2-10"),
        Medium => ("11-50", "11-50"),
        Large => ("51-200", "51-200"),
        Enterprise => ("200+", "200+"),
    }
}

define_choice! {
    /// Why the user is here. Up to [`MAX_INTENTS`] may be selected.
    Intent, "intent" {
        BuildAgents => ("build_agents", "Build agents"),
        CoordinateAgents => ("coordinate_agents", "Coordinate agent systems"),
        Research => ("research", "Follow the research"),
        AutomateWorkflows => ("automate_workflows", "Automate workflows"),
        Evaluate => ("evaluate", "Evaluate agent reliability"),
        Explore => ("explore", "Just exploring"),
    }
}

define_choice! {
    /// How soon the user needs something working.
    Urgency, "urgency" {
        Exploring => ("exploring", "No rush, exploring"),
        ThisQuarter => ("this_quarter", "This quarter"),
        ThisMonth => ("this_month", "This month"),
        Immediately => ("immediately", "Right now"),
    }
}

define_choice! {
    /// Self-reported technical comfort.
    TechnicalComfort, "technical comfort" {
        NonTechnical => ("non_technical", "Not technical"),
        SomeCode => ("some_code", "I can read some code"),
        Developer => ("developer", "I write code daily"),
        Expert => ("expert", "I build distributed systems"),
    }
}

define_choice! {
    /// Where the user heard about A2A Labs.
    DiscoverySource, "discovery" {
        Search => ("search", "Search engine"),
        Social => ("social", "Social media"),
        Referral => ("referral", "A friend or colleague"),
        Event => ("event", "Talk or event"),
        Newsletter => ("newsletter", "Newsletter"),
        Other => ("other", "Somewhere else"),
    }
}

define_choice! {
    /// What the user cares about most.
    Priority, "priority" {
        Reliability => ("reliability", "Reliability"),
        Speed => ("speed", "Speed"),
        Cost => ("cost", "Cost"),
        Security => ("security", "Security"),
        Autonomy => ("autonomy", "Autonomy"),
    }
}

/// A completed onboarding profile as stored in the `users` collection.
///
/// Field names are camelCase on the wire; the discovery source is stored
/// under `discovery`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingProfile {
    pub full_name: String,
    pub username: Username,
    pub role: Role,
    pub team_size: TeamSize,
    pub intent: Vec<Intent>,
    pub urgency: Urgency,
    pub technical_comfort: TechnicalComfort,
    #[serde(rename = "discovery")]
    pub discovery_source: DiscoverySource,
    pub priority: Priority,
    pub onboarding_complete: bool,
    #[serde(with = "iso8601")]
    pub updated_at: DateTime<Utc>,
}

/// Format a timestamp the way browsers' `toISOString()` does
/// (`2026-01-02T03:04:05.678Z`).
#[must_use]
pub fn to_iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Serde helpers for millisecond ISO-8601 timestamps.
pub mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::to_iso8601(*at))
    }

    /// Deserialize any RFC 3339 timestamp.
    ///
    /// # Errors
    ///
    /// Fails if the string is not RFC 3339.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

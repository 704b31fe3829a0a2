//! Onboarding wizard.
//!
//! Nine fixed steps collect a profile; the final step merges it onto the
//! user's document. Wizard state is per user and lives in [`WizardStore`]
//! until the profile is saved.

mod draft;
mod steps;
mod store;
mod wizard;

pub use draft::{ProfileDraft, Selection};
pub use steps::{Step, StepKind};
pub use store::{SharedWizard, WizardStore};
pub use wizard::{Availability, AvailabilityCheck, IntentToggle, WizardState};

use std::sync::Arc;

use thiserror::Error;

use a2a_labs_core::UnknownChoice;

use crate::documents::DocumentError;

/// Errors raised by wizard operations.
#[derive(Debug, Error)]
pub enum OnboardingError {
    /// The submitted value isn't one of the step's options.
    #[error(transparent)]
    UnknownChoice(#[from] UnknownChoice),

    /// A selection was submitted for a step that doesn't take one.
    #[error("step {step} does not take that selection")]
    WrongStep { step: u8 },

    /// The username is already stored and can't change.
    #[error("your username is already set and can't be changed")]
    UsernameLocked,

    /// A required answer is missing.
    #[error("the {step} step still needs an answer")]
    Incomplete { step: Step },

    /// Loading stored profile data failed.
    #[error("failed to load onboarding state: {0}")]
    Load(#[source] Arc<DocumentError>),
}

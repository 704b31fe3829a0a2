//! Onboarding wizard route handlers.
//!
//! Every action mutates the user's [`WizardState`] and redirects back to
//! `GET /onboarding`, which renders the current step. The username field
//! also polls `GET /onboarding/username` for an availability fragment.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use a2a_labs_core::{
    DiscoverySource, Intent, MAX_INTENTS, Priority, Role, TeamSize, TechnicalComfort, UserId,
    Urgency, Username,
};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::guard::{HOME_PATH, ONBOARDING_PATH};
use crate::middleware::{Flash, Flashes, RequireAuth, push_flash};
use crate::models::{CurrentUser, session_keys};
use crate::onboarding::{
    IntentToggle, OnboardingError, ProfileDraft, Selection, SharedWizard, Step, StepKind,
    WizardState,
};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Step 1 form data.
#[derive(Debug, Deserialize)]
pub struct IdentityForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub username: String,
    /// Present when the Continue button submitted the form.
    pub advance: Option<String>,
}

/// Username availability query.
#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    #[serde(default)]
    pub username: String,
}

/// Single-choice form data.
#[derive(Debug, Deserialize)]
pub struct SelectForm {
    pub value: String,
}

/// Intent toggle form data.
#[derive(Debug, Deserialize)]
pub struct IntentForm {
    pub intent: String,
}

// =============================================================================
// View Types
// =============================================================================

/// An option button on a choice step.
pub struct ChoiceOption {
    pub key: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// A line of the review summary.
pub struct SummaryRow {
    pub step: u8,
    pub label: &'static str,
    pub value: String,
}

/// Wizard page template.
#[derive(Template, WebTemplate)]
#[template(path = "onboarding/wizard.html")]
pub struct WizardTemplate {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub step: u8,
    pub total_steps: u8,
    pub progress_percent: u16,
    pub title: &'static str,
    /// `identity`, `single`, `multi` or `review`.
    pub kind: &'static str,
    pub full_name: String,
    pub username: String,
    pub username_locked: bool,
    pub username_too_long: bool,
    pub max_username_length: usize,
    pub availability: &'static str,
    pub generation: u64,
    pub options: Vec<ChoiceOption>,
    pub selected_count: usize,
    pub max_intents: usize,
    pub summary: Vec<SummaryRow>,
    pub can_continue: bool,
    pub is_first: bool,
}

/// Username availability fragment.
#[derive(Template, WebTemplate)]
#[template(path = "onboarding/username.html")]
pub struct UsernameFragment {
    pub username: String,
    pub availability: &'static str,
    pub generation: u64,
    pub locked: bool,
    pub too_long: bool,
    pub max_length: usize,
}

impl WizardTemplate {
    fn build(wizard: &WizardState, user: CurrentUser, flashes: Vec<Flash>) -> Self {
        let step = wizard.step();
        let draft = wizard.draft();

        let kind = match step.kind() {
            StepKind::Identity => "identity",
            StepKind::SingleChoice => "single",
            StepKind::MultiChoice => "multi",
            StepKind::Review => "review",
        };
        let options = match step.kind() {
            StepKind::SingleChoice => single_choice_options(step, draft),
            StepKind::MultiChoice => intent_options(draft),
            StepKind::Identity | StepKind::Review => Vec::new(),
        };
        let summary = if step == Step::Review {
            summary(draft)
        } else {
            Vec::new()
        };
        let total = Step::LAST.number();

        Self {
            user: Some(user),
            flashes,
            step: step.number(),
            total_steps: total,
            progress_percent: u16::from(step.number()) * 100 / u16::from(total),
            title: step.title(),
            kind,
            full_name: draft.full_name.clone(),
            username: draft.username.clone(),
            username_locked: wizard.username_locked(),
            username_too_long: draft.username.len() > Username::MAX_LENGTH,
            max_username_length: Username::MAX_LENGTH,
            availability: wizard.availability().as_str(),
            generation: wizard.generation(),
            options,
            selected_count: draft.intent.len(),
            max_intents: MAX_INTENTS,
            summary,
            can_continue: wizard.is_step_valid(step),
            is_first: step == Step::FIRST,
        }
    }
}

macro_rules! choice_options {
    ($ty:ty, $current:expr) => {
        <$ty>::ALL
            .iter()
            .map(|choice| ChoiceOption {
                key: choice.as_str(),
                label: choice.label(),
                selected: $current == Some(*choice),
            })
            .collect()
    };
}

fn single_choice_options(step: Step, draft: &ProfileDraft) -> Vec<ChoiceOption> {
    match step {
        Step::Role => choice_options!(Role, draft.role),
        Step::TeamSize => choice_options!(TeamSize, draft.team_size),
        Step::Urgency => choice_options!(Urgency, draft.urgency),
        Step::TechnicalComfort => choice_options!(TechnicalComfort, draft.technical_comfort),
        Step::Discovery => choice_options!(DiscoverySource, draft.discovery_source),
        Step::Priorities => choice_options!(Priority, draft.priority),
        Step::Identity | Step::Intent | Step::Review => Vec::new(),
    }
}

fn intent_options(draft: &ProfileDraft) -> Vec<ChoiceOption> {
    Intent::ALL
        .iter()
        .map(|intent| ChoiceOption {
            key: intent.as_str(),
            label: intent.label(),
            selected: draft.intent.contains(intent),
        })
        .collect()
}

fn summary(draft: &ProfileDraft) -> Vec<SummaryRow> {
    fn label_of<T: Copy>(value: Option<T>, label: fn(T) -> &'static str) -> String {
        value.map_or_else(|| "Not answered".to_string(), |v| label(v).to_string())
    }

    let intents = if draft.intent.is_empty() {
        "Not answered".to_string()
    } else {
        draft
            .intent
            .iter()
            .map(|i| i.label())
            .collect::<Vec<_>>()
            .join(", ")
    };

    vec![
        SummaryRow {
            step: Step::Identity.number(),
            label: "Name",
            value: draft.full_name.clone(),
        },
        SummaryRow {
            step: Step::Identity.number(),
            label: "Username",
            value: format!("@{}", draft.username),
        },
        SummaryRow {
            step: Step::Role.number(),
            label: "Role",
            value: label_of(draft.role, Role::label),
        },
        SummaryRow {
            step: Step::TeamSize.number(),
            label: "Team size",
            value: label_of(draft.team_size, TeamSize::label),
        },
        SummaryRow {
            step: Step::Intent.number(),
            label: "Interested in",
            value: intents,
        },
        SummaryRow {
            step: Step::Urgency.number(),
            label: "Timeline",
            value: label_of(draft.urgency, Urgency::label),
        },
        SummaryRow {
            step: Step::TechnicalComfort.number(),
            label: "Technical comfort",
            value: label_of(draft.technical_comfort, TechnicalComfort::label),
        },
        SummaryRow {
            step: Step::Discovery.number(),
            label: "Found us via",
            value: label_of(draft.discovery_source, DiscoverySource::label),
        },
        SummaryRow {
            step: Step::Priorities.number(),
            label: "Top priority",
            value: label_of(draft.priority, Priority::label),
        },
    ]
}

// =============================================================================
// Helpers
// =============================================================================

/// The user's wizard, resumed from their stored document on first use.
async fn load_wizard(state: &AppState, user: &CurrentUser) -> Result<SharedWizard> {
    let wizard = state
        .wizards()
        .get_or_init(&user.id, async {
            let stored = state.profiles().stored(&user.id).await?;
            Ok(WizardState::resume(&stored, user.display_name.as_deref()))
        })
        .await?;
    Ok(wizard)
}

/// Record username input and run its availability check.
///
/// The wizard lock is released while the store is queried; a result that
/// arrives after a newer edit is discarded by the wizard.
async fn update_username(
    state: &AppState,
    user_id: &UserId,
    wizard: &SharedWizard,
    raw: &str,
) -> std::result::Result<(), OnboardingError> {
    let check = wizard.lock().await.set_username(raw)?;
    let Some(check) = check else {
        return Ok(());
    };

    match state
        .profiles()
        .is_username_available(user_id, &check.username)
        .await
    {
        Ok(available) => {
            if !wizard.lock().await.resolve_availability(&check, available) {
                tracing::debug!(generation = check.generation, "Discarded stale availability result");
            }
        }
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "Username availability check failed");
            wizard.lock().await.availability_failed(&check);
        }
    }
    Ok(())
}

fn back_to_wizard() -> Response {
    Redirect::to(ONBOARDING_PATH).into_response()
}

// =============================================================================
// Routes
// =============================================================================

/// Render the current step.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Flashes(flashes): Flashes,
) -> Result<Response> {
    let wizard = load_wizard(&state, &user).await?;
    let page = {
        let wizard = wizard.lock().await;
        WizardTemplate::build(&wizard, user, flashes)
    };
    Ok(page.into_response())
}

/// Save step 1 answers; advance when the Continue button was used.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn identity(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<IdentityForm>,
) -> Result<Response> {
    let wizard = load_wizard(&state, &user).await?;
    wizard.lock().await.set_full_name(&form.full_name);

    if let Err(e) = update_username(&state, &user.id, &wizard, &form.username).await {
        push_flash(&session, Flash::error(e.to_string())).await;
        return Ok(back_to_wizard());
    }

    if form.advance.is_some() {
        let mut wizard = wizard.lock().await;
        if wizard.step() == Step::Identity && !wizard.advance() {
            push_flash(
                &session,
                Flash::error("Enter your name and pick an available username to continue."),
            )
            .await;
        }
    }
    Ok(back_to_wizard())
}

/// Username availability fragment, polled while typing.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn username(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<UsernameQuery>,
) -> Result<Response> {
    let wizard = load_wizard(&state, &user).await?;
    let locked = match update_username(&state, &user.id, &wizard, &query.username).await {
        Ok(()) => false,
        Err(OnboardingError::UsernameLocked) => true,
        Err(e) => return Err(e.into()),
    };

    let wizard = wizard.lock().await;
    let username = wizard.draft().username.clone();
    Ok(UsernameFragment {
        too_long: username.len() > Username::MAX_LENGTH,
        max_length: Username::MAX_LENGTH,
        username,
        availability: wizard.availability().as_str(),
        generation: wizard.generation(),
        locked: locked || wizard.username_locked(),
    }
    .into_response())
}

/// Store a single-choice answer and move to the next step.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn select(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<SelectForm>,
) -> Result<Response> {
    let wizard = load_wizard(&state, &user).await?;
    let mut wizard = wizard.lock().await;

    let outcome = Selection::parse(wizard.step(), &form.value).and_then(|s| wizard.select(s));
    match outcome {
        Ok(()) => {
            let step = wizard.step().number().to_string();
            add_breadcrumb("onboarding", "Answered step", Some(&[("next_step", step.as_str())]));
        }
        Err(e) => push_flash(&session, Flash::error(e.to_string())).await,
    }
    Ok(back_to_wizard())
}

/// Toggle an intent tag on step 4.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn intent(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<IntentForm>,
) -> Result<Response> {
    let intent: Intent = match form.intent.parse() {
        Ok(intent) => intent,
        Err(e) => {
            push_flash(&session, Flash::error(OnboardingError::from(e).to_string())).await;
            return Ok(back_to_wizard());
        }
    };

    let wizard = load_wizard(&state, &user).await?;
    let mut wizard = wizard.lock().await;
    if wizard.step() != Step::Intent {
        return Ok(back_to_wizard());
    }
    if wizard.toggle_intent(intent) == IntentToggle::Ignored {
        push_flash(
            &session,
            Flash::info(format!("You can pick up to {MAX_INTENTS}.")),
        )
        .await;
    }
    Ok(back_to_wizard())
}

/// Continue: advance when the current step is valid.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn next(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let wizard = load_wizard(&state, &user).await?;
    let mut wizard = wizard.lock().await;
    if wizard.step() != Step::LAST && !wizard.advance() {
        push_flash(&session, Flash::error("Please complete this step first.")).await;
    }
    Ok(back_to_wizard())
}

/// Back: previous step, answers kept.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn back(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Response> {
    let wizard = load_wizard(&state, &user).await?;
    wizard.lock().await.prev_step();
    Ok(back_to_wizard())
}

/// Finish: merge the profile onto the user's document.
///
/// On success the wizard is discarded and the visitor lands on the home
/// page. On failure the wizard stays on the review step for a retry.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn finish(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let wizard = load_wizard(&state, &user).await?;
    let mut locked = wizard.lock().await;
    if locked.step() != Step::Review {
        return Ok(back_to_wizard());
    }

    let profile = match locked.build_profile(Utc::now()) {
        Ok(profile) => profile,
        Err(OnboardingError::Incomplete { step }) => {
            locked.return_to(step);
            push_flash(
                &session,
                Flash::error(format!("Please answer the {step} step before finishing.")),
            )
            .await;
            return Ok(back_to_wizard());
        }
        Err(e) => return Err(AppError::Onboarding(e)),
    };

    if let Err(e) = state.profiles().finish(&user.id, &profile).await {
        tracing::error!(user_id = %user.id, error = %e, "Failed to save onboarding profile");
        sentry::capture_error(&e);
        push_flash(
            &session,
            Flash::error("We couldn't save your profile. Please try again."),
        )
        .await;
        return Ok(back_to_wizard());
    }
    drop(locked);

    state.wizards().discard(&user.id).await;
    if let Err(e) = session.insert(session_keys::ONBOARDING_COMPLETE, true).await {
        tracing::warn!(error = %e, "Failed to cache onboarding status");
    }
    add_breadcrumb("onboarding", "Completed onboarding", None);
    push_flash(&session, Flash::success("Onboarding complete!")).await;
    Ok(Redirect::to(HOME_PATH).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn user() -> CurrentUser {
        let now = Utc::now();
        CurrentUser {
            id: UserId::new("user-1"),
            email: None,
            display_name: Some("Ada".to_string()),
            signed_in_at: now,
            expires_at: now + Duration::days(30),
        }
    }

    #[test]
    fn test_view_for_single_choice_step_marks_selection() {
        let mut wizard = WizardState::new();
        wizard.next_step();
        wizard.select(Selection::Role(Role::Researcher)).unwrap();
        wizard.prev_step();

        let view = WizardTemplate::build(&wizard, user(), Vec::new());
        assert_eq!(view.step, 2);
        assert_eq!(view.kind, "single");
        assert_eq!(view.options.len(), Role::ALL.len());
        let selected: Vec<&str> = view
            .options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.key)
            .collect();
        assert_eq!(selected, vec!["researcher"]);
        assert!(view.can_continue);
    }

    #[test]
    fn test_view_for_review_lists_every_answer() {
        let mut wizard = WizardState::new();
        for _ in 0..8 {
            wizard.next_step();
        }
        let view = WizardTemplate::build(&wizard, user(), Vec::new());
        assert_eq!(view.kind, "review");
        assert_eq!(view.progress_percent, 100);
        assert_eq!(view.summary.len(), 9);
        assert_eq!(view.summary[2].value, "Not answered");
        assert!(!view.can_continue);
    }

    #[test]
    fn test_intent_view_counts_selection() {
        let mut wizard = WizardState::new();
        for _ in 0..3 {
            wizard.next_step();
        }
        wizard.toggle_intent(Intent::Research);
        let view = WizardTemplate::build(&wizard, user(), Vec::new());
        assert_eq!(view.kind, "multi");
        assert_eq!(view.selected_count, 1);
        assert_eq!(view.max_intents, 3);
    }
}

//! Landing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::filters;
use crate::middleware::{Flash, Flashes, OptionalAuth};
use crate::models::CurrentUser;

// =============================================================================
// Landing Content
// =============================================================================

/// A text section of the landing page.
pub struct Section {
    /// Anchor targeted by the header navigation.
    pub anchor: &'static str,
    pub heading: &'static str,
    /// Second, dimmed heading line.
    pub echo: Option<&'static str>,
    pub lead: &'static str,
    pub points: &'static [&'static str],
    pub closing: &'static [&'static str],
    /// Whether a decorative panel sits beside the text.
    pub with_panel: bool,
}

/// Sections below the hero, in page order.
pub const SECTIONS: &[Section] = &[
    Section {
        anchor: "research",
        heading: "A2A Labs explores agent-native intelligence.",
        echo: None,
        lead: "We design systems where autonomous agents:",
        points: &[
            "reason independently",
            "communicate with other agents",
            "negotiate goals",
            "execute without constant human input",
        ],
        closing: &["This is not automation.", "This is coordination."],
        with_panel: false,
    },
    Section {
        anchor: "systems",
        heading: "Agent-to-agent systems require new primitives.",
        echo: None,
        lead: "We work on:",
        points: &[
            "communication protocols",
            "memory sharing",
            "delegation logic",
            "emergent behavior",
        ],
        closing: &["Designed for scale.", "Designed for autonomy."],
        with_panel: true,
    },
    Section {
        anchor: "philosophy",
        heading: "Interfaces are temporary.",
        echo: Some("Systems endure."),
        lead: "We believe intelligence should:",
        points: &[
            "operate quietly",
            "adapt continuously",
            "improve without prompting",
        ],
        closing: &["A2A Labs builds what runs underneath."],
        with_panel: false,
    },
];

/// Contact address shown in the footer.
pub const CONTACT_EMAIL: &str = "contact@a2alabs.xyz";

// =============================================================================
// Templates
// =============================================================================

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub sections: &'static [Section],
    pub contact_email: &'static str,
}

// =============================================================================
// Routes
// =============================================================================

/// Display the landing page.
#[instrument(skip_all)]
pub async fn home(OptionalAuth(user): OptionalAuth, Flashes(flashes): Flashes) -> impl IntoResponse {
    HomeTemplate {
        user,
        flashes,
        sections: SECTIONS,
        contact_email: CONTACT_EMAIL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_anchors_exist() {
        let anchors: Vec<&str> = SECTIONS.iter().map(|s| s.anchor).collect();
        assert!(anchors.contains(&"systems"));
        assert!(anchors.contains(&"research"));
    }
}

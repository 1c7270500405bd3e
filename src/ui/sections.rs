use crate::models::FlagState;
use crate::models::flags::{BETA_TOOLS_BANNER, FEEDBACK_FORM, NEWSLETTER_FORM};
use crate::state::FlagReader;

/// Where leads can still write when the feedback form is switched off
pub const SUPPORT_EMAIL: &str = "support@prostokit.io";

/// Page sections whose presence is controlled by a feature flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandingSection {
    BetaToolsBanner,
    NewsletterForm,
    FeedbackForm,
}

impl LandingSection {
    pub const ALL: [LandingSection; 3] = [
        LandingSection::BetaToolsBanner,
        LandingSection::NewsletterForm,
        LandingSection::FeedbackForm,
    ];

    /// The flag that gates this section
    pub fn flag(&self) -> &'static str {
        match self {
            LandingSection::BetaToolsBanner => BETA_TOOLS_BANNER,
            LandingSection::NewsletterForm => NEWSLETTER_FORM,
            LandingSection::FeedbackForm => FEEDBACK_FORM,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            LandingSection::BetaToolsBanner => "Beta: batch file compression",
            LandingSection::NewsletterForm => "Subscribe to updates",
            LandingSection::FeedbackForm => "Tell us about your task",
        }
    }
}

/// How a section renders in the current pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionView {
    Shown,

    /// Section is switched off and simply left out
    Hidden,

    /// Section is switched off and flags are still loading
    Placeholder,

    /// Section is switched off; a static notice takes its place
    Disabled { notice: String },
}

/// Decide how `section` renders from a single state snapshot
pub fn render_section(state: &FlagState, section: LandingSection) -> SectionView {
    if state.is_enabled(section.flag()) {
        return SectionView::Shown;
    }

    match section {
        LandingSection::BetaToolsBanner => SectionView::Hidden,
        _ if state.is_loading => SectionView::Placeholder,
        LandingSection::NewsletterForm => SectionView::Disabled {
            notice: format!(
                "Newsletter signup is paused. Enable the {} flag to collect leads again.",
                NEWSLETTER_FORM
            ),
        },
        LandingSection::FeedbackForm => SectionView::Disabled {
            notice: format!(
                "We still accept requests at {}. The form comes back as soon as the {} flag is enabled.",
                SUPPORT_EMAIL, FEEDBACK_FORM
            ),
        },
    }
}

/// Sections whose flag is currently on
pub fn visible_sections<R: FlagReader + ?Sized>(reader: &R) -> Vec<LandingSection> {
    LandingSection::ALL
        .into_iter()
        .filter(|section| reader.is_enabled(section.flag()))
        .collect()
}

// UI module - consumers of the flag state
//
// Nothing here writes flag state directly. Every render pass reads the
// provider (or one snapshot of it) afresh.
//
// - banner: flag status line with retry affordance
// - sections: flag-gated landing page sections
// - forms: newsletter and feedback controllers
// - watcher: re-render on flag change events, periodic reloads

pub mod banner;
pub mod forms;
pub mod sections;
pub mod watcher;

pub use banner::StatusBanner;
pub use forms::{FeedbackController, NewsletterController};
pub use sections::{LandingSection, SUPPORT_EMAIL, SectionView, render_section, visible_sections};
pub use watcher::{reload_every, spawn_banner_watcher};

//! Landing page renderer.
//!
//! The page is a pure function of the static content in this module: the
//! three feature records, the three overview steps and the anchor/contact
//! constants. Rendering goes through the compiled `templates/landing.html`
//! askama template and is byte-identical across calls.

use askama::Template;

use crate::Result;

/// Identifier of the "how it works" section targeted by `#overview`
pub const OVERVIEW_ANCHOR: &str = "overview";

/// Identifier of the feature grid section targeted by `#features`
pub const FEATURES_ANCHOR: &str = "features";

/// Target of the "Contact the team" link
pub const CONTACT_HREF: &str = "mailto:team@gitslice.dev";

/// Document `<title>`
pub const PAGE_TITLE: &str = "Git Slice | Slice-based workflows";

/// A (title, description) pair rendered in the feature grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub title: &'static str,
    pub description: &'static str,
}

/// A numbered step in the overview section. The number is the 1-based
/// position in [`overview_steps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverviewStep {
    pub title: &'static str,
    pub description: &'static str,
}

const FEATURES: [Feature; 3] = [
    Feature {
        title: "Speed",
        description: "Slice only what you need, reuse the rest. Move from idea to review faster with focused diffs and reproducible runs.",
    },
    Feature {
        title: "Safety",
        description: "Keep changes isolated. Guardrails make it easy to test, share, and roll back without risking the rest of your repo.",
    },
    Feature {
        title: "Tooling",
        description: "First-class CLI and services for orchestrating slices, automations, and integrations with your existing workflows.",
    },
];

const OVERVIEW_STEPS: [OverviewStep; 3] = [
    OverviewStep {
        title: "Carve out the slice",
        description: "Pin the exact files and services you need. Spin up environments that mirror production with minimal setup.",
    },
    OverviewStep {
        title: "Iterate quickly",
        description: "Use the CLI to run tests, preview changes, and share the slice URL so reviewers can validate updates in minutes.",
    },
    OverviewStep {
        title: "Merge with confidence",
        description: "Every slice comes with reproducible logs, checks, and diffs so merging back is predictable and low-risk.",
    },
];

/// The fixed, ordered feature list: Speed, Safety, Tooling.
pub fn features() -> &'static [Feature] {
    &FEATURES
}

/// The three overview steps in display order.
pub fn overview_steps() -> &'static [OverviewStep] {
    &OVERVIEW_STEPS
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate<'a> {
    title: &'a str,
    features: &'a [Feature],
    steps: &'a [OverviewStep],
    overview_anchor: &'a str,
    features_anchor: &'a str,
    contact_href: &'a str,
}

/// Render the complete landing page document.
///
/// Feature entries are keyed by title (`data-key`); titles are not checked
/// for uniqueness.
pub fn render_page() -> Result<String> {
    let template = LandingTemplate {
        title: PAGE_TITLE,
        features: features(),
        steps: overview_steps(),
        overview_anchor: OVERVIEW_ANCHOR,
        features_anchor: FEATURES_ANCHOR,
        contact_href: CONTACT_HREF,
    };
    let html = template.render()?;
    log::debug!("rendered landing page ({} bytes)", html.len());
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn parse() -> Html {
        Html::parse_document(&render_page().expect("render"))
    }

    #[test]
    fn features_are_fixed_and_ordered() {
        let titles: Vec<_> = features().iter().map(|f| f.title).collect();
        assert_eq!(titles, ["Speed", "Safety", "Tooling"]);
    }

    #[test]
    fn feature_grid_renders_three_entries_in_order() {
        let doc = parse();
        let sel = Selector::parse("#features .feature-grid .feature h3").unwrap();
        let titles: Vec<String> = doc.select(&sel).map(|h| h.text().collect()).collect();
        assert_eq!(titles, vec!["Speed", "Safety", "Tooling"]);

        let keys = Selector::parse(".feature[data-key]").unwrap();
        assert_eq!(doc.select(&keys).count(), 3);
    }

    #[test]
    fn headline_mentions_slice_based_workflows() {
        let doc = parse();
        let h1 = Selector::parse("h1").unwrap();
        let headings: Vec<String> = doc.select(&h1).map(|h| h.text().collect()).collect();
        assert_eq!(headings.len(), 1);
        assert!(headings[0].to_lowercase().contains("slice-based workflows"));
    }

    #[test]
    fn steps_are_numbered_from_one() {
        let doc = parse();
        let sel = Selector::parse("#overview .step-number").unwrap();
        let numbers: Vec<String> = doc.select(&sel).map(|n| n.text().collect()).collect();
        assert_eq!(numbers, vec!["1", "2", "3"]);
    }

    #[test]
    fn cta_links_point_at_anchors() {
        let doc = parse();
        let sel = Selector::parse(".cta-row a").unwrap();
        let hrefs: Vec<_> = doc
            .select(&sel)
            .filter_map(|a| a.value().attr("href"))
            .collect();
        assert_eq!(hrefs, vec!["#features", "#overview"]);
    }

    #[test]
    fn contact_link_is_mailto() {
        let doc = parse();
        let sel = Selector::parse("section.cta a").unwrap();
        let a = doc.select(&sel).next().expect("contact link");
        assert_eq!(a.value().attr("href"), Some("mailto:team@gitslice.dev"));
        assert_eq!(a.text().collect::<String>(), "Contact the team");
    }

    #[test]
    fn sections_appear_in_order() {
        let doc = parse();
        let sel = Selector::parse(".page > *").unwrap();
        let order: Vec<String> = doc
            .select(&sel)
            .map(|e| {
                e.value()
                    .id()
                    .map(str::to_string)
                    .unwrap_or_else(|| e.value().name().to_string())
            })
            .collect();
        assert_eq!(order, vec!["header", "overview", "features", "section", "footer"]);
    }

    #[test]
    fn render_is_idempotent() {
        let a = render_page().unwrap();
        let b = render_page().unwrap();
        assert_eq!(a, b);
    }
}

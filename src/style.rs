//! Visibility model: which elements of a parsed document would be rendered.
//!
//! There is no layout engine here. An element counts as visible when no
//! element on its ancestor chain is hidden by markup (`hidden`, non-rendered
//! containers), by an inline `style`, or by a stylesheet rule, and the
//! element itself has something to show.

use scraper::{ElementRef, Html, Selector};

/// Selectors from stylesheet rules that hide what they match
#[derive(Debug, Default, Clone)]
pub struct HidingRules {
    selectors: Vec<Selector>,
}

impl HidingRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect hiding rules from every inline `<style>` block of `document`.
    pub fn from_document(document: &Html) -> Self {
        let mut rules = Self::new();
        if let Ok(style_sel) = Selector::parse("style") {
            for node in document.select(&style_sel) {
                let css = node.text().collect::<String>();
                if !css.trim().is_empty() {
                    rules.add_stylesheet(&css);
                }
            }
        }
        rules
    }

    /// Add the hiding rules of one stylesheet. Selectors scraper cannot
    /// parse (pseudo-elements, unsupported pseudo-classes) are skipped.
    pub fn add_stylesheet(&mut self, css: &str) {
        for raw in hiding_selectors(css) {
            match Selector::parse(&raw) {
                Ok(sel) => self.selectors.push(sel),
                Err(_) => log::debug!("skipping unsupported selector {:?}", raw),
            }
        }
    }

    /// Whether a rule hides `el` itself (ancestors are not considered)
    pub fn hides(&self, el: &ElementRef<'_>) -> bool {
        self.selectors.iter().any(|s| s.matches(el))
    }
}

/// Whether `el` would be rendered, given the document's hiding rules.
pub fn is_visible(el: ElementRef<'_>, rules: &HidingRules) -> bool {
    let chain = std::iter::once(el).chain(el.ancestors().filter_map(ElementRef::wrap));
    for node in chain {
        let value = node.value();
        if matches!(
            value.name(),
            "head" | "script" | "style" | "template" | "noscript" | "title" | "meta" | "link"
        ) {
            return false;
        }
        if value.attr("hidden").is_some() {
            return false;
        }
        if value.attr("style").map_or(false, declares_hidden) {
            return false;
        }
        if rules.hides(&node) {
            return false;
        }
    }
    has_box(el)
}

// An element with neither text nor child elements renders an empty box
fn has_box(el: ElementRef<'_>) -> bool {
    el.text().any(|t| !t.trim().is_empty()) || el.children().any(|c| c.value().is_element())
}

/// Whether a declaration block sets `display: none` or hides visibility.
pub fn declares_hidden(declarations: &str) -> bool {
    declarations.split(';').any(|decl| {
        let Some((prop, value)) = decl.split_once(':') else {
            return false;
        };
        let prop = prop.trim().to_ascii_lowercase();
        let value = value
            .trim()
            .trim_end_matches("!important")
            .trim()
            .to_ascii_lowercase();
        (prop == "display" && value == "none")
            || (prop == "visibility" && (value == "hidden" || value == "collapse"))
    })
}

/// Selectors of top-level rules whose declarations hide the matched
/// elements. At-rule blocks (`@media`, `@supports`, ...) are skipped.
pub fn hiding_selectors(css: &str) -> Vec<String> {
    let css = strip_comments(css);
    let mut out = Vec::new();
    let mut rest = css.as_str();

    while let Some(open) = rest.find('{') {
        let prelude = rest[..open].trim();
        let after = &rest[open + 1..];
        let Some(close) = matching_brace(after) else {
            break;
        };
        let block = &after[..close];
        rest = &after[close + 1..];

        // `@import url(x);` style statements end up glued to the prelude
        let prelude = prelude.rsplit(';').next().unwrap_or(prelude).trim();
        if prelude.starts_with('@') || prelude.is_empty() {
            continue;
        }
        if declares_hidden(block) {
            out.extend(
                prelude
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }
    }
    out
}

// Offset of the `}` closing a block whose `{` was just consumed
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        let sel = Selector::parse(css).unwrap();
        doc.select(&sel).next().expect("element present")
    }

    #[test]
    fn declarations_that_hide() {
        assert!(declares_hidden("color: red; display: none"));
        assert!(declares_hidden("DISPLAY:NONE !important"));
        assert!(declares_hidden("visibility: hidden;"));
        assert!(!declares_hidden("display: block; visibility: visible"));
        assert!(!declares_hidden("garbage"));
    }

    #[test]
    fn selectors_from_stylesheet_skip_at_rules_and_comments() {
        let css = r#"
            /* .commented { display: none } */
            .a, .b { display: none; }
            .c { color: red }
            @media (max-width: 10px) { .d { display: none } }
            #e { visibility: hidden }
        "#;
        assert_eq!(hiding_selectors(css), vec![".a", ".b", "#e"]);
    }

    #[test]
    fn visibility_follows_ancestor_chain() {
        let doc = Html::parse_document(
            r#"<html><head><style>.gone { display: none }</style></head><body>
                <section id="shown"><p>hi</p></section>
                <section id="attr" hidden><p>hi</p></section>
                <section id="inline" style="display:none"><p id="child">hi</p></section>
                <section id="ruled" class="gone"><p>hi</p></section>
                <section id="empty">   </section>
                <div id="img-only"><img src="x.png"></div>
            </body></html>"#,
        );
        let rules = HidingRules::from_document(&doc);

        assert!(is_visible(first(&doc, "#shown"), &rules));
        assert!(!is_visible(first(&doc, "#attr"), &rules));
        assert!(!is_visible(first(&doc, "#inline"), &rules));
        assert!(!is_visible(first(&doc, "#child"), &rules));
        assert!(!is_visible(first(&doc, "#ruled"), &rules));
        assert!(!is_visible(first(&doc, "#empty"), &rules));
        assert!(is_visible(first(&doc, "#img-only"), &rules));
        assert!(!is_visible(first(&doc, "title, style"), &rules));
    }

    #[test]
    fn unsupported_selectors_are_ignored() {
        let doc = Html::parse_document(r#"<body><p>shown</p><p class="ok">gone</p></body>"#);
        let mut rules = HidingRules::new();
        rules.add_stylesheet("p::before { display: none } .ok { display: none }");
        assert!(is_visible(first(&doc, "p"), &rules));
        assert!(!is_visible(first(&doc, "p.ok"), &rules));
    }
}

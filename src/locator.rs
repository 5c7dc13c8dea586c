//! Element locators modelled on accessibility queries: by role (with
//! heading level and accessible name), by visible text, or by CSS selector.

use std::fmt;

use scraper::{ElementRef, Html, Selector};

use crate::{Error, Result};

/// ARIA roles the check knows how to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Heading,
    Link,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Heading => "heading",
            Role::Link => "link",
        }
    }

    fn from_attr(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "heading" => Some(Role::Heading),
            "link" => Some(Role::Link),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an accessible name or text is compared against the expected value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// Whole normalized string, case-sensitive
    Exact(String),
    /// Case-insensitive substring
    Contains(String),
}

impl NameMatch {
    pub fn exact(value: impl Into<String>) -> Self {
        NameMatch::Exact(value.into())
    }

    pub fn contains(value: impl Into<String>) -> Self {
        NameMatch::Contains(value.into())
    }

    /// Test an already-normalized candidate string
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            NameMatch::Exact(expected) => candidate == normalize_whitespace(expected),
            NameMatch::Contains(needle) => candidate
                .to_lowercase()
                .contains(&normalize_whitespace(needle).to_lowercase()),
        }
    }
}

impl fmt::Display for NameMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMatch::Exact(v) => write!(f, "{:?}", v),
            NameMatch::Contains(v) => write!(f, "/{}/i", v),
        }
    }
}

/// A query resolving to zero or more elements of a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Role {
        role: Role,
        level: Option<u8>,
        name: Option<NameMatch>,
    },
    Text(NameMatch),
    Css(String),
}

impl Locator {
    pub fn heading(level: u8, name: NameMatch) -> Self {
        Locator::Role {
            role: Role::Heading,
            level: Some(level),
            name: Some(name),
        }
    }

    pub fn link(name: NameMatch) -> Self {
        Locator::Role {
            role: Role::Link,
            level: None,
            name: Some(name),
        }
    }

    pub fn text(name: NameMatch) -> Self {
        Locator::Text(name)
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    /// Resolve against `document`, returning matches in document order.
    pub fn resolve<'a>(&self, document: &'a Html) -> Result<Vec<ElementRef<'a>>> {
        match self {
            Locator::Css(css) => {
                let selector = Selector::parse(css)
                    .map_err(|e| Error::ConfigError(format!("invalid selector {:?}: {:?}", css, e)))?;
                Ok(document.select(&selector).collect())
            }
            Locator::Role { role, level, name } => Ok(body_elements(document)
                .filter(|el| match implicit_role(*el) {
                    Some((r, l)) => {
                        r == *role
                            && level.map_or(true, |want| l == Some(want))
                            && name
                                .as_ref()
                                .map_or(true, |m| m.matches(&accessible_name(*el)))
                    }
                    None => false,
                })
                .collect()),
            Locator::Text(matcher) => {
                let hits: Vec<ElementRef<'a>> = body_elements(document)
                    .filter(|el| matcher.matches(&normalized_text(*el)))
                    .collect();
                // Keep only the innermost elements carrying the text
                Ok(hits
                    .iter()
                    .copied()
                    .filter(|el| {
                        !hits.iter().any(|other| {
                            other.id() != el.id() && other.ancestors().any(|a| a.id() == el.id())
                        })
                    })
                    .collect())
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Role { role, level, name } => {
                write!(f, "role={}", role)?;
                if let Some(level) = level {
                    write!(f, "[level={}]", level)?;
                }
                if let Some(name) = name {
                    write!(f, "[name={}]", name)?;
                }
                Ok(())
            }
            Locator::Text(m) => write!(f, "text={}", m),
            Locator::Css(css) => write!(f, "css={}", css),
        }
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalized_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

/// Accessible name: `aria-label` when present, otherwise the element's text
pub fn accessible_name(el: ElementRef<'_>) -> String {
    match el.value().attr("aria-label") {
        Some(label) if !label.trim().is_empty() => normalize_whitespace(label),
        _ => normalized_text(el),
    }
}

/// Role of an element (explicit `role` attribute first) and, for headings,
/// its level.
pub fn implicit_role(el: ElementRef<'_>) -> Option<(Role, Option<u8>)> {
    let tag = el.value().name();
    let aria_level = el
        .value()
        .attr("aria-level")
        .and_then(|l| l.trim().parse::<u8>().ok());

    if let Some(role) = el.value().attr("role").and_then(Role::from_attr) {
        let level = match role {
            Role::Heading => aria_level.or_else(|| heading_level(tag)).or(Some(2)),
            _ => None,
        };
        return Some((role, level));
    }

    if let Some(level) = heading_level(tag) {
        return Some((Role::Heading, aria_level.or(Some(level))));
    }
    match tag {
        "a" | "area" if el.value().attr("href").is_some() => Some((Role::Link, None)),
        _ => None,
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

// Elements under <body>, excluding script-like content, in document order
fn body_elements<'a>(document: &'a Html) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let root = document.root_element();
    let body = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "body")
        .unwrap_or(root);
    body.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| !matches!(e.value().name(), "script" | "style" | "template" | "noscript"))
}

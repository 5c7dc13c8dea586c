//! HeadlessEngine: JavaScript-free backend built on a blocking HTTP client
//! and the scraper DOM.
//!
//! Every query re-parses the stored markup, so the engine holds only owned
//! strings and stays `Send`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::locator::{normalize_whitespace, Locator};
use crate::style::{is_visible, HidingRules};
use crate::{BrowserConfig, ElementInfo, Engine, Error, Navigation, Result, TextSnapshot};

type OnLoadHandler = Arc<dyn Fn(&TextSnapshot) + Send + Sync>;

pub struct HeadlessEngine {
    client: Client,
    config: BrowserConfig,
    last_html: Option<String>,
    last_url: Option<Url>,
    // Bodies of `<link rel="stylesheet">` targets of the current document
    linked_styles: Vec<String>,
    scroll_target: Option<String>,

    on_load: Option<OnLoadHandler>,
}

impl HeadlessEngine {
    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", self.config.user_agent.as_str());
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request.send().map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.config.timeout_ms)
            } else {
                Error::LoadError(format!("Failed to fetch {}: {}", url, e))
            }
        })
    }

    fn fetch_linked_styles(&mut self, base: &Url) {
        let Some(html) = self.last_html.as_ref() else {
            return;
        };
        let document = Html::parse_document(html);
        let Ok(link_sel) = Selector::parse("link[rel=\"stylesheet\"]") else {
            return;
        };
        let hrefs: Vec<String> = document
            .select(&link_sel)
            .filter_map(|node| node.value().attr("href"))
            .filter_map(|href| base.join(href).ok())
            .map(|u| u.to_string())
            .collect();

        for css_url in hrefs {
            match self.get(&css_url).and_then(|resp| resp.text().map_err(Error::from)) {
                Ok(text) if !text.trim().is_empty() => self.linked_styles.push(text),
                Ok(_) => {}
                Err(e) => log::warn!("stylesheet {} not loaded: {}", css_url, e),
            }
        }
    }

    fn install(&mut self, url: Url, html: String) {
        self.scroll_target = element_id(&url).filter(|f| !f.is_empty());
        self.last_html = Some(html);
        self.last_url = Some(url);
        self.linked_styles.clear();
    }

    fn fire_on_load(&self) {
        if let Some(cb) = &self.on_load {
            if let Ok(snapshot) = self.render_text_snapshot() {
                cb(&snapshot);
            }
        }
    }

    fn hiding_rules(&self, document: &Html) -> HidingRules {
        let mut rules = HidingRules::from_document(document);
        for css in &self.linked_styles {
            rules.add_stylesheet(css);
        }
        rules
    }

    fn has_id(&self, id: &str) -> Result<bool> {
        let document = self.document()?;
        let found = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .any(|el| el.value().id() == Some(id));
        Ok(found)
    }

    fn document(&self) -> Result<Html> {
        Ok(Html::parse_document(self.html()?))
    }
}

fn element_info(el: ElementRef<'_>, rules: &HidingRules) -> ElementInfo {
    let value = el.value();
    ElementInfo {
        tag: value.name().to_string(),
        id: value.id().map(str::to_string),
        text: normalize_whitespace(&el.text().collect::<String>()),
        attributes: value
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        visible: is_visible(el, rules),
    }
}

// Fragments are matched against `id` attributes in their decoded form
fn element_id(url: &Url) -> Option<String> {
    url.fragment()
        .map(|f| percent_decode_str(f).decode_utf8_lossy().into_owned())
}

fn without_fragment(url: &Url) -> Url {
    let mut u = url.clone();
    u.set_fragment(None);
    u
}

impl Engine for HeadlessEngine {
    fn new(config: BrowserConfig) -> Result<Self>
    where
        Self: Sized,
    {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::LoadError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            last_html: None,
            last_url: None,
            linked_styles: Vec::new(),
            scroll_target: None,
            on_load: None,
        })
    }

    fn load_url(&mut self, url: &str) -> Result<()> {
        let requested = Url::parse(url).map_err(|e| Error::LoadError(format!("{}: {}", url, e)))?;
        log::debug!("loading {}", requested);

        let resp = self.get(url)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::LoadError(format!("{} returned HTTP {}", url, status)));
        }

        // The fragment is never sent; carry it over to the final (post-redirect) URL
        let mut final_url = resp.url().clone();
        final_url.set_fragment(requested.fragment());

        let body = resp
            .text()
            .map_err(|e| Error::LoadError(format!("Failed to read response body: {}", e)))?;

        self.install(final_url.clone(), body);
        if self.config.load_stylesheets {
            self.fetch_linked_styles(&final_url);
        }
        self.fire_on_load();
        Ok(())
    }

    fn load_html(&mut self, url: &str, html: &str) -> Result<()> {
        let url = Url::parse(url).map_err(|e| Error::LoadError(format!("{}: {}", url, e)))?;
        self.install(url, html.to_string());
        self.fire_on_load();
        Ok(())
    }

    fn current_url(&self) -> Option<String> {
        self.last_url.as_ref().map(|u| u.to_string())
    }

    fn scroll_target(&self) -> Option<&str> {
        self.scroll_target.as_deref()
    }

    fn html(&self) -> Result<&str> {
        self.last_html
            .as_deref()
            .ok_or_else(|| Error::LoadError("No document loaded".into()))
    }

    fn render_text_snapshot(&self) -> Result<TextSnapshot> {
        let document = self.document()?;
        let title = Selector::parse("title")
            .ok()
            .and_then(|sel| document.select(&sel).next())
            .map(|n| n.text().collect::<String>())
            .unwrap_or_default();
        let text = Selector::parse("body")
            .ok()
            .and_then(|sel| document.select(&sel).next())
            .map(|b| b.text().collect::<String>())
            .unwrap_or_default();

        Ok(TextSnapshot {
            title,
            text,
            url: self.current_url().unwrap_or_default(),
        })
    }

    fn inspect(&self, locator: &Locator) -> Result<Vec<ElementInfo>> {
        let document = self.document()?;
        let rules = self.hiding_rules(&document);
        Ok(locator
            .resolve(&document)?
            .into_iter()
            .map(|el| element_info(el, &rules))
            .collect())
    }

    fn click(&mut self, locator: &Locator) -> Result<Navigation> {
        let base = self
            .last_url
            .clone()
            .ok_or_else(|| Error::NavigationError("No document loaded".into()))?;

        let href = {
            let document = self.document()?;
            let matches = locator.resolve(&document)?;
            let el = match matches.as_slice() {
                [one] => *one,
                [] => {
                    return Err(Error::NavigationError(format!(
                        "no element matches {}",
                        locator
                    )))
                }
                many => {
                    return Err(Error::NavigationError(format!(
                        "strict mode violation: {} resolved to {} elements",
                        locator,
                        many.len()
                    )))
                }
            };
            if !is_visible(el, &self.hiding_rules(&document)) {
                return Err(Error::NavigationError(format!("{} is not visible", locator)));
            }
            // The click lands on the element; the nearest enclosing link handles it
            std::iter::once(el)
                .chain(el.ancestors().filter_map(ElementRef::wrap))
                .find(|e| e.value().name() == "a")
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
                .ok_or_else(|| Error::NavigationError(format!("{} is not a link", locator)))?
        };

        let target = base.join(&href)?;
        log::debug!("click {} -> {}", locator, target);

        if target.fragment().is_some() && without_fragment(&target) == without_fragment(&base) {
            let fragment = element_id(&target).unwrap_or_default();
            if !fragment.is_empty() && !self.has_id(&fragment)? {
                log::warn!("fragment #{} has no matching element", fragment);
            }
            self.scroll_target = Some(fragment.clone()).filter(|f| !f.is_empty());
            self.last_url = Some(target.clone());
            return Ok(Navigation::Fragment {
                url: target.to_string(),
                target: fragment,
            });
        }

        match target.scheme() {
            "http" | "https" => {
                self.load_url(target.as_str())?;
                Ok(Navigation::Document {
                    url: self.current_url().unwrap_or_else(|| target.to_string()),
                })
            }
            _ => {
                log::info!("not following external link {}", target);
                Ok(Navigation::External {
                    url: target.to_string(),
                })
            }
        }
    }

    fn on_load<F>(&mut self, cb: F)
    where
        F: Fn(&TextSnapshot) + Send + Sync + 'static,
    {
        self.on_load = Some(Arc::new(cb));
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use reelgrab_core::models::settings::{MatcherSpec, RescuePattern};

static PROGRESS_API_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"get_progressApi\('([^']+)'\)").unwrap());

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table.table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody > tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static BUTTON: LazyLock<Selector> = LazyLock::new(|| Selector::parse("button").unwrap());

/// One way of spotting the media link inside a result page.
pub trait Matcher: Send + Sync {
    fn name(&self) -> &str;
    fn find(&self, doc: &Html) -> Option<String>;
}

fn first_href(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let href = scope.select(selector).next()?.value().attr("href")?;
    (!href.is_empty()).then(|| href.to_string())
}

pub struct TableRowMatcher {
    api_base: String,
}

impl Matcher for TableRowMatcher {
    fn name(&self) -> &str {
        "table_row"
    }

    fn find(&self, doc: &Html) -> Option<String> {
        doc.select(&TABLE).next()?;

        for row in doc.select(&ROW) {
            let Some(cell) = row.select(&CELL).nth(2) else {
                continue;
            };
            if let Some(href) = first_href(cell, &ANCHOR) {
                return Some(href);
            }
            let onclick = cell
                .select(&BUTTON)
                .next()
                .and_then(|b| b.value().attr("onclick"));
            if let Some(caps) = onclick.and_then(|js| PROGRESS_API_RE.captures(js)) {
                return Some(format!("{}{}", self.api_base, &caps[1]));
            }
        }
        None
    }
}

pub struct NestedMatcher {
    label: String,
    container: Selector,
    inner: Selector,
}

impl Matcher for NestedMatcher {
    fn name(&self) -> &str {
        &self.label
    }

    fn find(&self, doc: &Html) -> Option<String> {
        doc.select(&self.container).find_map(|container| {
            let anchor = container
                .select(&self.inner)
                .flat_map(|inner| inner.select(&ANCHOR))
                .next()?;
            anchor
                .value()
                .attr("href")
                .filter(|h| !h.is_empty())
                .map(str::to_string)
        })
    }
}

pub struct SelectorMatcher {
    label: String,
    selector: Selector,
}

impl Matcher for SelectorMatcher {
    fn name(&self) -> &str {
        &self.label
    }

    fn find(&self, doc: &Html) -> Option<String> {
        let href = doc.select(&self.selector).next()?.value().attr("href")?;
        (!href.is_empty()).then(|| href.to_string())
    }
}

pub struct FirstAnchorMatcher;

impl Matcher for FirstAnchorMatcher {
    fn name(&self) -> &str {
        "first_anchor"
    }

    fn find(&self, doc: &Html) -> Option<String> {
        first_href(doc.root_element(), &ANCHOR)
    }
}

fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!("[matchers] ignoring invalid selector {:?}: {}", css, e);
            None
        }
    }
}

/// Turns configured matcher specs into runnable matchers, keeping their order.
pub fn build_matchers(specs: &[MatcherSpec]) -> Vec<Box<dyn Matcher>> {
    specs
        .iter()
        .filter_map(|spec| -> Option<Box<dyn Matcher>> {
            match spec {
                MatcherSpec::TableRow { api_base } => Some(Box::new(TableRowMatcher {
                    api_base: api_base.clone(),
                })),
                MatcherSpec::Nested { container, inner } => Some(Box::new(NestedMatcher {
                    label: format!("{} > {}", container, inner),
                    container: parse_selector(container)?,
                    inner: parse_selector(inner)?,
                })),
                MatcherSpec::Selector { css } => Some(Box::new(SelectorMatcher {
                    label: css.clone(),
                    selector: parse_selector(css)?,
                })),
                MatcherSpec::FirstAnchor => Some(Box::new(FirstAnchorMatcher)),
            }
        })
        .collect()
}

/// Runs matchers in order over `html`. Returns the matcher name and the link.
pub fn run_matchers(matchers: &[Box<dyn Matcher>], html: &str) -> Option<(String, String)> {
    let doc = Html::parse_document(html);
    matchers.iter().find_map(|m| {
        let found = m.find(&doc)?;
        Some((m.name().to_string(), found))
    })
}

/// Last-resort regex scan over a raw response body.
pub struct RegexRescue {
    patterns: Vec<(Regex, String)>,
}

impl RegexRescue {
    pub fn new(patterns: &[RescuePattern]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Regex::new(&p.pattern) {
                Ok(re) => Some((re, p.prefix.clone())),
                Err(e) => {
                    tracing::warn!("[matchers] ignoring invalid rescue pattern {:?}: {}", p.pattern, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn find(&self, body: &str) -> Option<String> {
        self.patterns.iter().find_map(|(re, prefix)| {
            let caps = re.captures(body)?;
            let found = caps.get(1)?.as_str();
            Some(format!("{}{}", prefix, found))
        })
    }
}

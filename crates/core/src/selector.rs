//! Heuristic discovery of the listing-card selector.
//!
//! Every element of the page is scored with [`ElementHeuristics`]. Elements
//! clearing the threshold are grouped under the CSS selector that would match
//! them and their siblings, and the group with the highest count-weighted mean
//! score wins, provided it is frequent enough to be a repeated card.

use crate::page::{ElementSnapshot, Page};
use crate::scoring::{ElementHeuristics, score_element};

/// One candidate grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorCandidate {
    pub selector: String,
    pub element_count: usize,
    pub total_score: u32,
}

impl SelectorCandidate {
    /// Element count weighted by the mean per-element score.
    pub fn metric(&self) -> f64 {
        if self.element_count == 0 {
            return 0.0;
        }
        let mean = f64::from(self.total_score) / self.element_count as f64;
        self.element_count as f64 * mean
    }
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorReport {
    pub chosen: Option<SelectorCandidate>,
    /// Every group of qualifying elements, in first-encounter order.
    pub candidates: Vec<SelectorCandidate>,
}

/// The selector that groups `element` with similar elements.
///
/// First class name, else the id (as an `[id^=".."]` prefix match when it
/// ends in digits after a non-digit prefix, exact otherwise), else the tag name.
pub fn grouping_selector(element: &ElementSnapshot) -> String {
    if let Some(class) = element.classes().next() {
        return format!(".{}", css_escape(class));
    }

    if let Some(id) = element.id() {
        let prefix = id.trim_end_matches(|c: char| c.is_ascii_digit());
        if prefix.is_empty() || prefix.len() == id.len() {
            return format!("#{}", css_escape(id));
        }
        return format!("[id^=\"{}\"]", prefix.replace('\\', "\\\\").replace('"', "\\\""));
    }

    element.tag.clone()
}

/// Escape an identifier for use in a class or id selector.
fn css_escape(ident: &str) -> String {
    let mut escaped = String::with_capacity(ident.len());
    for (i, c) in ident.chars().enumerate() {
        match c {
            'a'..='z' | 'A'..='Z' | '_' | '-' => escaped.push(c),
            '0'..='9' if i > 0 => escaped.push(c),
            '0'..='9' => escaped.push_str(&format!("\\3{c} ")),
            c if !c.is_ascii() => escaped.push(c),
            c => {
                escaped.push('\\');
                escaped.push(c);
            }
        }
    }
    escaped
}

/// Group qualifying elements by selector, preserving first-encounter order.
pub fn rank_selectors(elements: &[ElementSnapshot], heuristics: &ElementHeuristics) -> Vec<SelectorCandidate> {
    let mut candidates: Vec<SelectorCandidate> = Vec::new();

    for element in elements {
        let score = score_element(element, heuristics);
        if score < heuristics.element_threshold {
            continue;
        }

        let selector = grouping_selector(element);
        match candidates.iter_mut().find(|c| c.selector == selector) {
            Some(candidate) => {
                candidate.element_count += 1;
                candidate.total_score += score;
            }
            None => candidates.push(SelectorCandidate { selector, element_count: 1, total_score: score }),
        }
    }

    candidates
}

/// Pick the best frequent-enough candidate. Ties keep the earlier group.
pub fn choose_selector<'a>(
    candidates: &'a [SelectorCandidate], heuristics: &ElementHeuristics,
) -> Option<&'a SelectorCandidate> {
    candidates
        .iter()
        .filter(|c| c.element_count >= heuristics.min_group_size)
        .fold(None, |best: Option<&SelectorCandidate>, candidate| match best {
            Some(b) if candidate.metric() <= b.metric() => Some(b),
            _ => Some(candidate),
        })
}

/// Score and group every element on the page.
pub fn discover(page: &dyn Page, heuristics: &ElementHeuristics) -> SelectorReport {
    let elements = match page.query("*") {
        Ok(elements) => elements,
        Err(e) => {
            tracing::debug!(error = %e, "element query failed");
            return SelectorReport::default();
        }
    };

    let candidates = rank_selectors(&elements, heuristics);
    let chosen = choose_selector(&candidates, heuristics).cloned();

    match &chosen {
        Some(c) => tracing::debug!(selector = %c.selector, count = c.element_count, "listing selector chosen"),
        None => tracing::debug!(groups = candidates.len(), "no listing selector qualified"),
    }

    SelectorReport { chosen, candidates }
}

/// The discovered listing-card selector, if any group qualified.
pub fn discover_selector(page: &dyn Page, heuristics: &ElementHeuristics) -> Option<String> {
    discover(page, heuristics).chosen.map(|c| c.selector)
}

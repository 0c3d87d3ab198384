use crate::profile::LayoutProfile;
use crate::text::normalize;
use crate::types::{Extraction, JobPosting};
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

static MATCH_PERCENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,3})%").unwrap());
static PAY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\d[\d,]*\s*K?/(?:yr|hr)\s*-\s*\$\d[\d,]*\s*K?/(?:yr|hr)").unwrap()
});
static REMOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bRemote\b").unwrap());
static CITY_STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][A-Za-z .'-]+,\s*[A-Z]{2})\b").unwrap());

/// Elements whose text never shows up in the rendered email.
const HIDDEN_TEXT_PARENTS: &[&str] = &["script", "style", "template"];

/// Turns the HTML of one digest email into job postings.
///
/// The email carries no per-posting markup, so two lists are derived
/// independently (job links, and the visible text split at the "apply"
/// button) and paired by position. Neither list can be trusted to line up
/// with the other when the template changes; [`Extraction::drift`] reports
/// how far apart they were.
#[derive(Debug, Clone, Default)]
pub struct DigestParser {
    profile: LayoutProfile,
}

impl DigestParser {
    pub fn new(profile: LayoutProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &LayoutProfile {
        &self.profile
    }

    pub fn parse_digest(&self, html: &str) -> Extraction {
        // Entities are decoded up front so both passes see the same characters
        let raw = html_escape::decode_html_entities(html);
        let document = Html::parse_document(&raw);

        let links = self.collect_links(&document);
        let blocks = self.split_blocks(&visible_text(&document));

        debug!("Digest has {} job links and {} text blocks", links.len(), blocks.len());

        let records: Vec<JobPosting> = links
            .iter()
            .zip(blocks.iter())
            .map(|(link, block)| self.parse_block(block, link))
            .collect();

        let extraction = Extraction {
            records,
            link_count: links.len(),
            block_count: blocks.len(),
        };

        if extraction.drift() != 0 {
            warn!(
                "Job links and text blocks differ ({} vs {}); keeping the first {}",
                extraction.link_count,
                extraction.block_count,
                extraction.records.len()
            );
        }

        extraction
    }

    /// Job detail links in document order, first occurrence wins.
    pub fn collect_links(&self, document: &Html) -> Vec<String> {
        let Ok(anchors) = Selector::parse("a[href]") else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in document.select(&anchors) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if href.contains(self.profile.job_link_marker) && seen.insert(href.to_string()) {
                links.push(href.to_string());
            }
        }
        links
    }

    /// Split the visible text of a digest into one block per posting.
    pub fn split_blocks(&self, text: &str) -> Vec<String> {
        let mut text = normalize(text);
        if let Some(pos) = text.find(self.profile.intro_marker) {
            text = text[pos + self.profile.intro_marker.len()..].trim().to_string();
        }

        let mut blocks: Vec<String> = text
            .split(self.profile.block_delimiter)
            .map(normalize)
            .filter(|block| !block.is_empty())
            .collect();

        if blocks
            .last()
            .is_some_and(|last| last.to_lowercase().starts_with(self.profile.footer_prefix))
        {
            blocks.pop();
        }

        blocks
    }

    /// Pull the posting fields out of one text block.
    pub fn parse_block(&self, block: &str, link: &str) -> JobPosting {
        let match_digits = MATCH_PERCENT.captures(block).map(|caps| caps[1].to_string());
        let pay_range = PAY_RANGE.find(block).map(|m| m.as_str().to_string());

        let location = if REMOTE.is_match(block) {
            Some("Remote".to_string())
        } else {
            CITY_STATE.captures(block).map(|caps| caps[1].to_string())
        };

        let company = block
            .split(self.profile.company_separator)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        let role = self.extract_role(
            block,
            match_digits.as_deref(),
            pay_range.as_deref(),
            location.as_deref(),
            &company,
        );

        JobPosting {
            link: link.to_string(),
            match_percent: match_digits.and_then(|digits| digits.parse().ok()),
            pay_range,
            location,
            company,
            role,
        }
    }

    fn extract_role(
        &self,
        block: &str,
        match_digits: Option<&str>,
        pay_range: Option<&str>,
        location: Option<&str>,
        company: &str,
    ) -> String {
        // The role follows the match score when there is one
        let after_match = match_digits
            .and_then(|digits| block.split_once(&format!("{}%", digits)))
            .map_or(block, |(_, rest)| rest);
        let mut role = normalize(after_match);

        let terminators = [pay_range, location]
            .into_iter()
            .flatten()
            .chain(self.profile.terminators.iter().copied());
        for terminator in terminators {
            if terminator.is_empty() {
                continue;
            }
            if let Some((head, _)) = role.split_once(terminator) {
                role = head.to_string();
            }
        }

        let role = role.trim_matches(|c: char| matches!(c, ' ' | '\u{b7}' | '-'));
        let mut role = normalize(&strip_noise(role, self.profile.noise_phrases));

        // Without a separator the company name can leak into the role text
        if !company.is_empty() && role.to_lowercase().starts_with(&company.to_lowercase()) {
            let rest: String = role.chars().skip(company.chars().count()).collect();
            role = normalize(&rest);
        }

        role
    }
}

/// Parse a digest with the default layout and return its postings.
pub fn extract(html: &str) -> Vec<JobPosting> {
    DigestParser::default().parse_digest(html).records
}

/// Delete every noise phrase from `text`.
///
/// Plain substring deletion: a phrase inside a longer word is removed too.
pub fn strip_noise(text: &str, phrases: &[&str]) -> String {
    phrases
        .iter()
        .fold(text.to_string(), |acc, phrase| acc.replace(phrase, ""))
}

/// Text nodes as a reader would see them, each trimmed and joined by one space.
pub fn visible_text(document: &Html) -> String {
    let mut pieces = Vec::new();
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .is_some_and(|element| HIDDEN_TEXT_PARENTS.contains(&element.name()));
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed);
        }
    }
    pieces.join(" ")
}

//! Field extraction from recognized work-order text.
//!
//! Matching is anchored on two literal labels, "Work Order" and
//! "Assigned To" (case-insensitive). Each value runs from its label to the
//! next label or line break, whichever comes first.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Separator placed between the texts of consecutive pages.
pub const PAGE_BREAK: &str = "\n\u{000C}\n";

/// Filename token used when no known assignee was found.
pub const NO_ASSIGNEE: &str = "NoElectrician";

static LABELS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)work order|assigned to").expect("label pattern is valid"));

static WORK_ORDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)work order\s*(\d{1,9})").expect("work order pattern is valid")
});

static ASSIGNED_TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)assigned to").expect("assignee pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Assignee {
    Known(String),
    Unknown,
}

impl Assignee {
    pub fn as_str(&self) -> &str {
        match self {
            Assignee::Known(name) => name,
            Assignee::Unknown => NO_ASSIGNEE,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Assignee::Known(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedRecord {
    pub work_order: Option<String>,
    pub description: Option<String>,
    pub assignee: Assignee,
}

/// The closed vocabulary of personnel names an assignee may resolve to.
#[derive(Debug, Clone, Default)]
pub struct KnownAssignees {
    names: Vec<String>,
}

impl KnownAssignees {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for name in names {
            let name = collapse_whitespace(name.as_ref());
            if !name.is_empty() && !normalized.contains(&name) {
                normalized.push(name);
            }
        }
        Self { names: normalized }
    }

    /// Returns the vocabulary entry equal to `candidate` after whitespace
    /// normalization. Comparison is case-sensitive.
    pub fn find(&self, candidate: &str) -> Option<&str> {
        let candidate = collapse_whitespace(candidate);
        self.names
            .iter()
            .find(|name| **name == candidate)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub struct FieldExtractor {
    assignees: KnownAssignees,
}

impl FieldExtractor {
    pub fn new(assignees: KnownAssignees) -> Self {
        Self { assignees }
    }

    pub fn assignees(&self) -> &KnownAssignees {
        &self.assignees
    }

    pub fn extract(&self, text: &str) -> ExtractedRecord {
        let (work_order, description) = match WORK_ORDER.captures(text) {
            Some(caps) => {
                let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
                let number = caps.get(1).map(|m| m.as_str().to_string());
                (number, description_after(&text[whole..]))
            }
            None => (None, None),
        };

        let assignee = assignee_candidates(text)
            .into_iter()
            .find_map(|candidate| self.assignees.find(&candidate).map(str::to_string))
            .map(Assignee::Known)
            .unwrap_or(Assignee::Unknown);

        if work_order.is_none() {
            log::debug!("No 'Work Order' label found in recognized text");
        }
        if !assignee.is_known() {
            log::debug!("No known assignee found in recognized text");
        }

        ExtractedRecord {
            work_order,
            description,
            assignee,
        }
    }
}

/// Extracts only the work-order number, as the rename utility does.
pub fn extract_work_order(text: &str) -> Option<String> {
    WORK_ORDER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Every "Assigned To" value in order of appearance.
pub fn assignee_candidates(text: &str) -> Vec<String> {
    ASSIGNED_TO
        .find_iter(text)
        .filter_map(|m| {
            let rest = text[m.end()..].trim_start();
            let run: String = until_boundary(rest)
                .chars()
                .take_while(|c| is_name_char(*c))
                .collect();
            let candidate = collapse_whitespace(&run);
            (!candidate.is_empty()).then_some(candidate)
        })
        .collect()
}

fn description_after(rest: &str) -> Option<String> {
    // \d{1,9} may stop inside a longer number.
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    if !rest.starts_with([' ', '\t']) {
        return None;
    }

    let run: String = until_boundary(rest)
        .chars()
        .take_while(|c| is_word_char(*c))
        .collect();
    let description = collapse_whitespace(&run);
    (!description.is_empty()).then_some(description)
}

/// Cuts `text` at the first line break or label.
fn until_boundary(text: &str) -> &str {
    let line_end = text.find(['\r', '\n']).unwrap_or(text.len());
    let line = &text[..line_end];
    match LABELS.find(line) {
        Some(label) => &line[..label.start()],
        None => line,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ' ' || c == '\t'
}

fn is_name_char(c: char) -> bool {
    is_word_char(c) || matches!(c, '-' | '\'' | '.')
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

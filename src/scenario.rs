use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static SCENARIO_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*([^:]+):\s*(.+)$").expect("scenario line regex"));

/// File name the UI offers for the plain-text export.
pub const EXPORT_FILENAME: &str = "selected-reel-scenarios.txt";

/// Raw user text the generation cycle starts from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInput {
    pub product_description: String,
    pub problem: String,
    pub target_audience: String,
}

impl FormInput {
    /// Names of the fields that are empty after trimming.
    pub fn blank_fields(&self) -> Vec<&'static str> {
        let mut blank = Vec::new();
        if self.product_description.trim().is_empty() {
            blank.push("productDescription");
        }
        if self.problem.trim().is_empty() {
            blank.push("problem");
        }
        if self.target_audience.trim().is_empty() {
            blank.push("targetAudience");
        }
        blank
    }
}

/// A short-video concept pitch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub selected: bool,
}

impl Scenario {
    pub fn new(id: i64, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            selected: false,
        }
    }

    /// Prompt handed to the text-to-video model.
    pub fn video_prompt(&self) -> String {
        format!("{}: {}", self.title, self.description)
    }
}

fn clean_title(raw: &str) -> &str {
    raw.trim().trim_matches('*').trim()
}

fn clean_description(raw: &str) -> &str {
    raw.trim().trim_start_matches('*').trim()
}

/// Splits one `N. Title: description` line. Returns `None` for anything else.
fn parse_line(line: &str) -> Option<(String, String)> {
    let caps = SCENARIO_LINE.captures(line.trim())?;
    let title = clean_title(&caps[1]);
    let description = clean_description(&caps[2]);
    if title.is_empty() || description.is_empty() {
        return None;
    }
    Some((title.to_string(), description.to_string()))
}

/// Parses free-text model output. Ids run from 1 over the kept lines only.
pub fn parse_numbered_list(text: &str) -> Vec<Scenario> {
    text.lines()
        .filter_map(parse_line)
        .enumerate()
        .map(|(index, (title, description))| Scenario::new(index as i64 + 1, title, description))
        .collect()
}

#[derive(Debug, Deserialize)]
struct ScenarioDraft {
    title: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ScenarioRoot {
    scenarios: Vec<ScenarioDraft>,
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl ScenarioDraft {
    /// Reshapes the draft so it survives the `N. Title: description` export:
    /// one line, and no colon inside the title.
    fn into_line_safe(self) -> Option<(String, String)> {
        let title = collapse_whitespace(&self.title.replace(':', " -"));
        let description = collapse_whitespace(&self.description);
        let title = clean_title(&title);
        let description = clean_description(&description);
        if title.is_empty() || description.is_empty() {
            return None;
        }
        Some((title.to_string(), description.to_string()))
    }
}

/// Decodes schema-constrained output `{"scenarios":[{"title","description"}]}`.
pub fn parse_structured(text: &str) -> Result<Vec<Scenario>> {
    let root: ScenarioRoot =
        serde_json::from_str(text).with_context(|| "Failed to parse scenario JSON")?;
    Ok(root
        .scenarios
        .into_iter()
        .filter_map(ScenarioDraft::into_line_safe)
        .enumerate()
        .map(|(index, (title, description))| Scenario::new(index as i64 + 1, title, description))
        .collect())
}

/// Selected scenarios as `N. Title: description`, separated by blank lines.
pub fn export_selected(scenarios: &[Scenario]) -> String {
    scenarios
        .iter()
        .filter(|s| s.selected)
        .map(|s| format!("{}. {}: {}", s.id, s.title, s.description))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Marks exactly the scenarios whose id is in `ids` as selected. Unknown ids are
/// ignored; returns how many scenarios ended up selected.
pub fn apply_selection(scenarios: &mut [Scenario], ids: &[i64]) -> usize {
    let wanted: HashSet<i64> = ids.iter().copied().collect();
    let mut count = 0;
    for scenario in scenarios.iter_mut() {
        scenario.selected = wanted.contains(&scenario.id);
        if scenario.selected {
            count += 1;
        }
    }
    count
}

/// First id that appears more than once, if any.
pub fn duplicate_id(scenarios: &[Scenario]) -> Option<i64> {
    let mut seen = HashSet::new();
    scenarios.iter().map(|s| s.id).find(|id| !seen.insert(*id))
}

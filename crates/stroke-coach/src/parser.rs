/// Parser for the coaching report text returned by the analysis service.
///
/// The report is human-readable, decorated with emoji and rule lines, and
/// its cosmetics drift across report-generator versions. The parser keys
/// only on semantically stable cues:
/// - section labels in ALL CAPS (`QUICK INSIGHT`, `BIGGEST RED FLAG`,
///   `WHAT'S WORKING`, `YOUR ACTION PLAN`)
/// - structural markers: bullets (`•`, `-`, `*`), numbered lines, arrow
///   fix lines (`→` / `->`), blank-line boundaries
///
/// Parser approach: independent extractors over the line list, each
/// returning an optional result. One section drifting or missing never
/// affects the others, and nothing here panics — unmatched fields are
/// simply absent and the raw text is always retained.
use regex::Regex;
use tracing::debug;

use crate::model::{AnalysisReport, Issue, RedFlag, Severity};

/// Turn a raw report into its structured form. Never fails: arbitrary
/// input degrades to an all-absent report carrying the verbatim text.
pub fn parse_report(raw: &str) -> AnalysisReport {
    let lines: Vec<&str> = raw.lines().collect();

    AnalysisReport {
        score: extract_score(raw),
        quick_insight: extract_quick_insight(&lines),
        biggest_red_flag: extract_red_flag(&lines),
        strengths: extract_strengths(&lines),
        issues: extract_issues(&lines),
        raw_text: raw.to_string(),
    }
}

/// First "score out of 10" occurrence, e.g. "Overall Technique Score: 7/10".
/// The anchored `/10` denominator keeps prose numbers from matching.
fn extract_score(raw: &str) -> Option<u8> {
    let score_re = Regex::new(r"(?i)score[^0-9\n]*(\d{1,2})\s*/\s*10").expect("valid regex");
    score_re
        .captures(raw)
        .and_then(|caps| caps[1].parse::<u8>().ok())
        .filter(|v| *v <= 10)
}

/// Text after the `QUICK INSIGHT` label, up to the next blank line,
/// decoration line, or section header.
fn extract_quick_insight(lines: &[&str]) -> Option<String> {
    let start = find_label(lines, &["QUICK INSIGHT"])?;
    let mut collected: Vec<&str> = Vec::new();

    for line in &lines[start + 1..] {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_decoration(line) {
            if collected.is_empty() {
                continue; // still inside the header decoration
            }
            break;
        }
        if is_section_header(line) {
            break;
        }
        collected.push(trimmed);
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected.join(" "))
    }
}

/// The `BIGGEST RED FLAG` section: one issue line plus a `HOW TO FIX`
/// remedy line. All-or-nothing — a partial match is discarded.
fn extract_red_flag(lines: &[&str]) -> Option<RedFlag> {
    let start = find_label(lines, &["RED FLAG"])?;
    let mut issue: Option<String> = None;
    let mut fix: Option<String> = None;
    let mut in_fix = false;

    for line in &lines[start + 1..] {
        let upper = line.to_uppercase();
        if upper.contains("HOW TO FIX") {
            in_fix = true;
            continue;
        }
        if is_section_header(line) {
            break;
        }
        if is_decoration(line) || line.trim().is_empty() {
            continue;
        }
        let text = strip_markers(line);
        if text.is_empty() {
            continue;
        }
        if in_fix {
            fix.get_or_insert(text);
        } else {
            issue.get_or_insert(text);
        }
    }

    match (issue, fix) {
        (Some(issue), Some(fix)) => Some(RedFlag { issue, fix }),
        (issue, fix) => {
            if issue.is_some() || fix.is_some() {
                debug!("red flag section incomplete, discarding");
            }
            None
        }
    }
}

/// Bullet lines from the `WHAT'S WORKING` section, markers stripped,
/// original order preserved. Non-bullet lines are ignored.
fn extract_strengths(lines: &[&str]) -> Vec<String> {
    let Some(start) = find_label(lines, &["WHAT'S WORKING", "STRENGTHS"]) else {
        return Vec::new();
    };

    let mut strengths = Vec::new();
    for line in &lines[start + 1..] {
        if is_section_header(line) {
            break;
        }
        let trimmed = line.trim_start();
        let bullet = trimmed
            .strip_prefix('•')
            .or_else(|| trimmed.strip_prefix("- "))
            .or_else(|| trimmed.strip_prefix("* "));
        if let Some(rest) = bullet {
            let text = rest.trim();
            if !text.is_empty() {
                strengths.push(text.to_string());
            }
        }
    }
    strengths
}

/// Numbered issue lines from the `ACTION PLAN` section.
///
/// Two line shapes carry issues:
/// - `N. … FIX THIS FIRST: description` — critical
/// - `N. … IMPORTANT: description` — moderate
///
/// Each may be followed by an indented `→ fix` line. All critical issues
/// are collected before all moderate ones regardless of interleaving in
/// the text; relative order within a severity is preserved.
fn extract_issues(lines: &[&str]) -> Vec<Issue> {
    let Some(start) = find_label(lines, &["ACTION PLAN"]) else {
        return Vec::new();
    };

    let critical_re =
        Regex::new(r"^\s*\d+[.)]\s.*?FIX THIS FIRST:\s*(.+)$").expect("valid regex");
    let moderate_re = Regex::new(r"^\s*\d+[.)]\s.*?IMPORTANT:\s*(.+)$").expect("valid regex");
    let numbered_re = Regex::new(r"^\s*\d+[.)]\s").expect("valid regex");
    let arrow_re = Regex::new(r"^\s*(?:→|->)\s*(.+)$").expect("valid regex");

    let mut critical: Vec<Issue> = Vec::new();
    let mut moderate: Vec<Issue> = Vec::new();

    let body = &lines[start + 1..];
    for (i, line) in body.iter().enumerate() {
        if is_section_header(line) {
            break;
        }
        let (severity, caps) = if let Some(caps) = critical_re.captures(line) {
            (Severity::Critical, caps)
        } else if let Some(caps) = moderate_re.captures(line) {
            (Severity::Moderate, caps)
        } else {
            continue;
        };
        let description = caps[1].trim().to_string();
        let fix = find_fix_line(&body[i + 1..], &arrow_re, &numbered_re);

        let issue = Issue {
            severity,
            description,
            fix,
        };
        match severity {
            Severity::Critical => critical.push(issue),
            Severity::Moderate => moderate.push(issue),
        }
    }

    critical.into_iter().chain(moderate).collect()
}

/// Scan forward from an issue line for its `→ fix` follow-up, stopping at
/// the next blank line, numbered line, or section header. Missing fix
/// lines yield an empty string; the issue itself still counts.
fn find_fix_line(following: &[&str], arrow_re: &Regex, numbered_re: &Regex) -> String {
    for line in following {
        if line.trim().is_empty() || numbered_re.is_match(line) || is_section_header(line) {
            break;
        }
        if let Some(caps) = arrow_re.captures(line) {
            return caps[1].trim().to_string();
        }
    }
    String::new()
}

/// Find the line index of a section header containing one of `labels`.
/// Only ALL-CAPS header lines qualify, so prose mentioning a label in
/// passing (e.g. "red flag alert" inside the insight) never matches.
fn find_label(lines: &[&str], labels: &[&str]) -> Option<usize> {
    lines.iter().position(|line| {
        if !is_section_header(line) {
            return false;
        }
        let upper = line.to_uppercase();
        labels.iter().any(|label| upper.contains(label))
    })
}

/// A header line: contains letters and every letter is uppercase.
/// Emoji and punctuation are ignored, so `🚨 BIGGEST RED FLAG` and a
/// plain `BIGGEST RED FLAG` both qualify.
fn is_section_header(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    let mut has_letter = false;
    for c in trimmed.chars() {
        if c.is_alphabetic() {
            if c.is_lowercase() {
                return false;
            }
            has_letter = true;
        }
    }
    has_letter
}

/// Rule lines (`━━━`, `===`, `---`) and other all-punctuation decoration.
fn is_decoration(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| !c.is_alphanumeric())
}

/// Drop leading emoji/bullet/arrow markers from a content line.
fn strip_markers(line: &str) -> String {
    line.trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim()
        .to_string()
}

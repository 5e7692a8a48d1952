use serde::{Deserialize, Serialize};

/// Issue priority as assigned by the analysis service.
///
/// Critical issues cost the swimmer the most and are always listed before
/// moderate ones, regardless of where they appeared in the report text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Moderate,
}

/// One technique problem from the report's action plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    /// What is wrong, e.g. "Your head is too high in the water"
    pub description: String,
    /// The suggested remedy; empty when the report omitted the fix line
    pub fix: String,
}

/// The single most severe problem plus its remedy. Both parts come from the
/// same report section; if either is missing the whole field is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedFlag {
    pub issue: String,
    pub fix: String,
}

/// Structured view of one coaching report.
///
/// Produced once per job by the report parser. Every field except
/// `raw_text` is optional or may be empty: the report format is not
/// formally guaranteed, so anything that does not match is simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Overall technique score 0–10, if the report carried one.
    pub score: Option<u8>,
    /// Single-paragraph summary of the swim.
    pub quick_insight: Option<String>,
    pub biggest_red_flag: Option<RedFlag>,
    /// Positive observations, original order preserved.
    pub strengths: Vec<String>,
    /// Prioritized action plan: critical items first, then moderate.
    pub issues: Vec<Issue>,
    /// The original report text, always retained for fallback display.
    pub raw_text: String,
}

impl AnalysisReport {
    /// True when no structured field was extracted; the consumer should
    /// fall back to showing `raw_text`.
    pub fn is_empty(&self) -> bool {
        self.score.is_none()
            && self.quick_insight.is_none()
            && self.biggest_red_flag.is_none()
            && self.strengths.is_empty()
            && self.issues.is_empty()
    }

    /// Plain-text rendering of the structured report for terminal display.
    pub fn render_text(&self) -> String {
        if self.is_empty() {
            return self.raw_text.clone();
        }

        let mut out = String::new();
        if let Some(score) = self.score {
            out.push_str(&format!("Technique score: {score}/10\n\n"));
        }
        if let Some(insight) = &self.quick_insight {
            out.push_str(&format!("Quick insight:\n  {insight}\n\n"));
        }
        if let Some(flag) = &self.biggest_red_flag {
            out.push_str(&format!(
                "Biggest red flag:\n  {}\n  Fix: {}\n\n",
                flag.issue, flag.fix
            ));
        }
        if !self.strengths.is_empty() {
            out.push_str("What's working:\n");
            for strength in &self.strengths {
                out.push_str(&format!("  - {strength}\n"));
            }
            out.push('\n');
        }
        if !self.issues.is_empty() {
            out.push_str("Action plan:\n");
            for (i, issue) in self.issues.iter().enumerate() {
                let label = match issue.severity {
                    Severity::Critical => "critical",
                    Severity::Moderate => "moderate",
                };
                out.push_str(&format!("  {}. [{label}] {}\n", i + 1, issue.description));
                if !issue.fix.is_empty() {
                    out.push_str(&format!("     fix: {}\n", issue.fix));
                }
            }
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_renders_raw_text() {
        let report = AnalysisReport {
            score: None,
            quick_insight: None,
            biggest_red_flag: None,
            strengths: vec![],
            issues: vec![],
            raw_text: "free-form text the parser could not structure".to_string(),
        };
        assert!(report.is_empty());
        assert_eq!(report.render_text(), report.raw_text);
    }

    #[test]
    fn test_render_lists_issues_in_stored_order() {
        let report = AnalysisReport {
            score: Some(6),
            quick_insight: None,
            biggest_red_flag: None,
            strengths: vec!["Good kick rhythm".to_string()],
            issues: vec![
                Issue {
                    severity: Severity::Critical,
                    description: "Head too high".to_string(),
                    fix: "Look down".to_string(),
                },
                Issue {
                    severity: Severity::Moderate,
                    description: "Crossing the midline".to_string(),
                    fix: String::new(),
                },
            ],
            raw_text: String::new(),
        };
        let text = report.render_text();
        assert!(text.contains("Technique score: 6/10"));
        let critical = text.find("[critical] Head too high").unwrap();
        let moderate = text.find("[moderate] Crossing the midline").unwrap();
        assert!(critical < moderate);
    }
}

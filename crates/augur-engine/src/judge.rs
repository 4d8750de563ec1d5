//! Reasoning judge: prompt construction and judgment parsing
//!
//! The LLM decides the polarity of each candidate. Any failure to get a
//! usable judgment is the caller's cue to fall back to neutral.

use crate::text::truncate_chars;
use augur_domain::traits::CollaboratorError;
use augur_domain::{Hypothesis, Observation, Polarity};
use serde_json::Value;

/// Longest rationale kept on evidence
const MAX_RATIONALE_CHARS: usize = 280;

/// JSON schema passed to structured generation
pub const JUDGMENT_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "polarity": {"type": "string", "enum": ["supports", "neutral", "contradicts"]},
    "rationale": {"type": "string"}
  },
  "required": ["polarity"]
}"#;

const JUDGE_INSTRUCTIONS: &str = r#"You assess whether a piece of evidence supports, contradicts, or is neutral to a hypothesis about an organization.
Answer with a single JSON object: {"polarity": "supports|neutral|contradicts", "rationale": "one sentence"}.
Rules:
- "supports" only if the evidence makes the hypothesis more likely
- "contradicts" only if it makes the hypothesis less likely
- otherwise "neutral""#;

/// Polarity plus a short rationale
#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    /// Effect of the evidence on the hypothesis
    pub polarity: Polarity,
    /// Short explanation, if the model gave one
    pub rationale: Option<String>,
}

impl Judgment {
    /// The fallback judgment
    pub fn neutral() -> Self {
        Self {
            polarity: Polarity::Neutral,
            rationale: None,
        }
    }
}

/// Builds bounded judge prompts
pub struct PromptBuilder<'a> {
    hypothesis: &'a Hypothesis,
    candidate: &'a Observation,
    narrative: &'a str,
}

impl<'a> PromptBuilder<'a> {
    /// Prompt about `candidate` as evidence for `hypothesis`
    pub fn new(hypothesis: &'a Hypothesis, candidate: &'a Observation) -> Self {
        Self {
            hypothesis,
            candidate,
            narrative: "",
        }
    }

    /// Add temporal context
    pub fn with_narrative(mut self, narrative: &'a str) -> Self {
        self.narrative = narrative;
        self
    }

    /// Build the prompt, at most `budget` characters
    ///
    /// The narrative is shortened first; only if the rest alone exceeds the
    /// budget is the whole prompt cut.
    pub fn build(&self, budget: usize) -> String {
        let mut head = String::new();
        head.push_str(JUDGE_INSTRUCTIONS);
        head.push_str("\n\n");
        head.push_str(&format!(
            "Hypothesis: {} is a {} opportunity (current confidence {:.2}).\n\n",
            self.hypothesis.entity_id, self.hypothesis.category, self.hypothesis.confidence()
        ));

        let mut tail = String::new();
        tail.push_str(&format!("Candidate evidence ({}):\n", self.candidate.source_type));
        tail.push_str("---\n");
        tail.push_str(self.candidate.payload_summary.trim());
        tail.push_str("\n---\n");

        let fixed = head.chars().count() + tail.chars().count();
        let mut prompt = head;
        let narrative = self.narrative.trim();
        const NARRATIVE_HEADER: &str = "Recent history:\n";
        if !narrative.is_empty() && fixed + NARRATIVE_HEADER.len() + 2 < budget {
            let room = budget - fixed - NARRATIVE_HEADER.len() - 2;
            prompt.push_str(NARRATIVE_HEADER);
            prompt.push_str(truncate_chars(narrative, room));
            prompt.push_str("\n\n");
        }
        prompt.push_str(&tail);

        truncate_chars(&prompt, budget).to_string()
    }
}

/// Parse an LLM response into a judgment
///
/// Accepts a bare object, an object inside a markdown code fence, or an
/// object surrounded by prose.
pub fn parse_judgment(response: &str) -> Result<Judgment, CollaboratorError> {
    let json_str = extract_json(response)?;
    let json: Value = serde_json::from_str(json_str)
        .map_err(|e| CollaboratorError::Malformed(format!("JSON parse error: {}", e)))?;
    let obj = json
        .as_object()
        .ok_or_else(|| CollaboratorError::Malformed("Expected JSON object".to_string()))?;

    let polarity = obj
        .get("polarity")
        .and_then(|v| v.as_str())
        .and_then(Polarity::parse)
        .ok_or_else(|| CollaboratorError::Malformed("Missing or invalid 'polarity'".to_string()))?;
    let rationale = obj
        .get("rationale")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| truncate_chars(s, MAX_RATIONALE_CHARS).to_string());

    Ok(Judgment { polarity, rationale })
}

fn extract_json(response: &str) -> Result<&str, CollaboratorError> {
    let trimmed = response.trim();
    let unfenced = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
            body.rsplit_once("```").map(|(b, _)| b).unwrap_or(body)
        }
        None => trimmed,
    };

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&unfenced[start..=end]),
        _ => Err(CollaboratorError::Malformed("No JSON object in response".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_domain::{source_types, BandThresholds};

    fn hypothesis() -> Hypothesis {
        Hypothesis::new("org:acme", "procurement", 0.2, 1.0, &BandThresholds::default(), 0)
    }

    fn candidate(text: &str) -> Observation {
        Observation::new(source_types::WEB_SEARCH, text, 0, 0.5, Polarity::Neutral)
    }

    #[test]
    fn test_parse_plain_and_fenced() {
        let plain = parse_judgment(r#"{"polarity": "supports", "rationale": "RFP announced"}"#).unwrap();
        assert_eq!(plain.polarity, Polarity::Supports);
        assert_eq!(plain.rationale.as_deref(), Some("RFP announced"));

        let fenced = parse_judgment("```json\n{\"polarity\": \"Contradicts\"}\n```").unwrap();
        assert_eq!(fenced.polarity, Polarity::Contradicts);
        assert!(fenced.rationale.is_none());

        let prose = parse_judgment("Sure! {\"polarity\": \"neutral\", \"rationale\": \"\"} Hope that helps.").unwrap();
        assert_eq!(prose, Judgment::neutral());
    }

    #[test]
    fn test_parse_failures_are_malformed() {
        for response in ["", "no json here", "[1, 2]", r#"{"polarity": "maybe"}"#, r#"{"rationale": "x"}"#, "{broken"] {
            assert!(
                matches!(parse_judgment(response), Err(CollaboratorError::Malformed(_))),
                "accepted {:?}",
                response
            );
        }
    }

    #[test]
    fn test_rationale_bounded() {
        let long = "x".repeat(1_000);
        let judgment = parse_judgment(&format!(r#"{{"polarity": "supports", "rationale": "{}"}}"#, long)).unwrap();
        assert_eq!(judgment.rationale.unwrap().len(), MAX_RATIONALE_CHARS);
    }

    #[test]
    fn test_prompt_contains_context() {
        let h = hypothesis();
        let c = candidate("City council tender for EHR replacement");
        let prompt = PromptBuilder::new(&h, &c).with_narrative("2024-02-01 funding: Series B").build(4_000);

        assert!(prompt.contains("org:acme"));
        assert!(prompt.contains("procurement"));
        assert!(prompt.contains("0.20"));
        assert!(prompt.contains("Series B"));
        assert!(prompt.contains("EHR replacement"));
    }

    #[test]
    fn test_prompt_budget_shortens_narrative_first() {
        let h = hypothesis();
        let c = candidate("tender notice");
        let narrative = "history ".repeat(500);
        let budget = JUDGE_INSTRUCTIONS.len() + 300;
        let prompt = PromptBuilder::new(&h, &c).with_narrative(&narrative).build(budget);

        assert!(prompt.chars().count() <= budget);
        assert!(prompt.contains("tender notice"));
        assert!(prompt.contains("Recent history"));
    }

    #[test]
    fn test_prompt_hard_cut_when_tiny() {
        let h = hypothesis();
        let c = candidate("tender notice");
        let prompt = PromptBuilder::new(&h, &c).with_narrative("history").build(50);
        assert_eq!(prompt.chars().count(), 50);
    }
}

//! Detection verdicts — the reduced form of a model response.
//!
//! Structured prompts come in several families (spam, AI-generated, link spam,
//! bot-like), each naming its boolean flag differently. The field names are
//! resolved here and nowhere else; callers only ask `is_flagged()`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::detection::EvaluationError;
use crate::llm_client::strip_json_fences;

/// Flag fields of the known detection families, in lookup order.
const FLAG_FIELDS: [&str; 4] = [
    "is_spam",
    "is_ai_generated",
    "contains_link_spam",
    "is_bot_like",
];

/// Field-name suffixes whose string arrays are collected as indicators.
const INDICATOR_SUFFIXES: [&str; 2] = ["_indicators", "_links"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredVerdict {
    pub flagged: bool,
    /// Name of the field `flagged` was read from.
    pub flag_field: String,
    pub reasoning: Option<String>,
    pub confidence: Option<f64>,
    pub indicators: Vec<String>,
    /// The full response record, including family-specific fields.
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionVerdict {
    Boolean { flagged: bool },
    Structured(StructuredVerdict),
}

impl DetectionVerdict {
    pub fn is_flagged(&self) -> bool {
        match self {
            DetectionVerdict::Boolean { flagged } => *flagged,
            DetectionVerdict::Structured(v) => v.flagged,
        }
    }

    pub fn reasoning(&self) -> Option<&str> {
        match self {
            DetectionVerdict::Boolean { .. } => None,
            DetectionVerdict::Structured(v) => v.reasoning.as_deref(),
        }
    }
}

/// Simple-mode reduction: true iff the answer starts with "true", ignoring case
/// and surrounding whitespace.
pub fn parse_boolean(text: &str) -> DetectionVerdict {
    DetectionVerdict::Boolean {
        flagged: text.trim().to_lowercase().starts_with("true"),
    }
}

/// Structured-mode reduction. A response that is not a JSON object, lacks a
/// boolean flag, or reports a confidence outside [0, 1] is an error, never a
/// negative verdict.
pub fn parse_structured(text: &str) -> Result<DetectionVerdict, EvaluationError> {
    let body = strip_json_fences(text);
    let value: Value =
        serde_json::from_str(body).map_err(|e| parse_error(text, e.to_string()))?;

    let Value::Object(raw) = value else {
        return Err(parse_error(text, "response is not a JSON object"));
    };

    let (flag_field, flagged) =
        resolve_flag(&raw).ok_or_else(|| parse_error(text, "no boolean verdict field"))?;

    let confidence = match raw.get("confidence") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(c) if (0.0..=1.0).contains(&c) => Some(c),
            _ => return Err(parse_error(text, format!("confidence {n} outside [0, 1]"))),
        },
        Some(_) => return Err(parse_error(text, "confidence is not a number")),
    };

    let reasoning = raw
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::to_string);

    let indicators = raw
        .iter()
        .filter(|(key, _)| INDICATOR_SUFFIXES.iter().any(|s| key.ends_with(s)))
        .filter_map(|(_, v)| v.as_array())
        .flatten()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    Ok(DetectionVerdict::Structured(StructuredVerdict {
        flagged,
        flag_field,
        reasoning,
        confidence,
        indicators,
        metadata: raw,
    }))
}

/// Known family fields first; otherwise the record's only boolean field.
fn resolve_flag(raw: &Map<String, Value>) -> Option<(String, bool)> {
    for field in FLAG_FIELDS {
        if let Some(flag) = raw.get(field).and_then(Value::as_bool) {
            return Some((field.to_string(), flag));
        }
    }

    let mut booleans = raw
        .iter()
        .filter_map(|(k, v)| v.as_bool().map(|b| (k.clone(), b)));
    match (booleans.next(), booleans.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

fn parse_error(raw: &str, reason: impl Into<String>) -> EvaluationError {
    EvaluationError::ResponseParse {
        reason: reason.into(),
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured(text: &str) -> StructuredVerdict {
        match parse_structured(text).unwrap() {
            DetectionVerdict::Structured(v) => v,
            other => panic!("expected structured verdict, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_boolean_true_variants() {
        for answer in ["True", "true", "TRUE.", "  True\n", "true - it is spam"] {
            assert!(parse_boolean(answer).is_flagged(), "answer {answer:?}");
        }
    }

    #[test]
    fn test_parse_boolean_false_variants() {
        for answer in ["False", "false", "", "It is true", "Yes", "untrue"] {
            assert!(!parse_boolean(answer).is_flagged(), "answer {answer:?}");
        }
    }

    #[test]
    fn test_spam_family() {
        let v = structured(
            r#"{"reasoning": "Contains promotional links", "is_spam": true,
                "confidence": 0.9, "spam_indicators": ["promotional-links", "urgency-language"]}"#,
        );
        assert!(v.flagged);
        assert_eq!(v.flag_field, "is_spam");
        assert_eq!(v.reasoning.as_deref(), Some("Contains promotional links"));
        assert_eq!(v.confidence, Some(0.9));
        assert_eq!(v.indicators, vec!["promotional-links", "urgency-language"]);
    }

    #[test]
    fn test_ai_family() {
        let v = structured(
            r#"{"reasoning": "Text shows AI patterns", "is_ai_generated": false,
                "confidence": 0.1, "ai_indicators": []}"#,
        );
        assert!(!v.flagged);
        assert_eq!(v.flag_field, "is_ai_generated");
    }

    #[test]
    fn test_link_spam_family_collects_links_and_indicators() {
        let v = structured(
            r#"{"reasoning": "Contains suspicious links", "contains_link_spam": true,
                "confidence": 0.95, "suspicious_links": ["http://spam.com"],
                "spam_indicators": ["link-spam"]}"#,
        );
        assert!(v.flagged);
        assert_eq!(v.flag_field, "contains_link_spam");
        assert_eq!(v.indicators.len(), 2);
        assert!(v.indicators.contains(&"http://spam.com".to_string()));
        assert!(v.indicators.contains(&"link-spam".to_string()));
    }

    #[test]
    fn test_bot_family() {
        let v = structured(
            r#"{"reasoning": "Shows bot-like behavior", "is_bot_like": true,
                "confidence": 0.85, "bot_indicators": ["automated-pattern"]}"#,
        );
        assert!(v.flagged);
        assert_eq!(v.flag_field, "is_bot_like");
    }

    #[test]
    fn test_unknown_family_with_single_boolean() {
        let v = structured(r#"{"reasoning": "r", "is_phishing": true, "confidence": 0.7}"#);
        assert!(v.flagged);
        assert_eq!(v.flag_field, "is_phishing");
    }

    #[test]
    fn test_fenced_json_is_accepted() {
        let v = structured("```json\n{\"is_spam\": false, \"reasoning\": \"fine\"}\n```");
        assert!(!v.flagged);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_structured("True").unwrap_err();
        assert!(matches!(err, EvaluationError::ResponseParse { raw, .. } if raw == "True"));
    }

    #[test]
    fn test_non_object_is_parse_error() {
        assert!(matches!(
            parse_structured("[true]"),
            Err(EvaluationError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_missing_flag_is_parse_error() {
        assert!(matches!(
            parse_structured(r#"{"reasoning": "no verdict", "confidence": 0.5}"#),
            Err(EvaluationError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_ambiguous_booleans_are_parse_error() {
        assert!(matches!(
            parse_structured(r#"{"is_phishing": true, "is_scam": false}"#),
            Err(EvaluationError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_confidence_out_of_range_is_parse_error() {
        assert!(matches!(
            parse_structured(r#"{"is_spam": true, "confidence": 1.5}"#),
            Err(EvaluationError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_structured_reasoning_accessor() {
        let verdict = parse_structured(r#"{"is_spam": false, "reasoning": "benign"}"#).unwrap();
        assert_eq!(verdict.reasoning(), Some("benign"));
        assert_eq!(parse_boolean("True").reasoning(), None);
    }
}

//! Structured results embedded in agent replies.
//!
//! Models often wrap JSON in a fenced code block or surround it with prose.
//! `translate` finds the JSON object and deserializes it.

use serde::de::DeserializeOwned;

/// Deserialize the JSON object carried by `text`.
///
/// Tries, in order: the whole text, the first ```` ```json ```` (or bare
/// ```` ``` ````) fenced block, then the span from the first `{` to the last
/// `}`. Returns `None` when none of them parse as `T`.
pub fn translate<T: DeserializeOwned>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    if let Some(block) = fenced_block(trimmed)
        && let Ok(value) = serde_json::from_str(block)
    {
        return Some(value);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // skip the info string ("json", "JSON", ...) up to the end of the line
    let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Review {
        score: u32,
        notes: String,
    }

    #[test]
    fn test_plain_json() {
        let review: Review = translate(r#"{"score": 82, "notes": "tight copy"}"#).unwrap();
        assert_eq!(review.score, 82);
    }

    #[test]
    fn test_fenced_json() {
        let text = "Here is my review:\n```json\n{\"score\": 55, \"notes\": \"too long\"}\n```\nThanks.";
        let review: Review = translate(text).unwrap();
        assert_eq!(
            review,
            Review {
                score: 55,
                notes: "too long".into()
            }
        );
    }

    #[test]
    fn test_json_inside_prose() {
        let text = r#"Verdict: {"score": 90, "notes": "ship it"} -- end"#;
        let review: Review = translate(text).unwrap();
        assert_eq!(review.score, 90);
    }

    #[test]
    fn test_malformed_returns_none() {
        assert!(translate::<Review>("{\"score\": 82,").is_none());
        assert!(translate::<Review>("no json here").is_none());
        assert!(translate::<Review>("} backwards {").is_none());
        assert!(translate::<Review>("").is_none());
    }

    #[test]
    fn test_wrong_shape_returns_none() {
        assert!(translate::<Review>(r#"{"rating": 5}"#).is_none());
    }
}

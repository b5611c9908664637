//! Pull structured payloads (code blocks, JSON) out of free-form model text.
//!
//! Every failure is a typed [`ExtractError`]; nothing here panics on model
//! output.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::ExtractError;

static FENCE_REGEX: OnceLock<Regex> = OnceLock::new();

fn fence_regex() -> &'static Regex {
    FENCE_REGEX.get_or_init(|| {
        Regex::new(r"(?s)```([A-Za-z0-9_+\-.]*)[^\n]*\n(.*?)```").expect("FENCE_REGEX is valid")
    })
}

/// A fenced block: language tag (possibly empty) and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub lang: String,
    pub body: String,
}

/// All fenced blocks in order of appearance.
pub fn code_blocks(text: &str) -> Vec<CodeBlock> {
    fence_regex()
        .captures_iter(text)
        .map(|caps| CodeBlock {
            lang: caps
                .get(1)
                .map(|m| m.as_str().to_ascii_lowercase())
                .unwrap_or_default(),
            body: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
        .collect()
}

/// Body of the first block tagged with one of `preferred` (case-insensitive),
/// else of the first block.
pub fn extract_code_block(text: &str, preferred: &[&str]) -> Result<String, ExtractError> {
    let blocks = code_blocks(text);
    let chosen = blocks
        .iter()
        .find(|b| preferred.iter().any(|p| b.lang.eq_ignore_ascii_case(p)))
        .or_else(|| blocks.first())
        .ok_or(ExtractError::NoCodeBlock)?;

    let body = chosen.body.trim_end();
    if body.trim().is_empty() {
        return Err(ExtractError::EmptyPayload);
    }

    let mut out = body.to_string();
    out.push('\n');
    Ok(out)
}

/// First balanced JSON object or array in `text`, fences stripped.
pub fn extract_json_str(text: &str) -> Result<String, ExtractError> {
    let source = code_blocks(text)
        .into_iter()
        .find(|b| b.lang.is_empty() || b.lang == "json")
        .map(|b| b.body)
        .unwrap_or_else(|| text.to_string());

    let start = source
        .char_indices()
        .find(|(_, c)| *c == '{' || *c == '[')
        .map(|(i, _)| i)
        .ok_or(ExtractError::NoJson)?;

    let substring = &source[start..];
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in substring.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(substring[..=i].to_string());
                }
            }
            _ => {}
        }
    }

    Err(ExtractError::InvalidJson("unbalanced brackets".to_string()))
}

/// Deserialize the first JSON payload in `text`.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, ExtractError> {
    let raw = extract_json_str(text)?;
    serde_json::from_str(&raw).map_err(|e| ExtractError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn prefers_requested_language() {
        let text = "Here you go:\n```bash\nnpm i\n```\nand\n```javascript\nconst a = 1;\n```\n";
        let code = extract_code_block(text, &["javascript", "js"]).unwrap();
        assert_eq!(code, "const a = 1;\n");
    }

    #[test]
    fn falls_back_to_first_block() {
        let text = "```\nplain\n```";
        assert_eq!(extract_code_block(text, &["ts"]).unwrap(), "plain\n");
    }

    #[test]
    fn missing_and_empty_blocks_are_typed_errors() {
        assert_eq!(
            extract_code_block("no fences at all", &["js"]),
            Err(ExtractError::NoCodeBlock)
        );
        assert_eq!(
            extract_code_block("```js\n   \n```", &["js"]),
            Err(ExtractError::EmptyPayload)
        );
    }

    #[test]
    fn block_tag_with_trailing_info_is_accepted() {
        let text = "```js title=\"tracing.js\"\nrequire('x');\n```";
        assert_eq!(extract_code_block(text, &["js"]).unwrap(), "require('x');\n");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        ok: bool,
        notes: Vec<String>,
    }

    #[test]
    fn json_inside_fence_and_prose() {
        let text = "Result:\n```json\n{\"ok\": true, \"notes\": [\"a}\", \"b\"]}\n```\nthanks";
        let v: Verdict = extract_json(text).unwrap();
        assert_eq!(
            v,
            Verdict {
                ok: true,
                notes: vec!["a}".into(), "b".into()]
            }
        );
    }

    #[test]
    fn bare_json_in_prose() {
        let v: Verdict = extract_json("sure! {\"ok\": false, \"notes\": []} done").unwrap();
        assert!(!v.ok);
    }

    #[test]
    fn json_failure_modes() {
        assert_eq!(extract_json_str("nothing here"), Err(ExtractError::NoJson));
        assert!(matches!(
            extract_json_str("{\"a\": [1, 2"),
            Err(ExtractError::InvalidJson(_))
        ));
        assert!(matches!(
            extract_json::<Verdict>("{\"ok\": 1}"),
            Err(ExtractError::InvalidJson(_))
        ));
    }
}

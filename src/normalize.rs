use crate::error::{Result, ScriptVisionError};

/// Clean up a raw generation response before extraction.
///
/// Drops a byte-order mark, folds `\r\n` and lone `\r` into `\n`, unwraps a
/// response that is entirely one markdown code fence, and trims. Blank
/// output is [`ScriptVisionError::EmptyResponse`].
pub fn normalize_response(raw: &str) -> Result<String> {
    let text = raw.trim_start_matches('\u{feff}');
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = strip_enclosing_fence(text.trim()).trim().to_string();

    if text.is_empty() {
        return Err(ScriptVisionError::EmptyResponse);
    }
    Ok(text)
}

/// Lossy conversion for bytes of unknown encoding.
pub fn sanitize_utf8_lossy(input: &[u8]) -> String {
    String::from_utf8_lossy(input).into_owned()
}

/// Longest prefix of `input` that fits in `max_bytes` without splitting a char.
pub fn clip_to_budget(input: &str, max_bytes: usize) -> &str {
    if input.len() <= max_bytes {
        return input;
    }

    let mut cut = max_bytes;
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    &input[..cut]
}

fn strip_enclosing_fence(text: &str) -> &str {
    if !text.starts_with("```") || !text.ends_with("```") || text.len() < 6 {
        return text;
    }

    let inner = &text[3..text.len() - 3];
    // A fence in the middle means several blocks, leave those alone.
    if inner.contains("```") {
        return text;
    }

    // Drop the info string (```json, ```text) on the opening line.
    match inner.find('\n') {
        Some(nl) if !inner[..nl].trim().contains(' ') => &inner[nl + 1..],
        Some(_) => inner,
        None => inner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_empty_response() {
        assert!(matches!(normalize_response(""), Err(ScriptVisionError::EmptyResponse)));
        assert!(matches!(
            normalize_response("  \r\n\t "),
            Err(ScriptVisionError::EmptyResponse)
        ));
        assert!(matches!(
            normalize_response("```\n```"),
            Err(ScriptVisionError::EmptyResponse)
        ));
    }

    #[test]
    fn test_line_endings_folded() {
        let out = normalize_response("a\r\nb\rc").unwrap();
        assert_eq!(out, "a\nb\nc");
    }

    #[test]
    fn test_enclosing_fence_removed() {
        let out = normalize_response("```json\n[{\"scene\":\"1\"}]\n```").unwrap();
        assert_eq!(out, "[{\"scene\":\"1\"}]");
    }

    #[test]
    fn test_multiple_fences_kept() {
        let raw = "```\na\n```\nthen\n```\nb\n```";
        assert_eq!(normalize_response(raw).unwrap(), raw);
    }

    #[test]
    fn test_bom_stripped() {
        assert_eq!(normalize_response("\u{feff}Scene 1").unwrap(), "Scene 1");
    }

    #[test]
    fn test_clip_respects_char_boundary() {
        let s = "héllo";
        assert_eq!(clip_to_budget(s, 2), "h");
        assert_eq!(clip_to_budget(s, 3), "hé");
        assert_eq!(clip_to_budget(s, 100), s);
    }

    #[test]
    fn test_lossy_sanitize() {
        assert_eq!(sanitize_utf8_lossy(b"ok\xff"), "ok\u{fffd}");
    }
}

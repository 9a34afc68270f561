//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Remove a markdown code fence the model may wrap JSON in.
/// Handles "```json ... ```" and bare "``` ... ```"; other text passes through trimmed.
pub fn strip_code_fences(text: &str) -> &str {
  let mut s = text.trim();
  if let Some(rest) = s.strip_prefix("```json") {
    s = rest;
  } else if let Some(rest) = s.strip_prefix("```") {
    s = rest;
  }
  if let Some(rest) = s.strip_suffix("```") {
    s = rest;
  }
  s.trim()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge model payloads.
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  let total = s.chars().count();
  if total <= max_chars {
    s.to_string()
  } else {
    let head: String = s.chars().take(max_chars).collect();
    format!("{}… ({} chars total)", head, total)
  }
}

use std::collections::HashMap;

/// Interpolate a template string by replacing `{{name}}` tokens with values from `vars`.
///
/// Notes:
/// - Whitespace around the token content is ignored: `{{  key  }}` == `{{key}}`.
/// - Unknown tokens are left intact to aid debugging.
pub fn interpolate_string(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut idx = 0;

    while let Some(offset) = template[idx..].find("{{") {
        let start = idx + offset;
        out.push_str(&template[idx..start]);

        let content_start = start + 2;
        match template[content_start..].find("}}") {
            Some(len) => {
                let end = content_start + len;
                let token = template[content_start..end].trim();
                match vars.get(token) {
                    Some(value) if !token.is_empty() => out.push_str(value),
                    _ => out.push_str(&template[start..end + 2]),
                }
                idx = end + 2;
            }
            None => {
                // No matching end, push rest and stop
                out.push_str(&template[start..]);
                idx = template.len();
            }
        }
    }

    if idx < template.len() {
        out.push_str(&template[idx..]);
    }

    out
}

/// Whether `s` still contains a complete `{{...}}` token.
pub fn has_unexpanded_tokens(s: &str) -> bool {
    s.find("{{")
        .is_some_and(|start| s[start + 2..].contains("}}"))
}

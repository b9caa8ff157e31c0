use sha2::{Digest, Sha256};

const MAX_STEM_CHARS: usize = 80;

/// Filesystem-safe, deterministic script name: `{sanitized_stem}--{short_hash(artifact_id)}.js`
pub fn script_filename(original_name: Option<&str>, artifact_id: &str) -> String {
    let stem = original_name.map(strip_extension).unwrap_or("recording");
    let sanitized = sanitize_stem(stem);
    let hash = short_hash(artifact_id);
    format!("{sanitized}--{hash}.js")
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

fn sanitize_stem(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        let c = if is_forbidden(c) || c.is_whitespace() { '_' } else { c };
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }

    let mut stem: String = compacted
        .trim_matches(&['_', '.'][..])
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    if stem.is_empty() {
        stem = "recording".to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    stem
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::script_filename;

    #[test]
    fn uses_stem_of_uploaded_file() {
        let name = script_filename(Some("Login flow.mp4"), "vid-1");
        assert!(name.starts_with("Login_flow--"), "{name}");
        assert!(name.ends_with(".js"));
        assert_eq!(name.len(), "Login_flow--".len() + 8 + ".js".len());
    }

    #[test]
    fn same_artifact_gives_same_name() {
        assert_eq!(
            script_filename(Some("a.mov"), "abc"),
            script_filename(Some("a.mov"), "abc")
        );
        assert_ne!(
            script_filename(Some("a.mov"), "abc"),
            script_filename(Some("a.mov"), "abd")
        );
    }

    #[test]
    fn hostile_names_are_sanitized() {
        let name = script_filename(Some("../../etc/pass:wd.webm"), "x");
        assert!(!name.contains('/'));
        assert!(!name.contains(':'));
        assert!(!name.starts_with('.'));

        assert!(script_filename(Some("CON.mp4"), "x").starts_with("CON_--"));
        assert!(script_filename(Some("???.mp4"), "x").starts_with("recording--"));
        assert!(script_filename(None, "x").starts_with("recording--"));
    }
}

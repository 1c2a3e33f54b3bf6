//! Raw-stream text extraction for markup the parser rejects

/// Elements whose bodies never count as text
const SKIPPED_BODIES: &[&str] = &["script", "style"];

/// Extract text straight from the byte stream: tags are skipped, the bodies
/// of `script` and `style` are dropped, and words are joined by single spaces.
pub fn extract_raw_text(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len() / 2);
    let lower = raw.to_ascii_lowercase();
    let bytes = raw.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] == b'<' {
            let Some(close) = raw[pos..].find('>') else {
                // Unterminated tag: the rest is markup noise
                break;
            };
            let tag_end = pos + close + 1;
            let tag = &lower[pos + 1..pos + close];
            pos = tag_end;

            if let Some(name) = SKIPPED_BODIES.iter().find(|name| opens(tag, name)) {
                let closing = format!("</{}", name);
                pos = match lower[pos..].find(&closing) {
                    Some(offset) => match raw[pos + offset..].find('>') {
                        Some(gt) => pos + offset + gt + 1,
                        None => bytes.len(),
                    },
                    None => bytes.len(),
                };
            }
            text.push(' ');
        } else {
            let next = raw[pos..].find('<').map(|i| pos + i).unwrap_or(bytes.len());
            text.push_str(&raw[pos..next]);
            pos = next;
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `tag` (contents between `<` and `>`, lowercased) opens `name`
fn opens(tag: &str, name: &str) -> bool {
    tag.strip_prefix(name)
        .map(|rest| rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '/'))
        .unwrap_or(false)
}

//! YAML frontmatter. Writing uses the one shape the site generator expects:
//! lists are always quoted, booleans are quoted, text is written as-is.
//! Reading accepts any YAML mapping and folds it back into that shape.

use crate::metadata::{MetadataMap, MetadataValue};
use serde_yaml::{Mapping, Value};
use std::fmt::Write as _;

const FENCE: &str = "---";

pub fn to_frontmatter(meta: &MetadataMap) -> String {
    let mut out = String::with_capacity(64 + meta.len() * 32);
    out.push_str(FENCE);
    out.push('\n');
    for (key, value) in meta.iter() {
        match value {
            MetadataValue::Text(text) => {
                let _ = writeln!(out, "{key}: {text}");
            }
            MetadataValue::Bool(b) => {
                let _ = writeln!(out, "{key}: \"{b}\"");
            }
            MetadataValue::List(items) => {
                let _ = writeln!(out, "{key}: ");
                for item in items {
                    let _ = writeln!(out, "  - \"{item}\"");
                }
            }
        }
    }
    out.push_str(FENCE);
    out.push('\n');
    out
}

/// Split a document into its fenced YAML block and the body after it.
fn split_frontmatter(doc: &str) -> Option<(&str, &str)> {
    let rest = doc.strip_prefix("---\n")?;
    let mut offset = 0;
    loop {
        let tail = &rest[offset..];
        match tail.find('\n') {
            Some(end) => {
                let line = &tail[..end];
                if line.trim_end() == FENCE {
                    return Some((&rest[..offset], &tail[end + 1..]));
                }
                offset += end + 1;
            }
            None if tail.trim_end() == FENCE => return Some((&rest[..offset], "")),
            None => return None,
        }
    }
}

/// Parse a fenced frontmatter block into its mapping and body. Returns `None`
/// when the document has no fenced block or the block is not a YAML mapping.
pub fn parse_frontmatter(doc: &str) -> Option<(MetadataMap, &str)> {
    let (block, body) = split_frontmatter(doc)?;
    let mapping = match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Mapping(m)) => m,
        Ok(Value::Null) => Mapping::new(),
        Ok(_) => {
            tracing::warn!("frontmatter is not a mapping");
            return None;
        }
        Err(e) => {
            tracing::warn!(error = %e, "unreadable frontmatter");
            return None;
        }
    };

    let mut meta = MetadataMap::new();
    for (key, value) in &mapping {
        meta.insert(scalar_text(key), from_yaml(value));
    }
    Some((meta, body))
}

/// Written booleans come back as the strings `"true"` / `"false"`, so those
/// fold back into `Bool`; bare YAML booleans stay text to keep their form.
fn from_yaml(value: &Value) -> MetadataValue {
    match value {
        Value::String(s) if s == "true" || s == "false" => MetadataValue::Bool(s == "true"),
        Value::String(s) => MetadataValue::Text(yaml_safe(s)),
        Value::Sequence(items) => MetadataValue::List(items.iter().map(scalar_text).collect()),
        Value::Tagged(tagged) => from_yaml(&tagged.value),
        Value::Mapping(_) => MetadataValue::Text(serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())),
        other => MetadataValue::Text(scalar_text(other)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// `s` as it must be written after `key: ` to read back as the same string.
fn yaml_safe(s: &str) -> String {
    let bare_ok = !s.is_empty()
        && !s.contains('\n')
        && matches!(serde_yaml::from_str::<Value>(s), Ok(Value::String(ref back)) if back == s);
    if bare_ok {
        s.to_string()
    } else {
        // A JSON string literal is a valid double-quoted YAML scalar.
        serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MetadataMap {
        let mut meta = MetadataMap::new();
        meta.insert("permalink", "my-post");
        meta.insert("publish", "true");
        meta.insert("title", "\"A: B\"");
        meta.insert("lw-is-linkpost", false);
        meta.insert("tags", vec!["AI".to_string(), "Rationality".to_string()]);
        meta
    }

    #[test]
    fn renders_each_variant() {
        let got = to_frontmatter(&sample());
        assert_eq!(
            got,
            "---\npermalink: my-post\npublish: true\ntitle: \"A: B\"\nlw-is-linkpost: \"false\"\ntags: \n  - \"AI\"\n  - \"Rationality\"\n---\n"
        );
    }

    #[test]
    fn parse_reads_back_rendered_block() {
        let doc = format!("{}Body text\n", to_frontmatter(&sample()));
        let (meta, body) = parse_frontmatter(&doc).expect("frontmatter");
        assert_eq!(meta, sample());
        assert_eq!(body, "Body text\n");
    }

    #[test]
    fn parse_rejects_unfenced_documents() {
        assert!(parse_frontmatter("no fence here\n").is_none());
        assert!(parse_frontmatter("---\nkey: value\n").is_none());
        assert!(parse_frontmatter("---\n- a list\n---\n").is_none());
    }

    #[test]
    fn text_that_needs_quotes_gets_them() {
        assert_eq!(yaml_safe("plain words"), "plain words");
        assert_eq!(yaml_safe("a: b"), "\"a: b\"");
        assert_eq!(yaml_safe("# not a comment"), "\"# not a comment\"");
        assert_eq!(yaml_safe("42"), "\"42\"");
        assert_eq!(yaml_safe(""), "\"\"");
    }
}

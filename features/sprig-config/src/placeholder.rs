use crate::{errors::PropertyError, provider::PropertySources};

const PREFIX: &str = "${";
const SUFFIX: char = '}';
const DEFAULT_SEPARATOR: char = ':';

/// Resolves placeholders in free text
pub(crate) fn resolve(text: &str, sources: &PropertySources) -> Result<String, PropertyError> {
    let mut visiting = Vec::new();
    resolve_recurse(text, sources, &mut visiting)
}

/// Resolves placeholders in the value of `key`, treating a reference back to `key` as a cycle
pub(crate) fn resolve_for_key(
    key: &str,
    raw: &str,
    sources: &PropertySources,
) -> Result<String, PropertyError> {
    let mut visiting = vec![key.to_string()];
    resolve_recurse(raw, sources, &mut visiting)
}

fn resolve_recurse(
    text: &str,
    sources: &PropertySources,
    visiting: &mut Vec<String>,
) -> Result<String, PropertyError> {
    if !text.contains(PREFIX) {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(PREFIX) {
        out.push_str(&rest[..start]);
        let after_prefix = &rest[start + PREFIX.len()..];
        let end = find_closing(after_prefix).ok_or_else(|| PropertyError::Unterminated(text.to_string()))?;

        // Nested placeholders inside the key are resolved first: ${${env}.port}
        let inner = resolve_recurse(&after_prefix[..end], sources, visiting)?;
        let (key, default) = match inner.split_once(DEFAULT_SEPARATOR) {
            Some((key, default)) => (key, Some(default)),
            None => (inner.as_str(), None),
        };

        match sources.get_raw(key) {
            Some(value) => {
                if visiting.iter().any(|v| v == key) {
                    let mut chain = visiting.clone();
                    chain.push(key.to_string());
                    return Err(PropertyError::CircularPlaceholder {
                        key: key.to_string(),
                        chain,
                    });
                }
                visiting.push(key.to_string());
                let resolved = resolve_recurse(value, sources, visiting)?;
                visiting.pop();
                out.push_str(&resolved);
            }
            None => match default {
                Some(default) => out.push_str(&resolve_recurse(default, sources, visiting)?),
                None => {
                    tracing::debug!("Unresolvable placeholder '{key}'");
                    return Err(PropertyError::UnresolvablePlaceholder {
                        key: key.to_string(),
                        text: text.to_string(),
                    });
                }
            },
        }

        rest = &after_prefix[end + SUFFIX.len_utf8()..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Index of the `}` closing a placeholder whose `${` was already consumed
fn find_closing(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '$' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                depth += 1;
            }
            SUFFIX if depth == 0 => return Some(i),
            SUFFIX => depth -= 1,
            _ => {}
        }
    }
    None
}

use crate::{ParsedTags, ReservedTags};

/// Parse a flat tag sequence. Never fails.
///
/// Duplicate keys keep the last value seen.
pub fn parse<I, S>(tags: I) -> ParsedTags
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = ParsedTags::empty();
    for tag in tags {
        let tag = tag.as_ref();
        match tag.split_once('=') {
            Some((key, value)) => {
                parsed.keyed.insert(key.to_string(), Some(value.to_string()));
            }
            None => parsed.plain.push(tag.to_string()),
        }
    }
    parsed
}

/// Serialize back into a flat tag sequence.
///
/// Keyed tags come first in map order, then plain tags in input relative
/// order. With `strip` set, reserved keys and reserved plain tags are dropped.
pub fn serialize(tags: &ParsedTags, strip: Option<&ReservedTags>) -> Vec<String> {
    let keep = |k: &str| strip.map_or(true, |r| !r.is_reserved(k));

    let mut out = Vec::with_capacity(tags.len());
    for (key, value) in &tags.keyed {
        if !keep(key) {
            continue;
        }
        match value {
            Some(v) => out.push(format!("{key}={v}")),
            None => out.push(key.clone()),
        }
    }
    for tag in &tags.plain {
        if keep(tag) {
            out.push(tag.clone());
        }
    }
    out
}

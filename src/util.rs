use std::time::{SystemTime, UNIX_EPOCH};

#[inline]
pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

#[inline]
pub(crate) fn unix_now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| {
            u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
        })
}

/// Build a response id of the form `<prefix>-<unix millis>`.
#[must_use]
pub(crate) fn timestamp_id(prefix: &str) -> String {
    let millis = unix_now_millis();
    let mut out = String::with_capacity(prefix.len() + 21);
    out.push_str(prefix);
    out.push('-');
    out.push_str(&millis.to_string());
    out
}

/// Truncate `text` to at most `max_len` bytes without splitting a UTF-8
/// sequence, appending `...` when anything was cut.
#[must_use]
pub(crate) fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&text[..end]);
    out.push_str("...");
    out
}

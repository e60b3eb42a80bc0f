//! Identifier and file-name derivation.

use std::sync::atomic::{AtomicI64, Ordering};

/// PostgreSQL truncates identifiers longer than this.
pub const MAX_IDENTIFIER_LEN: usize = 63;

static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp that is strictly increasing within this process.
pub fn next_timestamp_millis() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_TIMESTAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_TIMESTAMP.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

/// Lower-cases `raw` and collapses every run of characters outside
/// `[a-z0-9]` into one underscore.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    out
}

/// Derives the immutable menu key of an organization from its display name.
pub fn menu_table_name(name: &str, timestamp_millis: i64) -> String {
    let suffix = format!("_{timestamp_millis}");
    let mut base = sanitize_identifier(name);
    if !base.starts_with(|c: char| c.is_ascii_lowercase()) {
        base = if base.is_empty() {
            "org".to_string()
        } else {
            format!("org_{base}")
        };
    }
    base.truncate(MAX_IDENTIFIER_LEN.saturating_sub(suffix.len()));
    let base = base.trim_end_matches('_');
    format!("{base}{suffix}")
}

pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Stored name of an uploaded image: the sanitized stem of `original` plus
/// `.jpg`. Menu rows reference images through the same function, so
/// `"Margherita.JPG"` and `"margherita"` resolve to one file.
pub fn image_file_name(original: &str) -> Option<String> {
    let file_name = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    };
    let stem = sanitize_identifier(stem);
    if stem.is_empty() {
        return None;
    }
    Some(format!("{stem}.jpg"))
}

/// Lower-cased extension of `file_name`, without the dot.
pub fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

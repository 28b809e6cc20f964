//! String-level path normalization
//!
//! Cache paths are compared and signed as strings, so these helpers work on
//! `/`-separated strings rather than `std::path` types: the same input must
//! produce byte-identical output on every platform.

/// Convert backslashes to `/` and collapse repeated separators
pub fn normalize_separators(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut previous_was_separator = false;
    for c in path.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' {
            if previous_was_separator {
                continue;
            }
            previous_was_separator = true;
        } else {
            previous_was_separator = false;
        }
        normalized.push(c);
    }
    normalized
}

/// A relative file path: normalized, no leading or trailing separator
pub fn relative_file(path: &str) -> String {
    normalize_separators(path).trim_matches('/').to_string()
}

/// A relative folder: normalized, no leading separator, one trailing
/// separator. Empty input stays empty.
pub fn folder_relative(path: &str) -> String {
    let trimmed = relative_file(path);
    if trimmed.is_empty() {
        trimmed
    } else {
        format!("{}/", trimmed)
    }
}

/// An absolute folder: normalized, one leading and one trailing separator
pub fn folder_absolute(path: &str) -> String {
    let trimmed = relative_file(path);
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// Directory part of a path, `None` when the path has no directory
pub fn dirname(path: &str) -> Option<&str> {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(0) | None => None,
        Some(index) => Some(&path[..index]),
    }
}

/// Last component of a path
pub fn basename(path: &str) -> &str {
    let path = path.trim_end_matches(['/', '\\']);
    match path.rfind(['/', '\\']) {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

/// Last component without its final extension (`a.tar.gz` → `a.tar`)
pub fn file_stem(path: &str) -> &str {
    let name = basename(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(index) => &name[..index],
    }
}

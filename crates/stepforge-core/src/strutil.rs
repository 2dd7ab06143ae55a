//! Small string helpers shared by the model store and path checks.

/// Byte offset of the first ASCII case-insensitive occurrence of `needle`.
/// An empty needle matches at offset 0.
pub fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if pat.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - pat.len()).find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}

pub fn starts_with_ignore_ascii_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

pub fn make_ascii_upper(s: &mut String) -> &mut String {
    s.make_ascii_uppercase();
    s
}

pub fn make_ascii_lower(s: &mut String) -> &mut String {
    s.make_ascii_lowercase();
    s
}

/// Lowercased file extension, empty when there is none.
pub fn extension_lower(path: &std::path::Path) -> String {
    let mut ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    make_ascii_lower(&mut ext);
    ext
}

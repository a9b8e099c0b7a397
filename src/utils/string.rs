//! UTF-8 safe string helpers.
//!
//! Slicing by byte index panics on multibyte characters, so everything here
//! works on char boundaries.

/// Return a preview of `s` up to `n` characters, with a trailing `...` when
/// anything was cut. Used for log fields and the `/tasks` listing.
pub fn preview(s: &str, n: usize) -> String {
    let mut prefix: String = s.chars().take(n).collect();
    if s.chars().count() > n {
        prefix.push_str("...");
    }
    prefix
}

/// Cap `s` at `max_bytes`, cutting on a char boundary and appending a
/// `...[truncated N bytes]` marker. Returns the input unchanged when it fits.
///
/// # Example
/// ```
/// use taskpilot::utils::string::truncate_output;
///
/// let out = truncate_output("abcdefghij", 4);
/// assert!(out.starts_with("abcd"));
/// assert!(out.contains("truncated 6 bytes"));
/// ```
pub fn truncate_output(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut cut = max_bytes;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n...[truncated {} bytes]", &s[..cut], s.len() - cut)
}

//! Mission slug normalization
//!
//! A mission slug is the globally unique, URL-safe join key for a
//! mission. Operators choose it; we only accept inputs that are
//! already in normalized form so the identifier an operator typed is
//! the identifier everything else sees.

/// Normalize an arbitrary string into slug form: lowercase ASCII
/// alphanumerics with runs of any other characters collapsed into a
/// single `-`, with no leading or trailing `-`.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

/// Check whether the input is already a valid, normalized slug.
///
/// Empty strings are never valid slugs.
pub fn is_normalized(input: &str) -> bool {
    !input.is_empty() && normalize(input) == input
}

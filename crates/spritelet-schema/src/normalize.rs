/// Canonicalize a human-entered state label into its catalog key.
///
/// Trims, lower-cases, and joins whitespace-separated words with a single
/// `-`. The result is a fixed point: normalizing it again yields the same
/// string.
pub fn normalize_simple_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// True when `name` is already in canonical form.
pub fn is_normalized(name: &str) -> bool {
    normalize_simple_name(name) == name
}

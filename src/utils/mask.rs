//! Secret masking for logs and `Debug` output.

/// Characters of a secret that may be shown.
const VISIBLE_PREFIX_CHARS: usize = 4;

/// Secrets this short are hidden entirely.
const MIN_MASKABLE_CHARS: usize = 8;

/// Reduce a secret to a short prefix, e.g. `"abcd..."`.
///
/// Counts characters rather than bytes so multibyte input never splits.
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() <= MIN_MASKABLE_CHARS {
        return "****".to_string();
    }

    let prefix: String = secret.chars().take(VISIBLE_PREFIX_CHARS).collect();
    format!("{prefix}...")
}

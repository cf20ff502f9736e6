//! Standard pattern library.
//!
//! Natural-language forms for the common collection and string operations. Order matters:
//! candidates sharing a leading keyword are tried in the order listed here, so the more
//! specific `SORT ... BY` shape comes before the general `SORT`.

use crate::diagnostics::QuillError;
use crate::patterns::PatternRegistry;

// ===================================================================================================
// REGISTRY: Standard Pattern Registration
// ===================================================================================================

pub const STD_PATTERNS: &[(&str, &str)] = &[
    // Collections
    ("TAKE $count FROM $array", "ARRAY_TAKE($array, $count)"),
    ("SORT $array BY $key", "ARRAY_SORT_BY($array, $key)"),
    ("SORT $array ORDER? $order?", r#"ARRAY_SORT($array, $order="ASC")"#),
    ("REVERSE $array", "ARRAY_REVERSE($array)"),
    ("APPEND $item ONTO $array", "ARRAY_PUSH($array, $item)"),
    ("REMOVE $item FROM $array", "ARRAY_REMOVE($array, $item)"),
    // Strings
    ("REPEAT $text:STRING TIMES $count", "STRING_REPEAT($text, $count)"),
    ("JOIN $array USING? $separator?", r#"STRING_JOIN($array, $separator=" ")"#),
    // Timing
    ("WAIT $duration:INT MILLISECONDS?", "SLEEP($duration)"),
];

/// Registers all standard patterns in the given registry.
pub fn register_std_patterns(registry: &mut PatternRegistry) -> Result<(), QuillError> {
    for (pattern, transform) in STD_PATTERNS {
        registry.register(pattern, transform)?;
    }
    Ok(())
}

/// A fresh registry holding only the standard patterns.
pub fn standard_registry() -> Result<PatternRegistry, QuillError> {
    let mut registry = PatternRegistry::new();
    register_std_patterns(&mut registry)?;
    Ok(registry)
}

/// Default collection name for an entity type
///
/// Lower-cases the type name, then `y` after a consonant becomes `ies`,
/// a trailing `s`, `sh`, `ch`, `x` or `z` takes `es`, anything else takes `s`.
pub fn plural(type_name: &str) -> String {
    let lower = type_name.to_lowercase();
    if let Some(stem) = lower.strip_suffix('y') {
        let after_vowel = stem
            .chars()
            .last()
            .is_some_and(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'));
        if !after_vowel && !stem.is_empty() {
            return format!("{}ies", stem);
        }
    }
    if ["s", "sh", "ch", "x", "z"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{}es", lower);
    }
    format!("{}s", lower)
}

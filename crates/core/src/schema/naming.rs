//! Table naming convention: `<prefix>-<pluralized-entity-name>`.

use convert_case::{Case, Casing};

/// Build the physical table name for an entity.
///
/// The entity name is kebab-cased and its last word pluralized. An empty
/// prefix yields just the pluralized name.
pub fn table_name(prefix: &str, entity: &str) -> String {
    let plural = pluralize(&entity.to_case(Case::Kebab));
    if prefix.is_empty() {
        plural
    } else {
        format!("{prefix}-{plural}")
    }
}

/// Pluralize an English word using the common suffix rules.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !"aeiou".contains(c.to_ascii_lowercase())) {
            return format!("{stem}ies");
        }
    }

    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{word}es");
    }

    format!("{word}s")
}

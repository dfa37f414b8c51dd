//! Fixed mapping from platform language names to Judge0 CE language ids.

/// (platform name, Judge0 id, human-readable toolchain).
pub const LANGUAGES: &[(&str, i32, &str)] = &[
    ("c", 50, "C (GCC 9.2.0)"),
    ("cpp", 54, "C++ (GCC 9.2.0)"),
    ("java", 62, "Java (OpenJDK 13)"),
    ("python", 71, "Python (3.8.1)"),
    ("javascript", 63, "JavaScript (Node.js 12.14.0)"),
];

/// Resolve a platform language name to its backend id.
pub fn language_id(name: &str) -> Option<i32> {
    LANGUAGES
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, id, _)| *id)
}

/// All supported platform language names.
pub fn supported_languages() -> Vec<&'static str> {
    LANGUAGES.iter().map(|(n, _, _)| *n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_languages_resolve() {
        assert_eq!(language_id("cpp"), Some(54));
        assert_eq!(language_id("python"), Some(71));
        assert_eq!(language_id("java"), Some(62));
    }

    #[test]
    fn test_unknown_language_is_none() {
        assert_eq!(language_id("brainfuck"), None);
        assert_eq!(language_id(""), None);
        // Lookup is exact, not case-insensitive.
        assert_eq!(language_id("Python"), None);
    }

    #[test]
    fn test_table_has_no_duplicate_names() {
        let mut names: Vec<_> = LANGUAGES.iter().map(|(n, _, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), LANGUAGES.len());
    }
}

//! UI locale detection from URL paths.
//!
//! The site is published under `/<repo>/<locale>/…`; the segment after the
//! repository name selects the UI locale. Anything else falls back to
//! English.

use std::fmt;

/// Supported UI locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    En,
    Fr,
    De,
}

impl Default for Locale {
    fn default() -> Self {
        Locale::En
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl Locale {
    /// Parse a single path segment. Case-insensitive; unknown segments are
    /// `None`.
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment.to_lowercase().as_str() {
            "en" => Some(Locale::En),
            "fr" => Some(Locale::Fr),
            "de" => Some(Locale::De),
            _ => None,
        }
    }

    /// The segment used in locale-prefixed URLs.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
            Locale::De => "de",
        }
    }

    /// Language tag the embedded widget understands.
    pub fn widget_tag(&self) -> &'static str {
        match self {
            Locale::En => "en_US",
            Locale::Fr => "fr",
            Locale::De => "de",
        }
    }

    /// BCP 47-ish form for the document language attribute (`en-US`).
    pub fn html_lang(&self) -> String {
        self.widget_tag().replace('_', "-")
    }

    pub fn all() -> &'static [Locale] {
        &[Locale::En, Locale::Fr, Locale::De]
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Detect the UI locale from a URL path, relative to the repository segment.
///
/// The locale is the segment immediately after `repo`. When `repo` is absent
/// from the path, or the following segment is missing or unsupported, the
/// fallback locale (`En`) is returned.
pub fn detect(path: &str, repo: &str) -> Locale {
    let parts = segments(path);
    match parts.iter().position(|p| *p == repo) {
        Some(idx) => parts
            .get(idx + 1)
            .and_then(|s| Locale::from_path_segment(s))
            .unwrap_or_default(),
        None => Locale::default(),
    }
}

/// Base path of the site: `/…/<repo>/` when the repository segment is
/// present, `/` otherwise.
pub fn base_path(path: &str, repo: &str) -> String {
    let parts = segments(path);
    match parts.iter().position(|p| *p == repo) {
        Some(idx) => format!("/{}/", parts[..=idx].join("/")),
        None => "/".to_string(),
    }
}

/// Navigation target for switching the page to `locale`.
pub fn locale_url(path: &str, repo: &str, locale: Locale) -> String {
    format!("{}{}/", base_path(path, repo), locale.path_segment())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const REPO: &str = "qualifiedReplacement";

    #[rstest]
    #[case("en", Locale::En)]
    #[case("fr", Locale::Fr)]
    #[case("de", Locale::De)]
    #[case("EN", Locale::En)]
    #[case("De", Locale::De)]
    fn test_segment_parses(#[case] seg: &str, #[case] expected: Locale) {
        assert_eq!(Locale::from_path_segment(seg), Some(expected));
    }

    #[rstest]
    #[case("es")]
    #[case("")]
    #[case("english")]
    #[case("en-us")]
    fn test_segment_rejects(#[case] seg: &str) {
        assert_eq!(Locale::from_path_segment(seg), None);
    }

    #[rstest]
    #[case("/qualifiedReplacement/en/", Locale::En)]
    #[case("/qualifiedReplacement/fr/", Locale::Fr)]
    #[case("/qualifiedReplacement/de/pricing", Locale::De)]
    #[case("/qualifiedReplacement/", Locale::En)]
    #[case("/qualifiedReplacement/es/", Locale::En)]
    #[case("/somewhere/else/", Locale::En)]
    #[case("", Locale::En)]
    fn test_detect(#[case] path: &str, #[case] expected: Locale) {
        assert_eq!(detect(path, REPO), expected);
    }

    #[test]
    fn test_base_path_with_repo() {
        assert_eq!(
            base_path("/qualifiedReplacement/en/", REPO),
            "/qualifiedReplacement/"
        );
    }

    #[test]
    fn test_base_path_nested_prefix() {
        assert_eq!(
            base_path("/pages/qualifiedReplacement/fr/", REPO),
            "/pages/qualifiedReplacement/"
        );
    }

    #[test]
    fn test_base_path_without_repo() {
        assert_eq!(base_path("/other/site/", REPO), "/");
    }

    #[test]
    fn test_locale_url() {
        assert_eq!(
            locale_url("/qualifiedReplacement/en/", REPO, Locale::De),
            "/qualifiedReplacement/de/"
        );
        assert_eq!(locale_url("/elsewhere/", REPO, Locale::Fr), "/fr/");
    }

    #[test]
    fn test_widget_tags() {
        assert_eq!(Locale::En.widget_tag(), "en_US");
        assert_eq!(Locale::Fr.widget_tag(), "fr");
        assert_eq!(Locale::De.widget_tag(), "de");
    }

    #[test]
    fn test_html_lang_uses_hyphen() {
        assert_eq!(Locale::En.html_lang(), "en-US");
        assert_eq!(Locale::De.html_lang(), "de");
    }

    proptest! {
        #[test]
        fn test_detect_never_panics(path in ".{0,120}", repo in "[a-zA-Z0-9]{1,20}") {
            let _ = detect(&path, &repo);
            let _ = base_path(&path, &repo);
        }

        #[test]
        fn test_detect_always_supported(path in ".{0,120}") {
            let loc = detect(&path, "repo");
            prop_assert!(Locale::all().contains(&loc));
        }
    }
}

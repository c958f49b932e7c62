//! Heading ID generation for anchor links.

use std::collections::HashMap;

/// Convert heading text to a URL-friendly slug.
///
/// ```
/// use docview_core::render::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("  Multiple   spaces "), "multiple-spaces");
/// ```
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '_' {
                Some(c)
            } else if c == ' ' || c == '-' {
                Some('-')
            } else {
                None
            }
        })
        .collect::<String>()
        // Collapse multiple hyphens into one
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Hands out unique heading IDs within one document.
///
/// Repeated slugs get a numeric suffix, `intro`, `intro-1`, `intro-2`.
#[derive(Debug, Default)]
pub(crate) struct HeadingIds {
    seen: HashMap<String, usize>,
}

impl HeadingIds {
    pub(crate) fn unique(&mut self, text: &str) -> String {
        let slug = slugify(&text.replace('`', ""));
        let count = self.seen.entry(slug.clone()).or_insert(0);
        let id = if *count == 0 {
            slug
        } else {
            format!("{slug}-{count}")
        };
        *count += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("snake_case-and-dash"), "snake_case-and-dash");
        assert_eq!(slugify("Ünïcode Héading"), "ünïcode-héading");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_unique_ids() {
        let mut ids = HeadingIds::default();
        assert_eq!(ids.unique("Intro"), "intro");
        assert_eq!(ids.unique("Intro"), "intro-1");
        assert_eq!(ids.unique("`Intro`"), "intro-2");
        assert_eq!(ids.unique("Usage"), "usage");
    }
}

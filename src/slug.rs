//! URL slugs for titles and tag names.
//!
//! Non-ASCII text is transliterated with `deunicode` first, so `Café Über`
//! becomes `cafe-uber` instead of losing its letters.

/// Convert free text into a lowercase, dash-separated, URL-safe identifier.
///
/// - `"Hello, World!"` → `"hello-world"`
/// - `"  Rust 2024 "` → `"rust-2024"`
/// - `"C++"` → `"c"`
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_collapses_to_single_dash() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
    }

    #[test]
    fn surrounding_whitespace_trimmed() {
        assert_eq!(slugify("  Rust 2024 "), "rust-2024");
    }

    #[test]
    fn existing_dashes_preserved() {
        assert_eq!(slugify("my-first-post"), "my-first-post");
    }

    #[test]
    fn unicode_transliterated() {
        assert_eq!(slugify("Café Über"), "cafe-uber");
    }

    #[test]
    fn symbols_only_is_empty() {
        assert_eq!(slugify("+++"), "");
    }

    #[test]
    fn distinct_names_can_collide() {
        assert_eq!(slugify("C++"), slugify("c"));
    }
}

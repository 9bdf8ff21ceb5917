//! Filename conventions shared by identity resolution and default metadata.
//!
//! Photos straight off a phone are named like `IMG_7053.HEIC`. Two things are
//! derived from that name:
//!
//! - a **slug fragment**, lowercase and URL-safe: `IMG_7053.HEIC` → `img-7053`
//! - a **display title**, used until someone types a real one into the
//!   spreadsheet: `IMG_7053.HEIC` → `Img 7053`
//!
//! Both operate on the file *stem*; the extension never leaks into either.

use std::path::Path;

/// Separator used between slug words and between category and stem.
pub const SLUG_SEPARATOR: char = '-';

/// Filename stem (everything before the last dot). Falls back to the whole
/// name for dotfiles and names without an extension.
pub fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// Reduce arbitrary text to a slug fragment.
///
/// - Lowercases ASCII letters
/// - Whitespace, `_`, `.` and `-` become a single separator
/// - Any other character outside `[a-z0-9]` is dropped
/// - Consecutive separators collapse; leading/trailing ones are trimmed
///
/// ```
/// # use wardrobe_catalog::naming::slugify;
/// assert_eq!(slugify("IMG_7053"), "img-7053");
/// assert_eq!(slugify("  Blue  Shirt (old) "), "blue-shirt-old");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_sep = true;
    for c in text.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
            prev_sep = false;
        } else if (c.is_whitespace() || matches!(c, '_' | '.' | '-')) && !prev_sep {
            slug.push(SLUG_SEPARATOR);
            prev_sep = true;
        }
    }
    while slug.ends_with(SLUG_SEPARATOR) {
        slug.pop();
    }
    slug
}

/// Human-readable title from a filename.
///
/// Words are split on `_`, `-` and whitespace, then title-cased:
/// `IMG_7055.HEIC` → `Img 7055`, `blue-oxford-shirt.jpg` → `Blue Oxford Shirt`.
pub fn title_from_filename(filename: &str) -> String {
    file_stem(filename)
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

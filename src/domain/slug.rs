pub const MAX_SLUG_LEN: usize = 80;

/// Lowercase, ASCII-alphanumeric slug derived from a title. Generated once
/// at creation time; edits to the title never touch it.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len().min(MAX_SLUG_LEN));
    let mut last_was_dash = true;
    for ch in title.chars() {
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "feature-request".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Candidate for the nth collision retry. The base slug stays stable so
/// suffixed slugs remain recognizable.
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    assert!(!base.is_empty(), "Slug base must not be empty");
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{base}-{}", attempt + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Dark mode support"), "dark-mode-support");
        assert_eq!(slugify("  Add CSV  export!! "), "add-csv-export");
        assert_eq!(slugify("Émoji ünïcode"), "moji-n-code");
    }

    #[test]
    fn slugify_never_empty() {
        assert_eq!(slugify("!!!"), "feature-request");
        assert_eq!(slugify(""), "feature-request");
    }

    #[test]
    fn slugify_respects_length_cap() {
        let long = "word ".repeat(50);
        let slug = slugify(&long);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn collision_candidates() {
        assert_eq!(slug_candidate("dark-mode", 0), "dark-mode");
        assert_eq!(slug_candidate("dark-mode", 1), "dark-mode-2");
        assert_eq!(slug_candidate("dark-mode", 2), "dark-mode-3");
    }
}

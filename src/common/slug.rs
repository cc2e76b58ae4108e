//! Slug derivation for event titles.
//!
//! Lossy by design: lowercase, runs of non-alphanumeric characters collapse
//! to a single hyphen, leading/trailing hyphens are stripped. Derived once at
//! creation time; uniqueness is not checked client-side.

pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn collapses_symbol_runs_to_one_hyphen() {
        assert_eq!(slugify("AI & ML Summit 2025!"), "ai-ml-summit-2025");
    }

    #[test]
    fn strips_leading_and_trailing_separators() {
        assert_eq!(slugify("  --Hack Night-- "), "hack-night");
    }

    #[test]
    fn empty_and_symbol_only_titles_become_empty() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn plain_titles_pass_through_lowercased() {
        assert_eq!(slugify("Showcase"), "showcase");
    }
}

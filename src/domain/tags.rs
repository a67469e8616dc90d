use std::collections::HashSet;

use crate::domain::error::DomainError;

pub const MAX_TAGS: usize = 20;
const MAX_TAG_CHARS: usize = 40;

/// Trims tags, drops blanks and case-insensitive duplicates, keeping the
/// first spelling in the order given.
pub fn normalize_tags<I, S>(tags: I) -> Result<Vec<String>, DomainError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > MAX_TAG_CHARS {
            return Err(DomainError::validation(format!(
                "tag `{tag}` exceeds {MAX_TAG_CHARS} characters"
            )));
        }
        if seen.insert(tag.to_lowercase()) {
            out.push(tag.to_string());
        }
    }

    if out.len() > MAX_TAGS {
        return Err(DomainError::validation(format!(
            "at most {MAX_TAGS} tags are allowed"
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_keep_first_spelling() {
        let tags = normalize_tags(["Horror", " sci-fi", "horror", "", "Sci-Fi", "romance"])
            .expect("valid tags");
        assert_eq!(tags, vec!["Horror", "sci-fi", "romance"]);
    }
}

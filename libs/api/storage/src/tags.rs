// [libs/api/storage/src/tags.rs]
//! `tag_option` selection over a tag's per-write URL list (spec.md
//! §4.4: "tag_option ∈ {all, first, last} selects which to fetch").

use flame_domain_models::TagOption;

pub fn select(urls: &[String], option: TagOption) -> Vec<String> {
    match option {
        TagOption::All => urls.to_vec(),
        TagOption::First => urls.first().cloned().into_iter().collect(),
        TagOption::Last => urls.last().cloned().into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> Vec<String> {
        vec!["https://store/local/a".into(), "https://store/local/b".into(), "https://store/local/c".into()]
    }

    #[test]
    fn all_returns_every_url() {
        assert_eq!(select(&urls(), TagOption::All), urls());
    }

    #[test]
    fn first_and_last_return_single_entries() {
        assert_eq!(select(&urls(), TagOption::First), vec!["https://store/local/a".to_string()]);
        assert_eq!(select(&urls(), TagOption::Last), vec!["https://store/local/c".to_string()]);
    }

    #[test]
    fn empty_list_yields_empty_selection() {
        assert!(select(&[], TagOption::First).is_empty());
    }
}

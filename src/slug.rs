use lazy_static::lazy_static;
use regex::Regex;

/// URL slug for a post or tag title: every character that is not a word
/// character or `+` becomes `-`, then the whole string is lowercased.
pub fn slugify(title: &str) -> String {
    lazy_static! {
        static ref NON_WORD: Regex = Regex::new(r"[^\w+]").expect("slug regex compiles");
    }
    NON_WORD.replace_all(title, "-").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn spaces_and_punctuation_become_dashes() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Rust: 2024 edition!"), "rust--2024-edition-");
    }

    #[test]
    fn word_characters_and_plus_survive() {
        assert_eq!(slugify("C++_rocks"), "c++_rocks");
        assert_eq!(slugify("Привет мир"), "привет-мир");
    }

    #[test]
    fn already_a_slug() {
        assert_eq!(slugify("rust"), "rust");
        assert_eq!(slugify(""), "");
    }
}

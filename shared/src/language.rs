use async_trait::async_trait;
use thiserror::Error;

/// Minimum share of letters each script needs before a mixed text without the
/// `". "` delimiter counts as bilingual.
const BILINGUAL_MIN_SHARE: f64 = 0.2;

const TAMIL_BLOCK: std::ops::RangeInclusive<char> = '\u{0B80}'..='\u{0BFF}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Tamil,
    /// Tamil and another language in the same payload.
    Bilingual,
    Other,
    Unknown,
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("language detection failed: {0}")]
    Detection(String),
}

/// Labels the language of a comment. Implementations may do network I/O.
#[async_trait]
pub trait LanguageClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Language, ClassifyError>;
}

/// Local classifier that looks at which Unicode scripts the letters belong to.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptClassifier;

#[async_trait]
impl LanguageClassifier for ScriptClassifier {
    async fn classify(&self, text: &str) -> Result<Language, ClassifyError> {
        Ok(classify_script(text))
    }
}

/// Count (Tamil, other) letters. Vowel signs and the virama sit in the
/// Tamil block too and count as Tamil.
fn script_counts(text: &str) -> (usize, usize) {
    text.chars().fold((0, 0), |(tamil, other), c| {
        if TAMIL_BLOCK.contains(&c) {
            (tamil + 1, other)
        } else if c.is_alphabetic() {
            (tamil, other + 1)
        } else {
            (tamil, other)
        }
    })
}

/// Tamil-led left side and Tamil-free right side around the first `". "`.
fn follows_bilingual_convention(text: &str) -> bool {
    match split_bilingual(text) {
        Some((left, right)) => {
            let (left_tamil, left_other) = script_counts(&left);
            let (right_tamil, right_other) = script_counts(&right);
            left_tamil > left_other && right_tamil == 0 && right_other > 0
        }
        None => false,
    }
}

pub fn classify_script(text: &str) -> Language {
    let (tamil, other) = script_counts(text);

    let total = tamil + other;
    if total == 0 {
        return Language::Unknown;
    }
    if other == 0 {
        return Language::Tamil;
    }
    if tamil == 0 {
        return Language::Other;
    }

    // An explicit delimiter wins over the share rule, however short either side is.
    if follows_bilingual_convention(text) {
        return Language::Bilingual;
    }

    let tamil_share = tamil as f64 / total as f64;
    let other_share = other as f64 / total as f64;
    if tamil_share >= BILINGUAL_MIN_SHARE && other_share >= BILINGUAL_MIN_SHARE {
        Language::Bilingual
    } else if tamil_share > other_share {
        Language::Tamil
    } else {
        Language::Other
    }
}

/// Split "Tamil text. English text." on the first `". "`.
/// Returns `None` when there is no delimiter or either side is empty.
pub fn split_bilingual(text: &str) -> Option<(String, String)> {
    let (tamil, english) = text.split_once(". ")?;
    let tamil = tamil.trim();
    let english = english.trim();
    if tamil.is_empty() || english.is_empty() {
        return None;
    }
    Some((format!("{}.", tamil), english.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_script() {
        assert_eq!(classify_script("Hello"), Language::Other);
        assert_eq!(classify_script("நல்ல முயற்சி"), Language::Tamil);
        assert_eq!(
            classify_script("நல்ல முயற்சி. Good effort."),
            Language::Bilingual
        );
        assert_eq!(classify_script("123 !?"), Language::Unknown);
        assert_eq!(classify_script(""), Language::Unknown);
    }

    #[test]
    fn test_stray_word_does_not_make_text_bilingual() {
        // One English word inside a long Tamil sentence
        assert_eq!(
            classify_script("இன்று பயிற்சியில் மிகவும் நன்றாக விளையாடினார் ok"),
            Language::Tamil
        );
        assert_eq!(
            classify_script("Great footwork and passing today, keep it up நன்று"),
            Language::Other
        );
    }

    #[test]
    fn test_delimited_comment_with_short_tamil_opener_is_bilingual() {
        assert_eq!(
            classify_script("சரி. Good effort today, keep working on your passing drills"),
            Language::Bilingual
        );
        // English first does not follow the convention
        assert_eq!(
            classify_script("Good effort today, keep working on your passing drills. சரி"),
            Language::Other
        );
    }

    #[tokio::test]
    async fn test_script_classifier_never_fails() {
        let label = ScriptClassifier.classify("வணக்கம்").await.unwrap();
        assert_eq!(label, Language::Tamil);
    }

    #[test]
    fn test_split_bilingual() {
        assert_eq!(
            split_bilingual("நல்ல முயற்சி. Good effort."),
            Some(("நல்ல முயற்சி.".to_string(), "Good effort.".to_string()))
        );
        // Only the first delimiter splits
        assert_eq!(
            split_bilingual("ஒன்று. One. Two."),
            Some(("ஒன்று.".to_string(), "One. Two.".to_string()))
        );
        assert_eq!(split_bilingual("நல்ல முயற்சி Good effort"), None);
        assert_eq!(split_bilingual(". Good effort"), None);
    }
}

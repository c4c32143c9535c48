//! Profile text cleaning applied before embedding

/// Generic credential and role words that carry no matching signal
const STOPWORDS_AR: &[&str] = &[
    "مهندس", "شهادة", "لقب", "اول", "ثاني", "بكالوريوس", "ماجستير", "خبرة", "دورة",
    "متدرب", "حاصل", "مهندسة", "مستشار", "متدربة", "حاصلة",
];

/// Boilerplate phrases shared by every profile
const PHRASES_AR: &[&str] = &[
    "يتطوّع في مجتمع \"هارموني\" ضمن",
    "تتطوّع في مجتمع \"هارموني\" ضمن",
];

/// Punctuation stripped from tokens (Latin and Arabic)
const PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '(', ')', '"', '\'', '[', ']', '{', '}', '<', '>', '،', '؛', 'ـ',
];

/// Arabic definite article
const ARTICLE_AR: &str = "ال";

/// Collapse all whitespace runs (including newlines) to single spaces
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove boilerplate phrases, punctuation, the leading definite article and
/// stopwords from already-normalized text
pub fn remove_stopwords(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut cleaned = text.replace(['“', '”'], "\"");
    for phrase in PHRASES_AR {
        cleaned = cleaned.replace(phrase, " ");
    }

    cleaned
        .split_whitespace()
        .map(|token| {
            let token: String = token.chars().filter(|c| !PUNCTUATION.contains(c)).collect();
            match token.strip_prefix(ARTICLE_AR) {
                Some(rest) => rest.trim().to_string(),
                None => token.trim().to_string(),
            }
        })
        .filter(|token| !token.is_empty() && !STOPWORDS_AR.contains(&token.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full cleaning pipeline for one field
pub fn clean_field(text: &str) -> String {
    remove_stopwords(&normalize_text(text))
}

/// Whole-profile text: academic, professional and personal joined
pub fn profile_text(academic: &str, professional: &str, personal: &str) -> String {
    [academic, professional, personal]
        .iter()
        .filter(|t| !t.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Embedding APIs reject empty inputs; substitute a single space
pub fn embeddable(text: &str) -> String {
    if text.trim().is_empty() {
        " ".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  a\n\nb \t c  "), "a b c");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_remove_stopwords_and_article() {
        assert_eq!(remove_stopwords("مهندس البرمجيات"), "برمجيات");
        assert_eq!(remove_stopwords("خبرة (عشر) سنوات."), "عشر سنوات");
    }

    #[test]
    fn test_remove_boilerplate_phrase() {
        let text = "يتطوّع في مجتمع “هارموني” ضمن فريق التعليم";
        assert_eq!(remove_stopwords(text), "فريق تعليم");
    }

    #[test]
    fn test_latin_text_kept() {
        assert_eq!(clean_field("Senior  Data\nScientist, ML"), "Senior Data Scientist ML");
    }

    #[test]
    fn test_profile_text_skips_empty() {
        assert_eq!(profile_text("a", "", "c"), "a c");
        assert_eq!(profile_text("", "", ""), "");
        assert_eq!(embeddable(""), " ");
        assert_eq!(embeddable("x"), "x");
    }
}

//! Natural-language detection for chunks and questions.
//!
//! Detection is fallible: callers decide what to substitute when no language
//! can be determined (the pipelines use "unknown").

use unicode_segmentation::UnicodeSegmentation;

/// Number of characters inspected by [`HeuristicDetector`].
const SAMPLE_CHARS: usize = 500;

/// Error raised when a detector can not name a language.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectionError {
    /// The text has no letters or no decisive signal.
    #[error("language could not be determined")]
    Undetermined,

    /// A detector backend failed.
    #[error("language detector failed: {0}")]
    Backend(String),
}

/// Trait for language detectors.
pub trait LanguageDetector: Send + Sync {
    /// Return an ISO 639-1 code such as "en", "es" or "zh".
    fn detect(&self, text: &str) -> Result<String, DetectionError>;
}

/// Script- and stop-word-based language detector.
///
/// Non-Latin scripts are identified by their Unicode blocks. Latin-script
/// text is scored against short stop-word lists and a few distinctive
/// letters; the best language must win outright.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicDetector;

impl HeuristicDetector {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Script {
    Latin,
    Han,
    Kana,
    Hangul,
    Arabic,
    Hebrew,
    Cyrillic,
    Greek,
    Devanagari,
    Thai,
    Other,
}

fn script_of(c: char) -> Script {
    match c as u32 {
        0x0041..=0x024F => Script::Latin,
        0x0370..=0x03FF => Script::Greek,
        0x0400..=0x04FF => Script::Cyrillic,
        0x0590..=0x05FF => Script::Hebrew,
        0x0600..=0x06FF | 0x0750..=0x077F => Script::Arabic,
        0x0900..=0x097F => Script::Devanagari,
        0x0E00..=0x0E7F => Script::Thai,
        0x1100..=0x11FF | 0x3130..=0x318F | 0xAC00..=0xD7AF => Script::Hangul,
        0x3040..=0x30FF => Script::Kana,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF => Script::Han,
        _ => Script::Other,
    }
}

/// (language, stop words, distinctive letters)
const LATIN_PROFILES: [(&str, &[&str], &[char]); 7] = [
    (
        "en",
        &[
            "the", "and", "is", "are", "of", "to", "that", "it", "with", "for", "this", "was",
            "what", "how", "be", "by", "from", "which", "has", "been",
        ],
        &[],
    ),
    (
        "es",
        &[
            "el", "los", "las", "es", "y", "que", "un", "una", "por", "con", "para", "del",
            "como", "qué", "cómo", "está", "son", "al", "se",
        ],
        &['ñ', '¿', '¡'],
    ),
    (
        "fr",
        &[
            "le", "les", "est", "et", "des", "une", "du", "qui", "dans", "pour", "sur", "pas",
            "au", "aux", "ce", "sont", "elle", "il", "quel", "quelle",
        ],
        &['è', 'ê', 'ë', 'î', 'œ', 'û'],
    ),
    (
        "de",
        &[
            "der", "die", "das", "und", "ist", "ein", "eine", "nicht", "mit", "von", "zu", "den",
            "dem", "im", "auf", "für", "sich", "wie", "was", "sind", "sie", "wird",
        ],
        &['ß', 'ä', 'ö', 'ü'],
    ),
    (
        "pt",
        &[
            "o", "os", "é", "do", "da", "dos", "das", "um", "uma", "não", "em", "para", "com",
            "são", "você", "também",
        ],
        &['ã', 'õ'],
    ),
    (
        "it",
        &[
            "il", "lo", "gli", "è", "di", "della", "che", "per", "non", "sono", "nel", "questo",
        ],
        &[],
    ),
    (
        "nl",
        &[
            "het", "een", "en", "van", "dat", "niet", "op", "te", "voor", "zijn", "wat", "hoe",
            "ook",
        ],
        &['ĳ'],
    ),
];

impl LanguageDetector for HeuristicDetector {
    fn detect(&self, text: &str) -> Result<String, DetectionError> {
        let sample: String = text.chars().take(SAMPLE_CHARS).collect::<String>().to_lowercase();

        let mut counts = std::collections::HashMap::new();
        for c in sample.chars().filter(|c| c.is_alphabetic()) {
            *counts.entry(script_of(c)).or_insert(0usize) += 1;
        }

        let letters: usize = counts.values().sum();
        if letters == 0 {
            return Err(DetectionError::Undetermined);
        }

        let count = |script: Script| counts.get(&script).copied().unwrap_or(0);

        // Any kana means Japanese, even when kanji dominate.
        let kana = count(Script::Kana);
        if kana > 0 && kana + count(Script::Han) >= count(Script::Latin) {
            return Ok("ja".to_string());
        }

        let (dominant, _) = counts
            .iter()
            .filter(|(script, _)| **script != Script::Other)
            .max_by_key(|(_, n)| **n)
            .ok_or(DetectionError::Undetermined)?;

        let code = match dominant {
            Script::Han => "zh",
            Script::Hangul => "ko",
            Script::Arabic => "ar",
            Script::Hebrew => "he",
            Script::Cyrillic => "ru",
            Script::Greek => "el",
            Script::Devanagari => "hi",
            Script::Thai => "th",
            Script::Kana => "ja",
            Script::Latin => return detect_latin(&sample),
            Script::Other => return Err(DetectionError::Undetermined),
        };

        Ok(code.to_string())
    }
}

fn detect_latin(sample: &str) -> Result<String, DetectionError> {
    let words: Vec<&str> = sample.unicode_words().collect();

    let mut scores: Vec<(&str, usize)> = LATIN_PROFILES
        .iter()
        .map(|(code, stop_words, letters)| {
            let word_hits = words.iter().filter(|w| stop_words.contains(*w)).count();
            let letter_hits = sample.chars().filter(|c| letters.contains(c)).count();
            (*code, word_hits * 2 + letter_hits)
        })
        .collect();

    scores.sort_by(|a, b| b.1.cmp(&a.1));

    match (scores.first(), scores.get(1)) {
        (Some(&(code, best)), Some(&(_, runner_up))) if best > 0 && best > runner_up => {
            Ok(code.to_string())
        }
        _ => Err(DetectionError::Undetermined),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Result<String, DetectionError> {
        HeuristicDetector::new().detect(text)
    }

    #[test]
    fn test_detects_sample_corpus_languages() {
        assert_eq!(
            detect("Artificial intelligence (AI) is intelligence demonstrated by machines.").unwrap(),
            "en"
        );
        assert_eq!(
            detect("La inteligencia artificial (IA) es la inteligencia demostrada por máquinas.")
                .unwrap(),
            "es"
        );
        assert_eq!(
            detect("L'intelligence artificielle (IA) est l'intelligence démontrée par les machines.")
                .unwrap(),
            "fr"
        );
        assert_eq!(
            detect("Künstliche Intelligenz (KI) ist Intelligenz, die von Maschinen demonstriert wird.")
                .unwrap(),
            "de"
        );
        assert_eq!(detect("人工智能（AI）是由机器展示的智能。").unwrap(), "zh");
    }

    #[test]
    fn test_detects_questions() {
        assert_eq!(detect("What is artificial intelligence?").unwrap(), "en");
        assert_eq!(detect("¿Qué es la inteligencia artificial?").unwrap(), "es");
        assert_eq!(detect("什么是人工智能？").unwrap(), "zh");
    }

    #[test]
    fn test_detects_other_scripts() {
        assert_eq!(detect("人工知能とは何ですか").unwrap(), "ja");
        assert_eq!(detect("인공지능이란 무엇입니까").unwrap(), "ko");
        assert_eq!(detect("Что такое искусственный интеллект?").unwrap(), "ru");
        assert_eq!(detect("Τι είναι η τεχνητή νοημοσύνη;").unwrap(), "el");
        assert_eq!(detect("ما هو الذكاء الاصطناعي").unwrap(), "ar");
    }

    #[test]
    fn test_undetermined_without_letters() {
        assert_eq!(detect(""), Err(DetectionError::Undetermined));
        assert_eq!(detect("12345 !!! ---"), Err(DetectionError::Undetermined));
    }

    #[test]
    fn test_undetermined_without_signal() {
        assert_eq!(detect("xyzzy plugh"), Err(DetectionError::Undetermined));
    }
}

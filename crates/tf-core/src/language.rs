//! ISO 639-2 language lookup.
//!
//! Streams are tagged with three-letter codes. Subtitle metadata wants the
//! two-letter code and a display name, so [`LanguageTable`] maps one to the
//! other. [`Iso639Table`] carries the common languages inline.

/// Two-letter code and display name of a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code_639_2: &'static str,
    pub code_639_1: &'static str,
    pub name: &'static str,
}

/// The "undetermined" sentinel tag. Never resolved.
pub const UNDETERMINED: &str = "und";

/// Lookup from a three-letter tag to a [`Language`].
pub trait LanguageTable: Send + Sync {
    fn lookup(&self, code: &str) -> Option<Language>;
}

/// Embedded ISO 639-2 table. Accepts both bibliographic and terminology
/// codes (`fre` and `fra`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Iso639Table;

const LANGUAGES: &[(&str, &str, &str)] = &[
    ("ara", "ar", "Arabic"),
    ("bul", "bg", "Bulgarian"),
    ("cat", "ca", "Catalan"),
    ("ces", "cs", "Czech"),
    ("cze", "cs", "Czech"),
    ("chi", "zh", "Chinese"),
    ("zho", "zh", "Chinese"),
    ("dan", "da", "Danish"),
    ("deu", "de", "German"),
    ("ger", "de", "German"),
    ("ell", "el", "Greek"),
    ("gre", "el", "Greek"),
    ("eng", "en", "English"),
    ("est", "et", "Estonian"),
    ("fin", "fi", "Finnish"),
    ("fra", "fr", "French"),
    ("fre", "fr", "French"),
    ("heb", "he", "Hebrew"),
    ("hin", "hi", "Hindi"),
    ("hrv", "hr", "Croatian"),
    ("hun", "hu", "Hungarian"),
    ("ind", "id", "Indonesian"),
    ("isl", "is", "Icelandic"),
    ("ice", "is", "Icelandic"),
    ("ita", "it", "Italian"),
    ("jpn", "ja", "Japanese"),
    ("kor", "ko", "Korean"),
    ("lav", "lv", "Latvian"),
    ("lit", "lt", "Lithuanian"),
    ("msa", "ms", "Malay"),
    ("may", "ms", "Malay"),
    ("nld", "nl", "Dutch"),
    ("dut", "nl", "Dutch"),
    ("nor", "no", "Norwegian"),
    ("nob", "nb", "Norwegian Bokmål"),
    ("pol", "pl", "Polish"),
    ("por", "pt", "Portuguese"),
    ("ron", "ro", "Romanian"),
    ("rum", "ro", "Romanian"),
    ("rus", "ru", "Russian"),
    ("slk", "sk", "Slovak"),
    ("slo", "sk", "Slovak"),
    ("slv", "sl", "Slovenian"),
    ("spa", "es", "Spanish"),
    ("srp", "sr", "Serbian"),
    ("swe", "sv", "Swedish"),
    ("tha", "th", "Thai"),
    ("tur", "tr", "Turkish"),
    ("ukr", "uk", "Ukrainian"),
    ("vie", "vi", "Vietnamese"),
];

impl LanguageTable for Iso639Table {
    fn lookup(&self, code: &str) -> Option<Language> {
        if code.eq_ignore_ascii_case(UNDETERMINED) {
            return None;
        }
        LANGUAGES
            .iter()
            .find(|(three, _, _)| three.eq_ignore_ascii_case(code))
            .map(|(three, two, name)| Language {
                code_639_2: three,
                code_639_1: two,
                name,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_codes() {
        let eng = Iso639Table.lookup("eng").unwrap();
        assert_eq!(eng.code_639_1, "en");
        assert_eq!(eng.name, "English");
        assert_eq!(Iso639Table.lookup("FRE").unwrap().code_639_1, "fr");
        assert_eq!(Iso639Table.lookup("fra").unwrap().name, "French");
    }

    #[test]
    fn undetermined_and_unknown_are_absent() {
        assert!(Iso639Table.lookup("und").is_none());
        assert!(Iso639Table.lookup("xyz").is_none());
        assert!(Iso639Table.lookup("").is_none());
    }
}

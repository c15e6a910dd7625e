//! Question-language heuristic for the citation label.
//!
//! The collection is trilingual plus German visitors; a lightweight
//! function-word count is enough to pick the label language. English wins
//! ties, matching the collection's default interface language.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    En,
    Fr,
    Nl,
    De,
}

const EN_WORDS: &[&str] = &[
    "the", "who", "what", "where", "when", "which", "show", "me", "of", "is", "was", "painted",
    "more", "about", "this", "that", "it", "a", "an",
];
const FR_WORDS: &[&str] = &[
    "le", "la", "les", "qui", "que", "quoi", "où", "quand", "quel", "quelle", "montre", "moi",
    "de", "du", "des", "est", "était", "peint", "plus", "sur", "ce", "cette", "un", "une",
];
const NL_WORDS: &[&str] = &[
    "de", "het", "een", "wie", "wat", "waar", "wanneer", "welke", "toon", "mij", "van", "is",
    "was", "geschilderd", "meer", "over", "dit", "dat", "schilderij",
];
const DE_WORDS: &[&str] = &[
    "der", "die", "das", "ein", "eine", "wer", "was", "wo", "wann", "welche", "zeig", "mir",
    "von", "ist", "war", "gemalt", "mehr", "über", "dieses", "gemälde",
];

fn score(words: &[&str], vocab: &[&str]) -> usize {
    words.iter().filter(|w| vocab.contains(w)).count()
}

pub fn detect(question: &str) -> Lang {
    let lowered = question.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();
    let scored = [
        (Lang::En, score(&words, EN_WORDS)),
        (Lang::Fr, score(&words, FR_WORDS)),
        (Lang::Nl, score(&words, NL_WORDS)),
        (Lang::De, score(&words, DE_WORDS)),
    ];
    // Strict improvement only, so English keeps ties.
    let mut best = (Lang::En, 0usize);
    for (lang, s) in scored {
        if s > best.1 {
            best = (lang, s);
        }
    }
    best.0
}

pub fn more_information_label(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "More information",
        Lang::Fr => "Plus d'informations",
        Lang::Nl => "Meer informatie",
        Lang::De => "Weitere Informationen",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_the_four_supported_languages() {
        assert_eq!(detect("Who painted the portrait of the queen?"), Lang::En);
        assert_eq!(detect("Qui a peint le portrait de la reine ?"), Lang::Fr);
        assert_eq!(detect("Wie heeft het portret van de koningin geschilderd?"), Lang::Nl);
        assert_eq!(detect("Wer hat das Porträt der Königin gemalt?"), Lang::De);
    }

    #[test]
    fn unknown_input_defaults_to_english() {
        assert_eq!(detect("xyzzy 12345"), Lang::En);
        assert_eq!(more_information_label(detect("")), "More information");
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Text classification for OCR fragments
//!
//! Scanned drawings mix room labels with dimension strings, scale markers
//! and plain noise. The classifier contract is narrow so a learned model can
//! replace the vocabulary matcher without touching the assembler.

use regex::Regex;

/// Category of a recognized text fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    RoomLabel,
    Dimension,
    ScaleMarker,
    Noise,
}

/// Text classifier collaborator.
///
/// Returns the category and, for room labels, the canonical room name when
/// one is known.
pub trait TextClassifier: Send + Sync {
    fn classify(&self, text: &str) -> (TextKind, Option<String>);
}

/// Canonical room vocabulary with the aliases seen on real drawings.
const ROOM_VOCAB: &[(&str, &[&str])] = &[
    ("MASTER BEDROOM", &["MASTER", "MSTR", "MBED", "MAIN BED"]),
    ("BEDROOM", &["BED", "BDRM", "GUEST", "SLEEP"]),
    ("KITCHEN", &["KITCHEN", "KIT", "KITCH", "GALLEY"]),
    ("BATHROOM", &["BATH", "WC", "TOILET", "POWDER", "ENSUITE"]),
    ("LIVING ROOM", &["LIVING", "LVRM", "GREAT ROOM", "LOUNGE", "FAMILY"]),
    ("DINING ROOM", &["DINING", "DINE", "BREAKFAST"]),
    ("CLOSET", &["CLOSET", "WIC", "STORAGE", "WIR"]),
    ("GARAGE", &["GARAGE", "CARPORT"]),
    ("HALLWAY", &["HALL", "CORRIDOR", "ENTRY", "FOYER"]),
    ("BALCONY", &["BALCONY", "TERRACE", "PATIO", "DECK"]),
];

/// Rule-based classifier over the canonical room vocabulary.
pub struct VocabClassifier {
    scale_marker: Regex,
    dimension: Regex,
}

impl VocabClassifier {
    pub fn new() -> Self {
        Self {
            // "SCALE 1:100", "SCALE: 1/4"
            scale_marker: Regex::new(r"SCALE\s*:?\s*\d").expect("static regex"),
            // 12'6, 12x14, 3400MM
            dimension: Regex::new(r"\d+\s*'\s*\d+|\d+\s*X\s*\d+|\d+\s*MM\b").expect("static regex"),
        }
    }

    fn match_vocab(clean: &str) -> Option<String> {
        for (canonical, aliases) in ROOM_VOCAB {
            if clean == *canonical {
                return Some((*canonical).to_string());
            }
            for alias in *aliases {
                if clean == *alias || contains_word(clean, alias) {
                    return Some((*canonical).to_string());
                }
            }
        }
        None
    }
}

impl Default for VocabClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TextClassifier for VocabClassifier {
    fn classify(&self, text: &str) -> (TextKind, Option<String>) {
        let clean: String = text
            .to_uppercase()
            .chars()
            .filter(|c| *c != '.')
            .collect::<String>()
            .trim()
            .to_string();

        if clean.contains("SCALE") || self.scale_marker.is_match(&clean) {
            return (TextKind::ScaleMarker, Some(clean));
        }

        if self.dimension.is_match(&clean) {
            return (TextKind::Dimension, Some(clean));
        }

        if let Some(canonical) = Self::match_vocab(&clean) {
            return (TextKind::RoomLabel, Some(canonical));
        }

        // Short, purely alphabetic fragments are unknown room names;
        // anything longer reads as an annotation note.
        let letters_only = !clean.is_empty()
            && clean.chars().all(|c| c.is_ascii_alphabetic() || c == ' ');
        if letters_only && clean.len() > 2 && clean.len() < 20 {
            return (TextKind::RoomLabel, Some(clean));
        }

        (TextKind::Noise, None)
    }
}

/// True when `word` appears in `text` bounded by non-alphanumeric characters.
fn contains_word(text: &str, word: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = text[start..].find(word) {
        let begin = start + pos;
        let end = begin + word.len();
        let left_ok = begin == 0
            || !text.as_bytes()[begin - 1].is_ascii_alphanumeric();
        let right_ok =
            end == text.len() || !text.as_bytes()[end].is_ascii_alphanumeric();
        if left_ok && right_ok {
            return true;
        }
        start = begin + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_markers_take_priority() {
        let classifier = VocabClassifier::new();
        let (kind, _) = classifier.classify("Scale 1:100");
        assert_eq!(kind, TextKind::ScaleMarker);
    }

    #[test]
    fn dimensions_are_recognized() {
        let classifier = VocabClassifier::new();
        assert_eq!(classifier.classify("12x14").0, TextKind::Dimension);
        assert_eq!(classifier.classify("12'6").0, TextKind::Dimension);
        assert_eq!(classifier.classify("3400mm").0, TextKind::Dimension);
    }

    #[test]
    fn vocabulary_aliases_map_to_canonical_names() {
        let classifier = VocabClassifier::new();
        assert_eq!(
            classifier.classify("MSTR"),
            (TextKind::RoomLabel, Some("MASTER BEDROOM".into()))
        );
        assert_eq!(
            classifier.classify("w.i.c"),
            (TextKind::RoomLabel, Some("CLOSET".into()))
        );
        assert_eq!(
            classifier.classify("guest bed"),
            (TextKind::RoomLabel, Some("BEDROOM".into()))
        );
    }

    #[test]
    fn unknown_short_alpha_text_is_a_room_label() {
        let classifier = VocabClassifier::new();
        let (kind, name) = classifier.classify("Atrium");
        assert_eq!(kind, TextKind::RoomLabel);
        assert_eq!(name.as_deref(), Some("ATRIUM"));
    }

    #[test]
    fn long_notes_and_junk_are_noise() {
        let classifier = VocabClassifier::new();
        assert_eq!(
            classifier.classify("ALL DIMENSIONS TO BE VERIFIED ON SITE").0,
            TextKind::Noise
        );
        assert_eq!(classifier.classify("#@!").0, TextKind::Noise);
        assert_eq!(classifier.classify("ab").0, TextKind::Noise);
    }
}

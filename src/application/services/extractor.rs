//! Field extractor - recovers a typed character record from raw profile text
//!
//! The generator is instructed to emit twelve `Label: value` fields in a
//! fixed order, but its replies are only loosely structured: labels drift
//! away from line starts, values span multiple lines and may themselves
//! contain colons. Extraction is total: whatever the input, the caller gets
//! a fully-populated record plus warnings for anything that could not be
//! located.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::value_objects::{CharacterRecord, FieldKey};

/// Literal header of the background-name field, used to detect when a bare
/// `Предыстория:` capture has swallowed it.
const BACKGROUND_HEADER: &str = "Предыстория (Background):";

/// A line starting with an uppercase-Cyrillic label-like header. The first
/// such boundary after a header ends that header's value span, which is what
/// keeps multi-line values from consuming the following field.
static NEXT_LABEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[А-ЯЁ][\w \t()-]*:").expect("boundary pattern is valid"));

/// Primary backstory anchor: the narrative header on the line(s) right after
/// the inventory line, where the canonical format places it.
static BACKSTORY_PRIMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\nИнвентарь:[^\n]*\n+Предыстория:[ \t]*").expect("anchor pattern is valid"));

/// End of the narrative backstory in the canonical format.
static BACKSTORY_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\nЧерта Характера:").expect("end pattern is valid"));

/// Compiled strict/loose header patterns for one label.
struct LabelPattern {
    strict: Regex,
    loose: Regex,
}

impl LabelPattern {
    fn for_label(label: &str) -> Self {
        let escaped = regex::escape(label);
        Self {
            strict: Regex::new(&format!(r"(?m)^[ \t]*{escaped}:[ \t]*"))
                .expect("label pattern is valid"),
            loose: Regex::new(&format!(r"{escaped}:[ \t]*")).expect("label pattern is valid"),
        }
    }
}

static FIELD_PATTERNS: Lazy<Vec<(FieldKey, LabelPattern)>> = Lazy::new(|| {
    FieldKey::ALL
        .iter()
        .map(|&key| (key, LabelPattern::for_label(key.label())))
        .collect()
});

static BACKSTORY_PATTERN: Lazy<LabelPattern> =
    Lazy::new(|| LabelPattern::for_label("Предыстория"));

/// A diagnostic emitted for a field the extractor could not resolve.
/// Never fatal; the corresponding record field holds its sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionWarning {
    /// A labeled table field was absent from the text.
    FieldNotFound { label: &'static str },
    /// The narrative backstory header was absent from the text.
    BackstoryNotFound,
    /// A bare backstory capture swallowed the background-name header, so it
    /// was discarded instead of being misassigned.
    BackstoryCollision,
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionWarning::FieldNotFound { label } => {
                write!(f, "не удалось извлечь поле '{label}'")
            }
            ExtractionWarning::BackstoryNotFound => {
                write!(f, "не удалось извлечь текстовое описание 'Предыстория:'")
            }
            ExtractionWarning::BackstoryCollision => write!(
                f,
                "описание 'Предыстория:' конфликтует с 'Предыстория (Background):'"
            ),
        }
    }
}

/// One located `Label: value` span.
struct LabeledSpan<'a> {
    /// Everything from the label header through the end of the value;
    /// input for the collision guard.
    matched: &'a str,
    /// The value with surrounding whitespace removed.
    value: &'a str,
}

/// Finds `Label: value` spans bounded by the next label-like line.
///
/// The span is shortest-first by construction: the value ends at the first
/// boundary after the header, or at end of input.
struct LabeledSpanScanner<'a> {
    text: &'a str,
}

impl<'a> LabeledSpanScanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text }
    }

    /// Two-pass scan: the line-start-anchored pattern first, then the
    /// unanchored variant to recover labels the model misplaced.
    fn scan(&self, pattern: &LabelPattern) -> Option<LabeledSpan<'a>> {
        self.find(&pattern.strict).or_else(|| self.find(&pattern.loose))
    }

    fn find(&self, header: &Regex) -> Option<LabeledSpan<'a>> {
        let m = header.find(self.text)?;
        let value_start = m.end();
        let value_end = NEXT_LABEL_BOUNDARY
            .find(&self.text[value_start..])
            .map(|b| value_start + b.start())
            .unwrap_or(self.text.len());
        let value = self.text[value_start..value_end].trim();
        if value.is_empty() {
            return None;
        }
        Some(LabeledSpan {
            matched: &self.text[m.start()..value_end],
            value,
        })
    }
}

/// Extract a character record from the model's raw reply.
///
/// Total over all inputs: fields that cannot be located keep their
/// unresolved sentinel and produce one warning each. The eleven table
/// labels are matched in canonical order, so the parenthesized
/// `Предыстория (Background)` is consumed before the bare narrative label
/// is considered.
pub fn extract(raw: &str) -> (CharacterRecord, Vec<ExtractionWarning>) {
    let scanner = LabeledSpanScanner::new(raw);
    let mut record = CharacterRecord::unresolved();
    let mut warnings = Vec::new();

    for (key, pattern) in FIELD_PATTERNS.iter() {
        match scanner.scan(pattern) {
            Some(span) => record.set(*key, span.value.to_string()),
            None => warnings.push(ExtractionWarning::FieldNotFound { label: key.label() }),
        }
    }

    match extract_backstory(raw, &scanner) {
        Ok(value) => record.backstory_text = value,
        Err(warning) => warnings.push(warning),
    }

    (record, warnings)
}

/// The narrative backstory needs its own treatment because its label is a
/// prefix of the background-name label. The primary pattern anchors it to
/// its canonical position after the inventory line; the fallback is the
/// generic two-pass scan with a guard discarding captures that contain the
/// background-name header.
fn extract_backstory(
    raw: &str,
    scanner: &LabeledSpanScanner<'_>,
) -> Result<String, ExtractionWarning> {
    if let Some(anchor) = BACKSTORY_PRIMARY.find(raw) {
        let value_start = anchor.end();
        let value_end = BACKSTORY_END
            .find(&raw[value_start..])
            .map(|b| value_start + b.start())
            .unwrap_or(raw.len());
        let value = raw[value_start..value_end].trim();
        if !value.is_empty() {
            return Ok(value.to_string());
        }
    }

    match scanner.scan(&BACKSTORY_PATTERN) {
        Some(span) if span.matched.contains(BACKGROUND_HEADER) => {
            Err(ExtractionWarning::BackstoryCollision)
        }
        Some(span) => Ok(span.value.to_string()),
        None => Err(ExtractionWarning::BackstoryNotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{BACKSTORY_UNRESOLVED, UNRESOLVED};

    fn canonical_profile() -> String {
        [
            "Имя: Тор",
            "Раса: Человек",
            "Класс: Воин",
            "Предыстория (Background): Солдат",
            "Мировоззрение: Законно-Добрый",
            "Характеристики: Сила 16, Ловкость 12, Телосложение 14, Интеллект 10, Мудрость 11, Харизма 10",
            "Инвентарь: Меч, щит, кольчуга, рюкзак",
            "Предыстория: Тор вырос в северной деревне.",
            "Черта Характера: Храбрый",
            "Идеал: Честь",
            "Привязанность: Клан",
            "Слабость: Гнев",
        ]
        .join("\n")
    }

    #[test]
    fn canonical_profile_extracts_every_field_without_warnings() {
        let (record, warnings) = extract(&canonical_profile());

        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(record.name, "Тор");
        assert_eq!(record.race, "Человек");
        assert_eq!(record.class, "Воин");
        assert_eq!(record.background_name, "Солдат");
        assert_eq!(record.alignment, "Законно-Добрый");
        assert_eq!(record.inventory, "Меч, щит, кольчуга, рюкзак");
        assert_eq!(record.backstory_text, "Тор вырос в северной деревне.");
        assert_eq!(record.personality_trait, "Храбрый");
        assert_eq!(record.ideal, "Честь");
        assert_eq!(record.bond, "Клан");
        assert_eq!(record.flaw, "Гнев");
    }

    #[test]
    fn value_with_inline_colons_is_not_truncated() {
        let (record, warnings) = extract(&canonical_profile());

        assert!(warnings.is_empty());
        assert_eq!(
            record.stats,
            "Сила 16, Ловкость 12, Телосложение 14, Интеллект 10, Мудрость 11, Харизма 10"
        );
    }

    #[test]
    fn multi_paragraph_backstory_is_captured_whole() {
        let text = "Имя: Лира\nРаса: Эльф\nКласс: Плут\nПредыстория (Background): Шарлатан\n\
                    Мировоззрение: Хаотично-Нейтральный\nХарактеристики: Ловкость 16\n\
                    Инвентарь: Кинжал, отмычки\n\
                    Предыстория: Лира родилась в портовом городе.\n\nОна рано научилась обманывать.\n\
                    Черта Характера: Хитрая\nИдеал: Свобода\nПривязанность: Сестра\nСлабость: Азарт";
        let (record, warnings) = extract(text);

        assert!(warnings.is_empty());
        assert_eq!(
            record.backstory_text,
            "Лира родилась в портовом городе.\n\nОна рано научилась обманывать."
        );
        assert_eq!(record.personality_trait, "Хитрая");
    }

    #[test]
    fn missing_labels_yield_sentinels_and_one_warning_each() {
        let text = "Имя: Тор\nРаса: Человек\nКласс: Воин";
        let (record, warnings) = extract(text);

        assert_eq!(record.name, "Тор");
        assert_eq!(record.race, "Человек");
        assert_eq!(record.class, "Воин");
        assert_eq!(record.background_name, UNRESOLVED);
        assert_eq!(record.flaw, UNRESOLVED);
        assert_eq!(record.backstory_text, BACKSTORY_UNRESOLVED);

        // 8 missing table fields plus the narrative backstory.
        assert_eq!(warnings.len(), 9);
        assert!(warnings.contains(&ExtractionWarning::FieldNotFound {
            label: "Предыстория (Background)"
        }));
        assert!(warnings.contains(&ExtractionWarning::BackstoryNotFound));
    }

    #[test]
    fn background_name_does_not_bleed_into_narrative_backstory() {
        let (record, _) = extract(&canonical_profile());

        assert_eq!(record.background_name, "Солдат");
        assert!(!record.background_name.contains("вырос"));
        assert!(!record.backstory_text.contains("Солдат"));
    }

    #[test]
    fn narrative_alone_resolves_without_background_name() {
        let text = "Имя: Тор\nПредыстория: Вырос на севере, закалён морозами.\nЧерта Характера: Стойкий";
        let (record, warnings) = extract(text);

        assert_eq!(record.backstory_text, "Вырос на севере, закалён морозами.");
        assert_eq!(record.background_name, UNRESOLVED);
        assert!(warnings.contains(&ExtractionWarning::FieldNotFound {
            label: "Предыстория (Background)"
        }));
    }

    #[test]
    fn misplaced_label_is_recovered_by_the_loose_pass() {
        let text = "Вот результат: Имя: Тор\nРаса: Человек";
        let (record, _) = extract(text);

        assert_eq!(record.name, "Тор");
        assert_eq!(record.race, "Человек");
    }

    #[test]
    fn empty_input_yields_fully_unresolved_record() {
        let (record, warnings) = extract("");

        for key in FieldKey::ALL {
            assert_eq!(record.get(key), UNRESOLVED);
        }
        assert_eq!(record.backstory_text, BACKSTORY_UNRESOLVED);
        assert_eq!(warnings.len(), 12);
    }

    #[test]
    fn extraction_is_idempotent_and_total() {
        let text = canonical_profile();
        let first = extract(&text);
        let second = extract(&text);
        assert_eq!(first, second);

        // Feeding a serialized unresolved record back through never panics.
        let serialized = serde_json::to_string(&CharacterRecord::unresolved())
            .expect("record serializes");
        let (record, _) = extract(&serialized);
        let (again, _) = extract(&serialized);
        assert_eq!(record, again);
    }

    #[test]
    fn required_end_to_end_sample_extracts_exactly() {
        let text = "Имя: Тор\nРаса: Человек\nКласс: Варвар\nПредыстория (Background): Чужеземец\n\
                    Мировоззрение: Хаотично-Добрый\nХарактеристики: Сила 17\nИнвентарь: Секира\n\
                    Предыстория: Пришёл с севера.\nЧерта Характера: Храбрый\nИдеал: Честь\n\
                    Привязанность: Клан\nСлабость: Гнев";
        let (record, warnings) = extract(text);

        assert!(warnings.is_empty());
        assert_eq!(record.name, "Тор");
        assert_eq!(record.race, "Человек");
        assert_eq!(record.personality_trait, "Храбрый");
        assert_eq!(record.ideal, "Честь");
        assert_eq!(record.bond, "Клан");
        assert_eq!(record.flaw, "Гнев");
    }

    #[test]
    fn label_followed_only_by_whitespace_counts_as_missing() {
        let text = "Имя:\nРаса: Человек";
        let (record, warnings) = extract(text);

        assert_eq!(record.name, UNRESOLVED);
        assert_eq!(record.race, "Человек");
        assert!(warnings.contains(&ExtractionWarning::FieldNotFound { label: "Имя" }));
    }
}

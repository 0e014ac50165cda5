//! The typed record recovered from the model's raw profile text

use serde::Serialize;

/// Sentinel stored for any table field the extractor could not locate.
pub const UNRESOLVED: &str = "Не указано";

/// Sentinel stored when the narrative backstory could not be located.
pub const BACKSTORY_UNRESOLVED: &str = "Не удалось извлечь описание предыстории.";

/// Semantic keys of the eleven labeled table fields.
///
/// `ALL` lists them in the exact order the generator is instructed to emit
/// their labels; the extractor scans in this order. The parenthesized
/// background label precedes the bare narrative `Предыстория`, which is not
/// a table field and is scanned separately (see `CharacterRecord::backstory_text`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    Name,
    Race,
    Class,
    BackgroundName,
    Alignment,
    Stats,
    Inventory,
    Trait,
    Ideal,
    Bond,
    Flaw,
}

impl FieldKey {
    pub const ALL: [FieldKey; 11] = [
        FieldKey::Name,
        FieldKey::Race,
        FieldKey::Class,
        FieldKey::BackgroundName,
        FieldKey::Alignment,
        FieldKey::Stats,
        FieldKey::Inventory,
        FieldKey::Trait,
        FieldKey::Ideal,
        FieldKey::Bond,
        FieldKey::Flaw,
    ];

    /// The Russian header marking this field in the raw text.
    pub fn label(&self) -> &'static str {
        match self {
            FieldKey::Name => "Имя",
            FieldKey::Race => "Раса",
            FieldKey::Class => "Класс",
            FieldKey::BackgroundName => "Предыстория (Background)",
            FieldKey::Alignment => "Мировоззрение",
            FieldKey::Stats => "Характеристики",
            FieldKey::Inventory => "Инвентарь",
            FieldKey::Trait => "Черта Характера",
            FieldKey::Ideal => "Идеал",
            FieldKey::Bond => "Привязанность",
            FieldKey::Flaw => "Слабость",
        }
    }
}

/// A fully-populated character profile.
///
/// Every field always holds a value after extraction; fields the extractor
/// could not locate hold the unresolved sentinel instead of being absent,
/// so the renderer never needs to null-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterRecord {
    pub name: String,
    pub race: String,
    pub class: String,
    pub background_name: String,
    pub alignment: String,
    pub stats: String,
    pub inventory: String,
    pub personality_trait: String,
    pub ideal: String,
    pub bond: String,
    pub flaw: String,
    /// The long-form narrative backstory (multi-line).
    pub backstory_text: String,
}

impl CharacterRecord {
    /// A record with every field set to its unresolved sentinel.
    pub fn unresolved() -> Self {
        Self {
            name: UNRESOLVED.to_string(),
            race: UNRESOLVED.to_string(),
            class: UNRESOLVED.to_string(),
            background_name: UNRESOLVED.to_string(),
            alignment: UNRESOLVED.to_string(),
            stats: UNRESOLVED.to_string(),
            inventory: UNRESOLVED.to_string(),
            personality_trait: UNRESOLVED.to_string(),
            ideal: UNRESOLVED.to_string(),
            bond: UNRESOLVED.to_string(),
            flaw: UNRESOLVED.to_string(),
            backstory_text: BACKSTORY_UNRESOLVED.to_string(),
        }
    }

    pub fn get(&self, key: FieldKey) -> &str {
        match key {
            FieldKey::Name => &self.name,
            FieldKey::Race => &self.race,
            FieldKey::Class => &self.class,
            FieldKey::BackgroundName => &self.background_name,
            FieldKey::Alignment => &self.alignment,
            FieldKey::Stats => &self.stats,
            FieldKey::Inventory => &self.inventory,
            FieldKey::Trait => &self.personality_trait,
            FieldKey::Ideal => &self.ideal,
            FieldKey::Bond => &self.bond,
            FieldKey::Flaw => &self.flaw,
        }
    }

    pub fn set(&mut self, key: FieldKey, value: String) {
        match key {
            FieldKey::Name => self.name = value,
            FieldKey::Race => self.race = value,
            FieldKey::Class => self.class = value,
            FieldKey::BackgroundName => self.background_name = value,
            FieldKey::Alignment => self.alignment = value,
            FieldKey::Stats => self.stats = value,
            FieldKey::Inventory => self.inventory = value,
            FieldKey::Trait => self.personality_trait = value,
            FieldKey::Ideal => self.ideal = value,
            FieldKey::Bond => self.bond = value,
            FieldKey::Flaw => self.flaw = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_record_fills_every_field() {
        let record = CharacterRecord::unresolved();
        for key in FieldKey::ALL {
            assert_eq!(record.get(key), UNRESOLVED);
        }
        assert_eq!(record.backstory_text, BACKSTORY_UNRESOLVED);
    }

    #[test]
    fn get_reads_back_what_set_wrote() {
        let mut record = CharacterRecord::unresolved();
        record.set(FieldKey::Trait, "Храбрый".to_string());
        assert_eq!(record.get(FieldKey::Trait), "Храбрый");
        assert_eq!(record.get(FieldKey::Ideal), UNRESOLVED);
    }

    #[test]
    fn labels_follow_canonical_order() {
        assert_eq!(FieldKey::ALL[0].label(), "Имя");
        assert_eq!(FieldKey::ALL[3].label(), "Предыстория (Background)");
        assert_eq!(FieldKey::ALL[10].label(), "Слабость");
    }
}

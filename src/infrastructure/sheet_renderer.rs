//! Markdown character-sheet renderer

use async_trait::async_trait;

use crate::application::ports::outbound::{Artifact, RenderError, RendererPort};
use crate::domain::value_objects::{CharacterRecord, UNRESOLVED};

const FALLBACK_TITLE: &str = "Безымянный Герой";

/// Renders a character record into a Markdown sheet.
///
/// The layout follows the printable sheet: a title, the four headline
/// fields, then one section each for stats, inventory, backstory and
/// personality traits.
pub struct SheetRenderer;

impl SheetRenderer {
    pub fn new() -> Self {
        Self
    }

    fn title(record: &CharacterRecord) -> &str {
        if record.name.trim().is_empty() || record.name == UNRESOLVED {
            FALLBACK_TITLE
        } else {
            &record.name
        }
    }

    fn file_name(title: &str) -> String {
        let safe: String = title
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("DND_Character_{safe}.md")
    }
}

impl Default for SheetRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RendererPort for SheetRenderer {
    async fn render(&self, record: &CharacterRecord) -> Result<Artifact, RenderError> {
        let title = Self::title(record);

        let sheet = format!(
            "# {title}\n\n\
             **Раса:** {race}\n\
             **Класс:** {class}\n\
             **Предыстория (Background):** {background}\n\
             **Мировоззрение:** {alignment}\n\n\
             ## Характеристики\n\n{stats}\n\n\
             ## Инвентарь\n\n{inventory}\n\n\
             ## Предыстория\n\n{backstory}\n\n\
             ## Черты Личности\n\n\
             **Черта Характера:** {personality_trait}\n\n\
             **Идеал:** {ideal}\n\n\
             **Привязанность:** {bond}\n\n\
             **Слабость:** {flaw}\n",
            race = record.race,
            class = record.class,
            background = record.background_name,
            alignment = record.alignment,
            stats = record.stats,
            inventory = record.inventory,
            backstory = record.backstory_text,
            personality_trait = record.personality_trait,
            ideal = record.ideal,
            bond = record.bond,
            flaw = record.flaw,
        );

        Ok(Artifact {
            file_name: Self::file_name(title),
            mime_type: "text/markdown".to_string(),
            bytes: sheet.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::BACKSTORY_UNRESOLVED;

    #[tokio::test]
    async fn renders_all_sections_with_the_character_name_as_title() {
        let mut record = CharacterRecord::unresolved();
        record.name = "Тор".to_string();
        record.race = "Человек".to_string();
        record.backstory_text = "Вырос на севере.".to_string();

        let artifact = SheetRenderer::new().render(&record).await.unwrap();
        let sheet = String::from_utf8(artifact.bytes).unwrap();

        assert_eq!(artifact.file_name, "DND_Character_Тор.md");
        assert_eq!(artifact.mime_type, "text/markdown");
        assert!(sheet.starts_with("# Тор\n"));
        assert!(sheet.contains("**Раса:** Человек"));
        assert!(sheet.contains("## Характеристики"));
        assert!(sheet.contains("## Инвентарь"));
        assert!(sheet.contains("Вырос на севере."));
        assert!(sheet.contains("**Слабость:**"));
    }

    #[tokio::test]
    async fn unresolved_name_falls_back_to_the_placeholder_title() {
        let record = CharacterRecord::unresolved();

        let artifact = SheetRenderer::new().render(&record).await.unwrap();
        let sheet = String::from_utf8(artifact.bytes).unwrap();

        assert_eq!(artifact.file_name, "DND_Character_Безымянный_Герой.md");
        assert!(sheet.starts_with("# Безымянный Герой\n"));
        assert!(sheet.contains(BACKSTORY_UNRESOLVED));
    }

    #[tokio::test]
    async fn file_name_replaces_non_alphanumeric_characters() {
        let mut record = CharacterRecord::unresolved();
        record.name = "Тор, сын Одина!".to_string();

        let artifact = SheetRenderer::new().render(&record).await.unwrap();

        assert_eq!(artifact.file_name, "DND_Character_Тор__сын_Одина_.md");
    }
}

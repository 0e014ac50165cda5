//! Prompt builder - turns collected preferences into the generation prompt

use crate::domain::value_objects::PreferenceSet;

/// Sampling temperature used for character generation.
pub const GENERATION_TEMPERATURE: f32 = 0.85;

/// System preamble establishing the strict labeled output format the
/// extractor depends on. Kept verbatim in the generated language.
pub const SYSTEM_PREAMBLE: &str = "\
Ты - ИИ-ассистент, создающий полных персонажей для Dungeons & Dragons 5-й редакции.
Твоя задача - сгенерировать Имя, Расу, Класс, Предысторию (Background), Мировоззрение, Характеристики (стандартный набор из 6), стартовый Инвентарь и Предысторию (текстовое описание), Черту Характера, Идеал, Привязанность и Слабость.
Строго придерживайся материалов из System Reference Document (SRD 5.1).
Если какой-либо параметр не указан пользователем, выбери подходящий из SRD 5.1.
Если характеристики не указаны или есть только пожелания, предложи типичное или сбалансированное распределение.
Инвентарь должен состоять из 3-5 предметов, подходящих для стартового персонажа.
Текстовая Предыстория должна быть на 2-5 предложений и соответствовать всем выбранным элементам.

Ответ должен быть структурирован СТРОГО следующим образом, с каждым заголовком на НОВОЙ СТРОКЕ:
Имя: [текст]
Раса: [текст]
Класс: [текст]
Предыстория (Background): [текст]
Мировоззрение: [текст]
Характеристики: [текст, например: Сила 10, Ловкость 14,...]
Инвентарь: [текст, предметы через запятую]
Предыстория: [многострочный текст]
Черта Характера: [текст]
Идеал: [текст]
Привязанность: [текст]
Слабость: [текст]

ВАЖНО: Убедись, что заголовок \"Предыстория:\" (для текстового описания) не конфликтует с \"Предыстория (Background):\" (для названия бэкграунда).
Каждый заголовок должен быть точно таким, как указано выше (например, \"Предыстория (Background):\", а не просто \"Background:\").
";

/// Assemble the natural-language task description from the preferences.
///
/// One clause per collected field; unset fields carry an explicit fallback
/// instruction, so the description always lists all seven.
pub fn build_task_description(preferences: &PreferenceSet) -> String {
    let mut parts = vec!["Сгенерируй полного персонажа D&D 5e (SRD).".to_string()];

    let mut add_srd_param = |label: &str, value: &Option<String>, fallback: &str| {
        match value {
            Some(v) => parts.push(format!("{label}: {v} (из SRD 5.1, если применимо).")),
            None => parts.push(format!("{label}: {fallback}")),
        }
    };

    add_srd_param("Раса", &preferences.race, "Выбери подходящую расу из SRD 5.1.");
    add_srd_param("Класс", &preferences.class, "Выбери подходящий класс из SRD 5.1.");
    add_srd_param(
        "Предыстория (Background)",
        &preferences.background,
        "Выбери подходящую предысторию (background) из SRD 5.1.",
    );
    add_srd_param("Мировоззрение", &preferences.alignment, "Выбери подходящее мировоззрение.");

    match &preferences.location {
        Some(v) => parts.push(format!("Происхождение/Локация: {v}.")),
        None => parts.push("Происхождение/Локация: Придумай подходящее.".to_string()),
    }

    match &preferences.stats_preference {
        Some(v) => parts.push(format!("Пожелания по характеристикам: {v}.")),
        None => parts.push("Пожелания по характеристикам: Сбалансированное распределение.".to_string()),
    }

    match &preferences.details {
        Some(v) => parts.push(format!(
            "Дополнительные детали/пожелания к текстовой предыстории и характеру: {v}"
        )),
        None => parts.push(
            "Дополнительные детали/пожелания к текстовой предыстории и характеру: На усмотрение модели."
                .to_string(),
        ),
    }

    parts.push(
        "\nПредставь результат в указанном структурированном формате, включая Черту Характера, Идеал, Привязанность и Слабость."
            .to_string(),
    );

    parts.join("\n")
}

/// The full prompt handed to the model: preamble and task description as a
/// single part.
pub fn build_prompt_parts(preferences: &PreferenceSet) -> Vec<String> {
    vec![format!("{SYSTEM_PREAMBLE}{}", build_task_description(preferences))]
}

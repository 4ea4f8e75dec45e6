/*!
 * Tests for prompt template rendering
 */

use std::sync::Arc;

use locail::database::models::{TemplateRecord, TemplateScope};
use locail::database::{Repository, TemplateStore};
use locail::translation::prompts::{
    render_template, PromptData, PromptRenderer, TemplatePromptRenderer, ROLE_SYSTEM, ROLE_USER,
    TRANSLATE_SINGLE,
};

fn sample_data() -> PromptData {
    PromptData {
        src_lang: "en".into(),
        tgt_lang: "pt-BR".into(),
        key: "menu.start".into(),
        text: "Start __PH_0__".into(),
        file_path: "locales/en.json".into(),
        project: "Demo".into(),
        context: "Main menu button".into(),
        placeholders: vec!["{level}".into()],
        tags: vec![],
        project_id: Some(7),
    }
}

#[test]
fn test_renderTemplate_withLegacyDotSyntax_shouldSubstitute() {
    let out = render_template("{{.SrcLang}} -> {{ TgtLang }}", &sample_data()).unwrap();
    assert_eq!(out, "English -> Portuguese (BR)");
}

#[test]
fn test_renderTemplate_withEmptyLists_shouldRenderNone() {
    let out = render_template("tags: {{Tags}}; placeholders: {{Placeholders}}", &sample_data()).unwrap();
    assert_eq!(out, "tags: none; placeholders: {level}");
}

#[tokio::test]
async fn test_render_withoutStoredTemplates_shouldUseBuiltins() {
    let repo = Arc::new(Repository::new_in_memory().unwrap());
    let renderer = TemplatePromptRenderer::new(repo);

    let system = renderer
        .render(TemplateScope::Provider, Some(1), TRANSLATE_SINGLE, ROLE_SYSTEM, &sample_data())
        .await
        .unwrap();
    let user = renderer
        .render(TemplateScope::Provider, Some(1), TRANSLATE_SINGLE, ROLE_USER, &sample_data())
        .await
        .unwrap();

    assert!(system.contains("from English to Portuguese (BR)"));
    assert!(user.contains("key: menu.start"));
    assert!(user.contains("source: Start __PH_0__"));
}

#[tokio::test]
async fn test_render_withProjectTemplate_shouldUseProjectIdFromData() {
    let repo = Arc::new(Repository::new_in_memory().unwrap());
    repo.upsert_template(&TemplateRecord::new(
        TemplateScope::Project,
        Some(7),
        TRANSLATE_SINGLE,
        ROLE_USER,
        "[{{Project}}] {{Text}}",
    ))
    .await
    .unwrap();
    let renderer = TemplatePromptRenderer::new(repo);

    let user = renderer
        .render(TemplateScope::Provider, Some(1), TRANSLATE_SINGLE, ROLE_USER, &sample_data())
        .await
        .unwrap();

    assert_eq!(user, "[Demo] Start __PH_0__");
}

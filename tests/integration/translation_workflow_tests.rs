/*!
 * Integration tests for single-unit translation against SQLite storage.
 */

use std::sync::Arc;
use std::time::Duration;

use locail::database::models::{TemplateRecord, TemplateScope};
use locail::database::{CacheStore, TemplateStore, UnitStore};
use locail::errors::TranslationError;
use locail::providers::mock::{MockProvider, MockProviderFactory};
use locail::translation::prompts::{ROLE_SYSTEM, TRANSLATE_SINGLE};
use locail::translation::{TemplatePromptRenderer, TranslateRequest, TranslationCache, TranslatorService};

use crate::common::{seed_project, TestProject};

fn translator(project: &TestProject, factory: &MockProviderFactory) -> TranslatorService {
    TranslatorService::new(
        project.repo.clone(),
        Arc::new(factory.clone()),
        Arc::new(TemplatePromptRenderer::new(project.repo.clone())),
        TranslationCache::new(project.repo.clone()),
    )
    .with_retry_policy(3, Duration::from_millis(1))
}

#[tokio::test]
async fn test_translateOne_withTagsAndPlaceholders_shouldCacheMaskedForm() {
    let project = seed_project("ollama", &[("welcome", "<b>Hi</b> {name}")]).await.unwrap();
    let factory = MockProviderFactory::new(MockProvider::working());
    let service = translator(&project, &factory);
    let unit = project.repo.get_unit(project.unit_ids[0]).await.unwrap().unwrap();

    let out = service
        .translate_one(&TranslateRequest::new(project.provider_id, unit, "de"))
        .await
        .unwrap();

    assert_eq!(out, "[TRANSLATED to de] <b>Hi</b> {name}");
    let cached = project
        .repo
        .get_cached("__TAG_1__Hi__TAG_0__ __PH_0__", "", "de", "ollama", "test-model")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.translation, "[TRANSLATED to de] __TAG_1__Hi__TAG_0__ __PH_0__");
}

#[tokio::test]
async fn test_translateOne_withSharedMaskedText_shouldRestoreEachSourceTokens() {
    let project = seed_project("ollama", &[("a", "Hello {first}"), ("b", "Hello {last}")])
        .await
        .unwrap();
    let factory = MockProviderFactory::new(MockProvider::working());
    let service = translator(&project, &factory);
    let first = project.repo.get_unit(project.unit_ids[0]).await.unwrap().unwrap();
    let second = project.repo.get_unit(project.unit_ids[1]).await.unwrap().unwrap();

    let a = service
        .translate_one(&TranslateRequest::new(project.provider_id, first, "fr"))
        .await
        .unwrap();
    let b = service
        .translate_one(&TranslateRequest::new(project.provider_id, second, "fr"))
        .await
        .unwrap();

    assert_eq!(a, "[TRANSLATED to fr] Hello {first}");
    assert_eq!(b, "[TRANSLATED to fr] Hello {last}");
    assert_eq!(factory.provider().request_count(), 1);
}

#[tokio::test]
async fn test_translateOne_withGlobalTemplate_shouldSendRenderedPrompt() {
    let project = seed_project("ollama", &[("title", "Settings")]).await.unwrap();
    project
        .repo
        .upsert_template(&TemplateRecord::new(
            TemplateScope::Global,
            None,
            TRANSLATE_SINGLE,
            ROLE_SYSTEM,
            "Translate into {{TgtLang}}. Key {{Key}}.",
        ))
        .await
        .unwrap();
    let factory = MockProviderFactory::new(MockProvider::working());
    let service = translator(&project, &factory);
    let unit = project.repo.get_unit(project.unit_ids[0]).await.unwrap().unwrap();

    service
        .translate_one(&TranslateRequest::new(project.provider_id, unit, "it"))
        .await
        .unwrap();

    assert_eq!(
        factory.provider().requests()[0].system_prompt,
        "Translate into Italian. Key title."
    );
}

#[tokio::test]
async fn test_translateOne_withEmptyResults_shouldExhaustRetries() {
    let project = seed_project("ollama", &[("title", "Settings")]).await.unwrap();
    let factory = MockProviderFactory::new(MockProvider::empty());
    let service = translator(&project, &factory);
    let unit = project.repo.get_unit(project.unit_ids[0]).await.unwrap().unwrap();

    let err = service
        .translate_one(&TranslateRequest::new(project.provider_id, unit, "it"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "no choices returned");
    assert!(matches!(err, TranslationError::Provider(_)));
    assert_eq!(factory.provider().request_count(), 3);
}

#[tokio::test]
async fn test_translateOne_withUnsupportedProviderKind_shouldFailFast() {
    let project = seed_project("deepl", &[("title", "Settings")]).await.unwrap();
    let factory = MockProviderFactory::new(MockProvider::working());
    let service = translator(&project, &factory);
    let unit = project.repo.get_unit(project.unit_ids[0]).await.unwrap().unwrap();

    let err = service
        .translate_one(&TranslateRequest::new(project.provider_id, unit, "it"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "unsupported provider: deepl");
    assert_eq!(factory.provider().request_count(), 0);
}

#[test]
fn test_translateOne_withDifferentModels_shouldKeepSeparateCacheEntries() {
    crate::common::init_test_logging();
    let result = tokio_test::block_on(async {
        let project = seed_project("ollama", &[("title", "Settings")]).await?;
        let factory = MockProviderFactory::new(MockProvider::working());
        let service = translator(&project, &factory);
        let unit = project.repo.get_unit(project.unit_ids[0]).await?.unwrap();

        let mut request = TranslateRequest::new(project.provider_id, unit, "nl");
        request.model = "model-a".into();
        service.translate_one(&request).await?;
        request.model = "model-b".into();
        service.translate_one(&request).await?;
        request.model = "model-a".into();
        let out = service.translate_one(&request).await?;
        Ok::<_, anyhow::Error>((out, factory.provider().request_count()))
    });

    let (out, calls) = result.unwrap();
    assert_eq!(out, "[TRANSLATED to nl] Settings");
    assert_eq!(calls, 2);
}

/*!
 * Integration tests for background translation jobs.
 */

use std::sync::Arc;

use locail::app_config::JobConfig;
use locail::database::models::{JobItemStatus, JobStatus, TranslationRecord, TranslationStatus};
use locail::database::TranslationStore;
use locail::jobs::{
    ChannelSink, CollectingSink, JobEvent, JobRunner, TranslateFileParams, TranslateUnitsParams,
};
use locail::providers::mock::{MockProvider, MockProviderFactory};

use crate::common::{init_test_logging, seed_project, TestProject};

fn fast_config() -> JobConfig {
    JobConfig {
        item_timeout_secs: 5,
        retry_backoff_ms: 1,
        ..JobConfig::default()
    }
}

fn runner(project: &TestProject, factory: &MockProviderFactory) -> JobRunner {
    JobRunner::from_repository(project.repo.clone(), Arc::new(factory.clone()), fast_config())
        .with_source_language("en")
}

#[tokio::test]
async fn test_translateFile_withPartialTranslations_shouldOnlyFillGaps() {
    init_test_logging();
    let project = seed_project("ollama", &[("a", "One"), ("b", "Two"), ("c", "Three")])
        .await
        .unwrap();
    project
        .repo
        .upsert_translation(&TranslationRecord::machine(project.unit_ids[1], "fr", "Deux", None))
        .await
        .unwrap();
    let factory = MockProviderFactory::new(MockProvider::working());
    let sink = Arc::new(CollectingSink::new());
    let runner = runner(&project, &factory).with_event_sink(sink.clone());

    let params = TranslateFileParams {
        file_id: project.file_id,
        target_locales: vec!["fr".into(), "es".into()],
        model: String::new(),
    };
    let job_id = runner.start_translate_file(7, project.provider_id, params).await.unwrap();
    runner.wait(job_id).await;

    let job = runner.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!((job.progress, job.total), (5, 5));
    assert_eq!(factory.provider().request_count(), 5);

    let french = project
        .repo
        .list_translations_by_file_locale(project.file_id, "fr")
        .await
        .unwrap();
    assert_eq!(french.len(), 3);
    let kept = french.iter().find(|t| t.unit_id == project.unit_ids[1]).unwrap();
    assert_eq!(kept.text, "Deux");
    let added = french.iter().find(|t| t.unit_id == project.unit_ids[0]).unwrap();
    assert_eq!(added.status, TranslationStatus::Machine);

    let prompt = &factory.provider().requests()[0];
    assert_eq!(prompt.source_lang, "en");
    assert!(prompt.user_prompt.contains("file: locales/en.json"));
}

#[tokio::test]
async fn test_jobEvents_shouldFollowLifecycleOrder() {
    let project = seed_project("ollama", &[("a", "One")]).await.unwrap();
    let factory = MockProviderFactory::new(MockProvider::working());
    let sink = Arc::new(CollectingSink::new());
    let runner = runner(&project, &factory).with_event_sink(sink.clone());

    let params = TranslateUnitsParams {
        unit_ids: project.unit_ids.clone(),
        locales: vec!["ja".into()],
        model: String::new(),
        force: false,
    };
    let job_id = runner.start_translate_units(7, project.provider_id, params).await.unwrap();
    runner.wait(job_id).await;

    let names: Vec<&str> = sink
        .events()
        .iter()
        .filter(|e| e.name() != "job.log")
        .map(|e| e.name())
        .collect();
    assert_eq!(
        names,
        vec!["job.started", "job.item.start", "job.item.done", "job.progress", "job.progress"]
    );

    let logs = runner.list_logs(job_id, 10).await.unwrap();
    assert!(logs[0].message.starts_with("job started: provider="));
    assert!(logs
        .iter()
        .any(|l| l.message == "translate done: key=a locale=ja len=22"));
}

#[tokio::test]
async fn test_channelSink_shouldStreamEventsToReceiver() {
    let project = seed_project("ollama", &[("a", "One"), ("b", "Two")]).await.unwrap();
    let factory = MockProviderFactory::new(MockProvider::working());
    let (sink, mut events) = ChannelSink::new();
    let runner = runner(&project, &factory).with_event_sink(Arc::new(sink));

    let params = TranslateFileParams {
        file_id: project.file_id,
        target_locales: vec!["ko".into()],
        model: "custom-model".into(),
    };
    let job_id = runner.start_translate_file(7, project.provider_id, params).await.unwrap();

    let mut last_done = 0;
    while let Some(event) = events.recv().await {
        if let JobEvent::Progress { done, status, model, .. } = event {
            assert!(done >= last_done);
            assert_eq!(model, "custom-model");
            last_done = done;
            if status.is_terminal() {
                assert_eq!(status, JobStatus::Done);
                break;
            }
        }
    }
    assert_eq!(last_done, 2);
}

#[tokio::test]
async fn test_cancel_beforeJobRuns_shouldLeaveNoItems() {
    let project = seed_project("ollama", &[("a", "One"), ("b", "Two")]).await.unwrap();
    let factory = MockProviderFactory::new(MockProvider::slow(50));
    let runner = runner(&project, &factory);

    let params = TranslateUnitsParams {
        unit_ids: project.unit_ids.clone(),
        locales: vec!["fr".into()],
        model: String::new(),
        force: true,
    };
    let job_id = runner.start_translate_units(7, project.provider_id, params).await.unwrap();
    let cancelled = runner.cancel(job_id);
    runner.wait(job_id).await;

    let job = runner.get_job(job_id).await.unwrap().unwrap();
    if cancelled {
        assert_eq!(job.status, JobStatus::Canceled);
        assert!(job.progress < 2);
    } else {
        assert_eq!(job.status, JobStatus::Done);
    }
    assert!(!runner.cancel(job_id));
    assert!(runner
        .list_items(job_id)
        .await
        .unwrap()
        .iter()
        .all(|i| i.status != JobItemStatus::Running));
}

#[tokio::test]
async fn test_listJobs_shouldReturnNewestFirst() {
    let project = seed_project("ollama", &[("a", "One")]).await.unwrap();
    let factory = MockProviderFactory::new(MockProvider::working());
    let runner = runner(&project, &factory);

    let mut ids = Vec::new();
    for locale in ["fr", "de"] {
        let params = TranslateFileParams {
            file_id: project.file_id,
            target_locales: vec![locale.into()],
            model: String::new(),
        };
        let job_id = runner.start_translate_file(7, project.provider_id, params).await.unwrap();
        runner.wait(job_id).await;
        ids.push(job_id);
    }

    let jobs = runner.list_jobs(10).await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, ids[1]);
    assert_eq!(jobs[1].id, ids[0]);
}

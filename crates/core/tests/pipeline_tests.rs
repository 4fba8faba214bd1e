mod helpers;

use std::sync::{Arc, Mutex, atomic::Ordering};

use helpers::*;
use riskscan_core::{
    CompanyOutcome, DocumentAnalysis, DocumentMode, Error, RiskReport, Stage,
    news::{NewsPayload, NewsResult},
};

#[tokio::test]
async fn media_run_completes_and_persists_results() {
    let harness = Harness::new();
    let executor = Arc::new(FakeExecutor::new(vec![Ok(
        "1. **Fraud**: speaker denies fraud allegations",
    )]));
    let speech = Arc::new(FakeSpeech::new("we never committed fraud", 2));
    let pipeline = harness.pipeline(executor.clone()).await.with_media(Harness::media(
        Arc::new(FakeDownloader::default()),
        FakeExtractor { fail_with: None },
        speech.clone(),
    ));

    let run = pipeline.start_run();
    let analysis = pipeline
        .process_url_as(&run, "https://www.tiktok.com/@acme/video/1")
        .await
        .unwrap();

    assert_eq!(
        analysis.transcript_text,
        "Full Transcript:\nwe never committed fraud\n\n"
    );
    assert_eq!(
        analysis.report,
        RiskReport::Findings("1. Fraud: speaker denies fraud allegations".to_string())
    );
    assert_eq!(
        std::fs::read_to_string(&analysis.transcript_path).unwrap(),
        analysis.transcript_text
    );
    assert_eq!(
        std::fs::read_to_string(&analysis.report_path).unwrap(),
        "1. Fraud: speaker denies fraud allegations"
    );
    assert_eq!(speech.fetches.load(Ordering::SeqCst), 3);

    let prompts = executor.prompts.lock().unwrap();
    assert!(prompts[0].user_prompt.contains("we never committed fraud"));

    let record = pipeline.progress_of(run.run_id()).unwrap();
    assert_eq!(record.stage, Stage::Completed);
    assert_eq!(record.percentage, 100);
    assert!(dir_entries(harness.work_dir()).is_empty());
}

#[tokio::test]
async fn audio_failure_marks_error_and_cleans_scratch() {
    let harness = Harness::new();
    let executor = Arc::new(FakeExecutor::new(vec![]));
    let downloader = Arc::new(FakeDownloader::default());
    let pipeline = harness.pipeline(executor.clone()).await.with_media(Harness::media(
        downloader.clone(),
        FakeExtractor {
            fail_with: Some("Output file does not contain any stream".to_string()),
        },
        Arc::new(FakeSpeech::new("unused", 0)),
    ));

    let run = pipeline.start_run();
    let err = pipeline
        .process_url_as(&run, "https://x.com/acme/status/42")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AudioExtractionFailed { .. }));
    assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);

    let record = run.snapshot().unwrap();
    assert_eq!(record.stage, Stage::Error);
    assert_eq!(record.percentage, 30);
    assert!(record.message.contains("does not contain any stream"));

    assert!(harness.work_dir().exists());
    assert!(dir_entries(harness.work_dir()).is_empty(), "scratch files leaked");
    assert!(executor.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unsupported_url_fails_before_download() {
    let harness = Harness::new();
    let downloader = Arc::new(FakeDownloader::default());
    let pipeline = harness
        .pipeline(Arc::new(FakeExecutor::new(vec![])))
        .await
        .with_media(Harness::media(
            downloader.clone(),
            FakeExtractor { fail_with: None },
            Arc::new(FakeSpeech::new("unused", 0)),
        ));

    let err = pipeline
        .process_url("https://www.youtube.com/watch?v=1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedSource { .. }));
    assert_eq!(downloader.calls.load(Ordering::SeqCst), 0);
    assert!(dir_entries(harness.work_dir()).is_empty());
}

#[tokio::test]
async fn analysis_failure_is_surfaced_not_swallowed() {
    let harness = Harness::new();
    let executor = Arc::new(FakeExecutor::new(vec![Err("quota exceeded")]));
    let pipeline = harness.pipeline(executor).await.with_media(Harness::media(
        Arc::new(FakeDownloader::default()),
        FakeExtractor { fail_with: None },
        Arc::new(FakeSpeech::new("hello", 0)),
    ));

    let run = pipeline.start_run();
    let err = pipeline
        .process_url_as(&run, "https://instagram.com/reel/xyz")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AnalysisFailed { .. }));
    let record = run.snapshot().unwrap();
    assert_eq!(record.stage, Stage::Error);
    assert_eq!(record.percentage, 80);
}

#[tokio::test]
async fn media_flow_requires_media_services() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(Arc::new(FakeExecutor::new(vec![]))).await;

    let err = pipeline
        .process_url("https://x.com/acme/status/42")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotConfigured { .. }));
}

#[tokio::test]
async fn concurrent_runs_keep_separate_progress() {
    let harness = Harness::new();
    let pipeline = harness
        .pipeline(Arc::new(FakeExecutor::new(vec![Ok("1. risk")])))
        .await
        .with_media(Harness::media(
            Arc::new(FakeDownloader::default()),
            FakeExtractor { fail_with: None },
            Arc::new(FakeSpeech::new("hello", 0)),
        ));

    let good = pipeline.start_run();
    let bad = pipeline.start_run();
    let (ok, err) = tokio::join!(
        pipeline.process_url_as(&good, "https://twitter.com/a/status/1"),
        pipeline.process_url_as(&bad, "https://example.com/video"),
    );

    assert!(ok.is_ok());
    assert!(err.is_err());
    assert_eq!(good.snapshot().unwrap().stage, Stage::Completed);
    assert_eq!(bad.snapshot().unwrap().stage, Stage::Error);
}

#[tokio::test]
async fn company_document_yields_two_names() {
    let harness = Harness::new();
    let path = harness.root.path().join("contract.txt");
    std::fs::write(&path, "This agreement is made between Acme Corp and Globex Inc.").unwrap();

    let executor = Arc::new(FakeExecutor::new(vec![Ok("Acme Corp\nGlobex Inc\nextra")]));
    let pipeline = harness.pipeline(executor.clone()).await;

    let analysis = pipeline
        .analyze_document(&path, DocumentMode::Company)
        .await
        .unwrap();

    match analysis {
        DocumentAnalysis::Companies(record) => {
            assert_eq!(record.names, vec!["Acme Corp", "Globex Inc"])
        }
        other => panic!("unexpected analysis: {other:?}"),
    }
    assert!(
        executor.prompts.lock().unwrap()[0]
            .user_prompt
            .contains("between Acme Corp and Globex Inc")
    );
}

#[tokio::test]
async fn risk_document_persists_report() {
    let harness = Harness::new();
    let path = harness.root.path().join("filing.txt");
    std::fs::write(&path, "Acme Corp filed for Chapter 11 protection.").unwrap();

    let pipeline = harness
        .pipeline(Arc::new(FakeExecutor::new(vec![Ok("1. **Bankruptcy** filing")])))
        .await;

    let analysis = pipeline
        .analyze_document(&path, DocumentMode::Risk)
        .await
        .unwrap();

    assert_eq!(
        analysis,
        DocumentAnalysis::Risk(RiskReport::Findings("1. Bankruptcy filing".to_string()))
    );
    let saved = pipeline.store().dir_for("document-filing").join("risk_report.txt");
    assert_eq!(std::fs::read_to_string(saved).unwrap(), "1. Bankruptcy filing");
}

#[tokio::test]
async fn company_news_outcomes_stay_distinct() {
    let harness = Harness::new();
    let news = Arc::new(FakeNews {
        responses: vec![
            (
                "Acme",
                Some(NewsPayload {
                    news_results: Some(vec![NewsResult {
                        title: Some("Acme faces fraud lawsuit".to_string()),
                        ..NewsResult::default()
                    }]),
                }),
            ),
            ("Globex", Some(NewsPayload { news_results: None })),
            ("Initech", None),
        ],
        queries: Mutex::new(Vec::new()),
    });
    let executor = Arc::new(FakeExecutor::new(vec![Ok("1. lawsuit")]));
    let pipeline = harness
        .pipeline(executor.clone())
        .await
        .with_news(news.clone());

    let assessments = pipeline
        .assess_companies(&["Acme", "Globex", " ", "Initech"])
        .await
        .unwrap();

    assert_eq!(assessments.len(), 3);
    match &assessments[0].outcome {
        CompanyOutcome::Report { report, digest } => {
            assert_eq!(report.text(), "1. lawsuit");
            assert!(digest.contains("Title : Acme faces fraud lawsuit"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(assessments[1].outcome, CompanyOutcome::NoResults);
    assert_eq!(assessments[2].outcome, CompanyOutcome::SearchUnavailable);

    assert_eq!(
        news.queries.lock().unwrap()[0],
        r#""Acme" (bankruptcy OR lawsuit OR fraud)"#
    );
    assert_eq!(executor.prompts.lock().unwrap().len(), 1);

    let report = pipeline.store().dir_for("news-Acme").join("risk_report.txt");
    assert_eq!(std::fs::read_to_string(report).unwrap(), "1. lawsuit");
}

#[tokio::test]
async fn non_latin_company_reports_do_not_overwrite_each_other() {
    let harness = Harness::new();
    let hit = |title: &str| {
        Some(NewsPayload {
            news_results: Some(vec![NewsResult {
                title: Some(title.to_string()),
                ..NewsResult::default()
            }]),
        })
    };
    let news = Arc::new(FakeNews {
        responses: vec![("华为", hit("华为 lawsuit")), ("腾讯", hit("腾讯 fraud probe"))],
        queries: Mutex::new(Vec::new()),
    });
    let executor = Arc::new(FakeExecutor::new(vec![
        Ok("report for huawei"),
        Ok("report for tencent"),
    ]));
    let pipeline = harness.pipeline(executor).await.with_news(news);

    let assessments = pipeline.assess_companies(&["华为", "腾讯"]).await.unwrap();
    assert_eq!(assessments.len(), 2);

    let huawei = pipeline.store().dir_for("news-华为");
    let tencent = pipeline.store().dir_for("news-腾讯");
    assert_ne!(huawei, tencent);
    assert_eq!(
        std::fs::read_to_string(huawei.join("risk_report.txt")).unwrap(),
        "report for huawei"
    );
    assert_eq!(
        std::fs::read_to_string(tencent.join("risk_report.txt")).unwrap(),
        "report for tencent"
    );
    assert!(
        std::fs::read_to_string(tencent.join("news_digest.txt"))
            .unwrap()
            .contains("腾讯 fraud probe")
    );
    assert_eq!(dir_entries(pipeline.store().root()).len(), 2);
}

#[tokio::test]
async fn url_without_scheme_is_processed() {
    let harness = Harness::new();
    let downloader = Arc::new(FakeDownloader::default());
    let pipeline = harness
        .pipeline(Arc::new(FakeExecutor::new(vec![Ok("1. risk")])))
        .await
        .with_media(Harness::media(
            downloader.clone(),
            FakeExtractor { fail_with: None },
            Arc::new(FakeSpeech::new("hello", 0)),
        ));

    let analysis = pipeline
        .process_url("www.tiktok.com/@acme/video/1")
        .await
        .unwrap();
    assert_eq!(analysis.report.text(), "1. risk");
    assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
}

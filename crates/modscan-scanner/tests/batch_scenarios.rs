//! End-to-end batch tests
//!
//! Drives the orchestrator with mock predictors through the documented
//! scenarios: flagged text, flagged clothing, no face, partial adapter
//! failure, plus ordering, cancellation and statistics commit behavior.


use mock_predictors::{
    tagged_jpeg, FailingStore, MockAgeGender, MockClothing, MockGesture, MockTextExtractor,
};
use modscan_classifiers::{CommitMode, ModelRegistry, ProfanityLexicon, ScanConfig};
use modscan_core::{AdapterStatus, Error, Gender, Item, ModelName, ModelSelection, ReasonCode};
use modscan_scanner::{BatchOrchestrator, BatchState};
use modscan_telemetry::{FileStatisticsStore, StatisticsAccumulator};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

struct Predictors {
    clothing: Arc<MockClothing>,
    faces: MockAgeGender,
    ocr: Arc<MockTextExtractor>,
    gesture: MockGesture,
}

impl Default for Predictors {
    fn default() -> Self {
        Self {
            clothing: Arc::new(MockClothing::new(0.1, 0.9)),
            faces: MockAgeGender::with_face(Gender::Male),
            ocr: Arc::new(MockTextExtractor::echo()),
            gesture: MockGesture::new(&[]),
        }
    }
}

async fn registry(predictors: Predictors) -> Arc<ModelRegistry> {
    let mut registry = ModelRegistry::new()
        .with_clothing(predictors.clothing)
        .with_age_gender(Arc::new(predictors.faces))
        .with_text_extractor(predictors.ocr)
        .with_gesture(Arc::new(predictors.gesture))
        .with_lexicon(Arc::new(ProfanityLexicon::new(["crap", "damn"]).unwrap()));
    registry.initialize().await.unwrap();
    Arc::new(registry)
}

fn config(concurrency: usize) -> ScanConfig {
    let mut config = ScanConfig::default();
    config.batch.concurrency = concurrency;
    config.batch.adapter_timeout_ms = 2_000;
    config
}

fn models(names: &[&str]) -> ModelSelection {
    ModelSelection::parse(names).unwrap()
}

#[tokio::test]
async fn test_scenario_profane_text() {
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors::default()).await,
        &config(1),
        StatisticsAccumulator::in_memory(),
    );

    let outcome = orchestrator
        .classify_batch(vec![Item::text("This is a crap test")], &models(&["profanity"]))
        .await
        .unwrap();

    let verdict = &outcome.verdicts[0];
    assert!(verdict.flagged());
    assert_eq!(
        verdict.reasons().iter().copied().collect::<Vec<_>>(),
        vec![ReasonCode::FlaggedText]
    );
    assert_eq!(verdict.details().matched, vec!["crap"]);
}

#[tokio::test]
async fn test_scenario_topless_male() {
    let clothing = Arc::new(MockClothing::new(0.9, 0.1));
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors {
            clothing: clothing.clone(),
            faces: MockAgeGender::with_face(Gender::Male),
            ..Default::default()
        })
        .await,
        &config(1),
        StatisticsAccumulator::in_memory(),
    );

    let outcome = orchestrator
        .classify_batch(vec![tagged_jpeg("")], &models(&["clothing"]))
        .await
        .unwrap();

    let verdict = &outcome.verdicts[0];
    assert!(verdict.flagged());
    assert_eq!(
        verdict.reasons().iter().copied().collect::<Vec<_>>(),
        vec![ReasonCode::FlaggedClothing]
    );
    assert_eq!(verdict.details().gender, Some(Gender::Male));
    assert_eq!(verdict.details().topless_probability, Some(0.9));
    assert_eq!(verdict.details().clothed_probability, Some(0.1));
    assert_eq!(clothing.call_count(), 1);
}

#[tokio::test]
async fn test_scenario_no_face() {
    let clothing = Arc::new(MockClothing::new(0.9, 0.1));
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors {
            clothing: clothing.clone(),
            faces: MockAgeGender::no_face(),
            ..Default::default()
        })
        .await,
        &config(1),
        StatisticsAccumulator::in_memory(),
    );

    let outcome = orchestrator
        .classify_batch(vec![tagged_jpeg("")], &models(&["clothing", "age_gender"]))
        .await
        .unwrap();

    let verdict = &outcome.verdicts[0];
    assert!(!verdict.flagged());
    assert!(verdict.reasons().is_empty());
    assert_eq!(verdict.details().gender, Some(Gender::Unknown));
    assert_eq!(
        serde_json::to_value(verdict).unwrap()["details"]["gender"],
        "N/A"
    );
    assert_eq!(clothing.call_count(), 0);
    assert_eq!(outcome.state, BatchState::Committed);
}

#[tokio::test]
async fn test_scenario_one_failing_ocr_call() {
    let accumulator = StatisticsAccumulator::in_memory();
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors::default()).await,
        &config(1),
        accumulator.clone(),
    );

    let items = vec![
        tagged_jpeg("crap on a sign"),
        tagged_jpeg("ocr-fail"),
        tagged_jpeg("total crap"),
    ];
    let outcome = orchestrator
        .classify_batch(items, &models(&["text"]))
        .await
        .unwrap();

    assert_eq!(outcome.verdicts.len(), 3);
    let failed = &outcome.verdicts[1];
    assert_eq!(
        failed.details().adapter_status(ModelName::Text),
        Some(AdapterStatus::Unavailable)
    );
    assert!(!failed.flagged());
    assert_eq!(failed.details().unavailable_adapters().count(), 1);

    for index in [0, 2] {
        let verdict = &outcome.verdicts[index];
        assert_eq!(
            verdict.details().adapter_status(ModelName::Text),
            Some(AdapterStatus::Checked)
        );
        assert!(verdict.has_reason(ReasonCode::FlaggedText));
    }

    assert_eq!(outcome.state, BatchState::PartiallyFailed);
    assert!(outcome.is_committed());

    let totals = accumulator.totals().await.unwrap();
    assert_eq!(totals.flagged_text, 2);
    assert_eq!(totals.automated_scans, 1);
}

#[tokio::test]
async fn test_order_preserved_under_concurrency() {
    let ocr = Arc::new(
        MockTextExtractor::echo().with_staggered_latency(Duration::from_millis(15)),
    );
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors {
            ocr: ocr.clone(),
            ..Default::default()
        })
        .await,
        &config(4),
        StatisticsAccumulator::in_memory(),
    );

    let tags = ["aaaa", "a", "aaa", "aa", "aaaa", "", "aaa", "a"];
    let items = tags.iter().map(|tag| tagged_jpeg(tag)).collect();
    let outcome = orchestrator
        .classify_batch(items, &models(&["text"]))
        .await
        .unwrap();

    assert_eq!(outcome.verdicts.len(), tags.len());
    for (index, (verdict, tag)) in outcome.verdicts.iter().zip(tags).enumerate() {
        assert_eq!(verdict.item_reference(), index);
        let expected: Vec<String> = if tag.is_empty() {
            Vec::new()
        } else {
            vec![tag.to_string()]
        };
        assert_eq!(verdict.details().extracted_text, expected);
    }
    assert_eq!(ocr.call_count(), tags.len() as u32);
}

#[tokio::test]
async fn test_invalid_selection_fails_before_processing() {
    let ocr = Arc::new(MockTextExtractor::echo());
    let mut lexicon_only = ModelRegistry::new()
        .with_text_extractor(ocr.clone())
        .with_lexicon(Arc::new(ProfanityLexicon::builtin().unwrap()));
    lexicon_only.initialize().await.unwrap();

    let accumulator = StatisticsAccumulator::in_memory();
    let orchestrator =
        BatchOrchestrator::new(Arc::new(lexicon_only), &config(1), accumulator.clone());

    let result = orchestrator
        .classify_batch(
            vec![tagged_jpeg("crap"), Item::text("crap")],
            &models(&["text", "clothing"]),
        )
        .await;

    assert!(matches!(result, Err(Error::InvalidSelection(ref msg)) if msg.contains("clothing")));
    assert_eq!(ocr.call_count(), 0);
    assert!(accumulator.totals().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_item_is_isolated() {
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors::default()).await,
        &config(2),
        StatisticsAccumulator::in_memory(),
    );

    let items = vec![
        Item::text("damn"),
        Item::image(b"definitely not an image".to_vec()),
        Item::from_data_url("data:image/png;base64,###"),
        tagged_jpeg("fine"),
    ];
    let outcome = orchestrator
        .classify_batch(items, &models(&["text"]))
        .await
        .unwrap();

    assert_eq!(outcome.verdicts.len(), 4);
    assert!(outcome.verdicts[0].flagged());
    for index in [1, 2] {
        let verdict = &outcome.verdicts[index];
        assert!(verdict.is_error());
        assert!(!verdict.flagged());
        assert!(verdict.reasons().is_empty());
    }
    assert!(!outcome.verdicts[3].is_error());
    assert_eq!(outcome.error_count(), 2);
    assert_eq!(outcome.counters.flagged_text, 1);
    assert_eq!(outcome.state, BatchState::PartiallyFailed);
}

#[tokio::test]
async fn test_reasons_coexist_and_are_counted() {
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors {
            clothing: Arc::new(MockClothing::new(0.95, 0.05)),
            faces: MockAgeGender::with_face_aged(Gender::Female, 15.0),
            ocr: Arc::new(MockTextExtractor::new(&["damn"])),
            gesture: MockGesture::new(&[("middle_finger", 0.8), ("thumbs_up", 0.99)]),
        })
        .await,
        &config(1),
        StatisticsAccumulator::in_memory(),
    );

    let outcome = orchestrator
        .classify_batch(
            vec![tagged_jpeg(""), tagged_jpeg("")],
            &ModelSelection::all(),
        )
        .await
        .unwrap();

    for verdict in &outcome.verdicts {
        assert_eq!(verdict.reasons().len(), 4);
        assert_eq!(verdict.details().gestures.len(), 2);
    }
    for reason in ReasonCode::ALL {
        assert_eq!(outcome.counters.reason(reason), 2);
    }
    assert_eq!(outcome.counters.automated_scans, 1);
}

#[tokio::test]
async fn test_failed_face_detection_marks_dependents_unavailable() {
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors {
            faces: MockAgeGender::failing("gpu lost"),
            ..Default::default()
        })
        .await,
        &config(1),
        StatisticsAccumulator::in_memory(),
    );

    let outcome = orchestrator
        .classify_batch(
            vec![tagged_jpeg("crap")],
            &models(&["clothing", "age_gender", "text"]),
        )
        .await
        .unwrap();

    let details = outcome.verdicts[0].details();
    assert_eq!(
        details.unavailable_adapters().collect::<Vec<_>>(),
        vec![ModelName::Clothing, ModelName::AgeGender]
    );
    assert!(outcome.verdicts[0].has_reason(ReasonCode::FlaggedText));
}

#[tokio::test]
async fn test_hanging_adapter_does_not_stall_batch() {
    let mut config = config(2);
    config.batch.adapter_timeout_ms = 100;
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors::default()).await,
        &config,
        StatisticsAccumulator::in_memory(),
    );

    let started = Instant::now();
    let outcome = orchestrator
        .classify_batch(
            vec![tagged_jpeg("ocr-hang"), tagged_jpeg("crap"), tagged_jpeg("ok")],
            &models(&["text"]),
        )
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(
        outcome.verdicts[0].details().adapter_status(ModelName::Text),
        Some(AdapterStatus::Unavailable)
    );
    assert!(outcome.verdicts[1].flagged());
    assert!(!outcome.verdicts[2].flagged());
}

#[tokio::test]
async fn test_commit_failure_keeps_verdicts_and_can_retry() {
    let store = Arc::new(FailingStore::offline());
    let accumulator = StatisticsAccumulator::new(store.clone());
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors::default()).await,
        &config(1),
        accumulator.clone(),
    );

    let mut outcome = orchestrator
        .classify_batch(
            vec![Item::text("crap"), Item::text("clean")],
            &models(&["profanity"]),
        )
        .await
        .unwrap();

    assert_eq!(outcome.verdicts.len(), 2);
    assert!(outcome.verdicts[0].flagged());
    assert_eq!(outcome.state, BatchState::PartiallyFailed);
    assert!(outcome.statistics_warning.is_some());
    assert_eq!(outcome.pending_commit, Some(outcome.counters));
    assert!(accumulator.totals().await.unwrap().is_empty());

    store.set_online();
    orchestrator.retry_commit(&mut outcome).await.unwrap();

    assert_eq!(outcome.state, BatchState::Committed);
    assert!(outcome.statistics_warning.is_none());
    assert_eq!(accumulator.totals().await.unwrap(), outcome.counters);
}

#[tokio::test]
async fn test_cancel_mid_batch_returns_completed_verdicts() {
    let ocr = Arc::new(MockTextExtractor::echo().with_latency(Duration::from_millis(40)));
    let accumulator = StatisticsAccumulator::in_memory();
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors {
            ocr: ocr.clone(),
            ..Default::default()
        })
        .await,
        &config(1),
        accumulator.clone(),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let items = (0..10).map(|_| tagged_jpeg("crap")).collect();
    let outcome = orchestrator
        .classify_batch_with_cancel(items, &models(&["text"]), cancel)
        .await
        .unwrap();

    assert_eq!(outcome.state, BatchState::Cancelled);
    assert!(!outcome.verdicts.is_empty());
    assert!(outcome.verdicts.len() < 10);
    for (index, verdict) in outcome.verdicts.iter().enumerate() {
        assert_eq!(verdict.item_reference(), index);
        assert!(verdict.flagged());
    }
    assert_eq!(outcome.counters.flagged_text, outcome.verdicts.len() as u64);
    assert!(accumulator.totals().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_per_item_commit_mode() {
    let mut config = config(1);
    config.batch.commit_mode = CommitMode::PerItem;
    let accumulator = StatisticsAccumulator::in_memory();
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors::default()).await,
        &config,
        accumulator.clone(),
    );

    let outcome = orchestrator
        .classify_batch(
            vec![Item::text("crap"), Item::text("fine"), Item::text("damn crap")],
            &models(&["profanity"]),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, BatchState::Committed);
    let totals = accumulator.totals().await.unwrap();
    assert_eq!(totals, outcome.counters);
    assert_eq!(totals.flagged_text, 2);
    assert_eq!(totals.automated_scans, 1);
}

#[tokio::test]
async fn test_per_item_commits_survive_cancellation() {
    let mut config = config(1);
    config.batch.commit_mode = CommitMode::PerItem;
    let ocr = Arc::new(MockTextExtractor::echo().with_latency(Duration::from_millis(40)));
    let accumulator = StatisticsAccumulator::in_memory();
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors {
            ocr,
            ..Default::default()
        })
        .await,
        &config,
        accumulator.clone(),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let items = (0..10).map(|_| tagged_jpeg("crap")).collect();
    let outcome = orchestrator
        .classify_batch_with_cancel(items, &models(&["text"]), cancel)
        .await
        .unwrap();

    assert_eq!(outcome.state, BatchState::Cancelled);
    assert!(outcome.verdicts.len() < 10);

    let totals = accumulator.totals().await.unwrap();
    assert_eq!(totals.flagged_text, outcome.verdicts.len() as u64);
    assert_eq!(totals.automated_scans, 0);
}

#[tokio::test]
async fn test_batches_accumulate_with_cleanup() {
    let accumulator = StatisticsAccumulator::in_memory();
    let orchestrator = BatchOrchestrator::new(
        registry(Predictors::default()).await,
        &config(1),
        accumulator.clone(),
    );

    for _ in 0..3 {
        orchestrator
            .classify_batch(vec![Item::text("crap")], &models(&["profanity"]))
            .await
            .unwrap();
    }
    accumulator.record_cleanup(2).await.unwrap();

    let totals = accumulator.totals().await.unwrap();
    assert_eq!(totals.automated_scans, 3);
    assert_eq!(totals.flagged_text, 3);
    assert_eq!(totals.images_cleaned, 2);
}

#[tokio::test]
async fn test_file_totals_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("totals.json");

    for _ in 0..2 {
        let accumulator =
            StatisticsAccumulator::new(Arc::new(FileStatisticsStore::new(&path)));
        let orchestrator = BatchOrchestrator::new(
            registry(Predictors::default()).await,
            &config(1),
            accumulator,
        );
        orchestrator
            .classify_batch(
                vec![Item::text("crap"), tagged_jpeg("damn")],
                &models(&["text"]),
            )
            .await
            .unwrap();
    }

    let reopened = StatisticsAccumulator::new(Arc::new(FileStatisticsStore::new(&path)));
    let totals = reopened.totals().await.unwrap();
    assert_eq!(totals.automated_scans, 2);
    assert_eq!(totals.flagged_text, 4);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_batch_shape_and_counters(
        texts in prop::collection::vec(
            prop::sample::select(vec!["crap", "fine words", "damn it", "scrap metal", ""]),
            0..12,
        ),
        concurrency in 1usize..5,
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let outcome = runtime.block_on(async {
            let orchestrator = BatchOrchestrator::new(
                registry(Predictors::default()).await,
                &config(concurrency),
                StatisticsAccumulator::in_memory(),
            );
            let items = texts.iter().map(|t| Item::text(*t)).collect();
            orchestrator.classify_batch(items, &models(&["profanity"])).await.unwrap()
        });

        prop_assert_eq!(outcome.verdicts.len(), texts.len());
        prop_assert_eq!(outcome.counters.automated_scans, 1);

        let expected_flags = texts.iter().filter(|t| **t == "crap" || **t == "damn it").count();
        prop_assert_eq!(outcome.counters.flagged_text, expected_flags as u64);

        for (index, verdict) in outcome.verdicts.iter().enumerate() {
            prop_assert_eq!(verdict.item_reference(), index);
            prop_assert_eq!(verdict.flagged(), !verdict.reasons().is_empty());
        }
    }
}

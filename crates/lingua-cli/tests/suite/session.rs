use std::sync::Arc;

use lingua_cache::Priority;
use lingua_cli::session::{run_demo, speak, translate};
use lingua_cli::simulated::{self, Script, SpeechVoice};
use lingua_config::{LinguaConfig, MemoryPreferenceStore};
use lingua_models::{ResourceId, ResourceStatus};
use lingua_runtime::LinguaRuntime;

fn runtime() -> LinguaRuntime {
    simulated::register(LinguaRuntime::builder(LinguaConfig::default()))
        .preferences(Arc::new(MemoryPreferenceStore::new()))
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn second_translation_is_served_from_cache() {
    let runtime = runtime();
    runtime.set_target_language("fr").unwrap();

    let first = translate(&runtime, "Thank you!", Priority::Medium).await.unwrap();
    assert_eq!(first.text, "merci");
    assert_eq!(first.script, Script::Latin);
    assert!(!first.cached);

    let second = translate(&runtime, "thank you!", Priority::Medium).await.unwrap();
    assert_eq!(second.text, "merci");
    assert!(second.cached);

    let stats = runtime.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.item_count, 1);
}

#[tokio::test(start_paused = true)]
async fn translations_are_keyed_by_language() {
    let runtime = runtime();
    let spanish = translate(&runtime, "hello", Priority::Medium).await.unwrap();
    assert_eq!(spanish.text, "hola");

    runtime.set_target_language("de").unwrap();
    let german = translate(&runtime, "hello", Priority::Medium).await.unwrap();
    assert_eq!(german.text, "hallo");
    assert!(!german.cached);
}

#[tokio::test(start_paused = true)]
async fn speech_is_cached_as_low_priority_audio() {
    let runtime = runtime();
    let speech = speak(&runtime, "hi").await.unwrap();
    assert!(!speech.cached);
    assert_eq!(speech.sample_rate, SpeechVoice::SAMPLE_RATE);
    assert_eq!(speech.duration_ms, 2 * u64::from(SpeechVoice::MS_PER_CHAR));
    assert_eq!(runtime.cache_stats().by_priority.low.count, 1);

    let again = speak(&runtime, "hi").await.unwrap();
    assert!(again.cached);
    assert_eq!(again.bytes, speech.bytes);

    let speech_status = runtime.resource_status(&ResourceId::SPEECH).unwrap();
    assert_eq!(speech_status.status, ResourceStatus::Loaded);
}

#[tokio::test(start_paused = true)]
async fn demo_releases_memory_in_the_background() {
    let runtime = runtime();
    let report = run_demo(&runtime).await.unwrap();

    let background = report
        .steps
        .iter()
        .find(|step| step.action == "background")
        .unwrap();
    assert_eq!(background.loaded_resources, 0);
    assert_eq!(background.memory.resource_bytes, 0);
    // Only the pinned greeting survives.
    assert_eq!(background.cache_items, 1);

    let last = report.steps.last().unwrap();
    assert_eq!(last.loaded_resources, 1);
    assert!(report.steps.iter().filter(|step| step.action == "translate").count() >= 4);
    assert!(report.steps[1].detail.ends_with("(cached)"));
}

//! Translate and speak through the execution queue, memoizing results in the priority cache.

use lingua_cache::{CacheStats, Priority};
use lingua_config::LogBuffer;
use lingua_memory::MemoryReport;
use lingua_models::{ResourceError, ResourceId, ResourceSnapshot};
use lingua_runtime::{CachePayload, LifecycleSignal, LinguaRuntime};
use serde::Serialize;

use crate::simulated::{detect_script, PhraseTable, Script, SpeechVoice};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub source: String,
    pub target_language: String,
    pub script: Script,
    pub text: String,
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Speech {
    pub text: String,
    pub sample_rate: u32,
    pub bytes: u64,
    pub duration_ms: u64,
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub target_language: String,
    pub memory: MemoryReport,
    pub resources: Vec<ResourceSnapshot>,
    pub cache: CacheStats,
    /// Newest formatted log lines, oldest first.
    pub recent_logs: Vec<String>,
}

impl StatusReport {
    pub fn capture(runtime: &LinguaRuntime) -> Self {
        Self {
            target_language: runtime.target_language(),
            memory: runtime.memory_report(),
            resources: runtime.resource_statuses(),
            cache: runtime.cache_stats(),
            recent_logs: Vec::new(),
        }
    }

    pub fn with_recent_logs(mut self, logs: &LogBuffer, lines: usize) -> Self {
        self.recent_logs = logs.last_lines(lines);
        self
    }
}

fn translation_key(language: &str, text: &str) -> String {
    format!("translation:{language}:{}", text.trim().to_lowercase())
}

fn speech_key(text: &str) -> String {
    format!("speech:{}", text.trim())
}

fn remember(runtime: &LinguaRuntime, key: String, payload: CachePayload, priority: Priority) {
    if let Err(err) = runtime.cache().insert(key, payload, priority) {
        tracing::warn!(target: "lingua.cli", error = %err, "result not cached");
    }
}

/// Translate `text` into the runtime's current target language.
pub async fn translate(
    runtime: &LinguaRuntime,
    text: &str,
    priority: Priority,
) -> Result<Translation, ResourceError> {
    let target_language = runtime.target_language();
    let script = detect_script(text);
    let key = translation_key(&target_language, text);

    if let Some(text_out) = runtime.cache().lookup(&key).as_ref().and_then(CachePayload::as_text) {
        return Ok(Translation {
            source: text.to_owned(),
            target_language,
            script,
            text: text_out.to_owned(),
            cached: true,
        });
    }

    let source = text.to_owned();
    let language = target_language.clone();
    let translated = runtime
        .submit(ResourceId::TRANSLATION, move |lease| async move {
            let table = lease
                .downcast_ref::<PhraseTable>()
                .ok_or("translation resource holds an unexpected model")?;
            Ok::<_, &'static str>(table.translate(&source, &language).await)
        })
        .await?;

    remember(runtime, key, CachePayload::from(translated.clone()), priority);
    Ok(Translation {
        source: text.to_owned(),
        target_language,
        script,
        text: translated,
        cached: false,
    })
}

/// Synthesize `text`. Audio is cached at `Low` priority.
pub async fn speak(runtime: &LinguaRuntime, text: &str) -> Result<Speech, ResourceError> {
    let key = speech_key(text);
    let cached = runtime.cache().lookup(&key);

    let (bytes, cached) = match cached.as_ref().and_then(CachePayload::as_audio) {
        Some(pcm) => (pcm.len() as u64, true),
        None => {
            let source = text.to_owned();
            let pcm = runtime
                .submit(ResourceId::SPEECH, move |lease| async move {
                    let voice = lease
                        .downcast_ref::<SpeechVoice>()
                        .ok_or("speech resource holds an unexpected model")?;
                    Ok::<_, &'static str>(voice.synthesize(&source).await)
                })
                .await?;
            let bytes = pcm.len() as u64;
            remember(runtime, key, CachePayload::from(pcm), Priority::Low);
            (bytes, false)
        }
    };

    let samples = bytes / 2;
    Ok(Speech {
        text: text.to_owned(),
        sample_rate: SpeechVoice::SAMPLE_RATE,
        bytes,
        duration_ms: samples * 1_000 / u64::from(SpeechVoice::SAMPLE_RATE),
        cached,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoStep {
    pub action: String,
    pub detail: String,
    pub loaded_resources: usize,
    pub cache_items: usize,
    pub memory: MemoryReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoReport {
    pub steps: Vec<DemoStep>,
    pub final_status: StatusReport,
}

/// Scripted session: cold and warm translations, speech, a trip to the background and back.
pub async fn run_demo(runtime: &LinguaRuntime) -> Result<DemoReport, ResourceError> {
    let mut steps = Vec::new();
    let mut record = |action: &str, detail: String| {
        steps.push(DemoStep {
            action: action.to_owned(),
            detail,
            loaded_resources: runtime.manager().loaded_count(),
            cache_items: runtime.cache().len(),
            memory: runtime.memory_report(),
        });
    };

    let hello = translate(runtime, "hello", Priority::High).await?;
    record("translate", describe_translation(&hello));

    let again = translate(runtime, "hello", Priority::High).await?;
    record("translate", describe_translation(&again));

    let thanks = translate(runtime, "thank you", Priority::Medium).await?;
    record("translate", describe_translation(&thanks));

    let speech = speak(runtime, "good morning").await?;
    record(
        "speak",
        format!("\"{}\" -> {} bytes ({} ms)", speech.text, speech.bytes, speech.duration_ms),
    );

    let outcome = runtime.on_signal(LifecycleSignal::Backgrounded);
    record(
        "background",
        format!(
            "unloaded {} resource(s), evicted {} cache entrie(s)",
            outcome.resources_unloaded, outcome.cache_entries_evicted
        ),
    );

    runtime.on_signal(LifecycleSignal::Foregrounded);
    record("foreground", "resources reload on next use".to_owned());

    let hello = translate(runtime, "hello", Priority::High).await?;
    record("translate", describe_translation(&hello));

    let goodbye = translate(runtime, "goodbye", Priority::Medium).await?;
    record("translate", describe_translation(&goodbye));

    Ok(DemoReport {
        steps,
        final_status: StatusReport::capture(runtime),
    })
}

fn describe_translation(translation: &Translation) -> String {
    format!(
        "\"{}\" -> \"{}\" [{}]{}",
        translation.source,
        translation.text,
        translation.target_language,
        if translation.cached { " (cached)" } else { "" }
    )
}

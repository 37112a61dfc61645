//! Stand-ins for the native translation and speech engines.
//!
//! Both loaders sleep for a fixed delay and hand back a small in-memory model. The phrase
//! table and the synthesized audio are only good enough to make the resource lifecycle
//! observable from the command line.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use lingua_models::{BoxFuture, ModelHandle, ModelLoader, ResourceDescriptor, ResourceId};
use lingua_runtime::LinguaRuntimeBuilder;
use regex::Regex;
use serde::Serialize;

const PHRASES: &[(&str, &[(&str, &str)])] = &[
    ("hello", &[("es", "hola"), ("fr", "bonjour"), ("de", "hallo"), ("ja", "こんにちは"), ("ru", "привет")]),
    ("goodbye", &[("es", "adiós"), ("fr", "au revoir"), ("de", "auf wiedersehen"), ("ja", "さようなら"), ("ru", "до свидания")]),
    ("thank you", &[("es", "gracias"), ("fr", "merci"), ("de", "danke"), ("ja", "ありがとう"), ("ru", "спасибо")]),
    ("good morning", &[("es", "buenos días"), ("fr", "bonjour"), ("de", "guten morgen"), ("ja", "おはようございます"), ("ru", "доброе утро")]),
    ("where is the station", &[("es", "¿dónde está la estación?"), ("fr", "où est la gare ?"), ("de", "wo ist der bahnhof?"), ("ja", "駅はどこですか"), ("ru", "где вокзал?")]),
    ("how much is this", &[("es", "¿cuánto cuesta esto?"), ("fr", "combien ça coûte ?"), ("de", "wie viel kostet das?"), ("ja", "これはいくらですか"), ("ru", "сколько это стоит?")]),
    ("i need help", &[("es", "necesito ayuda"), ("fr", "j'ai besoin d'aide"), ("de", "ich brauche hilfe"), ("ja", "助けが必要です"), ("ru", "мне нужна помощь")]),
];

/// Writing system of an input text, by Unicode script class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    Latin,
    Cyrillic,
    Cjk,
    Arabic,
    Devanagari,
    Unknown,
}

/// The script with the most matching characters in `text`. Ties go to the earlier script in
/// declaration order.
pub fn detect_script(text: &str) -> Script {
    static PATTERNS: OnceLock<Vec<(Script, Regex)>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            (Script::Latin, r"\p{Latin}"),
            (Script::Cyrillic, r"\p{Cyrillic}"),
            (Script::Cjk, r"[\p{Han}\p{Hiragana}\p{Katakana}\p{Hangul}]"),
            (Script::Arabic, r"\p{Arabic}"),
            (Script::Devanagari, r"\p{Devanagari}"),
        ]
        .into_iter()
        .map(|(script, pattern)| (script, Regex::new(pattern).expect("valid regex")))
        .collect()
    });

    let mut best = (Script::Unknown, 0);
    for (script, re) in patterns {
        let count = re.find_iter(text).count();
        if count > best.1 {
            best = (*script, count);
        }
    }
    best.0
}

fn normalize_phrase(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '!', '?'])
        .trim()
        .to_lowercase()
}

/// Loaded translation model: a fixed phrase table with per-call latency.
#[derive(Debug)]
pub struct PhraseTable {
    latency: Duration,
}

impl PhraseTable {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    /// Table entry for `text`, if the phrase is known in `language`.
    pub fn lookup(&self, text: &str, language: &str) -> Option<&'static str> {
        let phrase = normalize_phrase(text);
        PHRASES
            .iter()
            .find(|(source, _)| *source == phrase)
            .and_then(|(_, targets)| targets.iter().find(|(lang, _)| *lang == language))
            .map(|(_, translated)| *translated)
    }

    pub async fn translate(&self, text: &str, language: &str) -> String {
        tokio::time::sleep(self.latency).await;
        match self.lookup(text, language) {
            Some(translated) => translated.to_owned(),
            None => format!("[{language}] {}", text.trim()),
        }
    }
}

/// Loaded speech model: renders text as 16-bit little-endian mono PCM at
/// [`SpeechVoice::SAMPLE_RATE`].
#[derive(Debug)]
pub struct SpeechVoice {
    latency: Duration,
}

impl SpeechVoice {
    pub const SAMPLE_RATE: u32 = 16_000;
    pub const MS_PER_CHAR: u32 = 60;

    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn render(&self, text: &str) -> Vec<u8> {
        let per_char = (Self::SAMPLE_RATE * Self::MS_PER_CHAR / 1_000) as usize;
        let mut pcm = Vec::with_capacity(text.chars().count() * per_char * 2);
        for ch in text.chars() {
            let amplitude = if ch.is_whitespace() { 0.0 } else { 0.3 * f32::from(i16::MAX) };
            let frequency = 200.0 + (u32::from(ch) % 40) as f32 * 10.0;
            for n in 0..per_char {
                let phase = 2.0 * std::f32::consts::PI * frequency * n as f32 / Self::SAMPLE_RATE as f32;
                let sample = (amplitude * phase.sin()) as i16;
                pcm.extend_from_slice(&sample.to_le_bytes());
            }
        }
        pcm
    }

    pub async fn synthesize(&self, text: &str) -> Vec<u8> {
        tokio::time::sleep(self.latency).await;
        self.render(text)
    }
}

#[derive(Debug, Clone)]
pub struct TranslationLoader {
    pub load_delay: Duration,
    pub call_latency: Duration,
}

impl Default for TranslationLoader {
    fn default() -> Self {
        Self {
            load_delay: Duration::from_millis(300),
            call_latency: Duration::from_millis(50),
        }
    }
}

impl ModelLoader for TranslationLoader {
    fn load(&self, descriptor: &ResourceDescriptor) -> BoxFuture<'static, Result<ModelHandle, String>> {
        tracing::debug!(target: "lingua.cli", resource = %descriptor.id, "loading phrase table");
        let Self {
            load_delay,
            call_latency,
        } = *self;
        Box::pin(async move {
            tokio::time::sleep(load_delay).await;
            Ok(ModelHandle::new(PhraseTable::new(call_latency)))
        })
    }
}

#[derive(Debug, Clone)]
pub struct SpeechLoader {
    pub load_delay: Duration,
    pub call_latency: Duration,
}

impl Default for SpeechLoader {
    fn default() -> Self {
        Self {
            load_delay: Duration::from_millis(200),
            call_latency: Duration::from_millis(50),
        }
    }
}

impl ModelLoader for SpeechLoader {
    fn load(&self, descriptor: &ResourceDescriptor) -> BoxFuture<'static, Result<ModelHandle, String>> {
        tracing::debug!(target: "lingua.cli", resource = %descriptor.id, "loading voice");
        let Self {
            load_delay,
            call_latency,
        } = *self;
        Box::pin(async move {
            tokio::time::sleep(load_delay).await;
            Ok(ModelHandle::new(SpeechVoice::new(call_latency)))
        })
    }
}

/// Register the simulated loaders for the well-known resources.
pub fn register(builder: LinguaRuntimeBuilder) -> LinguaRuntimeBuilder {
    register_with(builder, TranslationLoader::default(), SpeechLoader::default())
}

pub fn register_with(
    builder: LinguaRuntimeBuilder,
    translation: TranslationLoader,
    speech: SpeechLoader,
) -> LinguaRuntimeBuilder {
    builder
        .loader(ResourceId::TRANSLATION, Arc::new(translation))
        .loader(ResourceId::SPEECH, Arc::new(speech))
}

//! Completion Detection
//!
//! Case-insensitive substring heuristics deciding whether a round's text or
//! a tool result signals that the phase is finished. The match is
//! deliberately loose: "not finished yet" counts as complete.

use phasewright_tools::ToolResult;

use crate::models::settings::EngineConfig;

/// Matches round text and tool output against configured phrases
#[derive(Debug, Clone)]
pub struct CompletionDetector {
    phrases: Vec<String>,
    markers: Vec<String>,
}

impl CompletionDetector {
    /// Build a detector from text phrases and tool-output markers
    pub fn new<I, J, S, T>(phrases: I, markers: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            phrases: normalize(phrases),
            markers: normalize(markers),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.completion_phrases, &config.completion_markers)
    }

    /// Whether `text` contains any completion phrase
    pub fn text_signals_completion(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.phrases.iter().any(|p| lower.contains(p.as_str()))
    }

    /// Whether any successful result's output contains a completion marker
    pub fn tool_results_signal_completion<'a, I>(&self, results: I) -> bool
    where
        I: IntoIterator<Item = &'a ToolResult>,
    {
        results
            .into_iter()
            .filter(|r| r.success)
            .any(|r| {
                let lower = r.output.to_lowercase();
                self.markers.iter().any(|m| lower.contains(m.as_str()))
            })
    }
}

impl Default for CompletionDetector {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

fn normalize<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

use tracing::debug;

use eventrag_core::error::{Error, Result};
use eventrag_core::traits::CompletionModel;
use eventrag_core::types::Chunk;

use crate::prompt::build_prompt;

/// Grounded answering plus the "should we show sources" heuristic.
///
/// The heuristic only looks for marker phrases in the model's own wording, so
/// it can misfire both ways.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    no_info_phrases: Vec<String>,
}

impl Synthesizer {
    pub fn new<I, S>(no_info_phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { no_info_phrases: no_info_phrases.into_iter().map(|p| p.as_ref().to_lowercase()).collect() }
    }

    /// Calls the model once with the grounded prompt and returns its text verbatim.
    pub async fn answer(&self, model: &dyn CompletionModel, question: &str, context: &[Chunk]) -> Result<String> {
        let prompt = build_prompt(question, context);
        debug!(context_chunks = context.len(), prompt_chars = prompt.len(), "calling completion model");
        model.complete(&prompt).await.map_err(|e| Error::collaborator("completion", e))
    }

    /// False when the answer reads like "nothing found".
    pub fn should_attach_sources(&self, answer: &str) -> bool {
        let lowered = answer.to_lowercase();
        !self.no_info_phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_phrases_match_case_insensitively() {
        let synthesizer = Synthesizer::new(["non disponible", "n'ai pas trouvé"]);
        assert!(!synthesizer.should_attach_sources("Je N'AI PAS TROUVÉ de concert à Lyon."));
        assert!(!synthesizer.should_attach_sources("Information non disponible."));
        assert!(synthesizer.should_attach_sources("Le Concert de Jazz Test a lieu à Paris."));
    }

    #[test]
    fn empty_phrase_list_always_attaches() {
        let synthesizer = Synthesizer::new(Vec::<String>::new());
        assert!(synthesizer.should_attach_sources("aucun événement"));
    }
}

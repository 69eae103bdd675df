use std::sync::Arc;

use crate::fusion::FusedHit;

pub const SYSTEM_PROMPT: &str = "Answer based on the provided context only.\n\
If the answer isn't in the context, say so clearly.\n\
Cite sources using [Source N] references. Be concise but thorough.";

const SOURCE_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// LLM seam used for answer synthesis.
pub trait CompletionModel: Send + Sync {
    fn complete(&self, prompt: &Prompt) -> anyhow::Result<String>;
}

impl<M: CompletionModel + ?Sized> CompletionModel for Box<M> {
    fn complete(&self, prompt: &Prompt) -> anyhow::Result<String> { (**self).complete(prompt) }
}

impl<M: CompletionModel + ?Sized> CompletionModel for Arc<M> {
    fn complete(&self, prompt: &Prompt) -> anyhow::Result<String> { (**self).complete(prompt) }
}

/// `[Source N] Section: <title> (Page <n>)` then the text, per hit, numbered from 1.
pub fn build_context(hits: &[FusedHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, h)| {
            format!(
                "[Source {}] Section: {} (Page {})\n{}",
                i + 1,
                h.payload.section_title(),
                h.payload.page_number(),
                h.payload.text()
            )
        })
        .collect::<Vec<_>>()
        .join(SOURCE_SEPARATOR)
}

pub fn build_prompt(question: &str, hits: &[FusedHit]) -> Prompt {
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user: format!("Context:\n{}\n\nQuestion: {}", build_context(hits), question),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::FusedPayload;
    use docqa_vector::DenseHit;

    fn hit(text: &str, section: &str, page: u32) -> FusedHit {
        FusedHit {
            hybrid_score: 0.01,
            payload: FusedPayload::Dense(DenseHit { text: text.into(), score: 0.5, doc_id: "d".into(), page_number: page, section_title: section.into() }),
        }
    }

    #[test]
    fn context_labels_and_separators() {
        let ctx = build_context(&[hit("alpha", "Intro", 1), hit("beta", "Specs", 4)]);
        assert_eq!(ctx, "[Source 1] Section: Intro (Page 1)\nalpha\n\n---\n\n[Source 2] Section: Specs (Page 4)\nbeta");
    }

    #[test]
    fn prompt_wraps_context_and_question() {
        let p = build_prompt("What is alpha?", &[hit("alpha", "Intro", 1)]);
        assert!(p.system.contains("[Source N]"));
        assert!(p.system.starts_with("Answer based on the provided context only."));
        assert_eq!(p.user, "Context:\n[Source 1] Section: Intro (Page 1)\nalpha\n\nQuestion: What is alpha?");
    }
}

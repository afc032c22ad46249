//! Prompt templates for question condensing and grounded answering.

use crate::models::ScoredChunk;

/// Separator between retrieved chunks in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

const CONDENSE_TEMPLATE: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone question:";

const ANSWER_TEMPLATE: &str = "Answer the question based only on the following context:
{context}

Question: {question}
";

/// Prompt asking the model to rewrite `question` so it stands alone.
///
/// With an empty history the "Chat History" block is simply empty.
pub fn condense_question_prompt(chat_history: &str, question: &str) -> String {
    CONDENSE_TEMPLATE
        .replace("{question}", question)
        .replacen("{chat_history}", chat_history, 1)
}

/// Join chunk texts with a blank line, in the order given.
pub fn combine_chunks(chunks: &[ScoredChunk]) -> String {
    join_texts(chunks.iter().map(|c| c.chunk.text.as_str()))
}

pub fn join_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    texts.into_iter().collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Prompt instructing the model to answer only from `context`.
pub fn grounding_prompt(context: &str, question: &str) -> String {
    // Substitute the question first so a context containing "{question}"
    // is never expanded.
    ANSWER_TEMPLATE
        .replace("{question}", question)
        .replacen("{context}", context, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_texts_uses_blank_line() {
        assert_eq!(join_texts(["A", "B", "C"]), "A\n\nB\n\nC");
        assert_eq!(join_texts(Vec::<&str>::new()), "");
    }

    #[test]
    fn test_condense_prompt_with_empty_history() {
        let p = condense_question_prompt("", "What color is the sky?");
        assert!(p.contains("Chat History:\n\nFollow Up Input: What color is the sky?"));
        assert!(p.ends_with("Standalone question:"));
    }

    #[test]
    fn test_grounding_prompt_embeds_context_and_question() {
        let p = grounding_prompt("The sky is blue.", "What color is the sky?");
        assert!(p.starts_with("Answer the question based only on the following context:\nThe sky is blue."));
        assert!(p.contains("Question: What color is the sky?"));
    }

    #[test]
    fn test_grounding_prompt_does_not_expand_placeholders_in_context() {
        let p = grounding_prompt("literal {question} text", "Q?");
        assert!(p.contains("literal {question} text"));
    }
}

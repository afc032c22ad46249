//! Retrieval-augmented conversational answering.
//!
//! [`AnswerComposer::answer`] runs these stages in order, each consuming
//! the previous stage's output:
//!
//! | # | Stage | Input | Output |
//! |---|-------|-------|--------|
//! | 1 | read history | session memory | history text |
//! | 2 | rewrite | question + history | standalone question |
//! | 3 | retrieve | standalone question + active collection | chunks |
//! | 4 | combine | chunks | context block |
//! | 5 | ground | context + original question | grounding prompt |
//! | 6 | generate | grounding prompt | answer |
//! | 7 | commit | question + answer | memory append |
//!
//! Memory is only written in stage 7, so any failure leaves the
//! session's transcript exactly as it was. Callers with their own
//! follow-up work (recording the upload, say) run stages 1-6 with
//! [`AnswerComposer::draft`] and commit once that work has succeeded.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{DocQaError, Result};
use crate::index::{VectorIndex, DEFAULT_TOP_K};
use crate::llm::LanguageModel;
use crate::models::{AnswerResult, ScoredChunk};
use crate::prompt::{combine_chunks, condense_question_prompt, grounding_prompt};
use crate::session::Session;

/// Rewrites a follow-up question into one that stands alone.
#[derive(Clone)]
pub struct QuestionRewriter {
    llm: Arc<dyn LanguageModel>,
}

impl QuestionRewriter {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// One model call with the condense template.
    ///
    /// The trimmed response is returned as-is; a blank response falls back
    /// to the original question.
    pub async fn rewrite(&self, question: &str, history: &str) -> Result<String> {
        let prompt = condense_question_prompt(history, question);
        let response = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|e| DocQaError::AnswerGeneration(format!("question rewrite: {:#}", e)))?;

        let standalone = response.trim();
        if standalone.is_empty() {
            warn!(question, "model returned an empty standalone question; using the original");
            return Ok(question.to_string());
        }
        Ok(standalone.to_string())
    }
}

/// Answers questions about a session's active collection.
#[derive(Clone)]
pub struct AnswerComposer {
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LanguageModel>,
    rewriter: QuestionRewriter,
    top_k: usize,
}

impl AnswerComposer {
    pub fn new(index: Arc<dyn VectorIndex>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            index,
            rewriter: QuestionRewriter::new(llm.clone()),
            llm,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Stages 1-7.
    pub async fn answer(&self, session: &mut Session, question: &str) -> Result<AnswerResult> {
        let result = self.draft(session, question).await?;
        Self::commit(session, question, &result);
        Ok(result)
    }

    /// Stages 1-6. The session is only read.
    pub async fn draft(&self, session: &Session, question: &str) -> Result<AnswerResult> {
        let key = session
            .collection()
            .ok_or_else(|| {
                DocQaError::CollectionNotFound(format!(
                    "no document loaded for session {}",
                    session.id()
                ))
            })?
            .to_string();

        let history = read_history(session);
        let standalone_question = self.rewriter.rewrite(question, &history).await?;
        debug!(session = session.id(), %standalone_question, "question rewritten");

        let chunks = self.retrieve(&key, &standalone_question).await?;
        let context = combine_chunks(&chunks);
        let prompt = grounding_prompt(&context, question);
        let answer = self.generate(&prompt).await?;
        info!(
            session = session.id(),
            collection = %key,
            evidence = chunks.len(),
            "question answered"
        );

        Ok(AnswerResult {
            answer,
            standalone_question,
            chunks,
        })
    }

    /// Stage 7: append the turn to the session's memory.
    pub fn commit(session: &mut Session, question: &str, result: &AnswerResult) {
        session.memory_mut().append(question, result.answer.as_str());
        debug!(session = session.id(), turns = session.memory().len(), "turn recorded");
    }

    async fn retrieve(&self, key: &str, standalone_question: &str) -> Result<Vec<ScoredChunk>> {
        self.index.retrieve(key, standalone_question, self.top_k).await
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .llm
            .complete(prompt)
            .await
            .map_err(|e| DocQaError::AnswerGeneration(format!("{:#}", e)))?;
        Ok(response.trim().to_string())
    }
}

fn read_history(session: &Session) -> String {
    session.memory().buffer_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::bail;
    use async_trait::async_trait;

    use super::*;
    use crate::chunk::TextSplitter;
    use crate::embedding::HashEmbedder;
    use crate::index::EmbeddingIndex;
    use crate::ingest::ingest_text;
    use crate::store::memory::InMemoryStore;

    /// Echoes the follow-up question when condensing and the context when
    /// answering, so answers are fully determined by retrieval.
    #[derive(Default)]
    struct ScriptedModel {
        prompts: Mutex<Vec<String>>,
        rewrite_to: Option<String>,
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(rest) = prompt.split("Follow Up Input: ").nth(1) {
                if let Some(fixed) = &self.rewrite_to {
                    return Ok(fixed.clone());
                }
                let q = rest.split('\n').next().unwrap_or_default();
                return Ok(q.to_string());
            }
            let context = prompt
                .split("following context:\n")
                .nth(1)
                .and_then(|s| s.split("\n\nQuestion:").next())
                .unwrap_or_default();
            Ok(context.to_string())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        fn model_name(&self) -> &str {
            "failing"
        }
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            bail!("quota exceeded")
        }
    }

    async fn loaded_index(text: &str) -> Arc<EmbeddingIndex> {
        let index = Arc::new(EmbeddingIndex::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(HashEmbedder::new(256)),
        ));
        ingest_text(index.as_ref(), &TextSplitter::default(), "doc", text, 500)
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn test_end_to_end_single_chunk_answer() {
        let index = loaded_index("The sky is blue. Grass is green.").await;
        let composer = AnswerComposer::new(index, Arc::new(ScriptedModel::default()));
        let mut session = Session::new("s", 10);
        session.activate("doc");

        let result = composer.answer(&mut session, "What color is the sky?").await.unwrap();

        assert!(result.answer.contains("blue"));
        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.chunks[0].chunk.text, "The sky is blue. Grass is green.");
        assert_eq!(session.memory().len(), 1);
    }

    #[tokio::test]
    async fn test_history_grows_in_call_order() {
        let index = loaded_index("The sky is blue. Grass is green.").await;
        let composer = AnswerComposer::new(index, Arc::new(ScriptedModel::default()));
        let mut session = Session::new("s", 10);
        session.activate("doc");

        let questions = ["What color is the sky?", "And the grass?", "Anything else?"];
        for q in questions {
            composer.answer(&mut session, q).await.unwrap();
        }
        let recorded: Vec<&str> = session
            .memory()
            .history()
            .map(|t| t.question.as_str())
            .collect();
        assert_eq!(recorded, questions);
    }

    #[tokio::test]
    async fn test_grounding_prompt_uses_original_question() {
        let index = loaded_index("The sky is blue.").await;
        let model = Arc::new(ScriptedModel {
            rewrite_to: Some("What is the color of the sky today?".to_string()),
            ..Default::default()
        });
        let composer = AnswerComposer::new(index, model.clone());
        let mut session = Session::new("s", 10);
        session.activate("doc");

        let result = composer.answer(&mut session, "and today?").await.unwrap();
        assert_eq!(result.standalone_question, "What is the color of the sky today?");

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("Question: and today?"));
        assert!(!prompts[1].contains("color of the sky today"));
    }

    #[tokio::test]
    async fn test_second_question_sees_history() {
        let index = loaded_index("The sky is blue.").await;
        let model = Arc::new(ScriptedModel::default());
        let composer = AnswerComposer::new(index, model.clone());
        let mut session = Session::new("s", 10);
        session.activate("doc");

        composer.answer(&mut session, "What color is the sky?").await.unwrap();
        composer.answer(&mut session, "Are you sure?").await.unwrap();

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[2].contains("Human: What color is the sky?\nAI: The sky is blue."));
    }

    #[tokio::test]
    async fn test_rewrite_with_empty_history_is_non_empty() {
        let rewriter = QuestionRewriter::new(Arc::new(ScriptedModel::default()));
        let q = rewriter.rewrite("What color is the sky?", "").await.unwrap();
        assert_eq!(q, "What color is the sky?");
    }

    #[tokio::test]
    async fn test_blank_rewrite_falls_back_to_question() {
        let rewriter = QuestionRewriter::new(Arc::new(ScriptedModel {
            rewrite_to: Some("   ".to_string()),
            ..Default::default()
        }));
        let q = rewriter.rewrite("Who wrote it?", "Human: hi\nAI: hello").await.unwrap();
        assert_eq!(q, "Who wrote it?");
    }

    #[tokio::test]
    async fn test_missing_collection_leaves_memory_unchanged() {
        let index = loaded_index("The sky is blue.").await;
        let composer = AnswerComposer::new(index, Arc::new(ScriptedModel::default()));
        let mut session = Session::new("s", 10);
        session.activate("never-ingested");

        let err = composer.answer(&mut session, "What color is the sky?").await.unwrap_err();
        assert!(matches!(err, DocQaError::CollectionNotFound(_)));
        assert!(session.memory().is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_leaves_memory_unchanged() {
        let index = loaded_index("The sky is blue.").await;
        let composer = AnswerComposer::new(index, Arc::new(FailingModel));
        let mut session = Session::new("s", 10);
        session.activate("doc");
        session.memory_mut().append("earlier", "turn");

        let err = composer.answer(&mut session, "What color is the sky?").await.unwrap_err();
        assert!(matches!(err, DocQaError::AnswerGeneration(_)));
        assert_eq!(session.memory().len(), 1);
    }

    #[tokio::test]
    async fn test_draft_does_not_touch_memory() {
        let index = loaded_index("The sky is blue.").await;
        let composer = AnswerComposer::new(index, Arc::new(ScriptedModel::default()));
        let mut session = Session::new("s", 10);
        session.activate("doc");

        let result = composer.draft(&session, "What color is the sky?").await.unwrap();
        assert!(session.memory().is_empty());

        AnswerComposer::commit(&mut session, "What color is the sky?", &result);
        let turn = session.memory().history().next().unwrap();
        assert_eq!(turn.answer, result.answer);
    }

    #[tokio::test]
    async fn test_no_active_collection() {
        let index = loaded_index("The sky is blue.").await;
        let composer = AnswerComposer::new(index, Arc::new(ScriptedModel::default()));
        let mut session = Session::new("s", 10);
        let err = composer.answer(&mut session, "Hello?").await.unwrap_err();
        assert!(matches!(err, DocQaError::CollectionNotFound(_)));
    }
}

//! Retrieval-augmented question answering over the indexed sections

use crate::config::{Config, Credentials};
use crate::services::{
    with_rate_limit_retry, ChatModel, Embedder, GeminiClient, PineconeIndex, RetryPolicy,
    ServiceResult, VectorIndex, VectorMatch,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Reply used when retrieval finds nothing
pub const NO_DOCUMENTS_REPLY: &str = "I couldn't find any relevant documents.";

/// Builds the prompt sent to the chat model
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a Legal Compliance Assistant.\n\
         \n\
         - If the user greets you (hi/hello), reply politely.\n\
         - Otherwise, use the context below to answer the question.\n\
         - If the answer is not in the context, say \"I don't know.\"\n\
         \n\
         CONTEXT:\n\
         {}\n\
         \n\
         QUESTION:\n\
         {}\n",
        context, question
    )
}

/// Joins the stored text of each match, separated by blank lines
pub fn build_context(matches: &[VectorMatch]) -> String {
    matches
        .iter()
        .filter_map(|hit| hit.metadata.get("text"))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Answers questions from the sections closest to them
pub struct Agent {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chat: Arc<dyn ChatModel>,
    top_k: usize,
    temperature: f32,
    retry: RetryPolicy,
}

impl Agent {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chat: Arc<dyn ChatModel>,
        top_k: usize,
        temperature: f32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            embedder,
            index,
            chat,
            top_k,
            temperature,
            retry,
        }
    }

    /// Answers one question
    ///
    /// Every downstream call is retried while it reports a rate limit.
    pub async fn answer(&self, question: &str) -> ServiceResult<String> {
        let embedder = &self.embedder;
        let vector =
            with_rate_limit_retry(self.retry, "question embedding", || embedder.embed(question))
                .await?;

        let index = &self.index;
        let top_k = self.top_k;
        let matches =
            with_rate_limit_retry(self.retry, "search", || index.query(&vector, top_k)).await?;
        tracing::debug!("Retrieved {} sections", matches.len());

        if matches.is_empty() {
            return Ok(NO_DOCUMENTS_REPLY.to_string());
        }

        let prompt = build_prompt(&build_context(&matches), question);
        let chat = &self.chat;
        let temperature = self.temperature;
        let answer =
            with_rate_limit_retry(self.retry, "generation", || chat.complete(&prompt, temperature))
                .await?;

        Ok(answer.trim().to_string())
    }

    /// Reads questions line by line until `exit`, `quit`, or end of input
    ///
    /// A failed question is reported and the loop continues.
    pub async fn interactive<R, W>(&self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        output
            .write_all(b"Agent is ready! (Type 'exit' to quit)\n")
            .await?;

        loop {
            output.write_all(b"\nUser: ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
                break;
            }

            let reply = match self.answer(question).await {
                Ok(answer) => format!("\nAI: {}\n", answer),
                Err(e) => {
                    tracing::debug!("Question failed: {:?}", e);
                    format!("\nError: {}\n", e)
                }
            };
            output.write_all(reply.as_bytes()).await?;
        }

        output.flush().await
    }
}

/// Builds an agent against the configured services
pub fn build_agent(config: &Config) -> crate::Result<Agent> {
    let credentials = Credentials::from_env()?;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .build()?;

    let gemini = Arc::new(GeminiClient::new(
        client.clone(),
        credentials.google_api_key.as_str(),
        config.agent.api_url.as_str(),
        config.index.embedding_model.as_str(),
        config.agent.chat_model.as_str(),
    ));
    let index = Arc::new(PineconeIndex::new(
        client,
        credentials.pinecone_api_key.as_str(),
        &config.index,
    ));

    Ok(Agent::new(
        gemini.clone(),
        index,
        gemini,
        config.agent.top_k,
        config.agent.temperature,
        RetryPolicy::from_config(&config.agent),
    ))
}

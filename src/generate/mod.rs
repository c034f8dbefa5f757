//! Solution generator - compose a prompt from retrieved bugs and call the LLM
//!
//! The prompt carries a bounded amount of retrieved context: blocks are added
//! in rank order and the lowest-ranked records are dropped first when the
//! budget would overflow. An empty retrieval never fails generation - the
//! model is asked anyway and the output is flagged as having no prior art.

mod groq;

pub use groq::{ChatMessage, GroqClient};

use anyhow::Result;
use uuid::Uuid;

use crate::config::GenerationSection;
use crate::retrieval::ScoredBug;

/// Upper bound on prompt size (~3k tokens), leaving the generation model
/// headroom for its answer inside an 8k window
const MAX_CONTEXT_CHARS: usize = 12_000;

const SYSTEM_PROMPT: &str = "You are an expert debugging assistant. \
    Provide clear, actionable solutions based on the provided context.";

/// A generated solution with attribution
#[derive(Debug)]
pub struct Solution {
    pub text: String,
    /// Record ids actually included in the prompt, in rank order
    pub used_record_ids: Vec<Uuid>,
    /// True when generation ran without any retrieved context
    pub no_prior_art: bool,
}

/// Generates solutions conditioned on retrieved bug records
pub struct SolutionGenerator {
    client: GroqClient,
    config: GenerationSection,
}

impl SolutionGenerator {
    pub fn new(client: GroqClient, config: GenerationSection) -> Self {
        Self { client, config }
    }

    /// Generate a solution for `query` using the retrieved bugs as context.
    ///
    /// Never fails merely because `retrieved` is empty; in that case the
    /// result is flagged `no_prior_art` and the model works from the query
    /// alone.
    pub fn generate(
        &self,
        query: &str,
        language: Option<&str>,
        extra_context: Option<&str>,
        retrieved: &[ScoredBug],
    ) -> Result<Solution> {
        let (prompt, used_record_ids) = build_prompt(query, language, extra_context, retrieved);
        let no_prior_art = used_record_ids.is_empty();

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(&prompt),
        ];

        let text = self.client.chat_with_retry(
            &self.config.model,
            messages,
            self.config.temperature,
            self.config.max_tokens,
            self.config.max_retries,
        )?;

        Ok(Solution {
            text,
            used_record_ids,
            no_prior_art,
        })
    }
}

/// Assemble the user prompt under the context budget.
///
/// Returns the prompt and the ids of the retrieved records that made it in.
fn build_prompt(
    query: &str,
    language: Option<&str>,
    extra_context: Option<&str>,
    retrieved: &[ScoredBug],
) -> (String, Vec<Uuid>) {
    let mut prompt = format!(
        "Based on similar bugs found in the database, help solve this error.\n\n\
         USER'S ERROR:\n{}\n\n\
         LANGUAGE: {}\n\
         ADDITIONAL CONTEXT: {}\n\n",
        query,
        language.unwrap_or("Not specified"),
        extra_context.unwrap_or("None provided"),
    );

    const CONTEXT_HEADER: &str = "Here are similar bugs and their solutions:\n\n";

    let mut used = Vec::new();
    let mut blocks = String::new();

    for (i, bug) in retrieved.iter().enumerate() {
        let block = format!(
            "Bug {} (Confidence: {}, Similarity: {:.2}):\n\
             Error: {}\n\
             Context: {}\n\
             Solution: {}\n\
             Source: {}\n---\n",
            i + 1,
            bug.record.confidence_score,
            bug.similarity,
            bug.record.error_pattern,
            bug.record.context,
            bug.record.solution,
            bug.record.source,
        );

        // Rank order means the lowest-ranked blocks are the ones dropped
        if prompt.len() + CONTEXT_HEADER.len() + blocks.len() + block.len() > MAX_CONTEXT_CHARS {
            break;
        }
        blocks.push_str(&block);
        used.push(bug.record.id);
    }

    // Keyed off what survived the budget, not what was retrieved: a context
    // that lost every block reads the same as an empty retrieval
    if used.is_empty() {
        prompt.push_str(
            "No similar bugs were found in the database. \
             Answer from the error text alone and state that no prior art was available.\n\n",
        );
    } else {
        prompt.push_str(CONTEXT_HEADER);
        prompt.push_str(&blocks);
    }

    prompt.push_str(
        "\nBased on the above, provide:\n\
         1. Likely cause of the error\n\
         2. Step-by-step solution\n\
         3. Code example if applicable\n\
         4. Prevention tips\n\n\
         Keep your response clear and practical.",
    );

    (prompt, used)
}

use anyhow::{Context, Result};
use std::sync::Arc;

use query::pipeline::{contexts, format_response, synthesise_answer};
use query::{GeminiClient, GeminiConfig, GraphRagPipeline, RetrievalResult};

use crate::cache::AnswerCache;
use crate::config::{AppConfig, LlmConfig};
use crate::metrics::{Metrics, TimedOperation};
use crate::retry::RetryPolicy;

/// Read-only pipeline plus the optional LLM path, shared by every request.
pub struct QueryService {
    pipeline: GraphRagPipeline,
    llm: Option<GeminiClient>,
    cache: AnswerCache,
    retry: RetryPolicy,
    metrics: Arc<Metrics>,
    default_top_k: usize,
}

impl QueryService {
    pub fn new(
        pipeline: GraphRagPipeline,
        llm: Option<GeminiClient>,
        config: &AppConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        let cache = if config.cache.enabled {
            AnswerCache::new(config.cache.max_entries)
        } else {
            AnswerCache::disabled()
        };

        Self {
            pipeline,
            llm,
            cache,
            retry: RetryPolicy::from_config(&config.retry),
            metrics,
            default_top_k: config.retrieval.top_k,
        }
    }

    /// Build the pipeline from `config.data_path` and connect the LLM when a key is set.
    pub async fn build(config: &AppConfig, metrics: Arc<Metrics>) -> Result<Self> {
        let timer = TimedOperation::start();
        let pipeline = GraphRagPipeline::from_path(&config.data_path, &config.pipeline_config())
            .await
            .context("Failed to build the GraphRAG pipeline")?;
        metrics.record_build(timer.elapsed());

        let stats = pipeline.stats();
        tracing::info!(
            chunks = stats.chunks,
            entities = stats.entities,
            co_occurs = stats.co_occurs,
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "Pipeline ready"
        );

        let llm = match llm_client(&config.llm) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "LLM answers disabled");
                None
            }
        };

        Ok(Self::new(pipeline, llm, config, metrics))
    }

    pub fn pipeline(&self) -> &GraphRagPipeline {
        &self.pipeline
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn cache(&self) -> &AnswerCache {
        &self.cache
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        let timer = TimedOperation::start();
        let results = self.pipeline.retrieve(question, top_k)?;
        self.metrics.record_query(timer.elapsed());
        tracing::debug!(question, top_k, results = results.len(), "Retrieved passages");
        Ok(results)
    }

    /// Rendered answer for `question`, from the LLM when `use_llm` is set.
    pub async fn answer(&self, question: &str, top_k: usize, use_llm: bool) -> Result<String> {
        if use_llm && !self.cache.is_enabled() {
            return self.uncached_llm_answer(question, top_k).await;
        }

        let results = self.retrieve(question, top_k)?;

        let answer = if use_llm {
            self.llm_answer(question, &contexts(&results, top_k)).await?
        } else {
            synthesise_answer(&results)
        };

        Ok(format_response(question, &answer, &results, top_k))
    }

    /// Whole retrieve-and-generate round trip, retried as one unit
    async fn uncached_llm_answer(&self, question: &str, top_k: usize) -> Result<String> {
        let client = self.client()?;
        let pipeline = &self.pipeline;

        let timer = TimedOperation::start();
        let result = self
            .retry
            .retry("gemini_query", move || pipeline.query_with_llm(question, top_k, client))
            .await;
        self.metrics.record_query(timer.elapsed());
        self.metrics.record_llm_call(result.is_ok());
        result
    }

    fn client(&self) -> Result<&GeminiClient> {
        self.llm
            .as_ref()
            .context("LLM answers requested but no Gemini API key is configured")
    }

    async fn llm_answer(&self, question: &str, contexts: &[String]) -> Result<String> {
        let client = self.client()?;

        let prompt = GeminiClient::build_prompt(question, contexts);
        if let Some(answer) = self.cache.get(&prompt) {
            self.metrics.record_cache_hit();
            tracing::debug!("Answer cache hit");
            return Ok(answer);
        }

        let result = self
            .retry
            .retry("gemini_answer", move || client.answer(question, contexts))
            .await;
        self.metrics.record_llm_call(result.is_ok());

        let answer = result.context("Failed to generate answer")?;
        self.cache.insert(&prompt, answer.clone());
        Ok(answer)
    }
}

pub fn llm_client(config: &LlmConfig) -> Result<GeminiClient, query::LlmError> {
    let gemini = GeminiConfig::from_env(
        &config.api_key_env,
        &config.model,
        config.temperature,
        config.max_output_tokens,
    )?;
    Ok(GeminiClient::new(gemini))
}

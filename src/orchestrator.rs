//! The answer waterfall: cache → router → local model → pipeline → cloud.
//!
//! The cloud route skips the local model; the pipeline still runs and a
//! cloud answer, when one arrives, takes precedence over its selection.
//!
//! [`Orchestrator::ask`] never fails. Sources that error are recorded in
//! the result's `attempts` metadata and the chain moves on; when nothing
//! answers, a low-confidence fallback text is returned. Every result is
//! written back to the cache (fallbacks included) unless it falls below
//! `cache.min_confidence`.

use anyhow::Result;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::backend::{OllamaBackend, OpenAIBackend};
use crate::cache::{AnswerCache, CacheEntry};
use crate::config::{Config, OrchestratorConfig};
use crate::intent::format_intents;
use crate::models::{AttemptRecord, Candidate, EngineResult, Metadata};
use crate::pipeline::{compose, effective_intents, Pipeline};
use crate::router::{Route, Router};
use crate::text::normalize_query;
use crate::traits::{run_attempt, AskContext, SourceAdapter};

pub const FALLBACK_SOURCE: &str = "fallback";

pub struct Orchestrator<C: AnswerCache> {
    cache: C,
    router: Router,
    local: Option<Box<dyn SourceAdapter>>,
    cloud: Option<Box<dyn SourceAdapter>>,
    pipeline: Pipeline,
    settings: OrchestratorConfig,
    cache_min_confidence: f64,
}

/// The chosen answer before it becomes an [`EngineResult`].
struct Resolved {
    text: String,
    source: String,
}

impl<C: AnswerCache> Orchestrator<C> {
    /// An orchestrator with no model backends and default settings.
    pub fn new(cache: C, router: Router, pipeline: Pipeline) -> Self {
        Self {
            cache,
            router,
            local: None,
            cloud: None,
            pipeline,
            settings: OrchestratorConfig::default(),
            cache_min_confidence: 0.0,
        }
    }

    /// Wire the full waterfall from configuration.
    pub fn from_config(config: &Config, cache: C) -> Result<Self> {
        let cloud = OpenAIBackend::new(&config.cloud)?;
        if let Some(reason) = cloud.disabled_reason() {
            debug!(reason, "cloud model disabled");
        }
        let router = Router::new(cloud.is_enabled(), &config.router);
        let pipeline = Pipeline::from_config(config)?;

        let mut orchestrator = Self::new(cache, router, pipeline)
            .with_cloud(cloud)
            .with_settings(config.orchestrator.clone())
            .with_cache_min_confidence(config.cache.min_confidence);
        if config.local_model.enabled {
            orchestrator = orchestrator.with_local(OllamaBackend::new(&config.local_model)?);
        }
        Ok(orchestrator)
    }

    pub fn with_local(mut self, adapter: impl SourceAdapter + 'static) -> Self {
        self.local = Some(Box::new(adapter));
        self
    }

    pub fn with_cloud(mut self, adapter: impl SourceAdapter + 'static) -> Self {
        self.cloud = Some(Box::new(adapter));
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_cache_min_confidence(mut self, min_confidence: f64) -> Self {
        self.cache_min_confidence = min_confidence;
        self
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Answer `query`.
    pub fn ask(&mut self, query: &str, ctx: &AskContext) -> EngineResult {
        let key = normalize_query(query);
        if !key.is_empty() {
            if let Some(hit) = self.cache.get(query) {
                info!(key = %key, source = %hit.source, "cache hit");
                return cached_result(hit);
            }
        }

        let mut ctx = ctx.clone();
        ctx.intents = effective_intents(query, &ctx);

        let decision = self.router.explain(query);
        info!(route = %decision.route, reason = %decision.reason, "routed");

        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut best_source: Option<String> = None;

        let mut resolved = self.local_and_pipeline(
            query,
            &ctx,
            decision.route,
            &mut attempts,
            &mut candidates,
            &mut best_source,
        );

        // On the cloud route a cloud answer replaces the pipeline's.
        if resolved.is_none() || decision.route == Route::Cloud {
            if let Some(c) = self.try_cloud(query, &ctx, &mut attempts) {
                best_source = Some(c.source.clone());
                resolved = Some(Resolved {
                    text: c.text.clone(),
                    source: c.source.clone(),
                });
                candidates.insert(0, c);
            }
        }

        let (text, source, confidence) = match resolved {
            Some(r) => (r.text, r.source, self.settings.answer_confidence),
            None => {
                info!("no source answered, using fallback");
                (
                    self.settings.fallback_text.clone(),
                    FALLBACK_SOURCE.to_string(),
                    self.settings.fallback_confidence,
                )
            }
        };

        let mut meta = Metadata::new();
        meta.insert("route".to_string(), decision.route.as_str().into());
        meta.insert("route_reason".to_string(), decision.reason.into());
        meta.insert("intents".to_string(), format_intents(&ctx.intents).into());
        meta.insert(
            "candidates".to_string(),
            Value::Array(
                candidates
                    .iter()
                    .map(|c| json!([c.source, c.confidence]))
                    .collect(),
            ),
        );
        meta.insert(
            "best_source".to_string(),
            best_source.map(Value::from).unwrap_or(Value::Null),
        );
        meta.insert(
            "attempts".to_string(),
            serde_json::to_value(&attempts).unwrap_or(Value::Null),
        );

        let mut sources = BTreeMap::new();
        sources.insert(source.clone(), true);

        if !key.is_empty() && confidence >= self.cache_min_confidence {
            let entry = CacheEntry::new(&text, &source, confidence, meta.clone())
                .with_sources(sources.clone());
            self.cache.put(query, entry);
        } else {
            debug!(key = %key, confidence, "result not cached");
        }

        meta.insert("cache".to_string(), Value::Bool(false));
        info!(source = %source, confidence, "answered");
        EngineResult::new(text, sources, confidence, meta)
    }

    fn try_cloud(
        &self,
        query: &str,
        ctx: &AskContext,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Option<Candidate> {
        let cloud = self.cloud.as_deref()?;
        let (candidate, record) = run_attempt(cloud, query, ctx).into_candidate(cloud.label());
        attempts.push(record);
        candidate
    }

    fn local_and_pipeline(
        &self,
        query: &str,
        ctx: &AskContext,
        route: Route,
        attempts: &mut Vec<AttemptRecord>,
        candidates: &mut Vec<Candidate>,
        best_source: &mut Option<String>,
    ) -> Option<Resolved> {
        let mut usable: Option<Candidate> = None;
        if route != Route::Cloud {
            if let Some(local) = self.local.as_deref() {
                let (candidate, record) =
                    run_attempt(local, query, ctx).into_candidate(local.label());
                attempts.push(record);
                if let Some(c) = candidate {
                    if c.confidence >= self.settings.min_local_confidence {
                        usable = Some(c);
                    } else {
                        debug!(confidence = c.confidence, "local answer below threshold");
                        candidates.push(c);
                    }
                }
            }
        }

        if route != Route::Hybrid {
            if let Some(c) = usable {
                *best_source = Some(c.source.clone());
                candidates.push(c.clone());
                return Some(Resolved {
                    text: c.text,
                    source: c.source,
                });
            }
        } else if let Some(c) = usable {
            candidates.push(c);
        }

        let (found, records) = self.pipeline.collect(query, ctx);
        attempts.extend(records);
        candidates.extend(found);

        let selection = compose(candidates)?;
        *best_source = Some(selection.best_source.clone());
        Some(Resolved {
            text: selection.text,
            source: selection.best_source,
        })
    }
}

fn cached_result(entry: CacheEntry) -> EngineResult {
    let mut meta = entry.metadata;
    meta.insert("cache".to_string(), Value::Bool(true));
    let mut sources = entry.sources;
    if sources.is_empty() {
        sources.insert(entry.source, true);
    }
    EngineResult::new(entry.text, sources, entry.confidence, meta)
}

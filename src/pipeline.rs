//! The ordered lookup pipeline.
//!
//! Stages run strictly one after another and every applicable stage runs:
//! there is no short-circuit on the first answer, so the scorer can choose
//! among several. Stage order is fixed:
//!
//! 1. curated knowledge
//! 2. local notes
//! 3. encyclopedia
//! 4. web snippet
//! 5. topic news (news intent, or "latest" / "breaking" / "today")
//! 6. research feed (research intent, or "paper" / "study" / "arxiv")
//!
//! Stages switched off in configuration are simply not built.

use anyhow::Result;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::aggregate::aggregate;
use crate::config::Config;
use crate::intent::{detect_intents, Intent};
use crate::models::{AttemptRecord, Candidate};
use crate::rank::select;
use crate::source_knowledge::KnowledgeSource;
use crate::source_news::NewsSource;
use crate::source_notes::NotesSource;
use crate::source_research::ResearchSource;
use crate::source_web::WebSource;
use crate::source_wikipedia::WikipediaSource;
use crate::traits::{run_attempt, AskContext, SourceAdapter};

const NEWS_HINTS: &[&str] = &["latest", "breaking", "today"];
const RESEARCH_HINTS: &[&str] = &["paper", "study", "arxiv"];

/// When a stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Always,
    News,
    Research,
}

impl Gate {
    pub fn allows(&self, query: &str, intents: &BTreeSet<Intent>) -> bool {
        let q = query.to_lowercase();
        match self {
            Gate::Always => true,
            Gate::News => {
                intents.contains(&Intent::News) || NEWS_HINTS.iter().any(|h| q.contains(h))
            }
            Gate::Research => {
                intents.contains(&Intent::Research)
                    || RESEARCH_HINTS.iter().any(|h| q.contains(h))
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::Always => "always",
            Gate::News => "news intent",
            Gate::Research => "research intent",
        }
    }
}

pub struct Stage {
    pub adapter: Box<dyn SourceAdapter>,
    pub gate: Gate,
}

impl Stage {
    pub fn always(adapter: impl SourceAdapter + 'static) -> Self {
        Self {
            adapter: Box::new(adapter),
            gate: Gate::Always,
        }
    }

    pub fn gated(adapter: impl SourceAdapter + 'static, gate: Gate) -> Self {
        Self {
            adapter: Box::new(adapter),
            gate,
        }
    }
}

/// The winner of a candidate list and its aggregated display text.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub text: String,
    pub best_source: String,
}

/// Select a winner among `candidates` and aggregate it with the extras.
pub fn compose(candidates: &[Candidate]) -> Option<Selection> {
    let (winner, extras) = select(candidates.to_vec())?;
    Some(Selection {
        text: aggregate(Some(&winner), &extras),
        best_source: winner.source,
    })
}

/// Everything one pipeline pass produced.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub candidates: Vec<Candidate>,
    pub attempts: Vec<AttemptRecord>,
    pub selection: Option<Selection>,
}

/// Intents from the context, or detected from the query when none are given.
pub fn effective_intents(query: &str, ctx: &AskContext) -> BTreeSet<Intent> {
    if ctx.intents.is_empty() {
        detect_intents(query)
    } else {
        ctx.intents.clone()
    }
}

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Build the standard stage list from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut stages = Vec::new();

        if config.knowledge.enabled {
            stages.push(Stage::always(KnowledgeSource::from_config(&config.knowledge)));
        }
        if config.notes.enabled {
            stages.push(Stage::always(NotesSource::new(&config.notes)?));
        }
        if config.wikipedia.enabled {
            stages.push(Stage::always(WikipediaSource::new(&config.wikipedia)?));
        }
        if config.web.enabled {
            stages.push(Stage::always(WebSource::new(&config.web)?));
        }
        if config.news.enabled {
            let fallback = if config.wikipedia.enabled {
                Some(WikipediaSource::new(&config.wikipedia)?)
            } else {
                None
            };
            stages.push(Stage::gated(NewsSource::new(&config.news, fallback)?, Gate::News));
        }
        if config.research.enabled {
            stages.push(Stage::gated(
                ResearchSource::new(&config.research)?,
                Gate::Research,
            ));
        }

        debug!(stages = stages.len(), "pipeline built");
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every applicable stage and gather candidates and attempt records.
    pub fn collect(&self, query: &str, ctx: &AskContext) -> (Vec<Candidate>, Vec<AttemptRecord>) {
        let intents = effective_intents(query, ctx);
        let mut candidates = Vec::new();
        let mut attempts = Vec::new();

        for stage in &self.stages {
            if !stage.gate.allows(query, &intents) {
                debug!(source = stage.adapter.label(), gate = stage.gate.as_str(), "stage skipped");
                continue;
            }
            let attempt = run_attempt(stage.adapter.as_ref(), query, ctx);
            let (candidate, record) = attempt.into_candidate(stage.adapter.label());
            candidates.extend(candidate);
            attempts.push(record);
        }

        info!(
            attempted = attempts.len(),
            candidates = candidates.len(),
            "pipeline collected"
        );
        (candidates, attempts)
    }

    /// Collect, select and aggregate.
    pub fn run(&self, query: &str, ctx: &AskContext) -> PipelineOutput {
        let (candidates, attempts) = self.collect(query, ctx);
        let selection = compose(&candidates);
        PipelineOutput {
            candidates,
            attempts,
            selection,
        }
    }
}

//! End-to-end waterfall tests with in-memory fake sources.
//!
//! No network access: every adapter here is a scripted fake that counts its
//! calls, so the tests can assert which stages of the waterfall ran.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use raya::cache::{AnswerCache, CacheEntry, JsonFileCache, MemoryCache};
use raya::config::RouterConfig;
use raya::intent::Intent;
use raya::models::Metadata;
use raya::orchestrator::Orchestrator;
use raya::pipeline::{Gate, Pipeline, Stage};
use raya::router::Router;
use raya::traits::{AskContext, Attempt, SourceAdapter, SourceError};

// ============ Fakes ============

#[derive(Clone)]
enum Script {
    Answer(&'static str, f64),
    Nothing,
    Fail,
}

struct Fake {
    label: &'static str,
    script: Script,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Fake {
    fn new(label: &'static str, script: Script) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fake = Self {
            label,
            script,
            calls: calls.clone(),
            prompts: Arc::new(Mutex::new(Vec::new())),
        };
        (fake, calls)
    }
}

impl SourceAdapter for Fake {
    fn label(&self) -> &str {
        self.label
    }

    fn description(&self) -> &str {
        "scripted test source"
    }

    fn try_resolve(&self, query: &str, ctx: &AskContext) -> Attempt {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(ctx.prompt_for(query));
        match &self.script {
            Script::Answer(text, conf) => Attempt::answered(*text, *conf),
            Script::Nothing => Attempt::no_answer("nothing scripted"),
            Script::Fail => Attempt::Failed(SourceError::Network("connection refused".into())),
        }
    }
}

fn local_router() -> Router {
    Router::new(false, &RouterConfig::default())
}

fn cloud_router(hybrid: bool) -> Router {
    Router::new(
        true,
        &RouterConfig {
            hybrid,
            ..RouterConfig::default()
        },
    )
}

const PARIS: &str = "Paris is the capital and most populous city of France.";

// ============ Cache and fallback ============

#[test]
fn test_pipeline_answer_is_cached_and_served() {
    let (wiki, wiki_calls) = Fake::new("wikipedia", Script::Answer(PARIS, 0.85));
    let mut orch = Orchestrator::new(
        MemoryCache::new(),
        local_router(),
        Pipeline::new(vec![Stage::always(wiki)]),
    );

    let first = orch.ask("capital of France", &AskContext::new());
    assert!(first.text().contains(PARIS));
    assert!(first.sources().contains_key("wikipedia"));
    assert!((first.confidence() - 0.9).abs() < 1e-9);
    assert!(!first.from_cache());
    assert_eq!(first.meta()["best_source"], "wikipedia");
    assert_eq!(first.meta()["route"], "local");

    let second = orch.ask("Capital of France?", &AskContext::new());
    assert!(second.from_cache());
    assert_eq!(second.text(), first.text());
    assert!(second.sources().contains_key("wikipedia"));
    assert_eq!(wiki_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_nothing_answers_gives_fallback() {
    let (notes, _) = Fake::new("custom_db", Script::Nothing);
    let (web, web_calls) = Fake::new("web", Script::Fail);
    let mut orch = Orchestrator::new(
        MemoryCache::new(),
        local_router(),
        Pipeline::new(vec![Stage::always(notes), Stage::always(web)]),
    );

    let result = orch.ask("capital of atlantis", &AskContext::new());
    assert_eq!(result.text(), "Sorry, I don't know the answer to that.");
    assert!((result.confidence() - 0.2).abs() < 1e-9);
    assert!(result.sources().contains_key("fallback"));
    assert_eq!(web_calls.load(Ordering::SeqCst), 1);

    let attempts = result.meta()["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["outcome"], "no_answer");
    assert_eq!(attempts[1]["outcome"], "failed");
    assert!(attempts[1]["reason"]
        .as_str()
        .unwrap()
        .contains("connection refused"));

    // Fallbacks are cached too with the default threshold.
    assert_eq!(orch.cache().len(), 1);
}

#[test]
fn test_min_confidence_skips_cache_write() {
    let mut orch = Orchestrator::new(MemoryCache::new(), local_router(), Pipeline::default())
        .with_cache_min_confidence(0.5);

    let result = orch.ask("capital of atlantis", &AskContext::new());
    assert!(result.sources().contains_key("fallback"));
    assert!(orch.cache().is_empty());
}

#[test]
fn test_empty_query_is_not_cached() {
    let (wiki, wiki_calls) = Fake::new("wikipedia", Script::Nothing);
    let mut orch = Orchestrator::new(
        MemoryCache::new(),
        local_router(),
        Pipeline::new(vec![Stage::always(wiki)]),
    );

    orch.ask("?!", &AskContext::new());
    orch.ask("   ", &AskContext::new());
    assert!(orch.cache().is_empty());
    assert_eq!(wiki_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_stale_placeholder_is_recomputed() {
    let mut cache = MemoryCache::new();
    cache.put(
        "capital of france",
        CacheEntry::new(
            "[cloud disabled] OPENAI_API_KEY not set",
            "cloud_model",
            0.9,
            Metadata::new(),
        ),
    );
    let (knowledge, calls) = Fake::new("knowledge", Script::Answer(PARIS, 0.95));
    let mut orch = Orchestrator::new(
        cache,
        local_router(),
        Pipeline::new(vec![Stage::always(knowledge)]),
    );

    let result = orch.ask("capital of france", &AskContext::new());
    assert!(!result.from_cache());
    assert!(result.text().starts_with("Main Answer (Curated Knowledge):"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stored = orch.cache().get("capital of france").unwrap();
    assert_eq!(stored.source, "knowledge");
}

#[test]
fn test_json_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");

    {
        let (knowledge, _) = Fake::new("knowledge", Script::Answer(PARIS, 0.95));
        let mut orch = Orchestrator::new(
            JsonFileCache::open(&path),
            local_router(),
            Pipeline::new(vec![Stage::always(knowledge)]),
        );
        orch.ask("capital of france", &AskContext::new());
    }

    let (knowledge, calls) = Fake::new("knowledge", Script::Answer(PARIS, 0.95));
    let mut orch = Orchestrator::new(
        JsonFileCache::open(&path),
        local_router(),
        Pipeline::new(vec![Stage::always(knowledge)]),
    );
    let result = orch.ask("CAPITAL OF FRANCE", &AskContext::new());
    assert!(result.from_cache());
    assert!(result.text().contains(PARIS));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ============ Local model ============

#[test]
fn test_confident_local_answer_skips_pipeline() {
    let (local, local_calls) = Fake::new(
        "local_model",
        Script::Answer("A thorough local answer that is long enough.", 0.75),
    );
    let (wiki, wiki_calls) = Fake::new("wikipedia", Script::Answer(PARIS, 0.85));
    let mut orch = Orchestrator::new(
        MemoryCache::new(),
        local_router(),
        Pipeline::new(vec![Stage::always(wiki)]),
    )
    .with_local(local);

    let result = orch.ask("tell me something", &AskContext::new());
    assert_eq!(result.text(), "A thorough local answer that is long enough.");
    assert!(result.sources().contains_key("local_model"));
    assert_eq!(local_calls.load(Ordering::SeqCst), 1);
    assert_eq!(wiki_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_weak_local_answer_still_runs_pipeline() {
    let (local, _) = Fake::new("local_model", Script::Answer("I don't know.", 0.3));
    let (wiki, wiki_calls) = Fake::new("wikipedia", Script::Answer(PARIS, 0.85));
    let mut orch = Orchestrator::new(
        MemoryCache::new(),
        local_router(),
        Pipeline::new(vec![Stage::always(wiki)]),
    )
    .with_local(local);

    let result = orch.ask("capital of france", &AskContext::new());
    assert_eq!(wiki_calls.load(Ordering::SeqCst), 1);
    assert!(result.text().starts_with("Main Answer (Reference):"));
    assert!(result.text().contains("Local Model:\nI don't know."));
    assert_eq!(result.meta()["candidates"].as_array().unwrap().len(), 2);
}

#[test]
fn test_hybrid_merges_local_and_pipeline() {
    let (local, _) = Fake::new(
        "local_model",
        Script::Answer("From my notes, you prefer the window seat on flights.", 0.75),
    );
    let (notes, notes_calls) = Fake::new(
        "custom_db",
        Script::Answer("Seat preference: window, aisle on overnight flights.", 0.9),
    );
    let (cloud, cloud_calls) = Fake::new("cloud_model", Script::Answer("cloud text", 0.9));
    let mut orch = Orchestrator::new(
        MemoryCache::new(),
        cloud_router(true),
        Pipeline::new(vec![Stage::always(notes)]),
    )
    .with_local(local)
    .with_cloud(cloud);

    let result = orch.ask("my seat preference", &AskContext::new());
    assert_eq!(result.meta()["route"], "hybrid");
    assert_eq!(notes_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cloud_calls.load(Ordering::SeqCst), 0);
    assert!(result.text().contains("Local notes"));
    assert!(result.text().contains("Local Model"));
}

// ============ Cloud ============

#[test]
fn test_cloud_route_runs_pipeline_then_cloud() {
    let (local, local_calls) = Fake::new("local_model", Script::Answer("local", 0.75));
    let (wiki, wiki_calls) = Fake::new("wikipedia", Script::Answer(PARIS, 0.85));
    let (cloud, cloud_calls) = Fake::new(
        "cloud_model",
        Script::Answer("Here is a careful comparison of the two designs.", 0.9),
    );
    let mut orch = Orchestrator::new(
        MemoryCache::new(),
        cloud_router(false),
        Pipeline::new(vec![Stage::always(wiki)]),
    )
    .with_local(local)
    .with_cloud(cloud);

    let result = orch.ask("explain the capital of france", &AskContext::new());
    assert_eq!(result.meta()["route"], "cloud");
    assert_eq!(result.text(), "Here is a careful comparison of the two designs.");
    assert!(result.sources().contains_key("cloud_model"));
    assert_eq!(result.meta()["best_source"], "cloud_model");
    assert_eq!(local_calls.load(Ordering::SeqCst), 0);
    assert_eq!(wiki_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cloud_calls.load(Ordering::SeqCst), 1);

    let candidates = result.meta()["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0][0], "cloud_model");
    assert_eq!(candidates[1][0], "wikipedia");

    let attempts = result.meta()["attempts"].as_array().unwrap();
    assert_eq!(attempts[0]["source"], "wikipedia");
    assert_eq!(attempts[1]["source"], "cloud_model");
}

#[test]
fn test_pipeline_answer_on_local_route_skips_cloud() {
    let (wiki, _) = Fake::new("wikipedia", Script::Answer(PARIS, 0.85));
    let (cloud, cloud_calls) = Fake::new("cloud_model", Script::Answer("cloud text", 0.9));
    let mut orch = Orchestrator::new(
        MemoryCache::new(),
        cloud_router(false),
        Pipeline::new(vec![Stage::always(wiki)]),
    )
    .with_cloud(cloud);

    let result = orch.ask("capital of france", &AskContext::new());
    assert_eq!(result.meta()["route"], "local");
    assert!(result.text().starts_with("Main Answer (Reference):"));
    assert_eq!(cloud_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failed_cloud_route_falls_through_to_pipeline_once() {
    let (local, local_calls) = Fake::new("local_model", Script::Answer("local", 0.75));
    let (wiki, wiki_calls) = Fake::new("wikipedia", Script::Answer(PARIS, 0.85));
    let (cloud, cloud_calls) = Fake::new("cloud_model", Script::Fail);
    let mut orch = Orchestrator::new(
        MemoryCache::new(),
        cloud_router(false),
        Pipeline::new(vec![Stage::always(wiki)]),
    )
    .with_local(local)
    .with_cloud(cloud);

    let result = orch.ask("explain the capital of france", &AskContext::new());
    assert!(result.text().starts_with("Main Answer (Reference):"));
    assert_eq!(cloud_calls.load(Ordering::SeqCst), 1);
    assert_eq!(local_calls.load(Ordering::SeqCst), 0);
    assert_eq!(wiki_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cloud_is_last_resort_on_local_route() {
    let (wiki, _) = Fake::new("wikipedia", Script::Nothing);
    let (cloud, cloud_calls) = Fake::new("cloud_model", Script::Answer("Cloud says hi.", 0.9));
    let mut orch = Orchestrator::new(
        MemoryCache::new(),
        cloud_router(false),
        Pipeline::new(vec![Stage::always(wiki)]),
    )
    .with_cloud(cloud);

    let result = orch.ask("who painted the mona lisa", &AskContext::new());
    assert_eq!(result.meta()["route"], "local");
    assert_eq!(result.text(), "Cloud says hi.");
    assert_eq!(cloud_calls.load(Ordering::SeqCst), 1);
}

// ============ Gates and context ============

#[test]
fn test_news_stage_runs_only_for_news_queries() {
    let (news, news_calls) = Fake::new("news", Script::Answer("Rover finds ice", 0.55));
    let mut orch = Orchestrator::new(
        MemoryCache::new(),
        local_router(),
        Pipeline::new(vec![Stage::gated(news, Gate::News)]),
    );

    orch.ask("capital of france", &AskContext::new());
    assert_eq!(news_calls.load(Ordering::SeqCst), 0);

    let result = orch.ask("latest news on mars", &AskContext::new());
    assert_eq!(news_calls.load(Ordering::SeqCst), 1);
    assert!(result.text().starts_with("Main Answer (News hits):"));
    assert!(result.meta()["intents"].as_str().unwrap().contains("news"));

    orch.ask("mars rover", &AskContext::with_intents([Intent::News]));
    assert_eq!(news_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_prompt_context_reaches_model() {
    let (local, _) = Fake::new("local_model", Script::Nothing);
    let prompts = local.prompts.clone();
    let mut orch = Orchestrator::new(MemoryCache::new(), local_router(), Pipeline::default())
        .with_local(local);

    let ctx = AskContext {
        prompt_context: Some("User: hi\nRAYA: hello".to_string()),
        ..AskContext::default()
    };
    orch.ask("how are you", &ctx);

    let prompts = prompts.lock().unwrap();
    assert_eq!(
        prompts.as_slice(),
        ["User: hi\nRAYA: hello\n\nUser query:\nhow are you"]
    );
}

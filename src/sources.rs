use anyhow::Result;

use crate::backend::{OpenAIBackend, CLOUD_LABEL, LOCAL_LABEL};
use crate::config::Config;
use crate::pipeline::Pipeline;

/// One row of `raya sources`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatus {
    pub label: String,
    pub status: String,
    pub gate: String,
    pub description: String,
}

fn row(label: &str, status: impl Into<String>, gate: &str, description: &str) -> SourceStatus {
    SourceStatus {
        label: label.to_string(),
        status: status.into(),
        gate: gate.to_string(),
        description: description.to_string(),
    }
}

/// Status of every source in waterfall order: local model, pipeline stages,
/// cloud model. Disabled pipeline stages are listed as `DISABLED`.
pub fn source_statuses(config: &Config) -> Result<Vec<SourceStatus>> {
    let mut rows = Vec::new();

    let local_status = if config.local_model.enabled {
        format!("OK ({})", config.local_model.model)
    } else {
        "DISABLED".to_string()
    };
    rows.push(row(LOCAL_LABEL, local_status, "route", "Local model via Ollama"));

    let pipeline = Pipeline::from_config(config)?;
    for stage in pipeline.stages() {
        let label = stage.adapter.label();
        let status = match label {
            "knowledge" if !config.knowledge.path.exists() => "NOT CONFIGURED (file missing)",
            "custom_db" if !config.notes.root.is_dir() => "NOT CONFIGURED (root missing)",
            _ => "OK",
        };
        rows.push(row(
            label,
            status,
            stage.gate.as_str(),
            stage.adapter.description(),
        ));
    }

    let disabled = [
        ("knowledge", config.knowledge.enabled),
        ("custom_db", config.notes.enabled),
        ("wikipedia", config.wikipedia.enabled),
        ("web", config.web.enabled),
        ("news", config.news.enabled),
        ("arxiv", config.research.enabled),
    ];
    for (label, enabled) in disabled {
        if !enabled {
            rows.push(row(label, "DISABLED", "-", "-"));
        }
    }

    let cloud = OpenAIBackend::new(&config.cloud)?;
    let cloud_status = match cloud.disabled_reason() {
        None => format!("OK ({})", config.cloud.model),
        Some(reason) => format!("DISABLED ({})", reason),
    };
    rows.push(row(
        CLOUD_LABEL,
        cloud_status,
        "fallback",
        "Cloud model via OpenAI chat completions",
    ));

    Ok(rows)
}

pub fn list_sources(config: &Config) -> Result<()> {
    let rows = source_statuses(config)?;
    println!("{:<12} {:<36} {:<16} DESCRIPTION", "SOURCE", "STATUS", "GATE");
    for r in rows {
        println!(
            "{:<12} {:<36} {:<16} {}",
            r.label, r.status, r.gate, r.description
        );
    }
    Ok(())
}

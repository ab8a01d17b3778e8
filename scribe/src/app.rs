//! Wiring from configuration to a rendered result.
//!
//! [`build_agent`] turns config and credentials into the production agent;
//! [`write_post`] renders the task, runs the retry loop against any
//! [`Generator`], and hands the final text to the renderer.

use std::io::Write;

use anyhow::Result;
use tracing::{info, warn};

use crate::agent::{Agent, Persona};
use crate::core::guardrail::GuardrailChain;
use crate::core::types::FinalResult;
use crate::io::config::{Credentials, ScribeConfig};
use crate::io::llm::{OpenAiClient, OpenAiSettings};
use crate::io::search::SerperSearch;
use crate::render::{RenderPath, display_result};
use crate::runner::{Generator, RunOptions, run_task};
use crate::task::{Task, TaskInput};

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub result: FinalResult,
    pub render: RenderPath,
}

/// Build the OpenAI-backed agent, with Serper search when enabled.
pub fn build_agent(config: &ScribeConfig, credentials: &Credentials) -> Result<Agent<OpenAiClient>> {
    if credentials.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; llm calls will fail authentication");
    }
    let llm = OpenAiClient::new(OpenAiSettings {
        base_url: credentials
            .openai_base_url
            .clone()
            .unwrap_or_else(|| config.llm.base_url.clone()),
        api_key: credentials.openai_api_key.clone(),
        model: config.llm.model.clone(),
        temperature: config.llm.temperature,
        timeout: config.request_timeout(),
    })?;

    let persona = Persona {
        role: config.agent.role.clone(),
        goal: config.agent.goal.clone(),
        backstory: config.agent.backstory.clone(),
    };
    let agent = Agent::new(persona, llm)?.with_max_tool_rounds(config.llm.max_tool_rounds);
    if !config.search.enabled {
        return Ok(agent);
    }

    if credentials.serper_api_key.is_none() {
        warn!("SERPER_API_KEY is not set; search tool calls will fail");
    }
    let search = SerperSearch::new(
        config.search.endpoint.clone(),
        credentials.serper_api_key.clone(),
        config.search.results,
        config.request_timeout(),
    )?;
    Ok(agent.with_search(Box::new(search)))
}

pub fn run_options(config: &ScribeConfig) -> RunOptions {
    RunOptions {
        max_attempts: config.task.max_attempts,
        policy: config.task.exhaustion_policy,
        timeout: config.run_timeout(),
    }
}

/// Render the task with `input`, run it through `generator`, and display
/// the final text on `out`.
pub fn write_post<G: Generator, W: Write>(
    config: &ScribeConfig,
    generator: &G,
    input: &TaskInput,
    out: &mut W,
) -> Result<RunSummary> {
    let task = Task::new(
        config.task.description.clone(),
        config.task.expected_output.clone(),
    );
    let prompt = task.render(input)?;
    let guardrail =
        GuardrailChain::blog(config.guardrail.word_limit, config.guardrail.require_title);

    let result = run_task(
        generator,
        &prompt,
        &guardrail,
        &run_options(config),
        |report| {
            info!(
                attempt = report.attempt,
                max_attempts = report.max_attempts,
                accepted = report.outcome.is_accepted(),
                "attempt finished"
            );
        },
    )?;

    let render = display_result(out, &result.raw);
    Ok(RunSummary { result, render })
}

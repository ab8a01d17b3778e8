//! Prompt builder for agent conversations.

use anyhow::{Context, Result};
use minijinja::{Environment, UndefinedBehavior, context};
use serde::Serialize;

use crate::agent::Persona;
use crate::core::types::Rejection;
use crate::io::llm::ToolDefinition;
use crate::task::TaskPrompt;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const TASK_TEMPLATE: &str = include_str!("prompts/task.md");

#[derive(Debug, Serialize)]
struct ToolContext<'a> {
    name: &'a str,
    description: &'a str,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.add_template("system", SYSTEM_TEMPLATE)
            .context("parse system template")?;
        env.add_template("task", TASK_TEMPLATE)
            .context("parse task template")?;
        Ok(Self { env })
    }

    /// System message: persona plus the tools on offer.
    pub fn render_system(&self, persona: &Persona, tools: &[ToolDefinition]) -> Result<String> {
        let tools: Vec<ToolContext<'_>> = tools
            .iter()
            .map(|tool| ToolContext {
                name: &tool.name,
                description: &tool.description,
            })
            .collect();
        let rendered = self.env.get_template("system")?.render(context! {
            role => persona.role.trim(),
            goal => persona.goal.trim(),
            backstory => persona.backstory.trim(),
            tools => tools,
        })?;
        Ok(rendered.trim_end().to_string())
    }

    /// User message: the task, its expected output, and prior rejections.
    pub fn render_task(&self, prompt: &TaskPrompt, guidance: &[Rejection]) -> Result<String> {
        let rendered = self.env.get_template("task")?.render(context! {
            description => prompt.description.trim(),
            expected_output => prompt.expected_output.trim(),
            guidance => guidance,
        })?;
        Ok(rendered.trim_end().to_string())
    }
}

//! Task definition and parameter substitution.
//!
//! A [`Task`] holds a description template and an expected-output contract.
//! Rendering it against a [`TaskInput`] produces the [`TaskPrompt`] handed to
//! every generation attempt. The template and the input must agree exactly:
//! a referenced placeholder without a value and a value that no placeholder
//! references are both errors.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use minijinja::{Environment, UndefinedBehavior, Value};
use tracing::debug;

/// Named parameters substituted into the description template.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    params: BTreeMap<String, Value>,
}

impl TaskInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock inputs: `topic` and `year`.
    pub fn topic_year(topic: impl Into<String>, year: i32) -> Self {
        let topic: String = topic.into();
        Self::new().with("topic", topic).with("year", year)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }
}

/// A unit of work: description template plus expected-output contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
}

/// Rendered task, immutable for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPrompt {
    pub description: String,
    pub expected_output: String,
}

impl Task {
    pub fn new(description: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
        }
    }

    /// Substitute `input` into the description.
    pub fn render(&self, input: &TaskInput) -> Result<TaskPrompt> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_template("description", &self.description)
            .context("parse task description template")?;
        let template = env.get_template("description")?;

        let referenced = template.undeclared_variables(false);
        let mut missing: Vec<&str> = referenced
            .iter()
            .map(String::as_str)
            .filter(|name| !input.params.contains_key(*name))
            .collect();
        missing.sort_unstable();
        if !missing.is_empty() {
            bail!("missing task input(s): {}", missing.join(", "));
        }
        let unused: Vec<&str> = input
            .names()
            .filter(|name| !referenced.contains(*name))
            .collect();
        if !unused.is_empty() {
            bail!(
                "task input(s) not referenced by the description: {}",
                unused.join(", ")
            );
        }

        let description = template
            .render(&input.params)
            .context("render task description")?;
        debug!(description = %description, "rendered task description");
        Ok(TaskPrompt {
            description,
            expected_output: self.expected_output.clone(),
        })
    }
}

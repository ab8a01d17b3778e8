//! LLM-backed agent producing generation attempts.
//!
//! The agent renders its persona and the task into a conversation, lets the
//! model call the search tool for a bounded number of rounds, and returns the
//! model's final text. It implements [`Generator`] so the runner never sees
//! the LLM or the tool.

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument, warn};

use crate::io::llm::{ChatMessage, ChatRequest, LlmClient, ToolCall, ToolDefinition};
use crate::io::prompt::PromptEngine;
use crate::io::search::{SearchArgs, SearchTool};
use crate::runner::{AttemptRequest, Generator};

/// Role, goal and backstory the model is asked to adopt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

pub struct Agent<L> {
    persona: Persona,
    llm: L,
    search: Option<Box<dyn SearchTool>>,
    max_tool_rounds: u32,
    prompts: PromptEngine,
}

impl<L: LlmClient> Agent<L> {
    pub fn new(persona: Persona, llm: L) -> Result<Self> {
        Ok(Self {
            persona,
            llm,
            search: None,
            max_tool_rounds: 5,
            prompts: PromptEngine::new()?,
        })
    }

    pub fn with_search(mut self, search: Box<dyn SearchTool>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.search
            .iter()
            .map(|search| search.definition())
            .collect()
    }

    /// Run one tool call. Model mistakes (unknown tool, bad arguments) are
    /// reported back as the tool result; search failures are errors.
    fn call_tool(&self, call: &ToolCall) -> Result<String> {
        let Some(search) = self.search.as_deref().filter(|s| s.name() == call.name) else {
            warn!(tool = %call.name, "model called unknown tool");
            return Ok(format!("Error: unknown tool '{}'", call.name));
        };
        let args: SearchArgs = match serde_json::from_str(&call.arguments) {
            Ok(args) => args,
            Err(err) => {
                warn!(tool = %call.name, error = %err, "malformed tool arguments");
                return Ok(format!(
                    "Error: invalid arguments for '{}': {err}",
                    call.name
                ));
            }
        };
        info!(tool = %call.name, query = %args.search_query, "running search");
        search
            .search(&args.search_query)
            .with_context(|| format!("tool {}", call.name))
    }
}

impl<L: LlmClient> Generator for Agent<L> {
    #[instrument(skip_all, fields(attempt = request.attempt, guidance = request.guidance.len()))]
    fn generate(&self, request: &AttemptRequest<'_>) -> Result<String> {
        let tools = self.tool_definitions();
        let system = self.prompts.render_system(&self.persona, &tools)?;
        let user = self.prompts.render_task(request.prompt, request.guidance)?;
        let mut messages = vec![ChatMessage::system(system), ChatMessage::user(user)];

        for round in 0..=self.max_tool_rounds {
            // The last round withdraws tools so the model has to answer.
            let offered = if round < self.max_tool_rounds {
                tools.clone()
            } else {
                Vec::new()
            };
            let response = self
                .llm
                .complete(&ChatRequest {
                    messages: messages.clone(),
                    tools: offered,
                })
                .context("llm completion")?;

            if response.tool_calls.is_empty() {
                let Some(content) = response.content else {
                    bail!("llm returned neither content nor tool calls");
                };
                debug!(round, chars = content.len(), "agent produced answer");
                return Ok(content);
            }

            debug!(round, calls = response.tool_calls.len(), "agent requested tools");
            let mut results = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                results.push(ChatMessage::tool_result(&call.id, self.call_tool(call)?));
            }
            messages.push(ChatMessage::assistant_tool_calls(
                response.content,
                response.tool_calls,
            ));
            messages.extend(results);
        }

        bail!(
            "llm kept requesting tools after {} round(s)",
            self.max_tool_rounds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::llm::{ChatResponse, Role};
    use crate::io::search::SERPER_TOOL_NAME;
    use crate::test_support::{ScriptedLlm, StaticSearch, sample_prompt};

    fn persona() -> Persona {
        Persona {
            role: "Blog Writer".to_string(),
            goal: "Write blog post".to_string(),
            backstory: "An expert blog writer".to_string(),
        }
    }

    fn text(content: &str) -> ChatResponse {
        ChatResponse {
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
        }
    }

    fn tool_call(name: &str, arguments: &str) -> ChatResponse {
        ChatResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
        }
    }

    fn request<'a>(prompt: &'a crate::task::TaskPrompt) -> AttemptRequest<'a> {
        AttemptRequest {
            attempt: 1,
            prompt,
            guidance: &[],
        }
    }

    #[test]
    fn returns_plain_answer() {
        let llm = ScriptedLlm::new(vec![text("# Title\n\nBody.")]);
        let agent = Agent::new(persona(), llm).expect("agent");
        let prompt = sample_prompt();

        let out = agent.generate(&request(&prompt)).expect("generate");
        assert_eq!(out, "# Title\n\nBody.");

        let requests = agent.llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].role, Role::System);
        assert_eq!(requests[0].messages[1].role, Role::User);
        assert!(requests[0].tools.is_empty());
    }

    #[test]
    fn runs_search_and_sends_result_back() {
        let llm = ScriptedLlm::new(vec![
            tool_call(SERPER_TOOL_NAME, "{\"search_query\":\"climate 2026\"}"),
            text("# Climate\n\nShort."),
        ]);
        let search = StaticSearch::new("Title: IPCC report");
        let agent = Agent::new(persona(), llm)
            .expect("agent")
            .with_search(Box::new(search.clone()));
        let prompt = sample_prompt();

        let out = agent.generate(&request(&prompt)).expect("generate");
        assert_eq!(out, "# Climate\n\nShort.");
        assert_eq!(search.queries(), vec!["climate 2026".to_string()]);

        let requests = agent.llm.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        let followup = &requests[1].messages;
        assert_eq!(followup[2].role, Role::Assistant);
        assert_eq!(followup[2].tool_calls.len(), 1);
        assert_eq!(followup[3].role, Role::Tool);
        assert_eq!(followup[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(followup[3].content.as_deref(), Some("Title: IPCC report"));
    }

    #[test]
    fn unknown_tool_is_reported_to_model() {
        let llm = ScriptedLlm::new(vec![tool_call("calculator", "{}"), text("done")]);
        let agent = Agent::new(persona(), llm).expect("agent");
        let prompt = sample_prompt();

        agent.generate(&request(&prompt)).expect("generate");
        let requests = agent.llm.requests();
        let tool_msg = requests[1].messages.last().expect("tool message");
        assert_eq!(
            tool_msg.content.as_deref(),
            Some("Error: unknown tool 'calculator'")
        );
    }

    #[test]
    fn malformed_arguments_are_reported_to_model() {
        let llm = ScriptedLlm::new(vec![tool_call(SERPER_TOOL_NAME, "not json"), text("done")]);
        let search = StaticSearch::new("unused");
        let agent = Agent::new(persona(), llm)
            .expect("agent")
            .with_search(Box::new(search.clone()));
        let prompt = sample_prompt();

        agent.generate(&request(&prompt)).expect("generate");
        assert!(search.queries().is_empty());
        let requests = agent.llm.requests();
        let tool_msg = requests[1].messages.last().expect("tool message");
        assert!(
            tool_msg
                .content
                .as_deref()
                .is_some_and(|c| c.starts_with("Error: invalid arguments"))
        );
    }

    #[test]
    fn tools_withdrawn_after_round_limit() {
        let call = tool_call(SERPER_TOOL_NAME, "{\"search_query\":\"q\"}");
        let llm = ScriptedLlm::new(vec![call.clone(), call, text("final")]);
        let agent = Agent::new(persona(), llm)
            .expect("agent")
            .with_search(Box::new(StaticSearch::new("r")))
            .with_max_tool_rounds(2);
        let prompt = sample_prompt();

        let out = agent.generate(&request(&prompt)).expect("generate");
        assert_eq!(out, "final");
        let requests = agent.llm.requests();
        assert_eq!(requests.len(), 3);
        assert!(!requests[1].tools.is_empty());
        assert!(requests[2].tools.is_empty());
    }

    #[test]
    fn search_failure_is_fatal() {
        let llm = ScriptedLlm::new(vec![
            tool_call(SERPER_TOOL_NAME, "{\"search_query\":\"q\"}"),
            text("never reached"),
        ]);
        let search = StaticSearch::failing("SERPER_API_KEY is not set");
        let agent = Agent::new(persona(), llm)
            .expect("agent")
            .with_search(Box::new(search.clone()));
        let prompt = sample_prompt();

        let err = agent.generate(&request(&prompt)).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("tool search_the_internet_with_serper"), "{chain}");
        assert!(chain.contains("SERPER_API_KEY is not set"), "{chain}");
        assert_eq!(search.queries(), vec!["q".to_string()]);
        assert_eq!(agent.llm.requests().len(), 1);
    }

    #[test]
    fn search_failure_ends_the_run_without_retrying() {
        use crate::core::guardrail::GuardrailChain;
        use crate::runner::{RunOptions, run_task};

        let llm = ScriptedLlm::new(vec![
            tool_call(SERPER_TOOL_NAME, "{\"search_query\":\"q\"}"),
            text("short answer"),
        ]);
        let agent = Agent::new(persona(), llm)
            .expect("agent")
            .with_search(Box::new(StaticSearch::failing("connection refused")));

        let mut attempts = 0;
        let err = run_task(
            &agent,
            &sample_prompt(),
            &GuardrailChain::blog(100, false),
            &RunOptions::default(),
            |_| attempts += 1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("generation attempt 1"));
        assert!(format!("{err:#}").contains("connection refused"));
        assert_eq!(attempts, 0);
        assert_eq!(agent.llm.requests().len(), 1);
    }

    #[test]
    fn empty_response_is_error() {
        let llm = ScriptedLlm::new(vec![ChatResponse::default()]);
        let agent = Agent::new(persona(), llm).expect("agent");
        let prompt = sample_prompt();

        let err = agent.generate(&request(&prompt)).unwrap_err();
        assert!(err.to_string().contains("neither content nor tool calls"));
    }

    #[test]
    fn guidance_reaches_user_message() {
        let llm = ScriptedLlm::new(vec![text("ok")]);
        let agent = Agent::new(persona(), llm).expect("agent");
        let prompt = sample_prompt();
        let guidance = vec![crate::core::types::Rejection {
            attempt: 1,
            reason: "Blog content exceeds 100 words".to_string(),
        }];

        agent
            .generate(&AttemptRequest {
                attempt: 2,
                prompt: &prompt,
                guidance: &guidance,
            })
            .expect("generate");
        let requests = agent.llm.requests();
        let user = requests[0].messages[1].content.clone().unwrap_or_default();
        assert!(user.contains("- Attempt 1: Blog content exceeds 100 words"));
        assert_eq!(agent.persona().role, "Blog Writer");
    }
}

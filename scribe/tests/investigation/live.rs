use scribe::app::{build_agent, write_post};
use scribe::io::config::{Credentials, ScribeConfig};
use scribe::io::search::{SearchTool, SerperSearch};
use scribe::task::TaskInput;

/// Full run against the real model; the post may or may not pass the guardrail.
#[test]
#[ignore = "requires OPENAI_API_KEY and network"]
fn live_run_produces_text() {
    let credentials = Credentials::from_env();
    let config = ScribeConfig::default();
    let agent = build_agent(&config, &credentials).expect("agent");
    let mut out = Vec::new();

    let summary = write_post(
        &config,
        &agent,
        &TaskInput::topic_year("Climate Change", 2026),
        &mut out,
    )
    .expect("run");

    assert!(!summary.result.raw.trim().is_empty());
    assert!(summary.result.attempts >= 1);
    assert!(!out.is_empty());
}

#[test]
#[ignore = "requires SERPER_API_KEY and network"]
fn live_serper_returns_results() {
    let credentials = Credentials::from_env();
    let config = ScribeConfig::default();
    let search = SerperSearch::new(
        config.search.endpoint.clone(),
        credentials.serper_api_key,
        3,
        config.request_timeout(),
    )
    .expect("search");

    let text = search.search("climate change 2026").expect("search");
    assert!(text.contains("Search results:"));
}

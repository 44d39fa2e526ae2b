//! Command dispatch — one command in, exactly one response out.

use serde_json::Value;
use tracing::debug;

use browserlink_core::action::Action;
use browserlink_core::error::CommandError;
use browserlink_core::protocol::{Command, Response, ResponseBody};

use crate::registry::Session;
use crate::state::ServerState;

/// Interpret one decoded command against `session` and produce its response.
///
/// No engine failure propagates past this function: every error becomes an
/// error response and the connection survives the bad command.
pub async fn dispatch_command(
    state: &ServerState,
    session: &mut Session,
    command: Command,
) -> Response {
    match dispatch_inner(state, session, command).await {
        Ok(body) => Response::success(body),
        Err(e) => e.into_response(),
    }
}

async fn dispatch_inner(
    state: &ServerState,
    session: &mut Session,
    command: Command,
) -> Result<ResponseBody, CommandError> {
    match command {
        Command::Goto { url } => {
            debug!(conn_id = %session.conn_id, %url, "goto");
            session
                .context
                .navigate(&url)
                .await
                .map_err(|e| CommandError::Navigation(e.to_string()))?;
            Ok(ResponseBody::Empty {})
        }

        Command::GetState => {
            let browser_state = session
                .context
                .browser_state()
                .await
                .map_err(|e| CommandError::StateCapture(e.to_string()))?;
            Ok(ResponseBody::State {
                state: browser_state,
            })
        }

        Command::ExecuteAction { action } => {
            let raw = action.ok_or_else(|| CommandError::MissingField("action".into()))?;
            let action: Action = serde_json::from_value(raw)
                .map_err(|e| CommandError::MissingField(format!("action: {e}")))?;
            let result = session
                .context
                .execute_action(action)
                .await
                .map_err(|e| CommandError::ActionExecution(e.to_string()))?;
            Ok(ResponseBody::ActionResult {
                result: result.unwrap_or(Value::Null),
            })
        }

        Command::GetPageContent => {
            let content = session
                .context
                .page_content()
                .await
                .map_err(|e| CommandError::ContentFetch(e.to_string()))?;
            Ok(ResponseBody::PageContent { content })
        }

        Command::RunAgent { task, max_steps } => {
            run_hosted_agent(state, session, task, max_steps).await
        }

        Command::Unknown { kind } => {
            debug!(conn_id = %session.conn_id, kind, "Unknown command type");
            Err(CommandError::UnknownCommand)
        }
    }
}

/// Run the hosted decision loop against this session's context. Internally
/// it may issue many browser operations; on the wire it is still one
/// command and one response.
async fn run_hosted_agent(
    state: &ServerState,
    session: &mut Session,
    task_override: Option<String>,
    max_steps: Option<u32>,
) -> Result<ResponseBody, CommandError> {
    let hosted = state
        .agent
        .as_ref()
        .ok_or_else(|| CommandError::AgentRun("no hosted agent on this server".into()))?;

    if let Some(task) = task_override {
        *hosted.task.write().await = Some(task);
    }
    let task = hosted
        .task
        .read()
        .await
        .clone()
        .ok_or_else(|| CommandError::AgentRun("no task bound".into()))?;

    let max_steps = max_steps.unwrap_or(state.config.agent.max_steps);
    debug!(conn_id = %session.conn_id, %task, max_steps, "Hosted agent run");

    let outcome = hosted
        .decision
        .run(session.context.as_surface(), &task, max_steps)
        .await
        .map_err(|e| CommandError::AgentRun(e.to_string()))?;

    Ok(ResponseBody::AgentRun {
        result: outcome.final_result,
        is_done: outcome.is_done,
        errors: outcome.errors,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use browserlink_core::config::Config;
    use browserlink_core::surface::{AgentRunOutcome, BrowserSurface, DecisionLoop};
    use browserlink_engine::{BrowserEngine, StubEngine};

    use super::*;

    async fn test_session() -> Session {
        let engine = StubEngine::new();
        Session {
            conn_id: "test".into(),
            created_at: chrono::Utc::now(),
            context: engine.new_context().await.unwrap(),
        }
    }

    fn bare_state() -> ServerState {
        ServerState::new(Config::default(), Arc::new(StubEngine::new()))
    }

    #[tokio::test]
    async fn test_goto_success_is_bare_status() {
        let state = bare_state();
        let mut session = test_session().await;
        let response = dispatch_command(
            &state,
            &mut session,
            Command::Goto {
                url: "https://example.com".into(),
            },
        )
        .await;
        assert_eq!(response, Response::success(ResponseBody::Empty {}));
    }

    #[tokio::test]
    async fn test_goto_failure_carries_engine_text() {
        let state = bare_state();
        let mut session = test_session().await;
        let response = dispatch_command(
            &state,
            &mut session,
            Command::Goto {
                url: "notaurl".into(),
            },
        )
        .await;
        match response {
            Response::Error { message } => {
                assert!(message.starts_with("Navigation failed"));
                assert!(message.contains("notaurl"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_content_after_goto() {
        let state = bare_state();
        let mut session = test_session().await;
        dispatch_command(
            &state,
            &mut session,
            Command::Goto {
                url: "https://example.com".into(),
            },
        )
        .await;
        let response = dispatch_command(&state, &mut session, Command::GetPageContent).await;
        match response {
            Response::Success(ResponseBody::PageContent { content }) => {
                assert!(content.contains("https://example.com"))
            }
            other => panic!("expected content, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let state = bare_state();
        let mut session = test_session().await;
        let response = dispatch_command(
            &state,
            &mut session,
            Command::Unknown { kind: "foo".into() },
        )
        .await;
        assert_eq!(response, Response::error("Unknown command"));
    }

    #[tokio::test]
    async fn test_missing_action_field() {
        let state = bare_state();
        let mut session = test_session().await;
        let response =
            dispatch_command(&state, &mut session, Command::ExecuteAction { action: None }).await;
        match response {
            Response::Error { message } => assert!(message.contains("Missing field")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_action_payload_is_recoverable() {
        let state = bare_state();
        let mut session = test_session().await;
        let response = dispatch_command(
            &state,
            &mut session,
            Command::ExecuteAction {
                action: Some(json!({})),
            },
        )
        .await;
        assert!(matches!(response, Response::Error { .. }));

        // the session survives the bad command
        let response = dispatch_command(
            &state,
            &mut session,
            Command::Goto {
                url: "https://example.com".into(),
            },
        )
        .await;
        assert_eq!(response, Response::success(ResponseBody::Empty {}));
    }

    #[tokio::test]
    async fn test_run_agent_without_hosted_agent() {
        let state = bare_state();
        let mut session = test_session().await;
        let response = dispatch_command(
            &state,
            &mut session,
            Command::RunAgent {
                task: None,
                max_steps: None,
            },
        )
        .await;
        match response {
            Response::Error { message } => assert!(message.contains("no hosted agent")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    struct ScriptedLoop;

    #[async_trait]
    impl DecisionLoop for ScriptedLoop {
        async fn run(
            &self,
            browser: &mut dyn BrowserSurface,
            task: &str,
            _max_steps: u32,
        ) -> anyhow::Result<AgentRunOutcome> {
            browser.navigate("https://example.com").await?;
            let content = browser.page_content().await?;
            Ok(AgentRunOutcome {
                final_result: Some(format!("{task}: {} bytes", content.len())),
                is_done: true,
                errors: vec![],
            })
        }
    }

    #[tokio::test]
    async fn test_run_agent_with_task_override() {
        let state = ServerState::new(Config::default(), Arc::new(StubEngine::new()))
            .with_agent(Arc::new(ScriptedLoop));
        let mut session = test_session().await;
        let response = dispatch_command(
            &state,
            &mut session,
            Command::RunAgent {
                task: Some("scrape the docs".into()),
                max_steps: Some(3),
            },
        )
        .await;
        match response {
            Response::Success(ResponseBody::AgentRun {
                result,
                is_done,
                errors,
            }) => {
                assert!(result.unwrap().starts_with("scrape the docs"));
                assert!(is_done);
                assert!(errors.is_empty());
            }
            other => panic!("expected agent outcome, got {other:?}"),
        }
    }
}

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::common::*;

use crate::workflows::hiring::agent::{
    AgentError, AgentKind, AgentOrchestrator, AgentReply, AgentTransport, DispatchOptions,
    FallbackPolicy, HttpAgentTransport, ReplyStatus, RequestPhase, SessionId, SessionRegistry,
};
use crate::workflows::hiring::matching::MatchingEngine;

fn orchestrator(transport: ScriptedTransport) -> AgentOrchestrator<ScriptedTransport> {
    AgentOrchestrator::new(
        Arc::new(transport),
        MatchingEngine::default(),
        Duration::from_millis(100),
    )
}

fn matcher_reply() -> Value {
    // Agents commonly return the payload as a JSON-encoded string.
    Value::String(
        json!({
            "summary": "One strong fit",
            "recommended_jobs": [
                {"job_id": "job-1", "experience_match": 90, "salary_match": 80, "culture_fit": 70},
                {"job_id": "job-unknown", "experience_match": 10},
                {"no_id": true}
            ]
        })
        .to_string(),
    )
}

#[tokio::test]
async fn match_jobs_applies_agent_signals() {
    let transport = ScriptedTransport::with(
        AgentKind::JobMatcher,
        vec![Scripted::success(matcher_reply())],
    );
    let orchestrator = orchestrator(transport);

    let outcome = orchestrator
        .match_jobs(
            &candidate(),
            &[platform_job()],
            FallbackPolicy::Fail,
            DispatchOptions::default(),
        )
        .await
        .expect("agent answers");

    assert!(!outcome.is_mock);
    assert_eq!(outcome.summary.as_deref(), Some("One strong fit"));
    assert_eq!(outcome.trace.phase, RequestPhase::Succeeded);
    assert_eq!(outcome.trace.agent, AgentKind::JobMatcher);
    let result = outcome.report.best().expect("ranked");
    assert_close(result.experience_match_score, 90.0);
    assert_close(result.salary_match_score, 80.0);
    assert_close(result.culture_fit_score, 70.0);
    assert_close(result.skill_match_score, 66.7);
    assert!(uuid::Uuid::parse_str(&outcome.session_id.0).is_ok());
}

#[tokio::test]
async fn requests_carry_agent_type_and_session() {
    let transport = Arc::new(ScriptedTransport::with(
        AgentKind::Concierge,
        vec![Scripted::success(json!({"response": "Try the data roles"}))],
    ));
    let orchestrator = AgentOrchestrator::new(
        transport.clone(),
        MatchingEngine::default(),
        Duration::from_millis(100),
    );
    let session = SessionId("session-fixed".to_string());

    let reply = orchestrator
        .concierge(
            "Which roles fit me?",
            json!({"page": "jobs"}),
            DispatchOptions::in_session(session.clone()),
        )
        .await
        .expect("concierge answers");

    assert_eq!(reply.result, "Try the data roles");
    assert_eq!(reply.session_id, session);
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].agent_type, AgentKind::Concierge);
    assert_eq!(requests[0].session_id, session);
    assert_eq!(requests[0].context["page"], "jobs");
}

#[tokio::test]
async fn timeout_without_opt_in_propagates() {
    let transport = ScriptedTransport::with(AgentKind::JobMatcher, vec![Scripted::Hang]);
    let orchestrator = orchestrator(transport);

    let error = orchestrator
        .match_jobs(
            &candidate(),
            &[platform_job()],
            FallbackPolicy::default(),
            DispatchOptions::default().with_timeout(Duration::from_millis(30)),
        )
        .await
        .expect_err("no fallback by default");

    assert_eq!(
        error,
        AgentError::Timeout {
            agent: AgentKind::JobMatcher,
            timeout_ms: 30,
        }
    );
    assert_eq!(error.phase(), RequestPhase::TimedOut);
    assert!(error.is_retryable());
}

#[tokio::test]
async fn timeout_with_opt_in_serves_flagged_mock() {
    let transport = ScriptedTransport::with(AgentKind::JobMatcher, vec![Scripted::Hang]);
    let orchestrator = orchestrator(transport);

    let outcome = orchestrator
        .match_jobs(
            &candidate(),
            &[platform_job(), job("job-2", &["Python", "Airflow"])],
            FallbackPolicy::MockOnFailure,
            DispatchOptions::default().with_timeout(Duration::from_millis(30)),
        )
        .await
        .expect("mock substituted");

    assert!(outcome.is_mock);
    assert_eq!(outcome.trace.phase, RequestPhase::TimedOut);
    assert!(outcome
        .fallback_reason
        .as_deref()
        .is_some_and(|reason| reason.contains("30ms")));
    assert_eq!(outcome.report.results.len(), 2);
    assert!(outcome.report.results.iter().all(|result| result.is_mock));
}

#[tokio::test]
async fn rejected_reply_is_a_failure() {
    let rejection = AgentReply {
        status: ReplyStatus::Error,
        message: Some("model overloaded".to_string()),
        ..AgentReply::success(Value::Null)
    };
    let transport = ScriptedTransport::with(
        AgentKind::JobMatcher,
        vec![Scripted::Reply(rejection.clone()), Scripted::Reply(rejection)],
    );
    let orchestrator = orchestrator(transport);

    let failed = orchestrator
        .match_jobs(&candidate(), &[platform_job()], FallbackPolicy::Fail, DispatchOptions::default())
        .await;
    let mocked = orchestrator
        .match_jobs(
            &candidate(),
            &[platform_job()],
            FallbackPolicy::MockOnFailure,
            DispatchOptions::default(),
        )
        .await
        .expect("mock substituted");

    assert!(matches!(
        failed,
        Err(AgentError::Rejected { ref message, .. }) if message == "model overloaded"
    ));
    assert!(mocked.is_mock);
}

#[tokio::test]
async fn unusable_matcher_payload_is_malformed() {
    let transport = ScriptedTransport::with(
        AgentKind::JobMatcher,
        vec![Scripted::success(json!("no ranking today"))],
    );
    let orchestrator = orchestrator(transport);

    let error = orchestrator
        .match_jobs(&candidate(), &[platform_job()], FallbackPolicy::Fail, DispatchOptions::default())
        .await
        .expect_err("payload rejected");

    assert!(matches!(error, AgentError::Malformed { agent: AgentKind::JobMatcher, .. }));
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn answer_evaluation_never_falls_back() {
    let transport = ScriptedTransport::with(AgentKind::AnswerEvaluator, vec![Scripted::Hang]);
    let orchestrator = orchestrator(transport);
    let question = &questions(1)[0];

    let error = orchestrator
        .evaluate_answer(
            question,
            "I would shard by tenant.",
            DispatchOptions::default().with_timeout(Duration::from_millis(20)),
        )
        .await
        .expect_err("timeout propagates");

    assert!(matches!(error, AgentError::Timeout { agent: AgentKind::AnswerEvaluator, .. }));
}

#[tokio::test]
async fn answer_evaluation_decodes_lenient_payload() {
    let transport = ScriptedTransport::with(
        AgentKind::AnswerEvaluator,
        vec![Scripted::success(json!({
            "score": "7",
            "completeness": 8,
            "strengths": "concise",
        }))],
    );
    let orchestrator = orchestrator(transport);
    let question = &questions(1)[0];

    let outcome = orchestrator
        .evaluate_answer(question, "Answer", DispatchOptions::default())
        .await
        .expect("evaluated");

    assert_eq!(outcome.evaluation.score, Some(7.0));
    assert_eq!(outcome.evaluation.completeness, Some(8.0));
    assert_eq!(outcome.evaluation.relevance, None);
    assert_eq!(outcome.evaluation.strengths, vec!["concise"]);
}

#[tokio::test]
async fn cancelled_request_never_mocks() {
    let transport = ScriptedTransport::with(AgentKind::JobMatcher, vec![Scripted::Hang]);
    let orchestrator = orchestrator(transport);
    let cancel = CancellationToken::new();
    let candidate = candidate();
    let jobs = [platform_job()];
    let pending = orchestrator.match_jobs(
        &candidate,
        &jobs,
        FallbackPolicy::MockOnFailure,
        DispatchOptions::default().with_cancel(cancel.clone()),
    );
    cancel.cancel();

    let error = pending.await.expect_err("cancellation propagates");

    assert_eq!(error, AgentError::Cancelled { agent: AgentKind::JobMatcher });
    assert!(!error.allows_fallback());
    assert_eq!(orchestrator.sessions().active_sessions(), 0);
}

#[tokio::test]
async fn cancelling_one_request_leaves_others_running() {
    let transport = ScriptedTransport::with(
        AgentKind::Concierge,
        vec![
            Scripted::Hang,
            Scripted::after(Duration::from_millis(20), Scripted::success(json!("still here"))),
        ],
    );
    let orchestrator = orchestrator(transport);
    let cancel = CancellationToken::new();

    let doomed = orchestrator.concierge(
        "first",
        Value::Null,
        DispatchOptions::default().with_cancel(cancel.clone()),
    );
    let survivor = orchestrator.concierge("second", Value::Null, DispatchOptions::default());
    let trigger = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        cancel.cancel();
    };

    let (doomed, survivor, _) = tokio::join!(doomed, survivor, trigger);

    assert!(matches!(doomed, Err(AgentError::Cancelled { .. })));
    assert_eq!(survivor.expect("unaffected").result, "still here");
}

#[tokio::test]
async fn replies_within_a_session_arrive_in_issue_order() {
    let transport = ScriptedTransport::with(
        AgentKind::Concierge,
        vec![
            Scripted::after(Duration::from_millis(60), Scripted::success(json!("first"))),
            Scripted::success(json!("second")),
        ],
    );
    let orchestrator = orchestrator(transport);
    let session = SessionId::generate();
    let delivered = Mutex::new(Vec::new());

    let first = async {
        let reply = orchestrator
            .concierge("one", Value::Null, DispatchOptions::in_session(session.clone()))
            .await
            .expect("first reply");
        delivered.lock().expect("order mutex").push(reply.result);
    };
    let second = async {
        let reply = orchestrator
            .concierge("two", Value::Null, DispatchOptions::in_session(session.clone()))
            .await
            .expect("second reply");
        delivered.lock().expect("order mutex").push(reply.result);
    };
    tokio::join!(first, second);

    assert_eq!(*delivered.lock().expect("order mutex"), vec!["first", "second"]);
    assert_eq!(orchestrator.sessions().active_sessions(), 0);
}

#[tokio::test]
async fn timeout_covers_waiting_for_the_session_turn() {
    let transport = ScriptedTransport::with(
        AgentKind::Concierge,
        vec![Scripted::Hang, Scripted::success(json!("fast"))],
    );
    let orchestrator = orchestrator(transport);
    let session = SessionId::generate();

    let stalled = orchestrator.concierge(
        "one",
        Value::Null,
        DispatchOptions::in_session(session.clone()).with_timeout(Duration::from_secs(2)),
    );
    let queued = async {
        let started = tokio::time::Instant::now();
        let outcome = orchestrator
            .concierge(
                "two",
                Value::Null,
                DispatchOptions::in_session(session.clone())
                    .with_timeout(Duration::from_millis(50)),
            )
            .await;
        (outcome, started.elapsed())
    };

    tokio::select! {
        _ = stalled => panic!("the stalled request should still be pending"),
        (outcome, elapsed) = queued => {
            assert_eq!(
                outcome.expect_err("queued request gives up"),
                AgentError::Timeout { agent: AgentKind::Concierge, timeout_ms: 50 }
            );
            assert!(elapsed < Duration::from_millis(500), "waited {elapsed:?}");
        }
    }
}

#[tokio::test]
async fn separate_sessions_do_not_wait_for_each_other() {
    let transport = ScriptedTransport::with(
        AgentKind::Concierge,
        vec![
            Scripted::after(Duration::from_millis(60), Scripted::success(json!("slow"))),
            Scripted::success(json!("fast")),
        ],
    );
    let orchestrator = orchestrator(transport);
    let delivered = Mutex::new(Vec::new());

    let slow = async {
        let reply = orchestrator
            .concierge("one", Value::Null, DispatchOptions::default())
            .await
            .expect("slow reply");
        delivered.lock().expect("order mutex").push(reply.result);
    };
    let fast = async {
        let reply = orchestrator
            .concierge("two", Value::Null, DispatchOptions::default())
            .await
            .expect("fast reply");
        delivered.lock().expect("order mutex").push(reply.result);
    };
    tokio::join!(slow, fast);

    assert_eq!(*delivered.lock().expect("order mutex"), vec!["fast", "slow"]);
}

#[test]
fn dropped_tickets_release_their_lane() {
    let registry = SessionRegistry::new();
    let session = registry.resolve(None);

    let first = registry.issue(&session);
    let second = registry.issue(&session);
    assert_eq!((first.number(), second.number()), (0, 1));
    assert_eq!(registry.active_sessions(), 1);

    drop(second);
    assert_eq!(registry.active_sessions(), 1);
    drop(first);
    assert_eq!(registry.active_sessions(), 0);
}

#[tokio::test]
async fn http_transport_posts_to_agent_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/agents/concierge")
        .match_body(mockito::Matcher::PartialJson(json!({
            "agent_type": "concierge",
            "query": "hello",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "status": "success",
                "agent": "concierge",
                "result": "Hi there",
                "timestamp": "2025-03-01T09:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let transport = HttpAgentTransport::new(format!("{}/", server.url()), reqwest::Client::new());
    let orchestrator =
        AgentOrchestrator::new(Arc::new(transport), MatchingEngine::default(), Duration::from_secs(5));

    let reply = orchestrator
        .concierge("hello", json!({}), DispatchOptions::default())
        .await
        .expect("http round trip");

    mock.assert_async().await;
    assert_eq!(reply.result, "Hi there");
    assert_eq!(reply.timestamp.to_rfc3339(), "2025-03-01T09:00:00+00:00");
}

#[tokio::test]
async fn http_transport_maps_server_errors_to_dispatch_failures() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/agents/job_matcher")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;
    let transport = HttpAgentTransport::new(server.url(), reqwest::Client::new());

    let error = transport
        .dispatch(crate::workflows::hiring::agent::AgentRequest {
            query: "rank".to_string(),
            context: Value::Null,
            agent_type: AgentKind::JobMatcher,
            session_id: SessionId::generate(),
        })
        .await
        .expect_err("server error");

    assert!(matches!(
        error,
        AgentError::Dispatch { agent: AgentKind::JobMatcher, ref message } if message.contains("500")
    ));
}

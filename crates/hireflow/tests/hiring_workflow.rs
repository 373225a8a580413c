//! End-to-end hiring scenarios driven through the public router and service facade.
//!
//! The agent transport is replaced by a canned in-process fake so the scenarios
//! stay deterministic and never leave the test process.

mod common {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::http::{header, Request};
    use axum::response::Response;
    use serde_json::{json, Value};

    use hireflow::workflows::hiring::{
        AgentError, AgentKind, AgentReply, AgentRequest, AgentTransport, Candidate,
        HiringService, HiringSettings, InMemoryHiringRepository, Job,
    };

    pub(super) fn candidate() -> Candidate {
        serde_json::from_value(json!({
            "id": "cand-42",
            "user_id": "user-42",
            "display_name": "Sam Rivera",
            "experience_years": 6,
            "expected_salary": 140000,
            "skills": [
                {"name": "Rust", "proficiency": "expert"},
                {"name": "PostgreSQL", "proficiency": "advanced"},
                {"name": "Terraform", "proficiency": "intermediate"}
            ],
            "work_preferences": ["remote", "ownership"]
        }))
        .expect("candidate fixture")
    }

    pub(super) fn job(id: &str, skills: &[&str], status: &str) -> Job {
        serde_json::from_value(json!({
            "id": id,
            "recruiter_id": "rec-7",
            "title": format!("Backend Engineer {id}"),
            "employment_type": "full_time",
            "experience_level": "senior",
            "salary_min": 120000,
            "salary_max": 150000,
            "description": "Own the payments platform.",
            "company_culture": "Remote team that values ownership",
            "skills_required": skills,
            "status": status,
            "posted_at": "2025-02-10T08:00:00Z"
        }))
        .expect("job fixture")
    }

    /// Answers every agent with a fixed payload and records what it was asked.
    #[derive(Default)]
    pub(super) struct CannedTransport {
        pub(super) requests: Mutex<Vec<AgentRequest>>,
    }

    #[async_trait]
    impl AgentTransport for CannedTransport {
        async fn dispatch(&self, request: AgentRequest) -> Result<AgentReply, AgentError> {
            let agent = request.agent_type;
            self.requests.lock().expect("lock").push(request);
            let result = match agent {
                AgentKind::JobMatcher => json!({
                    "summary": "Strong backend fit",
                    "recommended_jobs": [
                        {"job_id": "job-pay", "experience_match_score": 95, "salary_match_score": 100, "culture_fit_score": 90}
                    ]
                }),
                AgentKind::AnswerEvaluator => json!({
                    "score": 8,
                    "completeness": 8,
                    "specificity": 7,
                    "relevance": 9,
                    "communication": 8,
                    "strengths": ["concrete examples"],
                    "improvements": []
                }),
                AgentKind::Concierge => Value::String("Happy to help.".to_string()),
            };
            Ok(AgentReply::success(result))
        }
    }

    pub(super) type Service = HiringService<InMemoryHiringRepository, CannedTransport>;

    pub(super) fn service() -> (Arc<Service>, Arc<CannedTransport>) {
        let repository = InMemoryHiringRepository::new();
        repository.save_candidate(candidate()).expect("seed candidate");
        repository
            .save_job(job("job-pay", &["Rust", "PostgreSQL", "Kafka"], "published"))
            .expect("seed job");
        repository
            .save_job(job("job-web", &["TypeScript"], "active"))
            .expect("seed job");
        let transport = Arc::new(CannedTransport::default());
        let service = HiringService::new(
            Arc::new(repository),
            transport.clone(),
            HiringSettings::default(),
        );
        (Arc::new(service), transport)
    }

    pub(super) fn candidate_call(method: &str, uri: &str, body: Value) -> Request<axum::body::Body> {
        call(method, uri, body, &[("x-actor-role", "candidate"), ("x-actor-id", "cand-42")])
    }

    pub(super) fn recruiter_call(method: &str, uri: &str, body: Value) -> Request<axum::body::Body> {
        call(
            method,
            uri,
            body,
            &[
                ("x-actor-role", "recruiter"),
                ("x-actor-id", "rec-7"),
                ("x-actor-owns", "job-pay,job-web"),
            ],
        )
    }

    fn call(method: &str, uri: &str, body: Value, headers: &[(&str, &str)]) -> Request<axum::body::Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = if body.is_null() {
            axum::body::Body::empty()
        } else {
            axum::body::Body::from(serde_json::to_vec(&body).expect("serialize body"))
        };
        builder.body(body).expect("request")
    }

    pub(super) async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 256 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }
}

use axum::http::StatusCode;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use hireflow::workflows::hiring::{
    hiring_router, Actor, AgentKind, ConciergeRequest, MatchingEngine, RecommendationLevel,
};

#[tokio::test]
async fn application_moves_from_submission_to_acceptance() {
    let (service, transport) = service();
    let router = hiring_router(service);

    let response = router
        .clone()
        .oneshot(candidate_call("POST", "/applications", json!({"job_id": "job-pay"})))
        .await
        .expect("apply");
    assert_eq!(response.status(), StatusCode::CREATED);
    let application = json_body(response).await;
    let application_id = application["id"].as_str().expect("id").to_string();
    let application_uri = format!("/applications/{application_id}");

    let response = router
        .clone()
        .oneshot(recruiter_call(
            "PATCH",
            &application_uri,
            json!({
                "status": "interview",
                "interview": {
                    "interview_type": "technical",
                    "scheduled_date": "2025-03-03T16:00:00Z",
                    "duration_minutes": 45,
                    "interviewers": ["rec-7"]
                }
            }),
        ))
        .await
        .expect("move to interview");
    assert_eq!(response.status(), StatusCode::OK);
    let change = json_body(response).await;
    assert_eq!(change["previous_status"], "submitted");
    assert_eq!(change["application"]["status"], "interview");
    let interview_id = change["interview"]["id"].as_str().expect("round one").to_string();
    let interview_uri = format!("/interviews/{interview_id}");

    let response = router
        .clone()
        .oneshot(candidate_call(
            "POST",
            &format!("{interview_uri}/submit_answers"),
            json!({
                "questions": [
                    {"text": "Design an idempotent payment API"},
                    {"text": "How do you roll out schema changes?"},
                    {"text": "Anything to add?"}
                ],
                "answers": {"0": "Idempotency keys stored with the ledger entry.", "1": "Expand, migrate, contract."}
            }),
        ))
        .await
        .expect("submit answers");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(recruiter_call("POST", &format!("{interview_uri}/evaluate"), json!({})))
        .await
        .expect("evaluate");
    assert_eq!(response.status(), StatusCode::OK);
    let evaluated = json_body(response).await;
    let report = &evaluated["evaluation_report"];
    assert_eq!(report["answered_questions"], 2);
    assert_eq!(report["ai_overall_score"], 8.0);
    assert_eq!(report["signal"], "strong_pass");
    assert_eq!(report["score_source"], "ai_advisory");

    let response = router
        .clone()
        .oneshot(recruiter_call(
            "POST",
            &format!("{interview_uri}/submit_feedback"),
            json!({
                "scores": {"technical": 9, "communication": 8, "cultural_fit": 9, "overall": 9},
                "feedback": "Clear thinker",
                "result": "passed"
            }),
        ))
        .await
        .expect("feedback");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(recruiter_call("GET", &format!("{application_uri}/recommendation"), Value::Null))
        .await
        .expect("recommendation");
    let recommendation = json_body(response).await;
    assert_eq!(recommendation["overall_score"], 9.0);
    assert_eq!(recommendation["basis"], "recruiter");
    assert_eq!(recommendation["signal"], "strong_pass");

    for status in ["offer", "accepted"] {
        let response = router
            .clone()
            .oneshot(recruiter_call("PATCH", &application_uri, json!({ "status": status })))
            .await
            .expect("status change");
        assert_eq!(response.status(), StatusCode::OK, "moving to {status}");
    }

    let response = router
        .clone()
        .oneshot(candidate_call("PATCH", &application_uri, json!({"status": "withdrawn"})))
        .await
        .expect("withdraw after acceptance");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["from"], "accepted");

    let evaluator_calls = transport
        .requests
        .lock()
        .expect("lock")
        .iter()
        .filter(|request| request.agent_type == AgentKind::AnswerEvaluator)
        .count();
    assert_eq!(evaluator_calls, 2);
}

#[tokio::test]
async fn job_matcher_ranks_listed_jobs() {
    let (service, _) = service();
    let router = hiring_router(service);

    let response = router
        .oneshot(candidate_call(
            "POST",
            "/agents/job_matcher",
            json!({"candidate_id": "cand-42"}),
        ))
        .await
        .expect("match");

    assert_eq!(response.status(), StatusCode::OK);
    let outcome = json_body(response).await;
    assert_eq!(outcome["is_mock"], false);
    assert_eq!(outcome["summary"], "Strong backend fit");
    let results = outcome["report"]["results"].as_array().expect("results");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["job_id"], "job-pay");
    assert_eq!(results[0]["matched_skills"], json!(["Rust", "PostgreSQL"]));
    assert_eq!(results[0]["missing_skills"], json!(["Kafka"]));
    assert_eq!(results[1]["job_id"], "job-web");
}

#[test]
fn offline_ranking_uses_only_local_signals() {
    let engine = MatchingEngine::default();
    let jobs = vec![
        job("job-pay", &["Rust", "PostgreSQL"], "published"),
        job("job-web", &["TypeScript", "React"], "published"),
        job("job-old", &["Rust"], "filled"),
    ];

    let report = engine.rank(&candidate(), &jobs, &Default::default());

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.excluded.len(), 1);
    let best = report.best().expect("ranked");
    assert_eq!(best.job_id.0, "job-pay");
    assert_eq!(best.skill_match_score, 100.0);
    assert_eq!(best.recommendation_level, RecommendationLevel::HighlyRecommended);
    assert!(!best.is_mock);
}

#[tokio::test]
async fn concierge_answers_in_plain_text() {
    let (service, _) = service();

    let reply = service
        .concierge(
            &Actor::candidate(&candidate().id),
            ConciergeRequest {
                query: "What should I improve?".to_string(),
                context: Value::Null,
                session_id: None,
            },
        )
        .await
        .expect("concierge reply");

    assert_eq!(reply.result, "Happy to help.");
}

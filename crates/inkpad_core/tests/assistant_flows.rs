use async_trait::async_trait;
use inkpad_core::db::open_db_in_memory;
use inkpad_core::model::label::DEFAULT_LABEL_COLOR;
use inkpad_core::{
    ApiRequest, ApiResponse, AssistantConfig, AssistantRoutes, AssistantService, Completion,
    CompletionError, CompletionProvider, FlowConfig, ManualClock, NoteId, NoteRepository,
    RateLimiter, RequestHandler, RetryingCompletion, Sleeper, SqliteLabelRepository,
    SqliteNoteRepository,
};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const OWNER: &str = "owner-1";
const LONG_BODY: &str = "Plan the next sprint, review the metrics dashboard and book the retro room.";

#[derive(Clone, Default)]
struct FakeProvider {
    replies: Arc<Mutex<VecDeque<Result<Completion, CompletionError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeProvider {
    fn scripted(replies: Vec<Result<&str, &str>>) -> Self {
        let replies = replies
            .into_iter()
            .map(|reply| {
                reply
                    .map(Completion::new)
                    .map_err(CompletionError::transient)
            })
            .collect();
        Self {
            replies: Arc::new(Mutex::new(replies)),
            prompts: Arc::default(),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    fn model(&self) -> &str {
        "fake-model"
    }

    async fn generate(&self, prompt: &str) -> Result<Completion, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::transient("no scripted reply")))
    }
}

#[derive(Clone, Default)]
struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.waits.lock().unwrap().push(delay);
    }
}

type Routes = AssistantRoutes<FakeProvider, RecordingSleeper, Arc<ManualClock>>;

struct Harness {
    conn: Arc<Mutex<Connection>>,
    provider: FakeProvider,
    sleeper: RecordingSleeper,
    routes: Routes,
}

impl Harness {
    fn new(replies: Vec<Result<&str, &str>>) -> Self {
        Self::with_config(replies, AssistantConfig::default())
    }

    fn with_config(replies: Vec<Result<&str, &str>>, config: AssistantConfig) -> Self {
        let conn = Arc::new(Mutex::new(open_db_in_memory().unwrap()));
        let provider = FakeProvider::scripted(replies);
        let sleeper = RecordingSleeper::default();
        let completion = RetryingCompletion::with_sleeper(provider.clone(), sleeper.clone());
        let service = Arc::new(AssistantService::new(Arc::clone(&conn), completion, config));
        let limiter = Arc::new(RateLimiter::with_clock(Arc::new(ManualClock::new(0))));
        Self {
            conn,
            provider,
            sleeper,
            routes: AssistantRoutes::new(service, limiter),
        }
    }

    fn seed_note(&self, owner_id: &str, title: &str, content: Option<&str>) -> NoteId {
        let conn = self.conn.lock().unwrap();
        SqliteNoteRepository::try_new(&conn)
            .unwrap()
            .create_note(owner_id, title, content)
            .unwrap()
            .id
    }

    fn summary_of(&self, note_id: NoteId) -> Option<String> {
        let conn = self.conn.lock().unwrap();
        SqliteNoteRepository::try_new(&conn)
            .unwrap()
            .find_note(note_id, OWNER)
            .unwrap()
            .unwrap()
            .summary
    }

    fn label_counts(&self, note_id: NoteId) -> (usize, usize) {
        let conn = self.conn.lock().unwrap();
        let repo = SqliteLabelRepository::try_new(&conn).unwrap();
        (
            repo.count_labels(OWNER).unwrap(),
            repo.count_associations(note_id).unwrap(),
        )
    }
}

fn authed(body: Value) -> ApiRequest {
    ApiRequest::new(body)
        .with_principal(OWNER)
        .with_header("x-forwarded-for", "203.0.113.5")
}

fn tag_names(response: &ApiResponse) -> Vec<String> {
    response.body["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tag| tag["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn tags_flow_links_decoded_labels_idempotently() {
    let harness = Harness::new(vec![
        Ok(r#"["planning", "work", "planning"]"#),
        Ok("```json\n[\"Planning\", \"review\"]\n```"),
    ]);
    let note_id = harness.seed_note(OWNER, "Sprint", Some(LONG_BODY));

    let first = harness
        .routes
        .tags
        .handle(authed(json!({ "noteId": note_id })))
        .await;
    assert_eq!(first.status, 200);
    assert_eq!(tag_names(&first), vec!["planning", "work"]);
    assert_eq!(first.body["tags"][0]["color"], DEFAULT_LABEL_COLOR);
    assert!(first.body["tags"][0].get("ownerId").is_none());
    assert_eq!(harness.label_counts(note_id), (2, 2));

    let second = harness
        .routes
        .tags
        .handle(authed(json!({ "noteId": note_id })))
        .await;
    assert_eq!(second.status, 200);
    assert_eq!(tag_names(&second), vec!["planning", "review"]);
    assert_eq!(harness.label_counts(note_id), (3, 3));

    let prompt = &harness.provider.prompts()[0];
    assert!(prompt.contains("JSON array"));
    assert!(prompt.contains("Sprint\n\nPlan the next sprint"));
}

#[tokio::test]
async fn tags_flow_rejects_short_notes_before_calling_provider() {
    let harness = Harness::new(vec![Ok(r#"["unused"]"#)]);
    let note_id = harness.seed_note(OWNER, "Hi", Some("short"));

    let response = harness
        .routes
        .tags
        .handle(authed(json!({ "noteId": note_id })))
        .await;

    assert_eq!(response.status, 400);
    assert!(harness.provider.prompts().is_empty());
}

#[tokio::test]
async fn tags_flow_hides_other_owners_notes() {
    let harness = Harness::new(vec![]);
    let foreign = harness.seed_note("owner-2", "Sprint", Some(LONG_BODY));

    let response = harness
        .routes
        .tags
        .handle(authed(json!({ "noteId": foreign })))
        .await;

    assert_eq!(response.status, 404);
    assert_eq!(response.error_message(), Some("Note not found"));
}

#[tokio::test]
async fn undecodable_completion_is_a_server_error() {
    let harness = Harness::new(vec![Ok("{}")]);
    let note_id = harness.seed_note(OWNER, "Sprint", Some(LONG_BODY));

    let response = harness
        .routes
        .tags
        .handle(authed(json!({ "noteId": note_id })))
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(response.error_message(), Some("Could not generate tags"));
    assert_eq!(harness.label_counts(note_id), (0, 0));
}

#[tokio::test]
async fn transient_failures_are_retried_with_linear_backoff() {
    let harness = Harness::new(vec![Err("overloaded"), Err("overloaded"), Ok("alpha, beta")]);
    let note_id = harness.seed_note(OWNER, "Sprint", Some(LONG_BODY));

    let response = harness
        .routes
        .tags
        .handle(authed(json!({ "noteId": note_id })))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(tag_names(&response), vec!["alpha", "beta"]);
    assert_eq!(harness.provider.prompts().len(), 3);
    assert_eq!(
        *harness.sleeper.waits.lock().unwrap(),
        vec![Duration::from_millis(1_000), Duration::from_millis(2_000)]
    );
}

#[tokio::test]
async fn exhausted_retries_surface_as_server_error() {
    let harness = Harness::new(vec![Err("down"), Err("down"), Err("still down")]);
    let note_id = harness.seed_note(OWNER, "Sprint", Some(LONG_BODY));

    let response = harness
        .routes
        .tags
        .handle(authed(json!({ "noteId": note_id })))
        .await;

    assert_eq!(response.status, 500);
    assert!(response.error_message().unwrap().contains("still down"));
    assert_eq!(harness.provider.prompts().len(), 3);
}

#[tokio::test]
async fn throttled_tags_calls_never_reach_the_provider() {
    let config = AssistantConfig {
        tags: FlowConfig::new("ai:tags", 1, 5_000),
        ..AssistantConfig::default()
    };
    let harness = Harness::with_config(vec![Ok(r#"["alpha"]"#), Ok(r#"["beta"]"#)], config);
    let note_id = harness.seed_note(OWNER, "Sprint", Some(LONG_BODY));

    let first = harness
        .routes
        .tags
        .handle(authed(json!({ "noteId": note_id })))
        .await;
    let second = harness
        .routes
        .tags
        .handle(authed(json!({ "noteId": note_id })))
        .await;

    assert_eq!(first.status, 200);
    assert_eq!(second.status, 429);
    assert_eq!(harness.provider.prompts().len(), 1);

    // Another scope on the same limiter keeps its own budget.
    let ping = harness.routes.ping.handle(authed(json!({}))).await;
    assert_eq!(ping.status, 200);
}

#[tokio::test]
async fn unauthenticated_and_malformed_requests_are_rejected() {
    let harness = Harness::new(vec![]);

    let anonymous = harness
        .routes
        .summarize
        .handle(ApiRequest::new(json!({ "noteId": NoteId::new_v4() })))
        .await;
    assert_eq!(anonymous.status, 401);

    let malformed = harness
        .routes
        .tags
        .handle(authed(json!({ "noteId": 42 })))
        .await;
    assert_eq!(malformed.status, 400);
    assert!(harness.provider.prompts().is_empty());
}

#[tokio::test]
async fn summarize_flow_persists_summary() {
    let harness = Harness::new(vec![Ok("- plan sprint\n- review metrics")]);
    let note_id = harness.seed_note(OWNER, "Sprint", Some(LONG_BODY));

    let response = harness
        .routes
        .summarize
        .handle(authed(json!({ "noteId": note_id })))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["summary"], "- plan sprint\n- review metrics");
    assert_eq!(response.body["wasTruncated"], false);
    assert_eq!(response.body["originalLength"], LONG_BODY.chars().count());
    assert_eq!(response.body["processedLength"], LONG_BODY.chars().count());
    assert_eq!(
        harness.summary_of(note_id).as_deref(),
        Some("- plan sprint\n- review metrics")
    );
}

#[tokio::test]
async fn summarize_flow_flags_truncated_input() {
    let config = AssistantConfig {
        summarize: FlowConfig::new("ai:summarize", 10, 40),
        ..AssistantConfig::default()
    };
    let harness = Harness::with_config(vec![Ok("short summary")], config);
    let note_id = harness.seed_note(OWNER, "Sprint", Some(LONG_BODY));

    let response = harness
        .routes
        .summarize
        .handle(authed(json!({ "noteId": note_id })))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["wasTruncated"], true);
    assert!(response.body["processedLength"].as_u64().unwrap() <= 40);
    assert!(harness.provider.prompts()[0].contains("beginning of a longer document"));
}

#[tokio::test]
async fn summarize_flow_rejects_empty_content() {
    let harness = Harness::new(vec![]);
    let note_id = harness.seed_note(OWNER, "Only a title", Some("   "));

    let response = harness
        .routes
        .summarize
        .handle(authed(json!({ "noteId": note_id })))
        .await;

    assert_eq!(response.status, 400);
    assert_eq!(harness.summary_of(note_id), None);
}

#[tokio::test]
async fn chat_flow_grounds_answers_in_the_note() {
    let harness = Harness::new(vec![Ok("Book the room first."), Ok("Hello!")]);
    let note_id = harness.seed_note(OWNER, "Sprint", Some(LONG_BODY));

    let grounded = harness
        .routes
        .chat
        .handle(authed(json!({ "message": " What first? ", "noteId": note_id })))
        .await;
    assert_eq!(grounded.status, 200);
    assert_eq!(grounded.body["answer"], "Book the room first.");
    assert_eq!(grounded.body["noteId"], json!(note_id));
    assert!(grounded.body["timestamp"].as_str().unwrap().ends_with('Z'));

    let general = harness
        .routes
        .chat
        .handle(authed(json!({ "message": "hi" })))
        .await;
    assert_eq!(general.status, 200);
    assert_eq!(general.body["noteId"], Value::Null);

    let prompts = harness.provider.prompts();
    assert!(prompts[0].contains("Note Title: Sprint"));
    assert!(prompts[0].contains("User Question: What first?"));
    assert!(prompts[1].starts_with("You are a helpful assistant for a note-taking app."));
}

#[tokio::test]
async fn chat_with_unresolved_note_sends_the_bare_question() {
    let harness = Harness::new(vec![Ok("first"), Ok("second")]);
    let foreign = harness.seed_note("owner-2", "Secret", Some(LONG_BODY));

    for note_id in [NoteId::new_v4(), foreign] {
        let response = harness
            .routes
            .chat
            .handle(authed(json!({ "message": "hi", "noteId": note_id })))
            .await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["noteId"], json!(note_id));
    }

    for prompt in harness.provider.prompts() {
        assert!(prompt.starts_with("User Question: hi"), "prompt {prompt:?}");
        assert!(!prompt.contains("Secret"));
    }
}

#[tokio::test]
async fn chat_flow_requires_a_message() {
    let harness = Harness::new(vec![]);

    let response = harness
        .routes
        .chat
        .handle(authed(json!({ "message": "   " })))
        .await;

    assert_eq!(response.status, 400);
    assert_eq!(response.error_message(), Some("Message is required"));
}

#[tokio::test]
async fn ping_reports_model_and_never_retries() {
    let healthy = Harness::new(vec![Ok("pong")]);
    let response = healthy.routes.ping.handle(ApiRequest::new(json!({}))).await;
    assert_eq!(response.status, 200);
    assert_eq!(
        response.body,
        json!({ "ok": true, "model": "fake-model", "reply": "pong" })
    );

    let failing = Harness::new(vec![Err("unreachable"), Ok("pong")]);
    let response = failing.routes.ping.handle(ApiRequest::new(json!({}))).await;
    assert_eq!(response.status, 500);
    assert_eq!(response.body["ok"], false);
    assert_eq!(response.body["error"], "unreachable");
    assert_eq!(failing.provider.prompts().len(), 1);
    assert!(failing.sleeper.waits.lock().unwrap().is_empty());
}

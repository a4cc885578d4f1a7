//! Resume-match chat.
//!
//! One request may be in flight per session. Sending a new message cancels
//! the previous request and finishes any reply still being typed out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::models::first_str;
use crate::resume_match::typewriter::{Typewriter, TypewriterState};

/// Messages forwarded to the service as conversation history.
pub const HISTORY_WINDOW: usize = 6;

pub const FALLBACK_REPLY: &str =
    "I apologize, but I encountered an issue processing your question.";
pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// One live chat. Locked on its own so slow work on one chat never blocks the rest.
pub type SharedChat = Arc<Mutex<ChatSession>>;

/// Live chat sessions, keyed by `"{user_id}:{context_id}"`.
///
/// The outer lock only guards lookups and inserts and is never held across I/O.
pub type ChatRegistry = Arc<Mutex<HashMap<String, SharedChat>>>;

pub fn session_key(user_id: &str, context_id: &str) -> String {
    format!("{user_id}:{context_id}")
}

pub async fn lookup_chat(registry: &ChatRegistry, key: &str) -> Option<SharedChat> {
    registry.lock().await.get(key).cloned()
}

/// Registers a restored chat unless another request restored it first.
pub async fn register_chat(registry: &ChatRegistry, session: ChatSession) -> SharedChat {
    let mut chats = registry.lock().await;
    chats
        .entry(session.id.clone())
        .or_insert_with(|| Arc::new(Mutex::new(session)))
        .clone()
}

/// Installs a fresh chat, returning the one it replaced.
pub async fn replace_chat(registry: &ChatRegistry, session: ChatSession) -> Option<SharedChat> {
    let key = session.id.clone();
    registry
        .lock()
        .await
        .insert(key, Arc::new(Mutex::new(session)))
}

pub async fn remove_chat(registry: &ChatRegistry, key: &str) -> Option<SharedChat> {
    registry.lock().await.remove(key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Job context sent with every question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisContext {
    pub job_title: String,
    pub overall_score: Option<f64>,
    pub missing_skills: Vec<String>,
}

#[derive(Debug)]
pub struct ChatSession {
    id: String,
    messages: Vec<ChatMessage>,
    context: AnalysisContext,
    /// Reveal state of the last assistant message.
    typewriter: Option<Typewriter>,
    last_sync: Instant,
    next_request: u64,
    in_flight: Option<ChatRequest>,
}

/// Handle on one outstanding question.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub id: u64,
    pub token: CancellationToken,
}

impl ChatSession {
    pub fn new(id: impl Into<String>, context: AnalysisContext) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            context,
            typewriter: None,
            last_sync: Instant::now(),
            next_request: 0,
            in_flight: None,
        }
    }

    /// Rebuilds a session from persisted history. Nothing is typed out again.
    pub fn restore(id: impl Into<String>, context: AnalysisContext, messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::new(id, context)
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_typing(&self) -> bool {
        self.typewriter.as_ref().is_some_and(|tw| !tw.is_complete())
    }

    pub fn is_busy(&self) -> bool {
        self.is_loading() || self.is_typing()
    }

    /// Adds an assistant message that is typed out.
    pub fn push_assistant(&mut self, content: &str) {
        self.messages.push(ChatMessage::new(Role::Assistant, content));
        self.typewriter = Some(Typewriter::new(content));
        self.last_sync = Instant::now();
    }

    /// Starts a new exchange. Any request still in flight is cancelled and a
    /// reply still typing is completed.
    pub fn begin_request(&mut self, question: &str) -> ChatRequest {
        self.stop();
        if let Some(tw) = self.typewriter.as_mut() {
            tw.skip();
        }
        self.messages.push(ChatMessage::new(Role::User, question));

        self.next_request += 1;
        let request = ChatRequest {
            id: self.next_request,
            token: CancellationToken::new(),
        };
        self.in_flight = Some(request.clone());
        request
    }

    /// Cancels the in-flight request. Returns whether there was one.
    pub fn stop(&mut self) -> bool {
        match self.in_flight.take() {
            Some(request) => {
                request.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Records the reply for `request`. Replies to cancelled or superseded
    /// requests are dropped.
    pub fn finish_request(&mut self, request: &ChatRequest, reply: &str) -> bool {
        if !self.is_current(request) {
            return false;
        }
        self.in_flight = None;
        self.push_assistant(reply);
        true
    }

    /// Ends `request` with the generic error reply.
    pub fn fail_request(&mut self, request: &ChatRequest) -> bool {
        self.finish_request(request, ERROR_REPLY)
    }

    fn is_current(&self, request: &ChatRequest) -> bool {
        !request.token.is_cancelled()
            && self
                .in_flight
                .as_ref()
                .is_some_and(|current| current.id == request.id)
    }

    /// Body for `/api/resume-rag-python`.
    pub fn request_body(&self, question: &str) -> Value {
        // The question itself is the last message; history stops before it.
        let prior = &self.messages[..self.messages.len().saturating_sub(1)];
        let start = prior.len().saturating_sub(HISTORY_WINDOW);
        let history: Vec<Value> = prior[start..]
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        json!({
            "action": "chat",
            "question": question,
            "sessionId": self.id,
            "conversationHistory": history,
            "analysisContext": self.context,
        })
    }

    /// Catches the typewriter up with wall-clock time.
    pub fn sync(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_sync);
        self.last_sync = now;
        if let Some(tw) = self.typewriter.as_mut() {
            tw.advance(elapsed);
        }
    }

    pub fn pause(&mut self) {
        if let Some(tw) = self.typewriter.as_mut() {
            tw.pause();
        }
    }

    pub fn resume(&mut self) {
        self.last_sync = Instant::now();
        if let Some(tw) = self.typewriter.as_mut() {
            tw.resume();
        }
    }

    pub fn skip(&mut self) {
        if let Some(tw) = self.typewriter.as_mut() {
            tw.skip();
        }
    }

    pub fn view(&self) -> ChatSessionView {
        ChatSessionView {
            session_id: self.id.clone(),
            messages: self.messages.clone(),
            typing: self.typewriter.as_ref().map(Typewriter::state),
            loading: self.is_loading(),
            busy: self.is_busy(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionView {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    /// Reveal state of the last assistant message.
    pub typing: Option<TypewriterState>,
    pub loading: bool,
    pub busy: bool,
}

/// Pulls the reply text out of a chat response.
pub fn chat_reply(response: &Value) -> String {
    first_str(
        response,
        &["data.response", "data.answer", "response", "answer", "message"],
    )
    .unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn session() -> ChatSession {
        ChatSession::new(
            "user-1:job-1",
            AnalysisContext {
                job_title: "Backend Engineer".into(),
                overall_score: Some(72.0),
                missing_skills: vec!["Kubernetes".into()],
            },
        )
    }

    #[test]
    fn test_reply_is_typed_out() {
        let mut chat = session();
        let request = chat.begin_request("What should I learn first?");
        assert!(chat.is_loading());

        assert!(chat.finish_request(&request, "Start with Kubernetes."));
        assert!(!chat.is_loading());
        assert!(chat.is_typing());
        assert!(chat.is_busy());

        chat.sync(Instant::now() + Duration::from_secs(5));
        assert!(!chat.is_busy());
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[1].role, Role::Assistant);
    }

    #[test]
    fn test_new_question_supersedes_in_flight_request() {
        let mut chat = session();
        let first = chat.begin_request("first");
        let second = chat.begin_request("second");

        assert!(first.token.is_cancelled());
        assert!(!chat.finish_request(&first, "stale answer"));
        assert!(chat.finish_request(&second, "fresh answer"));

        let contents: Vec<&str> = chat.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "fresh answer"]);
    }

    #[test]
    fn test_new_question_finishes_typing() {
        let mut chat = session();
        chat.push_assistant("A long welcome message that is still being revealed.");
        assert!(chat.is_typing());

        chat.begin_request("next");
        assert!(!chat.is_typing());
        assert_eq!(
            chat.view().typing.map(|t| t.complete),
            Some(true)
        );
    }

    #[test]
    fn test_stop_cancels_and_drops_reply() {
        let mut chat = session();
        let request = chat.begin_request("question");
        assert!(chat.stop());
        assert!(!chat.stop());
        assert!(!chat.finish_request(&request, "late"));
        assert_eq!(chat.messages().len(), 1);
    }

    #[test]
    fn test_request_body_carries_last_six_prior_messages() {
        let mut chat = session();
        for i in 0..5 {
            let request = chat.begin_request(&format!("q{i}"));
            chat.finish_request(&request, &format!("a{i}"));
        }
        chat.begin_request("latest");

        let body = chat.request_body("latest");
        assert_eq!(body["action"], "chat");
        assert_eq!(body["sessionId"], "user-1:job-1");
        assert_eq!(body["analysisContext"]["jobTitle"], "Backend Engineer");

        let history = body["conversationHistory"].as_array().unwrap();
        assert_eq!(history.len(), HISTORY_WINDOW);
        assert_eq!(history[0], json!({ "role": "user", "content": "q2" }));
        assert_eq!(history[5], json!({ "role": "assistant", "content": "a4" }));
    }

    #[test]
    fn test_chat_reply_shapes() {
        assert_eq!(chat_reply(&json!({ "data": { "response": "hi" } })), "hi");
        assert_eq!(chat_reply(&json!({ "answer": "yo" })), "yo");
        assert_eq!(chat_reply(&json!({ "data": {} })), FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_registry_stays_free_while_a_chat_is_locked() {
        let registry: ChatRegistry = Arc::new(Mutex::new(HashMap::new()));
        let busy = register_chat(&registry, session()).await;
        let _guard = busy.lock().await;

        assert!(registry.try_lock().is_ok());
        let other = ChatSession::new("user-2:job-1", AnalysisContext::default());
        let other = register_chat(&registry, other).await;
        assert!(other.try_lock().is_ok());
        assert!(lookup_chat(&registry, "user-1:job-1").await.is_some());
    }

    #[tokio::test]
    async fn test_restore_race_keeps_first_registration() {
        let registry: ChatRegistry = Arc::new(Mutex::new(HashMap::new()));
        let first = register_chat(&registry, session()).await;
        first.lock().await.push_assistant("Welcome back");

        let second = register_chat(&registry, session()).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().await.messages().len(), 1);

        let replaced = replace_chat(&registry, session()).await;
        assert!(replaced.is_some_and(|old| Arc::ptr_eq(&old, &first)));
        assert!(remove_chat(&registry, "user-1:job-1").await.is_some());
        assert!(lookup_chat(&registry, "user-1:job-1").await.is_none());
    }
}

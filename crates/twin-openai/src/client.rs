//! Hosted assistants API client implementation.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::types::ChatCompletion;
use crate::{
    Assistant, ChatMessage, CreateAssistantRequest, FileObject, ListResponse, Message,
    OpenAiError, Run, SortOrder, Thread, ToolOutput,
};

/// Base URL of the public API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Beta header value selecting the assistants wire format.
const ASSISTANTS_BETA: &str = "assistants=v1";

/// Page size used when listing thread messages.
const MESSAGE_PAGE_LIMIT: u32 = 100;

/// Client for the hosted assistants API.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Create a new client against the public API.
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[cfg(test)]
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
    }

    /// Request against an assistants endpoint, which needs the beta header.
    fn beta(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path)
            .header("OpenAI-Beta", ASSISTANTS_BETA)
    }

    // =========================================================================
    // Assistants and files
    // =========================================================================

    /// Retrieve an existing assistant.
    pub async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, OpenAiError> {
        let response = self
            .beta(Method::GET, &format!("/assistants/{}", assistant_id))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Create a new assistant.
    pub async fn create_assistant(
        &self,
        request: &CreateAssistantRequest,
    ) -> Result<Assistant, OpenAiError> {
        let response = self
            .beta(Method::POST, "/assistants")
            .json(request)
            .send()
            .await?;
        let assistant: Assistant = Self::handle_response(response).await?;
        debug!(assistant_id = %assistant.id, model = %assistant.model, "created assistant");
        Ok(assistant)
    }

    /// Upload a local file for use by assistants.
    pub async fn upload_file(&self, path: &Path) -> Result<FileObject, OpenAiError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let form = Form::new()
            .text("purpose", "assistants")
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .request(Method::POST, "/files")
            .multipart(form)
            .send()
            .await?;
        let file: FileObject = Self::handle_response(response).await?;
        debug!(file_id = %file.id, path = %path.display(), "uploaded file");
        Ok(file)
    }

    // =========================================================================
    // Threads and messages
    // =========================================================================

    /// Create an empty thread.
    pub async fn create_thread(&self) -> Result<Thread, OpenAiError> {
        let response = self
            .beta(Method::POST, "/threads")
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Retrieve an existing thread.
    pub async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, OpenAiError> {
        let response = self
            .beta(Method::GET, &format!("/threads/{}", thread_id))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Append a user message to a thread.
    pub async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<Message, OpenAiError> {
        #[derive(Serialize)]
        struct CreateMessageRequest<'a> {
            role: &'a str,
            content: &'a str,
        }

        let response = self
            .beta(Method::POST, &format!("/threads/{}/messages", thread_id))
            .json(&CreateMessageRequest {
                role: "user",
                content,
            })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// List a thread's messages (first page, up to 100) in the given order.
    pub async fn list_messages(
        &self,
        thread_id: &str,
        order: SortOrder,
    ) -> Result<Vec<Message>, OpenAiError> {
        let response = self
            .beta(Method::GET, &format!("/threads/{}/messages", thread_id))
            .query(&[
                ("order", order.as_str().to_string()),
                ("limit", MESSAGE_PAGE_LIMIT.to_string()),
            ])
            .send()
            .await?;
        let page: ListResponse<Message> = Self::handle_response(response).await?;
        if page.has_more {
            debug!(thread_id, "thread has more messages than one page");
        }
        Ok(page.data)
    }

    // =========================================================================
    // Runs
    // =========================================================================

    /// Start a run of an assistant against a thread.
    pub async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, OpenAiError> {
        #[derive(Serialize)]
        struct CreateRunRequest<'a> {
            assistant_id: &'a str,
        }

        let response = self
            .beta(Method::POST, &format!("/threads/{}/runs", thread_id))
            .json(&CreateRunRequest { assistant_id })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Fetch the current state of a run.
    pub async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, OpenAiError> {
        let response = self
            .beta(Method::GET, &format!("/threads/{}/runs/{}", thread_id, run_id))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Ask the service to stop a run that is still queued or in progress.
    pub async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, OpenAiError> {
        let response = self
            .beta(
                Method::POST,
                &format!("/threads/{}/runs/{}/cancel", thread_id, run_id),
            )
            .send()
            .await?;
        let run: Run = Self::handle_response(response).await?;
        debug!(run_id, status = %run.status, "requested run cancellation");
        Ok(run)
    }

    /// Submit outputs for every pending tool call of a run in one request.
    pub async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: &[ToolOutput],
    ) -> Result<Run, OpenAiError> {
        #[derive(Serialize)]
        struct SubmitRequest<'a> {
            tool_outputs: &'a [ToolOutput],
        }

        let response = self
            .beta(
                Method::POST,
                &format!("/threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
            )
            .json(&SubmitRequest { tool_outputs })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    // =========================================================================
    // Chat completions
    // =========================================================================

    /// Run a chat completion and return the first choice's text.
    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, OpenAiError> {
        #[derive(Serialize)]
        struct CompletionRequest<'a> {
            model: &'a str,
            messages: &'a [ChatMessage],
        }

        let response = self
            .request(Method::POST, "/chat/completions")
            .json(&CompletionRequest { model, messages })
            .send()
            .await?;
        let completion: ChatCompletion = Self::handle_response(response).await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAiError::InvalidResponse("completion had no content".to_string()))
    }

    /// Handle HTTP response and parse JSON.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, OpenAiError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(OpenAiError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let text = response.text().await.map_err(|e| {
                OpenAiError::InvalidResponse(format!(
                    "request failed ({}): failed to read response: {}",
                    status, e
                ))
            })?;

            // Try to parse as an API error envelope
            if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(&text) {
                return Err(OpenAiError::Api {
                    status: status.as_u16(),
                    kind: envelope.error.kind.unwrap_or_default(),
                    message: envelope.error.message,
                });
            }

            return Err(OpenAiError::InvalidResponse(format!(
                "request failed ({}): {}",
                status, text
            )));
        }

        let body = response.json().await?;
        Ok(body)
    }
}

/// API error response format.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Role, RunStatus, ToolDeclaration};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new("sk-test").with_base_url(server.uri())
    }

    #[test]
    fn test_client_base_url() {
        let client = OpenAiClient::new("sk-test");
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);

        let client = client.with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
    }

    #[tokio::test]
    async fn test_create_thread_sends_auth_and_beta_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/threads"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(header("OpenAI-Beta", "assistants=v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "thread_abc",
                "object": "thread",
                "created_at": 1700000000,
                "metadata": {}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let thread = client(&mock_server).create_thread().await.unwrap();
        assert_eq!(thread.id, "thread_abc");
    }

    #[tokio::test]
    async fn test_create_assistant_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/assistants"))
            .and(body_json(serde_json::json!({
                "model": "gpt-4-1106-preview",
                "name": "Twin",
                "instructions": "Be helpful.",
                "tools": [{"type": "retrieval"}],
                "file_ids": ["file_1"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "asst_1",
                "object": "assistant",
                "name": "Twin",
                "model": "gpt-4-1106-preview",
                "instructions": "Be helpful.",
                "created_at": 1700000000
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let assistant = client(&mock_server)
            .create_assistant(&CreateAssistantRequest {
                model: "gpt-4-1106-preview".to_string(),
                name: Some("Twin".to_string()),
                instructions: Some("Be helpful.".to_string()),
                tools: vec![ToolDeclaration::Retrieval],
                file_ids: vec!["file_1".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(assistant.id, "asst_1");
        assert_eq!(assistant.name.as_deref(), Some("Twin"));
    }

    #[tokio::test]
    async fn test_list_messages_newest_first() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/threads/thread_abc/messages"))
            .and(query_param("order", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [
                    {
                        "id": "msg_2",
                        "thread_id": "thread_abc",
                        "role": "assistant",
                        "created_at": 1700000010,
                        "content": [{"type": "text", "text": {"value": "You have two meetings.", "annotations": []}}]
                    },
                    {
                        "id": "msg_1",
                        "thread_id": "thread_abc",
                        "role": "user",
                        "created_at": 1700000000,
                        "content": [{"type": "text", "text": {"value": "What's my schedule today?", "annotations": []}}]
                    }
                ],
                "has_more": false
            })))
            .mount(&mock_server)
            .await;

        let messages = client(&mock_server)
            .list_messages("thread_abc", SortOrder::Desc)
            .await
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].text().as_deref(), Some("You have two meetings."));
    }

    #[tokio::test]
    async fn test_submit_tool_outputs_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/threads/thread_abc/runs/run_1/submit_tool_outputs"))
            .and(body_json(serde_json::json!({
                "tool_outputs": [{"tool_call_id": "call_1", "output": "done"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "run_1",
                "thread_id": "thread_abc",
                "assistant_id": "asst_1",
                "status": "queued"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let run = client(&mock_server)
            .submit_tool_outputs(
                "thread_abc",
                "run_1",
                &[ToolOutput {
                    tool_call_id: "call_1".to_string(),
                    output: "done".to_string(),
                }],
            )
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Queued);
    }

    #[tokio::test]
    async fn test_cancel_run() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/threads/thread_abc/runs/run_1/cancel"))
            .and(header("OpenAI-Beta", "assistants=v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "run_1",
                "thread_id": "thread_abc",
                "assistant_id": "asst_1",
                "status": "cancelling"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let run = client(&mock_server)
            .cancel_run("thread_abc", "run_1")
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Cancelling);
    }

    #[tokio::test]
    async fn test_chat_completion_returns_first_choice() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "I like hiking."}}]
            })))
            .mount(&mock_server)
            .await;

        let reply = client(&mock_server)
            .chat_completion(
                "gpt-4-1106-preview",
                &[ChatMessage::user("What do you do on weekends?")],
            )
            .await
            .unwrap();

        assert_eq!(reply, "I like hiking.");
    }

    #[tokio::test]
    async fn test_upload_file_multipart() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "file_123",
                "object": "file",
                "bytes": 2,
                "filename": "profile.json",
                "purpose": "assistants"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{}").unwrap();

        let uploaded = client(&mock_server).upload_file(file.path()).await.unwrap();
        assert_eq!(uploaded.id, "file_123");
        assert_eq!(uploaded.purpose, "assistants");
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_io_error() {
        let mock_server = MockServer::start().await;

        let result = client(&mock_server)
            .upload_file(Path::new("/nonexistent/profile.json"))
            .await;

        assert!(matches!(result.unwrap_err(), OpenAiError::Io(_)));
    }

    #[tokio::test]
    async fn test_api_error_envelope() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/threads/thread_gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {
                    "message": "No thread found with id 'thread_gone'.",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": null
                }
            })))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .retrieve_thread("thread_gone")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        match err {
            OpenAiError::Api { kind, message, .. } => {
                assert_eq!(kind, "invalid_request_error");
                assert!(message.contains("thread_gone"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/threads/thread_abc/runs/run_1"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .retrieve_run("thread_abc", "run_1")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OpenAiError::RateLimited {
                retry_after_secs: Some(7)
            }
        ));
    }
}

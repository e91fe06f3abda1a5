//! The remote operations the orchestration layer depends on.

use std::path::Path;

use async_trait::async_trait;

use crate::{
    Assistant, ChatMessage, CreateAssistantRequest, FileObject, Message, OpenAiClient,
    OpenAiError, Run, SortOrder, Thread, ToolOutput,
};

/// Hosted assistant operations, implemented by [`OpenAiClient`].
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, OpenAiError>;

    async fn create_assistant(
        &self,
        request: &CreateAssistantRequest,
    ) -> Result<Assistant, OpenAiError>;

    async fn upload_file(&self, path: &Path) -> Result<FileObject, OpenAiError>;

    async fn create_thread(&self) -> Result<Thread, OpenAiError>;

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, OpenAiError>;

    async fn create_message(&self, thread_id: &str, content: &str)
    -> Result<Message, OpenAiError>;

    async fn list_messages(
        &self,
        thread_id: &str,
        order: SortOrder,
    ) -> Result<Vec<Message>, OpenAiError>;

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, OpenAiError>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, OpenAiError>;

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: &[ToolOutput],
    ) -> Result<Run, OpenAiError>;

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, OpenAiError>;

    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, OpenAiError>;
}

#[async_trait]
impl AssistantApi for OpenAiClient {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, OpenAiError> {
        OpenAiClient::retrieve_assistant(self, assistant_id).await
    }

    async fn create_assistant(
        &self,
        request: &CreateAssistantRequest,
    ) -> Result<Assistant, OpenAiError> {
        OpenAiClient::create_assistant(self, request).await
    }

    async fn upload_file(&self, path: &Path) -> Result<FileObject, OpenAiError> {
        OpenAiClient::upload_file(self, path).await
    }

    async fn create_thread(&self) -> Result<Thread, OpenAiError> {
        OpenAiClient::create_thread(self).await
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, OpenAiError> {
        OpenAiClient::retrieve_thread(self, thread_id).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<Message, OpenAiError> {
        OpenAiClient::create_message(self, thread_id, content).await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: SortOrder,
    ) -> Result<Vec<Message>, OpenAiError> {
        OpenAiClient::list_messages(self, thread_id, order).await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, OpenAiError> {
        OpenAiClient::create_run(self, thread_id, assistant_id).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, OpenAiError> {
        OpenAiClient::retrieve_run(self, thread_id, run_id).await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: &[ToolOutput],
    ) -> Result<Run, OpenAiError> {
        OpenAiClient::submit_tool_outputs(self, thread_id, run_id, tool_outputs).await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, OpenAiError> {
        OpenAiClient::cancel_run(self, thread_id, run_id).await
    }

    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, OpenAiError> {
        OpenAiClient::chat_completion(self, model, messages).await
    }
}

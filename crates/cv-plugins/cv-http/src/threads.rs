use async_trait::async_trait;
use cv_core::{
    AddCommentRequest, CommentVoteRequest, IdRequest, NewThread, Result, Session, Thread, ThreadApi,
    ThreadEnvelope, ThreadsEnvelope, VoteDirection, VoteRequest,
};
use reqwest::multipart::Form;
use tracing::debug;

use crate::{file_part, HttpApi};

#[async_trait]
impl ThreadApi for HttpApi {
    async fn get_threads(&self, session: &Session) -> Result<Vec<Thread>> {
        let url = self.endpoint("threads/homethreads", &[])?;
        self.send_json(self.authed(self.client.post(url), session)).await
    }

    async fn get_thread_by_id(&self, session: &Session, id: &str) -> Result<Thread> {
        let url = self.endpoint("threads/getthread", &[])?;
        let body = IdRequest { id: id.to_string() };
        let envelope: ThreadEnvelope = self
            .send_json(self.authed(self.client.post(url), session).json(&body))
            .await?;
        Ok(envelope.thread)
    }

    async fn get_threads_by_tag(&self, session: &Session, tag: &str) -> Result<Vec<Thread>> {
        let url = self.endpoint("threads/tag/", &[tag])?;
        let envelope: ThreadsEnvelope = self.send_json(self.authed(self.client.get(url), session)).await?;
        Ok(envelope.threads)
    }

    async fn get_user_threads(&self, session: &Session, user_id: &str) -> Result<Vec<Thread>> {
        let url = self.endpoint("threads/user/", &[user_id])?;
        self.send_json(self.authed(self.client.get(url), session)).await
    }

    async fn create_thread(&self, session: &Session, thread: &NewThread) -> Result<()> {
        let mut form = Form::new()
            .text("title", thread.title.clone())
            .text("content", thread.content.clone());
        if !thread.tags.is_empty() {
            form = form.text("tags", thread.tags.join(","));
        }
        if let Some(attachment) = &thread.attachment {
            form = form.part("file", file_part(attachment)?);
        }
        debug!(title = %thread.title, "creating thread");

        let url = self.endpoint("threads/createthread", &[])?;
        self.send_empty(self.authed(self.client.post(url).multipart(form), session))
            .await
    }

    async fn vote(&self, session: &Session, thread_id: &str, direction: VoteDirection) -> Result<()> {
        let url = self.endpoint(&format!("threads/{}", direction.as_str()), &[])?;
        let body = VoteRequest {
            thread_id: thread_id.to_string(),
        };
        self.send_empty(self.authed(self.client.post(url).json(&body), session))
            .await
    }

    async fn vote_comment(
        &self,
        session: &Session,
        thread_id: &str,
        comment_id: &str,
        direction: VoteDirection,
    ) -> Result<()> {
        let url = self.endpoint(&format!("threads/comments/{}", direction.as_str()), &[])?;
        let body = CommentVoteRequest {
            thread_id: thread_id.to_string(),
            comment_id: comment_id.to_string(),
        };
        self.send_empty(self.authed(self.client.post(url).json(&body), session))
            .await
    }

    async fn add_comment(&self, session: &Session, thread_id: &str, content: &str) -> Result<()> {
        let url = self.endpoint("threads/addcomment", &[])?;
        let body = AddCommentRequest {
            thread_id: thread_id.to_string(),
            content: content.to_string(),
        };
        self.send_empty(self.authed(self.client.post(url).json(&body), session))
            .await
    }
}

//! Thread composition: input validation, tag handling and submission.

use cv_core::{AppError, Attachment, NewThread, Result};
use tracing::{debug, warn};

use crate::notice::Notice;
use crate::Services;

/// Largest attachment accepted, in bytes (10 MiB).
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Splits a comma separated tag field and normalises it.
pub fn parse_tags(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(','))
}

/// Trims, strips leading `#`, drops empties and duplicates. Order is kept.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().trim_start_matches('#').trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

fn validate_attachment(attachment: &Attachment) -> Result<()> {
    let mime = attachment.mime.as_str();
    let allowed = mime.starts_with("image/") || mime.starts_with("video/") || mime == "application/zip";
    if !allowed {
        return Err(AppError::Validation(format!(
            "Unsupported file type: {mime}. Only images, videos and zip files are allowed."
        )));
    }
    if attachment.bytes.len() > MAX_ATTACHMENT_BYTES {
        return Err(AppError::Validation("File is too large (max 10 MB).".to_string()));
    }
    Ok(())
}

/// Checks a draft and returns it with trimmed text and normalised tags.
pub fn validate(draft: NewThread) -> Result<NewThread> {
    let title = draft.title.trim();
    let content = draft.content.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title cannot be empty.".to_string()));
    }
    if content.is_empty() {
        return Err(AppError::Validation("Content cannot be empty.".to_string()));
    }
    if let Some(attachment) = &draft.attachment {
        validate_attachment(attachment)?;
    }
    Ok(NewThread {
        title: title.to_string(),
        content: content.to_string(),
        tags: normalize_tags(&draft.tags),
        attachment: draft.attachment,
    })
}

/// Validates and uploads a new thread. Feeds are not refreshed here.
pub async fn submit_thread(services: &Services, draft: NewThread) -> Result<()> {
    let draft = validate(draft)?;
    let session = services.session.require()?;

    if let Err(e) = services.threads.create_thread(&session, &draft).await {
        warn!(error = %e, "thread creation failed");
        services.notices.error(&e);
        return Err(e);
    }
    debug!(title = %draft.title, tags = draft.tags.len(), attachment = draft.attachment.is_some(), "thread created");
    services
        .notices
        .emit(Notice::Info("Thread posted.".to_string()));
    Ok(())
}

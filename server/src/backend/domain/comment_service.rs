//! Comments and urgency flags on breeding records.
//!
//! Comments are kept newest first on the record itself and saved through the
//! breeding service, so they share its optimistic write and rollback path.

use chrono::Utc;
use log::info;
use shared::{BreedingRecord, Comment};

use crate::backend::domain::breeding_service::BreedingService;
use crate::backend::domain::commands::comments::{AddCommentCommand, UpdateCommentUrgencyCommand};
use crate::backend::domain::errors::BreedingError;

#[derive(Clone)]
pub struct CommentService {
    breeding_service: BreedingService,
}

impl CommentService {
    pub fn new(breeding_service: BreedingService) -> Self {
        Self { breeding_service }
    }

    pub async fn add_comment(&self, command: AddCommentCommand) -> Result<BreedingRecord, BreedingError> {
        let author_id = self.breeding_service.require_session("add comment")?.actor_id;

        let content = command.content.trim();
        if content.is_empty() {
            return Err(BreedingError::validation("Comment cannot be empty"));
        }

        let mut record = self.breeding_service.find_record(&command.record_id).await?;
        let comment = Comment {
            id: Comment::generate_id(),
            content: content.to_string(),
            author_id,
            urgency: command.urgency,
            created_at: Utc::now(),
        };
        info!(
            "Adding {} comment {} to record {}",
            comment.urgency, comment.id, record.breeding_id
        );
        record.comments.insert(0, comment);

        self.breeding_service.commit(record).await
    }

    pub async fn update_comment_urgency(
        &self,
        command: UpdateCommentUrgencyCommand,
    ) -> Result<BreedingRecord, BreedingError> {
        self.breeding_service.require_session("update comment urgency")?;
        let mut record = self.breeding_service.find_record(&command.record_id).await?;

        let comment = record
            .comments
            .iter_mut()
            .find(|comment| comment.id == command.comment_id)
            .ok_or_else(|| BreedingError::not_found(format!("Comment not found: {}", command.comment_id)))?;
        info!(
            "Changing urgency of comment {} from {} to {}",
            comment.id, comment.urgency, command.urgency
        );
        comment.urgency = command.urgency;

        self.breeding_service.commit(record).await
    }
}

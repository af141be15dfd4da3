//! Internal messages between users.

use crate::context::ServiceContext;
use crate::error::{BusinessError, BusinessResult};
use ssg_core::{AuditEventType, Message, Principal, User};
use ssg_persistence::{MessageRepo, UserRepo};

pub struct MessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn send(
        &self,
        principal: &Principal,
        to_user_id: &str,
        subject: &str,
        content: &str,
    ) -> BusinessResult<Message> {
        if subject.trim().is_empty() || content.trim().is_empty() {
            return Err(BusinessError::validation("subject and content are required"));
        }
        if !UserRepo::exists(self.ctx.store(), to_user_id).await? {
            return Err(BusinessError::not_found("User", to_user_id));
        }

        let message = Message::new(&principal.user_id, to_user_id, subject, content);
        MessageRepo::insert(self.ctx.store(), &message).await?;
        self.ctx.record(
            AuditEventType::MessageSent,
            principal,
            &message.id,
            &format!("message to {}", to_user_id),
        );
        Ok(message)
    }

    /// Messages to the principal, newest first, with senders expanded
    pub async fn inbox(&self, principal: &Principal) -> BusinessResult<Vec<Message>> {
        Ok(MessageRepo::inbox(self.ctx.store(), &principal.user_id).await?)
    }

    /// Returns whether a message addressed to the principal was marked.
    pub async fn mark_read(&self, principal: &Principal, message_id: &str) -> BusinessResult<bool> {
        Ok(MessageRepo::mark_read(self.ctx.store(), message_id, &principal.user_id).await?)
    }

    /// Everyone the principal can write to
    pub async fn recipients(&self, principal: &Principal) -> BusinessResult<Vec<User>> {
        Ok(UserRepo::list_except(self.ctx.store(), &principal.user_id).await?)
    }
}

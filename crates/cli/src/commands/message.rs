//! Message commands

use anyhow::{anyhow, Result};
use ssg_business::MessageService;

use crate::commands::principal;
use crate::db::App;
use crate::MessageAction;

pub async fn handle(app: &App, action: MessageAction) -> Result<()> {
    let principal = principal(app).await?;
    let messages = MessageService::new(&app.ctx);

    match action {
        MessageAction::Send {
            to,
            subject,
            content,
        } => {
            let recipient = messages
                .recipients(&principal)
                .await?
                .into_iter()
                .find(|u| u.email.eq_ignore_ascii_case(to.trim()))
                .ok_or_else(|| anyhow!("No user with email {}", to))?;

            let message = messages
                .send(&principal, &recipient.id, &subject, &content)
                .await?;
            println!("✉️  Sent to {} ({})", recipient.full_name(), message.id);
        }

        MessageAction::Inbox => {
            let inbox = messages.inbox(&principal).await?;
            let unread = inbox.iter().filter(|m| !m.is_read).count();
            println!("📥 {} message(s), {} unread", inbox.len(), unread);
            for message in inbox {
                let marker = if message.is_read { " " } else { "*" };
                println!(
                    " {} {}  {}  from {}",
                    marker,
                    message.created_at.format("%Y-%m-%d %H:%M"),
                    message.subject,
                    message.sender_name()
                );
                println!("     {}", message.content);
                println!("     id: {}", message.id);
            }
        }

        MessageAction::Read { message_id } => {
            if messages.mark_read(&principal, &message_id).await? {
                println!("✅ Marked as read");
            } else {
                println!("❌ No message {} in your inbox", message_id);
            }
        }

        MessageAction::Recipients => {
            for user in messages.recipients(&principal).await? {
                println!("   {:<30} {:<20} {}", user.email, user.role, user.full_name());
            }
        }
    }

    Ok(())
}

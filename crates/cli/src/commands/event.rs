//! Event commands

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use ssg_business::{EventService, NewEvent};
use ssg_core::CampusEvent;

use crate::commands::principal;
use crate::db::App;
use crate::EventAction;

pub async fn handle(app: &App, action: EventAction) -> Result<()> {
    let principal = principal(app).await?;
    let events = EventService::new(&app.ctx);

    match action {
        EventAction::Create {
            title,
            date,
            description,
            location,
            mandatory,
        } => {
            let mut new = NewEvent::new(&title, parse_event_date(&date)?);
            new.description = description;
            new.location = location;
            new.is_mandatory = mandatory;

            let event = events.create(&principal, new).await?;
            println!("✅ Created event");
            print_event(&event);
        }

        EventAction::List => {
            let listed = events.list_for(&principal).await?;
            println!("📅 {} event(s)", listed.len());
            for event in &listed {
                print_event(event);
            }
        }

        EventAction::Upcoming => {
            let upcoming = events.upcoming(Utc::now()).await?;
            if upcoming.is_empty() {
                println!("No upcoming events");
            }
            for event in &upcoming {
                print_event(event);
            }
        }

        EventAction::Delete { event_id } => {
            events.delete(&principal, &event_id).await?;
            println!("🗑️  Deleted event {}", event_id);
        }
    }

    Ok(())
}

/// RFC 3339, "YYYY-MM-DD HH:MM" or "YYYY-MM-DD", all UTC
pub fn parse_event_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(naive.and_utc());
    }
    if let Some(naive) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }
    bail!("Invalid date '{}', expected RFC 3339 or YYYY-MM-DD HH:MM", input)
}

fn print_event(event: &CampusEvent) {
    let mandatory = if event.is_mandatory { " (mandatory)" } else { "" };
    println!("📌 {}{}", event.title, mandatory);
    println!("   ID:       {}", event.id);
    println!("   Date:     {}", event.event_date.format("%Y-%m-%d %H:%M UTC"));
    if let Some(location) = &event.location {
        println!("   Location: {}", location);
    }
    if let Some(description) = &event.description {
        println!("   {}", description);
    }
}

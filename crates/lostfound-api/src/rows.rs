//! Store rows -> wire models.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

use lostfound_db::models::{ItemRow, MessageRow};
use lostfound_types::models::{ImageRef, Item, ItemRef, ItemStatus, Message, Party, UserSummary};

/// Storage format for timestamps. Millisecond precision keeps string order
/// and time order identical.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

fn parse_time(raw: &str, what: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", what, raw, e);
            DateTime::default()
        })
}

pub fn item_from_row(row: ItemRow) -> Item {
    let image_url = match (row.image_url, row.image_filename) {
        (Some(url), Some(filename)) => Some(ImageRef { url, filename }),
        (Some(url), None) => {
            let filename = url.rsplit('/').next().unwrap_or_default().to_string();
            Some(ImageRef { url, filename })
        }
        _ => None,
    };

    let status = row.status.parse().unwrap_or_else(|e| {
        warn!("Item {}: {}", row.id, e);
        ItemStatus::default()
    });

    Item {
        id: parse_uuid(&row.id, "item id"),
        title: row.title,
        description: row.description,
        category: row.category,
        status,
        location: row.location,
        date: parse_time(&row.date, "item date"),
        image_url,
        posted_by: UserSummary {
            id: parse_uuid(&row.posted_by, "item owner"),
            name: row.poster_name,
            email: row.poster_email,
        },
    }
}

pub fn message_from_row(row: MessageRow) -> Message {
    Message {
        id: parse_uuid(&row.id, "message id"),
        item: ItemRef {
            id: parse_uuid(&row.item_id, "message item"),
            title: row.item_title,
        },
        sender: Party {
            id: parse_uuid(&row.sender_id, "message sender"),
            name: row.sender_name,
        },
        recipient: Party {
            id: parse_uuid(&row.recipient_id, "message recipient"),
            name: row.recipient_name,
        },
        text: row.text,
        created_at: parse_time(&row.created_at, "message created_at"),
    }
}

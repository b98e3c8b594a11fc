use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current time truncated to milliseconds, the precision the store keeps.
/// Using it for every new record means the value echoed back to a client
/// is identical to the one a later fetch returns.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    #[default]
    Lost,
    Found,
    Returned,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lost => "Lost",
            Self::Found => "Found",
            Self::Returned => "Returned",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Lost" => Ok(Self::Lost),
            "Found" => Ok(Self::Found),
            "Returned" => Ok(Self::Returned),
            other => Err(format!("unknown item status '{}'", other)),
        }
    }
}

/// Public view of a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Uploaded image attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: ItemStatus,
    pub location: String,
    /// When the item was posted.
    pub date: DateTime<Utc>,
    pub image_url: Option<ImageRef>,
    pub posted_by: UserSummary,
}

/// Item reference embedded in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
}

/// Sender or recipient embedded in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

/// A direct message about an item. Same shape over REST and over the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub item: ItemRef,
    pub sender: Party,
    pub recipient: Party,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The participant that is not `viewer`.
    pub fn counterparty(&self, viewer: Uuid) -> &Party {
        if self.sender.id == viewer {
            &self.recipient
        } else {
            &self.sender
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: Uuid, recipient: Uuid) -> Message {
        Message {
            id: Uuid::new_v4(),
            item: ItemRef { id: Uuid::new_v4(), title: "Blue Backpack".into() },
            sender: Party { id: sender, name: "Bea".into() },
            recipient: Party { id: recipient, name: "Ann".into() },
            text: "Found it near gate 3".into(),
            created_at: timestamp_now(),
        }
    }

    #[test]
    fn message_uses_wire_field_names() {
        let msg = message(Uuid::new_v4(), Uuid::new_v4());
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["_id"], msg.id.to_string());
        assert_eq!(json["item"]["_id"], msg.item.id.to_string());
        assert_eq!(json["item"]["title"], "Blue Backpack");
        assert_eq!(json["sender"]["name"], "Bea");
        assert!(json["createdAt"].is_string());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn counterparty_is_the_other_side() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let msg = message(b, a);

        assert_eq!(msg.counterparty(a).id, b);
        assert_eq!(msg.counterparty(b).id, a);
    }

    #[test]
    fn status_parses_known_values_only() {
        assert_eq!("Found".parse::<ItemStatus>().unwrap(), ItemStatus::Found);
        assert!("found".parse::<ItemStatus>().is_err());
        assert_eq!(ItemStatus::default(), ItemStatus::Lost);
    }
}

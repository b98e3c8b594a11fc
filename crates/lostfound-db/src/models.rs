/// Database row types. These map directly to SQLite rows.
/// Distinct from lostfound-types models to keep the DB layer independent.
/// Timestamps are RFC 3339 strings with millisecond precision.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

/// An item joined with its poster.
pub struct ItemRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub location: String,
    pub date: String,
    pub image_url: Option<String>,
    pub image_filename: Option<String>,
    pub posted_by: String,
    pub poster_name: String,
    pub poster_email: String,
}

/// Insert/update payload for the items table.
pub struct ItemRecord<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub status: &'a str,
    pub location: &'a str,
    pub date: &'a str,
    pub image_url: Option<&'a str>,
    pub image_filename: Option<&'a str>,
    pub posted_by: &'a str,
}

/// A message joined with its item title and both participants' names.
pub struct MessageRow {
    pub id: String,
    pub item_id: String,
    pub item_title: String,
    pub sender_id: String,
    pub sender_name: String,
    pub recipient_id: String,
    pub recipient_name: String,
    pub text: String,
    pub created_at: String,
}

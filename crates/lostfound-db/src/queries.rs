use crate::Database;
use crate::models::{ItemRecord, ItemRow, MessageRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

const ITEM_SELECT: &str = "
    SELECT i.id, i.title, i.description, i.category, i.status, i.location, i.date,
           i.image_url, i.image_filename, i.posted_by, u.name, u.email
    FROM items i
    JOIN users u ON i.posted_by = u.id";

// Item title and both names come back in one query (no N+1 on populate)
const MESSAGE_SELECT: &str = "
    SELECT m.id, m.item_id, i.title, m.sender_id, s.name, m.recipient_id, r.name,
           m.text, m.created_at
    FROM messages m
    JOIN items i ON m.item_id = i.id
    JOIN users s ON m.sender_id = s.id
    JOIN users r ON m.recipient_id = r.id";

impl Database {
    // -- Users --

    /// Returns false when the email is already taken.
    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            match conn.execute(
                "INSERT INTO users (id, name, email, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, name, email, password_hash, created_at),
            ) {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Items --

    pub fn insert_item(&self, item: &ItemRecord<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO items (id, title, description, category, status, location, date,
                                    image_url, image_filename, posted_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    item.id,
                    item.title,
                    item.description,
                    item.category,
                    item.status,
                    item.location,
                    item.date,
                    item.image_url,
                    item.image_filename,
                    item.posted_by,
                ],
            )?;
            Ok(())
        })
    }

    /// All items, newest first.
    pub fn list_items(&self) -> Result<Vec<ItemRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ITEM_SELECT} ORDER BY i.date DESC, i.id"))?;
            let rows = stmt
                .query_map([], item_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_item(&self, id: &str) -> Result<Option<ItemRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ITEM_SELECT} WHERE i.id = ?1"))?;
            stmt.query_row([id], item_from_row).optional()
        })
    }

    /// Overwrites every mutable column. `posted_by` and `date` are never changed.
    /// Returns false if no such item exists.
    pub fn update_item(&self, item: &ItemRecord<'_>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE items
                 SET title = ?2, description = ?3, category = ?4, status = ?5, location = ?6,
                     image_url = ?7, image_filename = ?8
                 WHERE id = ?1",
                rusqlite::params![
                    item.id,
                    item.title,
                    item.description,
                    item.category,
                    item.status,
                    item.location,
                    item.image_url,
                    item.image_filename,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_item_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed =
                conn.execute("UPDATE items SET status = ?2 WHERE id = ?1", (id, status))?;
            Ok(changed > 0)
        })
    }

    /// Deletes the item and, via cascade, the messages about it.
    pub fn delete_item(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM items WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        item_id: &str,
        sender_id: &str,
        recipient_id: &str,
        text: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, item_id, sender_id, recipient_id, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (id, item_id, sender_id, recipient_id, text, created_at),
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{MESSAGE_SELECT} WHERE m.id = ?1"))?;
            stmt.query_row([id], message_from_row).optional()
        })
    }

    /// Messages received by `user_id`, oldest first.
    pub fn get_inbox(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, "m.recipient_id", user_id))
    }

    /// Messages sent by `user_id`, oldest first.
    pub fn get_sent(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, "m.sender_id", user_id))
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, email, password, created_at FROM users WHERE {column} = ?1"
    ))?;

    stmt.query_row([value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            created_at: row.get(4)?,
        })
    })
    .optional()
}

fn query_messages(conn: &Connection, column: &str, user_id: &str) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(&format!(
        "{MESSAGE_SELECT} WHERE {column} = ?1 ORDER BY m.created_at ASC, m.id"
    ))?;

    let rows = stmt
        .query_map([user_id], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        status: row.get(4)?,
        location: row.get(5)?,
        date: row.get(6)?,
        image_url: row.get(7)?,
        image_filename: row.get(8)?,
        posted_by: row.get(9)?,
        poster_name: row.get(10)?,
        poster_email: row.get(11)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        item_id: row.get(1)?,
        item_title: row.get(2)?,
        sender_id: row.get(3)?,
        sender_name: row.get(4)?,
        recipient_id: row.get(5)?,
        recipient_name: row.get(6)?,
        text: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANN: &str = "00000000-0000-0000-0000-00000000000a";
    const BEA: &str = "00000000-0000-0000-0000-00000000000b";
    const ITEM: &str = "00000000-0000-0000-0000-0000000000f1";

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user(ANN, "Ann", "ann@example.com", "hash", "2026-10-18T09:00:00.000Z")
            .unwrap();
        db.create_user(BEA, "Bea", "bea@example.com", "hash", "2026-10-18T09:00:00.000Z")
            .unwrap();
        db.insert_item(&record(ITEM, "Blue Backpack", "Lost")).unwrap();
        db
    }

    fn record<'a>(id: &'a str, title: &'a str, status: &'a str) -> ItemRecord<'a> {
        ItemRecord {
            id,
            title,
            description: "Navy, two straps",
            category: "Bags",
            status,
            location: "Terminal B",
            date: "2026-10-18T09:05:00.000Z",
            image_url: None,
            image_filename: None,
            posted_by: ANN,
        }
    }

    #[test]
    fn email_lookup_is_case_insensitive() {
        let db = seeded();
        let user = db.get_user_by_email("ANN@example.com").unwrap().unwrap();
        assert_eq!(user.id, ANN);
        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = seeded();
        let created = db
            .create_user(
                "00000000-0000-0000-0000-00000000000c",
                "Other Ann",
                "ANN@example.com",
                "hash",
                "2026-10-18T09:00:00.000Z",
            )
            .unwrap();
        assert!(!created);
        assert_eq!(db.get_user_by_email("ann@example.com").unwrap().unwrap().name, "Ann");
    }

    #[test]
    fn item_is_joined_with_poster() {
        let db = seeded();
        let item = db.get_item(ITEM).unwrap().unwrap();
        assert_eq!(item.title, "Blue Backpack");
        assert_eq!(item.poster_name, "Ann");
        assert_eq!(item.poster_email, "ann@example.com");
        assert_eq!(db.list_items().unwrap().len(), 1);
    }

    #[test]
    fn update_and_status_change() {
        let db = seeded();
        assert!(db.update_item(&record(ITEM, "Navy Backpack", "Lost")).unwrap());
        assert!(db.set_item_status(ITEM, "Found").unwrap());

        let item = db.get_item(ITEM).unwrap().unwrap();
        assert_eq!(item.title, "Navy Backpack");
        assert_eq!(item.status, "Found");

        let missing = "00000000-0000-0000-0000-0000000000ff";
        assert!(!db.set_item_status(missing, "Found").unwrap());
    }

    #[test]
    fn inbox_and_sent_are_split_by_direction() {
        let db = seeded();
        db.insert_message(
            "00000000-0000-0000-0000-000000000101",
            ITEM,
            BEA,
            ANN,
            "Found it near gate 3",
            "2026-10-18T09:10:00.000Z",
        )
        .unwrap();
        db.insert_message(
            "00000000-0000-0000-0000-000000000102",
            ITEM,
            ANN,
            BEA,
            "Thank you!",
            "2026-10-18T09:11:00.000Z",
        )
        .unwrap();

        let inbox = db.get_inbox(ANN).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].text, "Found it near gate 3");
        assert_eq!(inbox[0].sender_name, "Bea");
        assert_eq!(inbox[0].item_title, "Blue Backpack");

        let sent = db.get_sent(ANN).unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient_name, "Bea");
    }

    #[test]
    fn deleting_an_item_removes_its_messages() {
        let db = seeded();
        db.insert_message(
            "00000000-0000-0000-0000-000000000101",
            ITEM,
            BEA,
            ANN,
            "Is it still lost?",
            "2026-10-18T09:10:00.000Z",
        )
        .unwrap();

        assert!(db.delete_item(ITEM).unwrap());
        assert!(!db.delete_item(ITEM).unwrap());
        assert!(db.get_item(ITEM).unwrap().is_none());
        assert!(db.get_inbox(ANN).unwrap().is_empty());
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lostfound.db");

        {
            let db = Database::open(&path).unwrap();
            db.create_user(ANN, "Ann", "ann@example.com", "hash", "2026-10-18T09:00:00.000Z")
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.get_user_by_id(ANN).unwrap().is_some());
    }
}

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS items (
            id              TEXT PRIMARY KEY,
            title           TEXT NOT NULL,
            description     TEXT NOT NULL,
            category        TEXT NOT NULL DEFAULT '',
            status          TEXT NOT NULL DEFAULT 'Lost',
            location        TEXT NOT NULL,
            date            TEXT NOT NULL,
            image_url       TEXT,
            image_filename  TEXT,
            posted_by       TEXT NOT NULL REFERENCES users(id)
        );

        CREATE INDEX IF NOT EXISTS idx_items_date
            ON items(date);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            item_id         TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            sender_id       TEXT NOT NULL REFERENCES users(id),
            recipient_id    TEXT NOT NULL REFERENCES users(id),
            text            TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_recipient
            ON messages(recipient_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_sender
            ON messages(sender_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

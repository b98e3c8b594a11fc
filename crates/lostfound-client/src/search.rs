use uuid::Uuid;

use lostfound_types::models::Item;

/// Case-insensitive substring match on title or description. A blank query
/// matches everything.
pub fn filter_items<'a>(items: &'a [Item], query: &str) -> Vec<&'a Item> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }

    items
        .iter()
        .filter(|item| {
            item.title.to_lowercase().contains(&needle)
                || item.description.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Items a given user posted (the dashboard view).
pub fn posted_by(items: &[Item], user: Uuid) -> Vec<&Item> {
    items.iter().filter(|item| item.posted_by.id == user).collect()
}

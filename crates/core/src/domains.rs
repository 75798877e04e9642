//! Built-in schemas for the sample apps. Hosts may build their own with
//! `EntitySchema::new`; these cover the collections the apps ship with.

use crate::schema::{ConflictRule, EntitySchema, FieldKind, FieldRule};

fn choice(options: &[&str]) -> FieldKind {
    FieldKind::Choice(options.iter().map(|o| o.to_string()).collect())
}

pub fn tasks() -> EntitySchema {
    EntitySchema::new("tasks", "quicktasks.tasks", "title")
        .field(FieldRule::new("title", FieldKind::Text).max_len(120))
        .field(FieldRule::new("description", FieldKind::Text).max_len(2000))
        .field(FieldRule::new("status", choice(&["todo", "in-progress", "done"])))
        .field(FieldRule::new("priority", choice(&["low", "medium", "high"])))
        .field(FieldRule::new("dueDate", FieldKind::Date))
        .field(FieldRule::new("completed", FieldKind::Boolean))
        .field(FieldRule::new("tags", FieldKind::List).max_len(40))
}

/// One non-cancelled booking per `(date, time)` slot.
pub fn bookings() -> EntitySchema {
    EntitySchema::new("bookings", "EasyBook.bookings", "title")
        .field(FieldRule::new("title", FieldKind::Text).max_len(100))
        .field(FieldRule::new("date", FieldKind::Date).required())
        .field(FieldRule::new("time", FieldKind::Time).required())
        .field(FieldRule::new("status", choice(&["pending", "confirmed", "cancelled"])).required())
        .field(FieldRule::new("description", FieldKind::Text).max_len(1000))
        .with_conflict(ConflictRule::new(["date", "time"], "status", &["cancelled"]))
}

pub fn recipes() -> EntitySchema {
    EntitySchema::new("recipes", "MyRecipeBox.recipes", "title")
        .field(FieldRule::new("title", FieldKind::Text).max_len(120))
        .field(FieldRule::new("description", FieldKind::Text).max_len(2000))
        .field(FieldRule::new("tags", FieldKind::List).max_len(40))
        .field(FieldRule::new("ingredients", FieldKind::Any))
        .field(FieldRule::new("instructions", FieldKind::Any))
}

pub fn contacts() -> EntitySchema {
    EntitySchema::new("contacts", "ContactVault.contacts", "name")
        .field(FieldRule::new("name", FieldKind::Text).max_len(100))
        .field(FieldRule::new("phone", FieldKind::Text).max_len(40))
        .field(FieldRule::new("email", FieldKind::Text).max_len(254))
        .field(FieldRule::new("notes", FieldKind::Text).max_len(2000))
        .field(FieldRule::new("tags", FieldKind::List).max_len(40))
}

pub fn expenses() -> EntitySchema {
    EntitySchema::new("expenses", "expenses", "name")
        .field(FieldRule::new("name", FieldKind::Text).max_len(100))
        .field(FieldRule::new("amount", FieldKind::Number).required())
        .field(FieldRule::new("category", FieldKind::Text).max_len(50))
        .field(FieldRule::new("date", FieldKind::Date))
}

pub fn flashcards() -> EntitySchema {
    EntitySchema::new("flashcards", "SmartCards.cards", "question")
        .field(FieldRule::new("question", FieldKind::Text).max_len(500))
        .field(FieldRule::new("answer", FieldKind::Text).required().max_len(500))
        .field(FieldRule::new("status", choice(&["unknown", "learning", "known"])))
        .field(FieldRule::new("tags", FieldKind::List).max_len(40))
}

pub fn all() -> Vec<EntitySchema> {
    vec![tasks(), bookings(), recipes(), contacts(), expenses(), flashcards()]
}

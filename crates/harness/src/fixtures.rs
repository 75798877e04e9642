use recordbox_core::{FieldValue, Fields};

pub fn fields(pairs: &[(&str, FieldValue)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn task(title: &str) -> Fields {
    fields(&[("title", title.into())])
}

pub fn booking(title: &str, date: &str, time: &str, status: &str) -> Fields {
    fields(&[
        ("title", title.into()),
        ("date", date.into()),
        ("time", time.into()),
        ("status", status.into()),
    ])
}

pub fn recipe(title: &str, tags: &[&str]) -> Fields {
    let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    fields(&[("title", title.into()), ("tags", tags.into())])
}

pub fn expense(name: &str, amount: f64, category: &str) -> Fields {
    fields(&[
        ("name", name.into()),
        ("amount", amount.into()),
        ("category", category.into()),
    ])
}

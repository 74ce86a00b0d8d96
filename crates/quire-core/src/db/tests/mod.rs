mod graph;
mod schema;
mod search;
mod tables;

use super::{Note, Store};
use crate::config::StoreConfig;
use crate::extract::MarkdownExtractor;
use std::sync::Arc;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn store_with(config: StoreConfig) -> Store {
    let extractor = Arc::new(MarkdownExtractor::new(config.extractor.clone()).unwrap());
    Store::open_in_memory_with(config, extractor).unwrap()
}

/// Save `content` as note `id` at `notes/<id>.md`
fn save(store: &Store, id: &str, content: &str) -> Note {
    store
        .save_note(id, "", &format!("notes/{}.md", id), content)
        .unwrap()
}

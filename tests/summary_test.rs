/// Summary merge integration tests
mod common;

use std::fs;
use std::sync::Arc;
use std::thread;

use common::{RecordBuilder, TranscriptBuilder, three_message_chain};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use session_keeper::index_storage::IndexEntryPatch;
use session_keeper::{
    Error, Result, SessionsIndex, TextCleaner, generate_and_merge_summary, load_index, merge_summary,
    update_index, upsert_entry,
};

fn read_index(dir: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(dir.join("sessions-index.json")).unwrap()).unwrap()
}

#[test]
fn test_merge_summary_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = three_message_chain("s1").create_in(dir.path());
    fs::write(dir.path().join("sessions-index.json"), r#"{"version":1,"entries":[{"sessionId":"s1","messageCount":0}]}"#)
        .unwrap();

    merge_summary(dir.path(), "s1", &file, "Fixed login bug").unwrap();

    assert_eq!(
        read_index(dir.path()),
        json!({"version": 1, "entries": [{"sessionId": "s1", "messageCount": 0, "customTitle": "Fixed login bug"}]})
    );
}

#[test]
fn test_merge_keeps_titles_when_another_entry_is_malformed() {
    let dir = tempfile::TempDir::new().unwrap();
    fs::write(
        dir.path().join("sessions-index.json"),
        r#"{"version":1,"entries":[
            {"sessionId":"s1","customTitle":"Precious title","messageCount":4},
            {"customTitle":"written by something else"}
        ]}"#,
    )
    .unwrap();

    merge_summary(dir.path(), "s2", &dir.path().join("s2.jsonl"), "New title").unwrap();

    let index = load_index(dir.path());
    assert_eq!(index.get("s1").and_then(|e| e.custom_title.as_deref()), Some("Precious title"));
    assert_eq!(index.get("s1").and_then(|e| e.message_count), Some(4));
    assert_eq!(index.get("s2").and_then(|e| e.custom_title.as_deref()), Some("New title"));
}

#[test]
fn test_upsert_commutes_on_disjoint_fields() {
    let mut base = SessionsIndex::default();
    upsert_entry(&mut base, "s1", IndexEntryPatch::default());

    let title = IndexEntryPatch::custom_title("a");
    let count = IndexEntryPatch { message_count: Some(5), ..IndexEntryPatch::default() };

    let mut one = base.clone();
    upsert_entry(&mut one, "s1", title.clone());
    upsert_entry(&mut one, "s1", count.clone());

    let mut two = base;
    upsert_entry(&mut two, "s1", count);
    upsert_entry(&mut two, "s1", title);

    assert_eq!(one, two);
}

#[test]
fn test_concurrent_merges_are_not_lost() {
    let dir = Arc::new(tempfile::TempDir::new().unwrap());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dir = Arc::clone(&dir);
            thread::spawn(move || {
                let id = format!("s{}", i);
                let file = dir.path().join(format!("{}.jsonl", id));
                merge_summary(dir.path(), &id, &file, &format!("Summary {}", i)).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let index = load_index(dir.path());
    assert_eq!(index.entries.len(), 8);
    for i in 0..8 {
        let entry = index.get(&format!("s{}", i)).unwrap();
        assert_eq!(entry.custom_title, Some(format!("Summary {}", i)));
    }
}

#[test]
fn test_generate_uses_first_five_meaningful_messages() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut transcript = TranscriptBuilder::with_id("s1")
        .message(RecordBuilder::user("ide", "The user opened the file src/lib.rs in the IDE."));
    for i in 0..7 {
        transcript = transcript.message(RecordBuilder::user(&format!("u{}", i), &format!("question {}", i)));
    }
    let file = transcript.create_in(dir.path());

    let summarizer = |instructions: &str, prompt: &str| -> Result<String> {
        assert!(instructions.contains("5-10 words"));
        assert_eq!(
            prompt,
            "Message 1: question 0\n\nMessage 2: question 1\n\nMessage 3: question 2\n\n\
             Message 4: question 3\n\nMessage 5: question 4"
        );
        Ok("Five questions asked".to_string())
    };

    let summary =
        generate_and_merge_summary(&summarizer, &file, "s1", dir.path(), &TextCleaner::default()).unwrap();
    assert_eq!(summary, "Five questions asked");
}

#[test]
fn test_upstream_failure_leaves_everything_untouched() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = three_message_chain("s1").create_in(dir.path());
    let transcript_before = fs::read(&file).unwrap();
    let summarizer =
        |_: &str, _: &str| -> Result<String> { Err(Error::Upstream("rate limited".to_string())) };

    let err =
        generate_and_merge_summary(&summarizer, &file, "s1", dir.path(), &TextCleaner::default()).unwrap_err();
    assert!(err.to_string().contains("rate limited"));
    assert_eq!(fs::read(&file).unwrap(), transcript_before);
    assert!(!dir.path().join("sessions-index.json").exists());
}

#[test]
fn test_update_index_returns_closure_value() {
    let dir = tempfile::TempDir::new().unwrap();
    let inserted = update_index(dir.path(), |index, _| {
        Ok(upsert_entry(index, "s9", IndexEntryPatch::custom_title("t")))
    })
    .unwrap();
    assert_eq!(inserted, session_keeper::index_storage::Upsert::Inserted);
    assert_eq!(load_index(dir.path()).get("s9").unwrap().message_count, Some(0));
}

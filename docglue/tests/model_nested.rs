mod common;

use common::{store, Message, Room};
use docglue::prelude::*;
use futures::executor::block_on;
use futures::StreamExt;
use serde_json::{json, Map, Value};

fn dict(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn parents_anchor_the_collection_path() {
    block_on(async {
        let store = store();
        let messages = store.model::<Message>().parents(["room1"]);

        let created = messages
            .create_by_dict(&dict(&[("id", json!("m1")), ("body", json!("hello"))]))
            .await
            .unwrap();
        assert_eq!(created.parent_ids(), ["room1".to_string()]);

        let loaded = messages.get_by_id("m1").await.unwrap().unwrap();
        assert_eq!(loaded.get("body").unwrap(), json!("hello"));
        assert_eq!(loaded.parent_ids(), ["room1".to_string()]);

        // the same id under another parent is a different document
        let other = store.model::<Message>().parents(["room2"]);
        assert!(other.get_by_id("m1").await.unwrap().is_none());
    });
}

#[test]
fn missing_parent_ids_are_a_programming_error() {
    block_on(async {
        let store = store();
        let unanchored = store.model::<Message>();
        assert!(matches!(
            unanchored.get_by_id("m1").await,
            Err(GlueError::Programming(_))
        ));
    });
}

#[test]
fn collection_group_queries_span_parents() {
    block_on(async {
        let store = store();
        for (room, id, body) in [
            ("room1", "m1", "hi"),
            ("room1", "m2", "there"),
            ("room2", "m3", "yo"),
        ] {
            store
                .model::<Message>()
                .parents([room])
                .create_by_dict(&dict(&[("id", json!(id)), ("body", json!(body))]))
                .await
                .unwrap();
        }

        let options = QueryOptions {
            collection_group: true,
            ..Default::default()
        };
        let all = store
            .model::<Message>()
            .query(&[], &options)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        // parent ids come back from the document paths
        let m3 = all.iter().find(|m| m.doc_id() == Some("m3")).unwrap();
        assert_eq!(m3.parent_ids(), ["room2".to_string()]);

        let filtered = store
            .model::<Message>()
            .query(&[Filter::eq("body", "yo")], &options)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].doc_id(), Some("m3"));
    });
}

#[test]
fn delete_leaves_orphans_delete_all_does_not() {
    block_on(async {
        let store = store();
        let rooms = store.model::<Room>();
        let mut room = rooms
            .create_by_dict(&dict(&[("id", json!("r1")), ("name", json!("general"))]))
            .await
            .unwrap();
        let messages = store.model::<Message>().parents(["r1"]);
        messages
            .create_by_dict(&dict(&[("id", json!("m1")), ("body", json!("hello"))]))
            .await
            .unwrap();

        // plain delete removes the parent only; the subtree is orphaned
        rooms.delete(&mut room).await.unwrap();
        assert!(rooms.get_by_id("r1").await.unwrap().is_none());
        assert!(messages.get_by_id("m1").await.unwrap().is_some());

        // recreate and delete the whole subtree
        let mut room = rooms
            .create_by_dict(&dict(&[("id", json!("r1")), ("name", json!("general"))]))
            .await
            .unwrap();
        rooms.delete_all(&mut room).await.unwrap();
        assert!(rooms.get_by_id("r1").await.unwrap().is_none());
        assert!(messages.get_by_id("m1").await.unwrap().is_none());
    });
}

#[test]
fn streaming_yields_hydrated_instances() {
    block_on(async {
        let store = store();
        let messages = store.model::<Message>().parents(["room1"]);
        for (id, rank) in [("m1", 2), ("m2", 1), ("m3", 3)] {
            messages
                .create_by_dict(&dict(&[
                    ("id", json!(id)),
                    ("body", json!("x")),
                    ("rank", json!(rank)),
                ]))
                .await
                .unwrap();
        }

        let options = QueryOptions {
            order_by: Some("rank".to_string()),
            ..Default::default()
        };
        let mut stream = messages.stream(&[], &options).unwrap();
        let mut ids = Vec::new();
        while let Some(message) = stream.next().await {
            ids.push(message.unwrap().doc_id().unwrap().to_string());
        }
        assert_eq!(ids, ["m2", "m1", "m3"]);
    });
}

#![allow(dead_code)]

use std::sync::LazyLock;

use docglue::memory::InMemoryClient;
use docglue::prelude::*;
use serde_json::json;

pub fn store() -> ModelStore<InMemoryClient> {
    ModelStore::new(InMemoryClient::new())
}

/// Flat collection with the common property kinds.
#[derive(Debug)]
pub struct Fruit {
    pub state: ModelState,
}

static FRUIT_SCHEMA: LazyLock<ModelSchema> = LazyLock::new(|| {
    ModelSchema::builder("fruits")
        .property("name", StringProperty::new().required())
        .property("price", IntegerProperty::new().default_value(100))
        .property(
            "tags",
            JsonProperty::new().with_schema(json!({
                "type": "array",
                "items": {"type": "string"},
            })),
        )
        .property("created_at", TimestampProperty::new().auto_now_add())
        .property("updated_at", TimestampProperty::new().auto_now())
        .build()
});

impl Model for Fruit {
    fn schema() -> &'static ModelSchema {
        &FRUIT_SCHEMA
    }

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    fn from_state(state: ModelState) -> Self {
        Fruit { state }
    }
}

/// Parent collection for the nested tests.
#[derive(Debug)]
pub struct Room {
    pub state: ModelState,
}

static ROOM_SCHEMA: LazyLock<ModelSchema> = LazyLock::new(|| {
    ModelSchema::builder("rooms")
        .property("name", StringProperty::new().required())
        .build()
});

impl Model for Room {
    fn schema() -> &'static ModelSchema {
        &ROOM_SCHEMA
    }

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    fn from_state(state: ModelState) -> Self {
        Room { state }
    }
}

/// Child collection nested under [`Room`].
#[derive(Debug)]
pub struct Message {
    pub state: ModelState,
}

static MESSAGE_SCHEMA: LazyLock<ModelSchema> = LazyLock::new(|| {
    ModelSchema::builder("rooms/{room_id}/messages")
        .property("body", StringProperty::new().required())
        .property("rank", IntegerProperty::new())
        .build()
});

impl Model for Message {
    fn schema() -> &'static ModelSchema {
        &MESSAGE_SCHEMA
    }

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    fn from_state(state: ModelState) -> Self {
        Message { state }
    }
}

//! In-memory SQLite fixture shared by the unit tests.

use crate::model::{ModelClass, RelationshipOptions};
use crate::session::{Session, lock};
use sqlrecord_connection::ConnectionRegistry;
use sqlrecord_core::Config;
use sqlrecord_sqlite::SqliteConnector;
use std::sync::{Arc, Mutex};

pub(crate) const SCHEMA: &[&str] = &[
    "CREATE TABLE schools (id INTEGER PRIMARY KEY, name VARCHAR(50))",
    "CREATE TABLE people (id INTEGER PRIMARY KEY, name VARCHAR(50), school_id INTEGER, created_at DATETIME)",
    "CREATE TABLE principals (id INTEGER PRIMARY KEY, name VARCHAR(50), school_id INTEGER)",
    "CREATE TABLE orders (id INTEGER PRIMARY KEY, reference VARCHAR(20))",
    "CREATE TABLE payments (id INTEGER PRIMARY KEY, order_id INTEGER, person_id INTEGER, amount NUMERIC(10,2))",
    "CREATE TABLE tags (id INTEGER PRIMARY KEY, name VARCHAR(20))",
    "CREATE TABLE people_tags (person_id INTEGER, tag_id INTEGER)",
    "INSERT INTO schools VALUES (1, 'Springfield Elementary'), (2, 'Shelbyville High')",
    "INSERT INTO people VALUES (1, 'Bart', 1, '2009-01-01 10:00:00'), (2, 'Lisa', 1, NULL), \
     (3, 'Nelson', 2, NULL), (4, 'Maggie', NULL, NULL)",
    "INSERT INTO principals VALUES (1, 'Skinner', 1)",
    "INSERT INTO orders VALUES (1, 'A-100'), (2, 'B-200'), (3, 'C-300')",
    "INSERT INTO payments VALUES (1, 1, 1, 5.00), (2, 1, 2, 7.50), (3, 2, 3, 2.25), (4, 2, 1, 1.00)",
    "INSERT INTO tags VALUES (1, 'smart'), (2, 'troublemaker')",
    "INSERT INTO people_tags VALUES (1, 2), (2, 1), (3, 2)",
];

pub(crate) fn models() -> Vec<ModelClass> {
    vec![
        ModelClass::new("School")
            .has_many("people", RelationshipOptions::new().order("id"))
            .has_one("principal", RelationshipOptions::new())
            .has_many("payments", RelationshipOptions::new().through("people")),
        ModelClass::new("Principal").belongs_to("school", RelationshipOptions::new()),
        ModelClass::new("Person")
            .attr_protected(["id"])
            .belongs_to("school", RelationshipOptions::new())
            .has_many("payments", RelationshipOptions::new().order("id"))
            .has_many("orders", RelationshipOptions::new().through("payments"))
            .has_many("schoolmates", RelationshipOptions::new().through("school").source("Person"))
            .has_and_belongs_to_many("tags", RelationshipOptions::new())
            .has_many("ghosts", RelationshipOptions::new().through("haunts").class_name("Person")),
        ModelClass::new("Order")
            .has_many("payments", RelationshipOptions::new())
            .has_many("people", RelationshipOptions::new().through("payments")),
        ModelClass::new("Payment")
            .belongs_to("order", RelationshipOptions::new())
            .belongs_to("person", RelationshipOptions::new()),
        ModelClass::new("Tag").has_and_belongs_to_many("people", RelationshipOptions::new()),
    ]
}

/// A session over a fresh in-memory database and the statements it runs.
pub(crate) fn session() -> (Session, Arc<Mutex<Vec<String>>>) {
    let statements = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&statements);

    let mut config = Config::new();
    config
        .add_connection("development", "sqlite://:memory:")
        .set_logging(true)
        .set_logger(Arc::new(move |message: &str| {
            lock(&sink).push(message.to_string());
        }));

    let registry = ConnectionRegistry::new(config).with_connector(Arc::new(SqliteConnector::new()));
    let session = models()
        .into_iter()
        .fold(Session::new(registry), Session::with_model);

    {
        let adapter = session.registry().resolve(None).expect("adapter");
        let mut conn = lock(&adapter);
        for sql in SCHEMA {
            conn.execute(sql, &[]).expect("fixture statement");
        }
    }
    lock(&statements).clear();
    (session, statements)
}

/// SELECT statements logged since the last call.
pub(crate) fn take_selects(statements: &Mutex<Vec<String>>) -> Vec<String> {
    lock(statements)
        .drain(..)
        .filter(|s| s.starts_with("SELECT"))
        .collect()
}

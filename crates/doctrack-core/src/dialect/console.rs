//! Dialect that renders commands as document-database client calls
//!
//! Nothing is persisted. Every command becomes one line such as
//!
//! ```text
//! db.collection('stores').document('s1').create({"name":"Main"})
//!   db.collection('stores').document('s1').collection('products').document('p1').update({"qty":2})
//! ```
//!
//! indented by tree level, kept in a transcript and logged at info level.

use serde_json::{Map, Value};

use super::Dialect;
use crate::commands::{AbstractCommand, ArrayOperation, Operation};
use crate::errors::Result;
use crate::snapshot::{to_json, DocPath, Snapshot};

#[derive(Debug, Default)]
pub struct ConsoleDialect {
    transcript: Vec<String>,
}

impl ConsoleDialect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered lines in execution order
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Render a single command without recording it
    pub fn render(command: &AbstractCommand) -> String {
        let indent = "  ".repeat(command.level() as usize);
        let target = document_ref(command.path());
        let call = match command.operation() {
            Operation::Create => format!("create({})", object(command.data().iter())),
            Operation::Update => format!("update({})", update_payload(command)),
            Operation::Delete => "delete()".to_string(),
        };
        format!("{}{}.{}", indent, target, call)
    }
}

impl Dialect for ConsoleDialect {
    type Session<'s> = ();

    fn execute_commands<'s>(&mut self, _session: &mut (), commands: &[AbstractCommand]) -> Result<()> {
        for command in commands {
            let line = Self::render(command);
            tracing::info!(
                operation = command.operation().as_str(),
                path = command.path().as_str(),
                level = command.level(),
                "{}",
                line
            );
            self.transcript.push(line);
        }
        Ok(())
    }
}

fn document_ref(path: &DocPath) -> String {
    let segments: Vec<&str> = path.segments().collect();
    let mut out = String::from("db");
    for pair in segments.chunks(2) {
        out.push_str(&format!(".collection('{}')", pair[0]));
        if let Some(id) = pair.get(1) {
            out.push_str(&format!(".document('{}')", id));
        }
    }
    out
}

fn object<'a>(entries: impl Iterator<Item = (&'a String, &'a Snapshot)>) -> String {
    let map: Map<String, Value> = entries.map(|(k, v)| (k.clone(), to_json(v))).collect();
    Value::Object(map).to_string()
}

fn array(items: &[Snapshot]) -> String {
    Value::Array(items.iter().map(to_json).collect()).to_string()
}

fn update_payload(command: &AbstractCommand) -> String {
    let mut parts = Vec::new();
    if !command.data().is_empty() {
        parts.push(object(command.data().iter()));
    }
    for field in command.deleted_fields().into_iter().flatten() {
        parts.push(format!("'{}': DELETE_FIELD", field));
    }
    for (field, op) in command.array_operations().into_iter().flatten() {
        let rendered = match op {
            ArrayOperation::Set(items) => array(items),
            ArrayOperation::Union(items) => format!("ArrayUnion({})", array(items)),
            ArrayOperation::Remove(items) => format!("ArrayRemove({})", array(items)),
            ArrayOperation::UnionRemove { union, remove } => format!(
                "ArrayRemove({}) + ArrayUnion({})",
                array(remove),
                array(union)
            ),
        };
        parts.push(format!("'{}': {}", field, rendered));
    }
    parts.join(", ")
}

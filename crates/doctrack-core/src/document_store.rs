use std::collections::BTreeMap;

use crate::apply::{apply_command, Document};
use crate::commands::AbstractCommand;
use crate::errors::Result;

/// In-memory document tree keyed by full document path
///
/// Not thread-safe; intended as the session of the in-memory dialect and as
/// a reference backend in tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDocumentStore {
    documents: BTreeMap<String, Document>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&Document> {
        self.documents.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.documents.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All document paths in lexical order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Documents directly inside `collection` (e.g. `stores/s1/products`)
    pub fn list_collection<'s>(
        &'s self,
        collection: &'s str,
    ) -> impl Iterator<Item = (&'s str, &'s Document)> + 's {
        self.documents.iter().filter_map(move |(path, doc)| {
            let (parent, _) = path.rsplit_once('/')?;
            (parent == collection).then_some((path.as_str(), doc))
        })
    }

    /// Apply one command
    ///
    /// # Errors
    ///
    /// See [`apply_command`].
    pub fn apply(&mut self, command: &AbstractCommand) -> Result<()> {
        let key = command.path().as_str();
        match apply_command(self.documents.get(key), command)? {
            Some(doc) => {
                self.documents.insert(key.to_string(), doc);
            }
            None => {
                self.documents.remove(key);
            }
        }
        Ok(())
    }

    /// Apply commands in order, all or nothing
    ///
    /// # Errors
    ///
    /// The first failing command's error; the store is left untouched.
    pub fn apply_batch(&mut self, commands: &[AbstractCommand]) -> Result<()> {
        let mut staged = self.clone();
        for command in commands {
            staged.apply(command)?;
        }
        *self = staged;
        Ok(())
    }
}

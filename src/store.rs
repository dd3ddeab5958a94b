use crate::error::Result;
use crate::model::Record;

/// A keyed record sink the harvester writes new and updated records into.
///
/// `upsert` is insert-or-replace on `name` and must keep a `created_at` the
/// store already holds for that name. Calling it twice with the same record
/// leaves the store as after one call.
pub trait RecordStore {
    /// Short label used in log lines.
    fn label(&self) -> &'static str;

    fn upsert(&mut self, record: &Record) -> Result<()>;

    fn load_all(&self) -> Result<Vec<Record>>;
}

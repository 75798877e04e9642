use crate::error::StorageError;

/// Host key/value storage. One key holds one whole document; there are no
/// transactions spanning keys.
pub trait PersistenceAdapter {
    /// `Ok(None)` when nothing has been stored under `key` yet.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<A: PersistenceAdapter + ?Sized> PersistenceAdapter for Box<A> {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).write(key, value)
    }
}

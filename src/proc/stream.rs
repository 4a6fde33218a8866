//! In-memory streams addressed by stream ids

use std::collections::HashMap;

use crate::core::ids::{Id, IdAllocator, IdError};

/// A byte stream: writes append, reads drain
#[derive(Debug, Default)]
pub struct Stream {
    buf: String,
}

impl Stream {
    pub fn write(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn read(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// All open streams in a session
#[derive(Debug, Default)]
pub struct StreamTable {
    ids: IdAllocator,
    streams: HashMap<Id, Stream>,
}

impl StreamTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an empty stream
    pub fn open(&mut self) -> Id {
        let id = self.ids.alloc();
        self.streams.insert(id, Stream::default());
        id
    }

    /// Close a stream, discarding unread data
    pub fn close(&mut self, id: Id) -> Result<(), IdError> {
        self.ids.free(id)?;
        self.streams.remove(&id);
        Ok(())
    }

    /// Append to a stream; false if it is not open
    pub fn write(&mut self, id: Id, text: &str) -> bool {
        match self.streams.get_mut(&id) {
            Some(stream) => {
                stream.write(text);
                true
            }
            None => false,
        }
    }

    /// Drain a stream; None if it is not open
    pub fn read(&mut self, id: Id) -> Option<String> {
        self.streams.get_mut(&id).map(Stream::read)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_drains() {
        let mut table = StreamTable::new();
        let fd = table.open();
        assert!(table.write(fd, "ab"));
        assert!(table.write(fd, "c"));
        assert_eq!(table.read(fd).as_deref(), Some("abc"));
        assert_eq!(table.read(fd).as_deref(), Some(""));
    }

    #[test]
    fn test_closed_stream() {
        let mut table = StreamTable::new();
        let fd = table.open();
        table.close(fd).unwrap();

        assert!(!table.write(fd, "x"));
        assert_eq!(table.read(fd), None);
        assert_eq!(table.close(fd), Err(IdError::DoubleFree(fd)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_ids_are_reused() {
        let mut table = StreamTable::new();
        let a = table.open();
        let b = table.open();
        assert_ne!(a, b);
        table.close(a).unwrap();
        assert_eq!(table.open(), a);
        assert_eq!(table.len(), 2);
    }
}

//! Line history for the shell
//!
//! Keeps committed lines in memory, newest last. Nothing is written to disk.

/// Default maximum number of history entries
pub const HISTORY_LIMIT: usize = 1000;

/// Committed line storage
#[derive(Debug, Clone)]
pub struct History {
    /// All entries (newest last)
    entries: Vec<String>,
    /// Maximum entries
    max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }

    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Add a committed line
    pub fn add(&mut self, line: &str) {
        // Skip empty or whitespace-only lines
        if line.trim().is_empty() {
            return;
        }

        // Skip if same as last line (dedup consecutive)
        if self.entries.last().map(String::as_str) == Some(line) {
            return;
        }

        self.entries.push(line.to_string());

        // Trim if exceeding limit
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
    }

    /// Entry by age, oldest first
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Search by case-insensitive substring (newest first)
    pub fn search(&self, query: &str) -> Vec<&str> {
        let query_lower = query.to_lowercase();
        self.entries
            .iter()
            .rev()
            .filter(|e| e.to_lowercase().contains(&query_lower))
            .map(String::as_str)
            .collect()
    }

    /// Get recent history (newest first)
    pub fn recent(&self, count: usize) -> Vec<&str> {
        self.entries.iter().rev().take(count).map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Insertion-ordered name/value table with case-insensitive lookup.
//!
//! Used for both request and response headers. Unlike `http::HeaderMap`, the
//! table keeps the exact order fields were added in and the spelling of each
//! name, so a response is written out exactly as the handler built it.

/// An ordered multimap of header fields.
///
/// [`add`](HeaderTable::add) always appends, keeping duplicates;
/// [`set`](HeaderTable::set) replaces every existing field of that name with a
/// single entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTable {
    entries: Vec<(String, String)>,
}

impl HeaderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, keeping any existing fields with the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Adds a field or replaces every existing field with the same name.
    ///
    /// The replacement takes the position of the first existing field.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.position(&name) {
            Some(index) => {
                let mut current = 0;
                self.entries.retain(|(existing, _)| {
                    let keep = current <= index || !existing.eq_ignore_ascii_case(&name);
                    current += 1;
                    keep
                });
                self.entries[index] = (name, value);
            }
            None => self.entries.push((name, value)),
        }
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// Every value stored under `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries.iter().filter(move |(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Removes every field named `name`, returning how many were dropped.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_duplicates() {
        let mut table = HeaderTable::new();
        for i in 0..3 {
            table.add("Set-Cookie", format!("c{i}=v"));
        }

        assert_eq!(table.len(), 3);
        assert_eq!(table.get_all("set-cookie").collect::<Vec<_>>(), vec!["c0=v", "c1=v", "c2=v"]);
        assert_eq!(table.get("SET-COOKIE"), Some("c0=v"));
    }

    #[test]
    fn set_leaves_single_latest_entry() {
        let mut table = HeaderTable::new();
        table.add("Accept", "*/*");
        table.add("X-Trace", "1");
        table.add("Host", "a");
        table.add("x-trace", "2");

        table.set("X-TRACE", "3");

        assert_eq!(table.len(), 3);
        assert_eq!(table.get_all("x-trace").collect::<Vec<_>>(), vec!["3"]);
        let names: Vec<_> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Accept", "X-TRACE", "Host"]);

        table.set("Server", "abyss");
        assert_eq!(table.iter().last(), Some(("Server", "abyss")));
    }

    #[test]
    fn remove_and_contains() {
        let mut table = HeaderTable::new();
        table.add("a", "1");
        table.add("B", "2");
        table.add("A", "3");

        assert!(table.contains("b"));
        assert_eq!(table.remove("a"), 2);
        assert!(!table.contains("A"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.remove("a"), 0);
    }
}

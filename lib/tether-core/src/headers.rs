//! Header map with case-insensitive lookup.
//!
//! Names are compared ASCII case-insensitively but stored exactly as they
//! were inserted, so the transport transmits the caller's spelling.

/// Ordered collection of HTTP headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of a header, looked up case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|index| self.entries.get(index))
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` if a header with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Sets a header, replacing any existing header with the same name.
    ///
    /// The replaced entry takes the new spelling of the name. Returns the
    /// previous value if there was one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self
            .position(&name)
            .and_then(|index| self.entries.get_mut(index))
        {
            Some(entry) => {
                let (_, previous) = std::mem::replace(entry, (name, value));
                Some(previous)
            }
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Sets a header only if no header with the same name exists.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.entries.push((name, value.into()));
        }
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name)
            .map(|index| self.entries.remove(index))
            .map(|(_, value)| value)
    }

    /// Merges `other` into `self`; headers from `other` win on collision.
    pub fn merge(&mut self, other: &Self) {
        for (name, value) in other {
            self.insert(name, value);
        }
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl<K, V> Extend<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let headers: Headers = [("Content-Type", "application/json")].into_iter().collect();

        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert!(headers.contains("Content-type"));
        assert_eq!(headers.get("Accept"), None);
    }

    #[test]
    fn insert_replaces_and_keeps_new_spelling() {
        let mut headers = Headers::new();
        headers.insert("x-trace", "1");
        let previous = headers.insert("X-Trace", "2");

        assert_eq!(previous.as_deref(), Some("1"));
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec![("X-Trace", "2")]);
    }

    #[test]
    fn insert_if_absent_keeps_existing() {
        let mut headers = Headers::new();
        headers.insert("content-type", "text/plain");
        headers.insert_if_absent("Content-Type", "application/json");

        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn merge_prefers_other() {
        let mut defaults: Headers = [("X", "2"), ("Y", "default")].into_iter().collect();
        let caller: Headers = [("x", "1")].into_iter().collect();
        defaults.merge(&caller);

        assert_eq!(defaults.get("X"), Some("1"));
        assert_eq!(defaults.get("Y"), Some("default"));
        assert_eq!(defaults.len(), 2);
    }

    #[test]
    fn remove_header() {
        let mut headers: Headers = [("Accept", "*/*")].into_iter().collect();
        assert_eq!(headers.remove("accept").as_deref(), Some("*/*"));
        assert!(headers.is_empty());
        assert_eq!(headers.remove("accept"), None);
    }
}

// Field mappings: logical field name -> column index

use std::fmt;

/// Ordered mapping from logical field names to column indices.
///
/// Iteration follows insertion order; re-inserting an existing name keeps
/// its position. Indices are never checked against row length.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldMapping {
    entries: Vec<(String, usize)>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut mapping = Self::new();
        for (name, index) in pairs {
            mapping.insert(name, index);
        }
        mapping
    }

    pub fn insert(&mut self, name: impl Into<String>, index: usize) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = index,
            None => self.entries.push((name, index)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<usize> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, i)| *i)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(n, i)| (n.as_str(), *i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(n, i)| format!("{}={}", n, i)).collect();
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order() {
        let mut mapping = FieldMapping::from_pairs([("x", 0), ("y", 3)]);
        mapping.insert("legend", 1);
        mapping.insert("x", 2);
        let pairs: Vec<_> = mapping.iter().collect();
        assert_eq!(pairs, vec![("x", 2), ("y", 3), ("legend", 1)]);
    }

    #[test]
    fn test_remove() {
        let mut mapping = FieldMapping::from_pairs([("x", 0), ("legend", 1)]);
        assert_eq!(mapping.remove("legend"), Some(1));
        assert_eq!(mapping.remove("legend"), None);
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_display() {
        let mapping = FieldMapping::from_pairs([("x", 0), ("y", 2)]);
        assert_eq!(mapping.to_string(), "x=0,y=2");
        assert_eq!(FieldMapping::new().to_string(), "");
    }
}

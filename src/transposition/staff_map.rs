use std::collections::BTreeMap;

/// Staff key standing for "every staff not set on its own"
pub const ALL_STAVES: i32 = -1;

/// Values keyed by staff `@n`, with a fallback for all staves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffMap<T> {
    entries: BTreeMap<i32, T>,
}

impl<T> Default for StaffMap<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> StaffMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The staff's own entry, else the entry for all staves
    pub fn get(&self, staff_n: i32) -> Option<&T> {
        self.entries
            .get(&staff_n)
            .or_else(|| self.entries.get(&ALL_STAVES))
    }

    pub fn insert(&mut self, staff_n: i32, value: T) {
        self.entries.insert(staff_n, value);
    }

    /// Replace every entry by one applying to all staves
    pub fn set_all(&mut self, value: T) {
        self.entries.clear();
        self.entries.insert(ALL_STAVES, value);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries of individual staves, the fallback excluded
    pub fn staff_values(&self) -> impl Iterator<Item = &T> {
        self.entries
            .iter()
            .filter(|(&n, _)| n != ALL_STAVES)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_entry_shadows_fallback() {
        let mut map = StaffMap::new();
        map.insert(ALL_STAVES, "global");
        map.insert(2, "second");

        assert_eq!(map.get(2), Some(&"second"));
        assert_eq!(map.get(1), Some(&"global"));
        assert_eq!(map.get(ALL_STAVES), Some(&"global"));
    }

    #[test]
    fn test_set_all_drops_staff_entries() {
        let mut map = StaffMap::new();
        map.insert(3, 5);
        map.set_all(1);
        assert_eq!(map.get(3), Some(&1));
        assert_eq!(map.staff_values().count(), 0);
    }

    #[test]
    fn test_empty_map() {
        let map: StaffMap<i32> = StaffMap::new();
        assert_eq!(map.get(1), None);
    }
}

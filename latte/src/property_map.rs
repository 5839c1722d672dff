use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;

use ahash::AHasher;

/// Depth of the search tree that lives inside every bucket.
pub const TREE_DEPTH: usize = 4;
/// Number of entries per bucket (a complete tree of [`TREE_DEPTH`] levels).
pub const TREE_LEN: usize = (1 << TREE_DEPTH) - 1;
pub const DEFAULT_BUCKETS: usize = 101;

/// Open-addressed hash map whose buckets are small binary search trees.
///
/// Every bucket is a complete tree of [`TREE_LEN`] entries stored in
/// preorder: the root sits at offset 0, the subtree holding larger keys
/// directly follows its parent, and the subtree holding smaller keys starts
/// after it. When a lookup path runs off the bottom of a full tree, the whole
/// table doubles its bucket count and rehashes.
///
/// `K::default()` and `V::default()` are reserved sentinels:
/// - a slot is vacant when both halves are the sentinel,
/// - a slot is a tombstone when the key is set but the value is the sentinel.
///
/// Removal only clears the value, so the tree shape below a removed key is
/// preserved and the key can later be revived in place.
///
/// Storage is allocated on the first insertion, so a map that never holds a
/// key costs no more than its header.
#[derive(Clone)]
pub struct PropertyMap<K, V> {
    entries: Box<[(K, V)]>,
    bucket_count: usize,
    len: usize,
}

enum Search {
    /// No storage has been allocated yet.
    Unallocated,
    /// The key is stored at this index (live or tombstoned).
    Found(usize),
    /// The key is absent; this is where it would be placed.
    Vacant(usize),
    /// The key is absent and its path in the bucket is exhausted.
    Full,
}

fn vacant_entries<K: Default, V: Default>(count: usize) -> Box<[(K, V)]> {
    (0..count).map(|_| (K::default(), V::default())).collect()
}

impl<K, V> PropertyMap<K, V>
where
    K: Copy + Ord + Hash + Default,
    V: Copy + PartialEq + Default,
{
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    /// Create an empty map with `bucket_count` buckets (at least one).
    /// Nothing is allocated until the first [`put`](Self::put).
    pub fn with_buckets(bucket_count: usize) -> Self {
        Self {
            entries: Box::default(),
            bucket_count: bucket_count.max(1),
            len: 0,
        }
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Entry slots currently backed by storage; zero until the first insert.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        match self.search(key) {
            Search::Found(index) => {
                let (_, value) = &self.entries[index];
                (*value != V::default()).then_some(value)
            }
            Search::Unallocated | Search::Vacant(_) | Search::Full => None,
        }
    }

    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite `key`.
    ///
    /// Writing the sentinel value is the same as [`remove`](Self::remove).
    pub fn put(&mut self, key: K, value: V) {
        debug_assert!(key != K::default(), "the sentinel key cannot be stored");
        if value == V::default() {
            self.remove(&key);
            return;
        }

        loop {
            match self.search(&key) {
                Search::Found(index) => {
                    let entry = &mut self.entries[index];
                    if entry.1 == V::default() {
                        self.len += 1;
                    }
                    entry.1 = value;
                    return;
                }
                Search::Vacant(index) => {
                    self.entries[index] = (key, value);
                    self.len += 1;
                    return;
                }
                Search::Full => self.grow(),
                Search::Unallocated => {
                    self.entries = vacant_entries(self.bucket_count * TREE_LEN);
                }
            }
        }
    }

    /// Tombstone `key`. Returns `true` iff a live entry was cleared.
    pub fn remove(&mut self, key: &K) -> bool {
        let Search::Found(index) = self.search(key) else {
            return false;
        };

        let entry = &mut self.entries[index];
        if entry.1 == V::default() {
            return false;
        }
        entry.1 = V::default();
        self.len -= 1;
        true
    }

    /// Drop every entry and release the storage, keeping the bucket count.
    pub fn clear(&mut self) {
        self.entries = Box::default();
        self.len = 0;
    }

    /// Live entries in storage order (bucket, then tree slot).
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    #[inline]
    fn bucket_base(&self, key: &K) -> usize {
        let mut hasher = AHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() as usize % self.bucket_count) * TREE_LEN
    }

    #[inline]
    fn is_vacant(&self, index: usize) -> bool {
        let (key, value) = &self.entries[index];
        *key == K::default() && *value == V::default()
    }

    fn search(&self, key: &K) -> Search {
        if self.entries.is_empty() {
            return Search::Unallocated;
        }
        let mut index = self.bucket_base(key);
        for level in 0..TREE_DEPTH {
            if self.is_vacant(index) {
                return Search::Vacant(index);
            }

            let stored = &self.entries[index].0;
            if stored == key {
                return Search::Found(index);
            }

            if stored < key {
                index += 1;
            } else {
                index += 1 << (TREE_DEPTH - level - 1);
            }
        }
        Search::Full
    }

    fn grow(&mut self) {
        let old_buckets = self.bucket_count;
        self.bucket_count *= 2;
        let old = mem::replace(
            &mut self.entries,
            vacant_entries(self.bucket_count * TREE_LEN),
        );
        self.len = 0;

        log::debug!(
            "property map grows from {} to {} buckets",
            old_buckets,
            self.bucket_count
        );

        for &(key, value) in old.iter() {
            if value != V::default() {
                self.put(key, value);
            }
        }
    }
}

impl<K, V> Default for PropertyMap<K, V>
where
    K: Copy + Ord + Hash + Default,
    V: Copy + PartialEq + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for PropertyMap<K, V>
where
    K: fmt::Debug + Default + PartialEq,
    V: fmt::Debug + Default + PartialEq,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let live = Iter::<K, V> {
            inner: self.entries.iter(),
        };
        f.debug_map().entries(live).finish()
    }
}

impl<K, V> Extend<(K, V)> for PropertyMap<K, V>
where
    K: Copy + Ord + Hash + Default,
    V: Copy + PartialEq + Default,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyMap<K, V>
where
    K: Copy + Ord + Hash + Default,
    V: Copy + PartialEq + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V> IntoIterator for &'a PropertyMap<K, V>
where
    K: PartialEq + Default,
    V: PartialEq + Default,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        Iter {
            inner: self.entries.iter(),
        }
    }
}

/// Iterator over the live entries of a [`PropertyMap`].
pub struct Iter<'a, K, V> {
    inner: std::slice::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: PartialEq + Default,
    V: PartialEq + Default,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .by_ref()
            .find(|(_, value)| *value != V::default())
            .map(|(key, value)| (key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    /// Keys 1..=15 in level order, which fills a single bucket exactly.
    const LEVEL_ORDER: [u32; 15] =
        [8, 4, 12, 2, 6, 10, 14, 1, 3, 5, 7, 9, 11, 13, 15];

    fn full_single_bucket() -> PropertyMap<u32, u32> {
        let mut map = PropertyMap::with_buckets(1);
        for key in LEVEL_ORDER {
            map.put(key, key * 10);
        }
        assert_eq!(map.bucket_count(), 1, "level order must not grow");
        map
    }

    #[test]
    fn size_tracks_distinct_keys() {
        let mut map = PropertyMap::<u32, u32>::new();
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());

        map.put(1, 50);
        assert_eq!(map.len(), 1);

        map.put(2, 100);
        assert_eq!(map.len(), 2);

        map.put(1, 150);
        assert_eq!(map.len(), 2);

        assert!(map.remove(&1));
        assert_eq!(map.len(), 1);
        assert!(!map.remove(&1), "second removal must report false");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn stores_and_overwrites() {
        let mut map = PropertyMap::<i64, i64>::new();
        assert_eq!(map.get(&1), None);

        map.put(1, 50);
        assert_eq!(map.get(&1), Some(&50));

        map.put(1, -50);
        assert_eq!(map.get(&1), Some(&-50));

        map.put(2, 999);
        assert_eq!(map.get(&1), Some(&-50));
        assert_eq!(map.get(&2), Some(&999));
    }

    #[test]
    fn growth_keeps_every_key() {
        let mut map = PropertyMap::<u32, u32>::new();
        for i in 1..9999 {
            map.put(i, i);
        }

        assert!(map.bucket_count() > DEFAULT_BUCKETS, "expected a rehash");
        assert_eq!(map.get(&765), Some(&765));
        assert_eq!(map.get(&53), Some(&53));
        assert_eq!(map.len(), 9998);
        for i in 1..9999 {
            assert_eq!(map.get(&i), Some(&i), "lost key {i} after growth");
        }
    }

    #[test]
    fn removal_leaves_siblings_alone() {
        let mut map = PropertyMap::<u32, u32>::new();
        for i in 1..9999 {
            map.put(i, i);
        }
        for key in [10, 20, 30, 35, 40] {
            assert!(map.remove(&key));
        }

        for key in [10, 20, 30, 35, 40] {
            assert_eq!(map.get(&key), None);
        }
        for key in [11, 12, 13, 14, 111] {
            assert_eq!(map.get(&key), Some(&key));
        }
        assert_eq!(map.len(), 9998 - 5);
    }

    #[test]
    fn tombstone_on_path_keeps_descendants_reachable() {
        let mut map = PropertyMap::<u32, u32>::with_buckets(1);
        map.put(8, 80);
        map.put(4, 40);
        map.put(2, 20);

        assert!(map.remove(&4));
        assert_eq!(map.get(&4), None);
        assert_eq!(map.get(&2), Some(&20), "key below a tombstone vanished");

        // routes past the tombstone to a vacant slot
        map.put(6, 60);
        assert_eq!(map.get(&6), Some(&60));

        // revives in place
        map.put(4, 41);
        assert_eq!(map.get(&4), Some(&41));
        assert_eq!(map.bucket_count(), 1);
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn churn_on_one_key_never_grows() {
        let mut map = full_single_bucket();
        for round in 0..100 {
            assert!(map.remove(&8));
            assert_eq!(map.get(&4), Some(&40));
            assert_eq!(map.get(&15), Some(&150));
            map.put(8, round + 1);
        }
        assert_eq!(map.bucket_count(), 1);
        assert_eq!(map.len(), 15);

        // a sixteenth key has nowhere to go
        map.put(16, 160);
        assert!(map.bucket_count() >= 2);
        assert_eq!(map.len(), 16);
        for key in LEVEL_ORDER {
            assert!(map.contains_key(&key));
        }
    }

    #[test]
    fn iteration_follows_storage_order() {
        let map = full_single_bucket();
        let keys: Vec<u32> = map.keys().copied().collect();
        assert_eq!(
            keys,
            vec![8, 12, 14, 15, 13, 10, 11, 9, 4, 6, 7, 5, 2, 3, 1]
        );
    }

    #[test]
    fn iteration_skips_tombstones_and_restarts() {
        let mut map = full_single_bucket();
        map.remove(&12);
        map.remove(&1);

        let first: Vec<(u32, u32)> =
            map.iter().map(|(k, v)| (*k, *v)).collect();
        let second: Vec<(u32, u32)> =
            (&map).into_iter().map(|(k, v)| (*k, *v)).collect();

        assert_eq!(first.len(), 13);
        assert_eq!(first, second);
        assert!(first.iter().all(|&(k, _)| k != 12 && k != 1));
    }

    #[test]
    fn sentinel_value_acts_as_removal() {
        let mut map = PropertyMap::<u32, u32>::new();
        map.put(3, 30);
        map.put(3, 0);
        assert_eq!(map.get(&3), None);
        assert!(map.is_empty());
    }

    #[test]
    fn shuffled_inserts_and_removals() {
        let mut rng = StdRng::seed_from_u64(0x1a7);
        let mut keys: Vec<u32> = (1..=2000).collect();
        keys.shuffle(&mut rng);

        let mut map: PropertyMap<u32, u32> =
            keys.iter().map(|&k| (k, k + 1)).collect();
        assert_eq!(map.len(), 2000);

        keys.shuffle(&mut rng);
        let (gone, kept) = keys.split_at(1000);
        for key in gone {
            assert!(map.remove(key));
        }
        for key in gone {
            assert_eq!(map.get(key), None);
        }
        for key in kept {
            assert_eq!(map.get(key), Some(&(key + 1)));
        }
        assert_eq!(map.iter().count(), 1000);
    }

    #[test]
    fn clear_empties_without_shrinking() {
        let mut map = PropertyMap::<u32, u32>::with_buckets(3);
        for i in 1..200 {
            map.put(i, i);
        }
        let buckets = map.bucket_count();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.bucket_count(), buckets);
        assert_eq!(map.capacity(), 0);
        assert_eq!(map.iter().next(), None);

        map.put(7, 70);
        assert_eq!(map.get(&7), Some(&70));
        assert_eq!(map.capacity(), buckets * TREE_LEN);
    }

    #[test]
    fn storage_is_allocated_on_first_insert() {
        let mut map = PropertyMap::<u32, u32>::new();
        assert_eq!(map.capacity(), 0);
        assert_eq!(map.bucket_count(), DEFAULT_BUCKETS);

        // reads and removals on an empty map never allocate
        assert_eq!(map.get(&3), None);
        assert!(!map.remove(&3));
        map.put(3, 0);
        assert_eq!(map.capacity(), 0);
        assert_eq!(format!("{map:?}"), "{}");

        map.put(3, 30);
        assert_eq!(map.capacity(), DEFAULT_BUCKETS * TREE_LEN);
        assert_eq!(map.get(&3), Some(&30));
        assert_eq!(format!("{map:?}"), "{3: 30}");

        let copy = PropertyMap::<u32, u32>::with_buckets(1).clone();
        assert_eq!(copy.capacity(), 0);
    }
}

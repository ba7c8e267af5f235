use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Mutex;

// Directory indices are masked out of a 64-bit hash; a bucket whose keys
// still collide at this depth can never be split apart.
const MAX_DEPTH: u32 = 64;

struct Bucket<K, V> {
    local_depth: u32,
    items: Vec<(K, V)>,
}

struct Directory<K, V> {
    global_depth: u32,
    /// Directory of indices into `buckets`; length is `1 << global_depth`.
    /// Splitting shares buckets between entries, so an arena of indices
    /// stands in for shared ownership.
    dir: Vec<usize>,
    buckets: Vec<Bucket<K, V>>,
}

/// Extendible hash table. Lookup is O(1) expected; growth doubles the
/// directory and redistributes a single bucket, never rehashing the rest.
pub struct ExtendibleHashTable<K, V, S = RandomState> {
    bucket_size: usize,
    hash_builder: S,
    inner: Mutex<Directory<K, V>>,
}

impl<K: Eq + Hash, V> ExtendibleHashTable<K, V, RandomState> {
    pub fn new(bucket_size: usize) -> Self {
        Self::with_hasher(bucket_size, RandomState::new())
    }
}

impl<K: Eq + Hash, V, S: BuildHasher> ExtendibleHashTable<K, V, S> {
    pub fn with_hasher(bucket_size: usize, hash_builder: S) -> Self {
        assert!(bucket_size > 0);
        ExtendibleHashTable {
            bucket_size,
            hash_builder,
            inner: Mutex::new(Directory {
                global_depth: 0,
                dir: vec![0],
                buckets: vec![Bucket {
                    local_depth: 0,
                    items: Vec::with_capacity(bucket_size),
                }],
            }),
        }
    }

    fn hash(&self, key: &K) -> u64 {
        let mut hasher = self.hash_builder.build_hasher();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn index_of(hash: u64, global_depth: u32) -> usize {
        (hash as usize) & ((1usize << global_depth) - 1)
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let dir = self.inner.lock().unwrap();
        let idx = Self::index_of(self.hash(key), dir.global_depth);
        let bucket = &dir.buckets[dir.dir[idx]];
        bucket
            .items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Insert `key -> value`, overwriting the value if the key is present.
    /// Full buckets split, doubling the directory when the splitting
    /// bucket's local depth has caught up with the global depth.
    pub fn insert(&self, key: K, value: V) {
        let hash = self.hash(&key);
        let mut dir = self.inner.lock().unwrap();
        loop {
            let idx = Self::index_of(hash, dir.global_depth);
            let target = dir.dir[idx];
            let bucket = &mut dir.buckets[target];

            if let Some(slot) = bucket.items.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = value;
                return;
            }
            if bucket.items.len() < self.bucket_size {
                bucket.items.push((key, value));
                return;
            }

            let local_depth = bucket.local_depth;
            assert!(
                local_depth < MAX_DEPTH,
                "bucket cannot be split: every key shares the same 64-bit hash"
            );

            if local_depth == dir.global_depth {
                for i in 0..dir.dir.len() {
                    let entry = dir.dir[i];
                    dir.dir.push(entry);
                }
                dir.global_depth += 1;
            }

            dir.buckets[target].local_depth = local_depth + 1;
            let sibling = dir.buckets.len();
            dir.buckets.push(Bucket {
                local_depth: local_depth + 1,
                items: Vec::with_capacity(self.bucket_size),
            });

            // Entries whose newly significant bit is set move to the sibling.
            for i in 0..dir.dir.len() {
                if dir.dir[i] == target && (i >> local_depth) & 1 == 1 {
                    dir.dir[i] = sibling;
                }
            }

            let spilled = std::mem::take(&mut dir.buckets[target].items);
            for (k, v) in spilled {
                let i = Self::index_of(self.hash(&k), dir.global_depth);
                let home = dir.dir[i];
                dir.buckets[home].items.push((k, v));
            }
            // Retry; the key's bucket may have split into a still-full half.
        }
    }

    /// Delete every entry equal to `key`; true if at least one was removed.
    /// Buckets are never merged and the directory never shrinks.
    pub fn remove(&self, key: &K) -> bool {
        let mut dir = self.inner.lock().unwrap();
        let idx = Self::index_of(self.hash(key), dir.global_depth);
        let target = dir.dir[idx];
        let bucket = &mut dir.buckets[target];
        let before = bucket.items.len();
        bucket.items.retain(|(k, _)| k != key);
        bucket.items.len() != before
    }

    pub fn global_depth(&self) -> u32 {
        self.inner.lock().unwrap().global_depth
    }

    pub fn local_depth(&self, dir_index: usize) -> u32 {
        let dir = self.inner.lock().unwrap();
        dir.buckets[dir.dir[dir_index]].local_depth
    }

    pub fn num_buckets(&self) -> usize {
        self.inner.lock().unwrap().buckets.len()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        let dir = self.inner.lock().unwrap();
        dir.buckets.iter().map(|b| b.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structural sanity: directory size matches the global depth, local
    /// depths never exceed it, and entries agreeing on a bucket's low
    /// `local_depth` bits point at that same bucket.
    #[cfg(test)]
    pub(crate) fn verify_integrity(&self) {
        let dir = self.inner.lock().unwrap();
        assert_eq!(dir.dir.len(), 1usize << dir.global_depth);
        for &b in &dir.dir {
            assert!(dir.buckets[b].local_depth <= dir.global_depth);
        }
        for i in 0..dir.dir.len() {
            for j in 0..dir.dir.len() {
                let depth = dir.buckets[dir.dir[i]].local_depth;
                let mask = (1usize << depth) - 1;
                if i & mask == j & mask {
                    assert_eq!(dir.dir[i], dir.dir[j]);
                }
            }
        }
        for bucket in &dir.buckets {
            assert!(bucket.items.len() <= self.bucket_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// Hasher that passes integer keys through unchanged, so tests can
    /// steer keys into chosen directory slots.
    #[derive(Clone, Default)]
    struct IdentityState;

    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            let mut buf = [0u8; 8];
            let n = bytes.len().min(8);
            buf[..n].copy_from_slice(&bytes[..n]);
            self.0 = u64::from_le_bytes(buf);
        }

        fn write_u32(&mut self, i: u32) {
            self.0 = i as u64;
        }

        fn write_u64(&mut self, i: u64) {
            self.0 = i;
        }

        fn write_usize(&mut self, i: usize) {
            self.0 = i as u64;
        }
    }

    impl BuildHasher for IdentityState {
        type Hasher = IdentityHasher;

        fn build_hasher(&self) -> IdentityHasher {
            IdentityHasher(0)
        }
    }

    fn identity_table(bucket_size: usize) -> ExtendibleHashTable<u64, u64, IdentityState> {
        ExtendibleHashTable::with_hasher(bucket_size, IdentityState)
    }

    #[test]
    fn test_insert_then_find() {
        let table = ExtendibleHashTable::new(4);
        table.insert(1, "a");
        table.insert(2, "b");
        assert_eq!(table.get(&1), Some("a"));
        assert_eq!(table.get(&2), Some("b"));
        assert_eq!(table.get(&3), None);
    }

    #[test]
    fn test_insert_overwrites() {
        let table = ExtendibleHashTable::new(4);
        table.insert(1, 10);
        table.insert(1, 20);
        assert_eq!(table.get(&1), Some(20));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let table = ExtendibleHashTable::new(4);
        table.insert(7, 70);
        assert!(table.remove(&7));
        assert!(!table.remove(&7));
        assert_eq!(table.get(&7), None);
    }

    #[test]
    fn test_directory_doubling() {
        // Even keys all land in slot 0 at depth 1, so the second split has
        // to double the directory again before 2 and {0, 4} separate on
        // their second bit.
        let table = identity_table(2);
        table.insert(0, 0);
        table.insert(2, 2);
        table.insert(4, 4);

        assert_eq!(table.global_depth(), 2);
        assert_eq!(table.num_buckets(), 3);
        assert_eq!(table.get(&0), Some(0));
        assert_eq!(table.get(&2), Some(2));
        assert_eq!(table.get(&4), Some(4));
        table.verify_integrity();
    }

    #[test]
    fn test_split_distributes_shared_entries() {
        // After two doublings four directory entries exist; splitting a
        // bucket shared by more than two entries must reassign exactly the
        // entries whose new bit is set, not a single fixed offset.
        let table = identity_table(2);
        for key in [0u64, 1, 2, 3, 4, 5, 6, 7] {
            table.insert(key, key * 10);
        }
        for key in [0u64, 1, 2, 3, 4, 5, 6, 7] {
            assert_eq!(table.get(&key), Some(key * 10));
        }
        table.verify_integrity();
    }

    #[test]
    fn test_grow_with_default_hasher() {
        let table = ExtendibleHashTable::new(4);
        for key in 0u32..500 {
            table.insert(key, key as usize);
        }
        assert_eq!(table.len(), 500);
        for key in 0u32..500 {
            assert_eq!(table.get(&key), Some(key as usize));
        }
        table.verify_integrity();
    }

    #[test]
    fn test_remove_after_growth() {
        let table = ExtendibleHashTable::new(2);
        for key in 0u32..64 {
            table.insert(key, key);
        }
        for key in (0u32..64).step_by(2) {
            assert!(table.remove(&key));
        }
        assert_eq!(table.len(), 32);
        for key in 0u32..64 {
            let expected = if key % 2 == 0 { None } else { Some(key) };
            assert_eq!(table.get(&key), expected);
        }
        table.verify_integrity();
    }

    #[test]
    fn test_concurrent_inserts() {
        let table = ExtendibleHashTable::new(4);
        thread::scope(|s| {
            for t in 0u32..4 {
                let table = &table;
                s.spawn(move || {
                    for i in 0..100 {
                        let key = t * 100 + i;
                        table.insert(key, key);
                    }
                });
            }
        });
        assert_eq!(table.len(), 400);
        for key in 0u32..400 {
            assert_eq!(table.get(&key), Some(key));
        }
        table.verify_integrity();
    }
}

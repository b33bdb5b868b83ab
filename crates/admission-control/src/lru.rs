//! 크기 제한 LRU 캐시
//!
//! 항목 수가 아니라 바이트 예산으로 용량을 관리합니다.
//! - 전체 크기가 `max_bytes`를 넘으면 가장 오래 사용되지 않은 항목부터 제거
//! - `max_item_bytes`보다 큰 항목은 저장하지 않음
//!
//! 모든 메서드는 `&self`를 받으며 내부 `Mutex`로 동기화됩니다.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use parking_lot::Mutex;

/// 캐시 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 항목 수
    pub count: usize,
    /// 전체 크기 (바이트)
    pub bytes: u64,
}

struct Slot<V> {
    value: V,
    size: u64,
    tick: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, Slot<V>>,
    /// 사용 순서 (tick → key), 가장 작은 tick이 가장 오래됨
    order: BTreeMap<u64, K>,
    tick: u64,
    bytes: u64,
    max_bytes: u64,
    max_item_bytes: u64,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &K) {
        let tick = self.next_tick();
        if let Some(slot) = self.entries.get_mut(key) {
            self.order.remove(&slot.tick);
            slot.tick = tick;
            self.order.insert(tick, key.clone());
        }
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.tick);
        self.bytes -= slot.size;
        Some(slot.value)
    }

    fn insert(&mut self, key: K, value: V, size: u64) -> bool {
        self.remove(&key);
        if size > self.max_item_bytes || size > self.max_bytes {
            return false;
        }
        let tick = self.next_tick();
        self.order.insert(tick, key.clone());
        self.entries.insert(key, Slot { value, size, tick });
        self.bytes += size;
        self.evict();
        true
    }

    fn evict(&mut self) {
        while self.bytes > self.max_bytes {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            if let Some(slot) = self.entries.remove(&oldest) {
                self.bytes -= slot.size;
            }
        }
    }
}

/// 크기 제한 LRU 캐시
pub struct SizedLruCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    size_of: fn(&K, &V) -> u64,
}

impl<K: Eq + Hash + Clone, V: Clone> SizedLruCache<K, V> {
    /// 새 캐시를 생성합니다.
    ///
    /// `size_of`는 항목 하나의 크기(바이트)를 계산합니다.
    pub fn new(max_bytes: u64, max_item_bytes: u64, size_of: fn(&K, &V) -> u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                tick: 0,
                bytes: 0,
                max_bytes,
                max_item_bytes,
            }),
            size_of,
        }
    }

    /// 항목을 추가하거나 교체합니다.
    ///
    /// 항목이 너무 커서 저장하지 않았으면 `false`를 반환하며, 같은 키의 이전 값도 제거됩니다.
    pub fn add(&self, key: K, value: V) -> bool {
        let size = (self.size_of)(&key, &value);
        self.inner.lock().insert(key, value, size)
    }

    /// 항목을 조회하고 최근 사용으로 표시합니다.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let value = inner.entries.get(key).map(|slot| slot.value.clone())?;
        inner.touch(key);
        Some(value)
    }

    /// 현재 값에 대해 `pred`가 참일 때만 값을 설정합니다.
    ///
    /// 확인과 설정은 하나의 락 안에서 수행됩니다. 실제로 저장되었으면 `true`를 반환합니다.
    pub fn test_and_set(&self, key: K, value: V, pred: impl FnOnce(Option<&V>) -> bool) -> bool {
        let size = (self.size_of)(&key, &value);
        let mut inner = self.inner.lock();
        if !pred(inner.entries.get(&key).map(|slot| &slot.value)) {
            return false;
        }
        inner.insert(key, value, size)
    }

    /// 항목을 제거합니다.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// 항목 수와 전체 크기를 반환합니다.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            count: inner.entries.len(),
            bytes: inner.bytes,
        }
    }

    /// 전체 크기 상한을 변경합니다. 줄어들면 즉시 제거합니다.
    pub fn resize(&self, max_bytes: u64) {
        let mut inner = self.inner.lock();
        inner.max_bytes = max_bytes;
        inner.evict();
    }

    /// 모든 항목을 제거합니다.
    pub fn purge(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        inner.bytes = 0;
    }
}

impl<K, V> std::fmt::Debug for SizedLruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SizedLruCache")
            .field("count", &inner.entries.len())
            .field("bytes", &inner.bytes)
            .field("max_bytes", &inner.max_bytes)
            .field("max_item_bytes", &inner.max_item_bytes)
            .finish()
    }
}

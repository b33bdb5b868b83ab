//! 이미지 캐시 — 컨테이너 이미지 조회 결과를 다이제스트 단위로 보관
//!
//! 키는 이미지 다이제스트입니다. `flatten_image_data`가 켜져 있으면 같은 다이제스트라도
//! 이름이 다르면 별도 항목이 되도록 `(이름, 다이제스트)` 복합 키를 사용합니다.
//! 다이제스트가 없는 이미지는 태그가 바뀔 수 있으므로 캐시하지 않습니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use kubeward_core::metrics as m;
use kubeward_core::workload::{Container, Image};

use crate::lru::{CacheStats, SizedLruCache};

/// 이미지 캐시 키
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageCacheKey {
    /// 다이제스트
    Digest(String),
    /// 이름 + 다이제스트
    NameDigest { name: String, digest: String },
}

impl ImageCacheKey {
    /// 컨테이너 이미지의 캐시 키를 만듭니다. 다이제스트가 없으면 `None`입니다.
    pub fn for_container(container: &Container, flatten: bool) -> Option<Self> {
        let digest = container.image_digest.as_deref().filter(|d| !d.is_empty())?;
        Some(if flatten {
            Self::NameDigest {
                name: container.image.full_name.clone(),
                digest: digest.to_owned(),
            }
        } else {
            Self::Digest(digest.to_owned())
        })
    }

    fn approx_size(&self) -> u64 {
        match self {
            Self::Digest(digest) => digest.len() as u64,
            Self::NameDigest { name, digest } => (name.len() + digest.len()) as u64,
        }
    }
}

/// 캐시 항목
#[derive(Debug, Clone)]
pub struct ImageCacheEntry {
    /// 조회된 이미지
    pub image: Image,
    /// 조회 시각
    pub resolved_at: DateTime<Utc>,
}

fn scan_time(image: &Image) -> Option<DateTime<Utc>> {
    image.scan.as_ref().map(|scan| scan.scan_time)
}

fn entry_size(key: &ImageCacheKey, entry: &Arc<ImageCacheEntry>) -> u64 {
    key.approx_size() + entry.image.approx_size()
}

/// 이미지 캐시
#[derive(Debug)]
pub struct ImageCache {
    lru: SizedLruCache<ImageCacheKey, Arc<ImageCacheEntry>>,
    flatten: bool,
}

impl ImageCache {
    /// 바이트 예산으로 캐시를 생성합니다.
    pub fn new(max_bytes: u64, max_item_bytes: u64, flatten: bool) -> Self {
        Self {
            lru: SizedLruCache::new(max_bytes, max_item_bytes, entry_size),
            flatten,
        }
    }

    /// 복합 키 사용 여부
    pub fn is_flattened(&self) -> bool {
        self.flatten
    }

    /// 컨테이너 이미지를 조회합니다.
    pub fn get(&self, container: &Container) -> Option<Arc<ImageCacheEntry>> {
        let entry = ImageCacheKey::for_container(container, self.flatten)
            .and_then(|key| self.lru.get(&key));
        let result = if entry.is_some() { "hit" } else { "miss" };
        metrics::counter!(m::ADMISSION_IMAGE_CACHE_LOOKUPS_TOTAL, m::LABEL_RESULT => result)
            .increment(1);
        entry
    }

    /// 조회 결과를 저장합니다. 저장되었으면 `true`를 반환합니다.
    ///
    /// 이미 있는 항목보다 스캔 시각이 오래된 결과는 덮어쓰지 않습니다.
    /// 스캔이 없는 이미지는 가장 오래된 것으로 취급합니다.
    pub fn insert(&self, container: &Container, image: Image) -> bool {
        let Some(key) = ImageCacheKey::for_container(container, self.flatten) else {
            return false;
        };
        let scanned_at = scan_time(&image);
        let entry = Arc::new(ImageCacheEntry {
            image,
            resolved_at: Utc::now(),
        });
        self.lru.test_and_set(key, entry, |current| {
            current.is_none_or(|existing| scan_time(&existing.image) <= scanned_at)
        })
    }

    /// 모든 항목을 제거합니다.
    pub fn purge(&self) {
        self.lru.purge();
    }

    /// 캐시 통계
    pub fn stats(&self) -> CacheStats {
        self.lru.stats()
    }
}

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::scoring::SignalProfile;

/// Analysed reference recordings keyed by sentence id.
///
/// Profiles never change after insertion, so readers only hold the lock for
/// the map lookup and share the profile through an `Arc`.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    profiles: RwLock<HashMap<String, Arc<SignalProfile>>>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<SignalProfile>> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Returns the cached profile for `key`, building and storing it on a miss.
    ///
    /// The builder runs without the lock held. When two callers race on the
    /// same key, the first insertion wins and both receive it.
    pub fn get_or_try_insert_with<E, F>(
        &self,
        key: &str,
        build: F,
    ) -> std::result::Result<Arc<SignalProfile>, E>
    where
        F: FnOnce() -> std::result::Result<SignalProfile, E>,
    {
        if let Some(profile) = self.get(key) {
            debug!(key, "reference cache hit");
            return Ok(profile);
        }
        let profile = Arc::new(build()?);
        let mut profiles = self
            .profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = profiles.entry(key.to_owned()).or_insert(profile);
        debug!(key, "reference cached");
        Ok(Arc::clone(entry))
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeatureKind, FeatureSequence};

    fn profile(duration: f64) -> SignalProfile {
        SignalProfile::from_contours(
            FeatureSequence::empty(FeatureKind::Pitch, 100.0),
            FeatureSequence::empty(FeatureKind::Intensity, 100.0),
            duration,
        )
    }

    #[test]
    fn builds_once_per_key() {
        let cache = ReferenceCache::new();
        let first = cache
            .get_or_try_insert_with("ch1_1", || Ok::<_, ()>(profile(1.0)))
            .unwrap();
        let second = cache
            .get_or_try_insert_with("ch1_1", || -> Result<SignalProfile, ()> {
                panic!("cached profile should be reused")
            })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_build_is_not_cached() {
        let cache = ReferenceCache::new();
        let result = cache.get_or_try_insert_with("ch1_2", || Err("decode failed"));
        assert_eq!(result.unwrap_err(), "decode failed");
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = ReferenceCache::new();
        cache
            .get_or_try_insert_with("ch2_1", || Ok::<_, ()>(profile(2.0)))
            .unwrap();
        assert!(cache.invalidate("ch2_1"));
        assert!(cache.get("ch2_1").is_none());
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(ReferenceCache::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache
                        .get_or_try_insert_with("ch3_1", || Ok::<_, ()>(profile(3.0)))
                        .unwrap()
                        .duration
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 3.0);
        }
        assert_eq!(cache.len(), 1);
    }
}

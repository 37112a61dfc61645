use lingua_cache::{CacheConfig, CacheError, Priority, PriorityCache};
use lingua_memory::{BudgetLedger, MemoryBudget};

fn cache_with_budget(total: u64) -> (BudgetLedger, PriorityCache<Vec<u8>>) {
    let ledger = BudgetLedger::new(MemoryBudget::from_total(total));
    let cache = PriorityCache::new(ledger.clone(), CacheConfig::default());
    (ledger, cache)
}

#[test]
fn threshold_sweep_drops_low_before_medium_and_keeps_high() {
    let (ledger, cache) = cache_with_budget(512);

    cache.insert("low-1", vec![0; 150], Priority::Low).unwrap();
    cache.insert("low-2", vec![0; 150], Priority::Low).unwrap();
    cache.insert("medium", vec![0; 150], Priority::Medium).unwrap();
    cache.insert("high", vec![0; 150], Priority::High).unwrap();

    assert!(!cache.contains("low-1"));
    assert!(!cache.contains("low-2"));
    assert!(cache.contains("medium"));
    assert!(cache.contains("high"));
    assert_eq!(cache.size_bytes(), 300);
    assert_eq!(ledger.cache_usage(), 300);

    let stats = cache.stats();
    assert_eq!(stats.evictions, 2);
    assert_eq!(stats.by_priority.low.count, 0);
    assert_eq!(stats.by_priority.high.bytes, 150);
}

#[test]
fn medium_is_evicted_oldest_first_once_low_is_gone() {
    let (_ledger, cache) = cache_with_budget(1_000);

    cache.insert("m1", vec![0; 300], Priority::Medium).unwrap();
    cache.insert("m2", vec![0; 300], Priority::Medium).unwrap();
    cache.insert("h", vec![0; 300], Priority::High).unwrap();

    assert!(!cache.contains("m1"));
    assert!(cache.contains("m2"));
    assert!(cache.contains("h"));
}

#[test]
fn high_entries_survive_pressure_even_above_threshold() {
    let (ledger, cache) = cache_with_budget(100);

    cache.insert("a", vec![0; 45], Priority::High).unwrap();
    cache.insert("b", vec![0; 45], Priority::High).unwrap();

    assert_eq!(cache.len(), 2);
    assert_eq!(ledger.cache_usage(), 90);
    assert_eq!(cache.maybe_evict(), 0);
}

#[test]
fn insert_evicts_to_make_room_when_budget_is_full() {
    let ledger = BudgetLedger::new(MemoryBudget::from_total(100));
    let cache = PriorityCache::new(
        ledger.clone(),
        CacheConfig {
            eviction_threshold: 1.0,
            ..CacheConfig::default()
        },
    );
    ledger.reserve_resource(20).unwrap().commit();

    cache.insert("old", vec![0; 60], Priority::High).unwrap();
    cache.insert("low", vec![0; 10], Priority::Low).unwrap();
    assert!(cache.contains("low"));

    cache.insert("new", vec![0; 15], Priority::Medium).unwrap();

    assert!(!cache.contains("low"));
    assert!(cache.contains("new"));
    assert!(ledger.usage() <= ledger.total());
}

#[test]
fn insert_that_cannot_fit_changes_nothing() {
    let (ledger, cache) = cache_with_budget(100);
    cache.insert("pinned", vec![0; 50], Priority::High).unwrap();
    cache.insert("low", vec![0; 20], Priority::Low).unwrap();

    let err = cache
        .insert("huge", vec![0; 80], Priority::Low)
        .unwrap_err();

    assert!(matches!(err, CacheError::InsufficientMemory { ref key, size: 80, .. } if key == "huge"));
    assert!(cache.contains("low"));
    assert!(cache.contains("pinned"));
    assert_eq!(ledger.cache_usage(), 70);
}

#[test]
fn aggressive_clear_keeps_only_high() {
    let (ledger, cache) = cache_with_budget(10_000);
    cache.insert("h", vec![0; 10], Priority::High).unwrap();
    cache.insert("m1", vec![0; 10], Priority::Medium).unwrap();
    cache.insert("m2", vec![0; 10], Priority::Medium).unwrap();
    cache.insert("l", vec![0; 10], Priority::Low).unwrap();

    assert_eq!(cache.aggressive_clear(), 3);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains("h"));
    assert_eq!(ledger.cache_usage(), 10);
    assert_eq!(cache.stats().evictions, 3);
}

use lingua_cache::{CacheConfig, Priority, PriorityCache};
use lingua_memory::{BudgetLedger, MemoryBudget};

#[test]
fn resource_load_reclaims_evictable_entries() {
    let ledger = BudgetLedger::new(MemoryBudget::from_total(1_000));
    let cache: PriorityCache<Vec<u8>> = PriorityCache::new(
        ledger.clone(),
        CacheConfig {
            eviction_threshold: 1.0,
            ..CacheConfig::default()
        },
    );
    cache.insert("h", vec![0; 300], Priority::High).unwrap();
    cache.insert("m", vec![0; 300], Priority::Medium).unwrap();
    cache.insert("l", vec![0; 300], Priority::Low).unwrap();

    ledger.reserve_resource(350).unwrap().commit();

    assert!(cache.contains("h"));
    assert!(cache.contains("m"));
    assert!(!cache.contains("l"));
    assert_eq!(ledger.usage(), 950);
}

#[test]
fn high_entries_are_not_reclaimable() {
    let ledger = BudgetLedger::new(MemoryBudget::from_total(1_000));
    let cache: PriorityCache<Vec<u8>> = PriorityCache::new(
        ledger.clone(),
        CacheConfig {
            eviction_threshold: 1.0,
            ..CacheConfig::default()
        },
    );
    cache.insert("h", vec![0; 800], Priority::High).unwrap();
    cache.insert("l", vec![0; 100], Priority::Low).unwrap();

    assert!(ledger.reserve_resource(300).is_err());
    assert_eq!(cache.len(), 2);
    assert_eq!(ledger.usage(), 900);
}

use std::time::Duration;

use lingua_cache::{CacheConfig, Priority, PriorityCache};
use lingua_memory::{BudgetLedger, MemoryBudget};

fn config() -> CacheConfig {
    CacheConfig {
        ttl: Duration::from_secs(60),
        eviction_threshold: 0.8,
        sweep_interval: Duration::from_secs(10),
    }
}

#[tokio::test(start_paused = true)]
async fn expired_lookup_is_a_single_miss_and_expiration() {
    let ledger = BudgetLedger::new(MemoryBudget::from_total(1_000));
    let cache: PriorityCache<String> = PriorityCache::new(ledger.clone(), config());

    cache
        .insert("greeting", "hola".to_owned(), Priority::Medium)
        .unwrap();
    assert_eq!(cache.lookup("greeting").as_deref(), Some("hola"));

    tokio::time::advance(Duration::from_secs(60)).await;

    assert_eq!(cache.lookup("greeting"), None);
    assert_eq!(cache.lookup("greeting"), None);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.evictions, 0);
    assert_eq!(ledger.cache_usage(), 0);
}

#[tokio::test(start_paused = true)]
async fn custom_ttl_overrides_the_default() {
    let ledger = BudgetLedger::new(MemoryBudget::from_total(1_000));
    let cache: PriorityCache<String> = PriorityCache::new(ledger, config());

    cache
        .insert_with_ttl("short", "a".to_owned(), Priority::High, Duration::from_secs(5))
        .unwrap();
    cache.insert("long", "b".to_owned(), Priority::Low).unwrap();

    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(!cache.contains("short"));
    assert!(cache.contains("long"));
}

#[tokio::test(start_paused = true)]
async fn unbounded_ttl_never_expires_and_keeps_the_ledger_in_sync() {
    let ledger = BudgetLedger::new(MemoryBudget::from_total(1_000));
    let cache: PriorityCache<Vec<u8>> = PriorityCache::new(ledger.clone(), config());

    cache
        .insert_with_ttl("pinned", vec![0; 40], Priority::Medium, Duration::MAX)
        .unwrap();
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.size_bytes(), 40);
    assert_eq!(ledger.cache_usage(), 40);

    tokio::time::advance(Duration::from_secs(365 * 24 * 60 * 60)).await;
    assert_eq!(cache.sweep_expired(), 0);
    assert_eq!(cache.lookup("pinned").map(|payload| payload.len()), Some(40));

    cache
        .insert_with_ttl("pinned", vec![0; 10], Priority::Medium, Duration::MAX)
        .unwrap();
    assert_eq!(ledger.cache_usage(), 10);
    assert_eq!(cache.remove("pinned").map(|payload| payload.len()), Some(10));
    assert_eq!(ledger.cache_usage(), 0);
}

#[tokio::test(start_paused = true)]
async fn sweeper_drops_expired_entries_in_the_background() {
    let ledger = BudgetLedger::new(MemoryBudget::from_total(1_000));
    let cache: PriorityCache<Vec<u8>> = PriorityCache::new(ledger.clone(), config());
    let sweeper = cache.spawn_sweeper();

    cache.insert("a", vec![0; 10], Priority::High).unwrap();
    cache
        .insert_with_ttl("b", vec![0; 10], Priority::Low, Duration::from_secs(600))
        .unwrap();

    tokio::time::sleep(Duration::from_secs(75)).await;

    assert_eq!(cache.len(), 1);
    assert_eq!(ledger.cache_usage(), 10);
    assert_eq!(cache.stats().expirations, 1);

    sweeper.stop();
}

#[tokio::test(start_paused = true)]
async fn sweep_expired_runs_on_demand() {
    let ledger = BudgetLedger::new(MemoryBudget::from_total(1_000));
    let cache: PriorityCache<Vec<u8>> = PriorityCache::new(ledger, config());
    cache.insert("a", vec![0; 10], Priority::Low).unwrap();
    cache.insert("b", vec![0; 10], Priority::Low).unwrap();

    assert_eq!(cache.sweep_expired(), 0);
    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(cache.sweep_expired(), 2);
    assert!(cache.is_empty());
}

use std::sync::Arc;

use chrono::NaiveDate;
use kbars_core::{BarSource, BarWindow, Frequency, Middleware};
use kbars_middleware::{CacheMiddleware, SourceBuilder};
use kbars_mock::MockBarStore;
use kbars_types::CacheConfig;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()
}

fn freq_1m() -> Frequency {
    "1m".parse().unwrap()
}

fn seeded_store() -> Arc<MockBarStore> {
    let mut store = MockBarStore::new();
    store.seed_minutes("000001.XSHE", &[date()]).unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn disabled_cache_leaves_the_stack_uncached() {
    let store = seeded_store();
    let cfg = CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    };
    let stack = SourceBuilder::new(store.clone()).with_cache(cfg).build();

    let window = BarWindow::Since {
        start: date().and_hms_opt(9, 31, 0).unwrap(),
        length: 10,
    };
    stack
        .raw_history_bars("000001.XSHE", freq_1m(), window)
        .await
        .unwrap();
    stack
        .raw_history_bars("000001.XSHE", freq_1m(), window)
        .await
        .unwrap();
    assert_eq!(store.fetch_count(), 2, "every request reaches the source");
}

#[tokio::test]
async fn enabled_cache_installs_through_the_builder() {
    let store = seeded_store();
    let stack = SourceBuilder::new(store.clone())
        .with_cache(CacheConfig {
            chunk_size: 100,
            ..CacheConfig::default()
        })
        .build();

    let window = BarWindow::Since {
        start: date().and_hms_opt(9, 31, 0).unwrap(),
        length: 100,
    };
    stack
        .raw_history_bars("000001.XSHE", freq_1m(), window)
        .await
        .unwrap();
    let calls = store.fetch_count();
    stack
        .raw_history_bars("000001.XSHE", freq_1m(), window)
        .await
        .unwrap();
    assert_eq!(store.fetch_count(), calls);
}

#[test]
fn middleware_reports_its_configuration() {
    let cfg = CacheConfig {
        chunk_size: 42,
        max_resident_bars: 420,
        enabled: true,
    };
    let middleware = CacheMiddleware::new(cfg);
    assert_eq!(middleware.name(), "CachingMiddleware");
    let json = middleware.config_json();
    assert_eq!(json["chunk_size"], 42);
    assert_eq!(json["enabled"], true);
}

#[tokio::test]
async fn errors_pass_through_unwrapped() {
    let store = seeded_store();
    let stack = SourceBuilder::new(store)
        .with_cache(CacheConfig::default())
        .build();
    let err = stack
        .raw_history_bars(
            kbars_mock::FAIL,
            freq_1m(),
            BarWindow::Since {
                start: date().and_hms_opt(9, 31, 0).unwrap(),
                length: 10,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

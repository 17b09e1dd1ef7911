use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use kbars_core::{BarSource, BarWindow, Frequency};
use kbars_middleware::CachingSource;
use kbars_mock::MockBarStore;
use kbars_types::CacheConfig;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    date().and_hms_opt(hour, minute, 0).unwrap()
}

fn freq_1m() -> Frequency {
    "1m".parse().unwrap()
}

async fn populated(chunk_size: usize) -> (Arc<MockBarStore>, CachingSource) {
    let mut store = MockBarStore::new();
    store.seed_minutes("000001.XSHE", &[date()]).unwrap();
    let store = Arc::new(store);
    let cfg = CacheConfig {
        chunk_size,
        ..CacheConfig::default()
    };
    let cache = CachingSource::new(store.clone(), &cfg);
    cache
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Since {
                start: at(9, 31),
                length: chunk_size,
            },
        )
        .await
        .unwrap();
    (store, cache)
}

#[tokio::test]
async fn request_ending_on_the_cached_edge_hits() {
    let (store, cache) = populated(100).await;
    let calls = store.fetch_count();
    let bars = cache
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Until {
                end: at(11, 10),
                length: 10,
            },
        )
        .await
        .unwrap();
    assert_eq!(bars.last().unwrap().datetime, at(11, 10));
    assert_eq!(store.fetch_count(), calls);
}

#[tokio::test]
async fn one_bar_past_the_edge_triggers_a_single_backfill() {
    let (store, cache) = populated(100).await;
    let calls = store.fetch_count();
    let bars = cache
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Until {
                end: at(11, 11),
                length: 10,
            },
        )
        .await
        .unwrap();
    assert_eq!(bars.last().unwrap().datetime, at(11, 11));
    assert_eq!(
        store.fetch_count(),
        calls + 1,
        "sliding one bar forward costs exactly one chunk fetch"
    );
}

#[tokio::test]
async fn walking_forward_slides_the_window() {
    let (store, cache) = populated(100).await;
    // walk in 10-bar steps through the rest of the morning and into the
    // afternoon; each chunk fetch covers many steps
    let points: Vec<NaiveDateTime> = store.seeded("000001.XSHE").iter().map(|b| b.datetime).collect();
    for end in points.iter().skip(99).step_by(10) {
        let bars = cache
            .raw_history_bars(
                "000001.XSHE",
                freq_1m(),
                BarWindow::Until {
                    end: *end,
                    length: 10,
                },
            )
            .await
            .unwrap();
        assert_eq!(bars.len(), 10);
        assert_eq!(bars.last().unwrap().datetime, *end);
    }
    // 240 bars at chunk 100: the initial two calls plus two slides
    assert_eq!(store.fetch_count(), 4);
}

#[tokio::test]
async fn exhausted_source_stops_triggering_backfills() {
    let (store, cache) = populated(100).await;
    let window = BarWindow::Since {
        start: at(14, 0),
        length: 500,
    };
    // run past the end of the seeded day until the entry is exhausted
    let _ = cache
        .raw_history_bars("000001.XSHE", freq_1m(), window)
        .await
        .unwrap();
    let _ = cache
        .raw_history_bars("000001.XSHE", freq_1m(), window)
        .await
        .unwrap();
    let calls = store.fetch_count();
    // the entry is finished; the same miss now goes straight to the source
    let _ = cache
        .raw_history_bars("000001.XSHE", freq_1m(), window)
        .await
        .unwrap();
    assert_eq!(
        store.fetch_count(),
        calls + 1,
        "finished entries delegate without backfilling"
    );
}

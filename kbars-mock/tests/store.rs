use chrono::{NaiveDate, NaiveTime};
use kbars_core::{BarSource, BarWindow};
use kbars_mock::MockBarStore;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[test]
fn seeding_covers_the_full_trading_day() {
    let mut store = MockBarStore::new();
    store.seed_minutes("000001.XSHE", &[monday()]).unwrap();
    let bars = store.seeded("000001.XSHE");
    assert_eq!(bars.len(), 240);
    assert_eq!(bars[0].datetime.time(), t(9, 31));
    assert_eq!(bars.last().unwrap().datetime.time(), t(15, 0));
}

#[test]
fn seeding_with_a_cutoff_stops_mid_session() {
    let mut store = MockBarStore::new();
    store
        .seed_minutes_until("000001.XSHE", monday(), t(10, 5))
        .unwrap();
    let bars = store.seeded("000001.XSHE");
    assert_eq!(bars.len(), 35);
    assert_eq!(bars.last().unwrap().datetime.time(), t(10, 5));
}

#[tokio::test]
async fn window_fetches_read_the_seeded_series() {
    let mut store = MockBarStore::new();
    store.seed_minutes("000001.XSHE", &[monday()]).unwrap();
    let bars = store
        .raw_history_bars(
            "000001.XSHE",
            "1m".parse().unwrap(),
            BarWindow::Until {
                end: monday().and_time(t(15, 0)),
                length: 10,
            },
        )
        .await
        .unwrap();
    assert_eq!(bars.len(), 10);
    assert_eq!(bars[0].datetime.time(), t(14, 51));
    assert_eq!(store.fetch_count(), 1);
}

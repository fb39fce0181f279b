use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use golden_boot::services::poller::Poller;

fn counting_poller(period: Duration) -> (Poller, Arc<AtomicUsize>) {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    let poller = Poller::spawn(period, move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    (poller, ticks)
}

#[tokio::test(start_paused = true)]
async fn ticks_once_per_period() {
    let (poller, ticks) = counting_poller(Duration::from_secs(5));

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 3);

    poller.cancel().await;
}

#[tokio::test(start_paused = true)]
async fn stops_after_cancel() {
    let (poller, ticks) = counting_poller(Duration::from_secs(5));
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 1);

    poller.cancel().await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_poller_stops_it() {
    let (poller, ticks) = counting_poller(Duration::from_secs(5));
    drop(poller);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
}

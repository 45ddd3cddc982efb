use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use wordwheel::services::timer::TimerManager;

fn counting_callback(counter: &Arc<AtomicU32>) -> impl Future<Output = ()> + Send + 'static {
    let counter = counter.clone();
    async move {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn timer_fires_once_after_the_delay() {
    let counter = Arc::new(AtomicU32::new(0));
    let mut timer = TimerManager::default();
    timer.start(Duration::from_millis(10), counting_callback(&counter));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_before_firing_suppresses_the_callback() {
    let counter = Arc::new(AtomicU32::new(0));
    let mut timer = TimerManager::default();
    timer.start(Duration::from_millis(20), counting_callback(&counter));
    timer.cancel();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let counter = Arc::new(AtomicU32::new(0));
    let mut timer = TimerManager::default();
    timer.start(Duration::from_millis(20), counting_callback(&counter));
    timer.cancel();
    timer.cancel();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn restarting_replaces_the_pending_timer() {
    let first = Arc::new(AtomicU32::new(0));
    let second = Arc::new(AtomicU32::new(0));
    let mut timer = TimerManager::default();
    timer.start(Duration::from_millis(20), counting_callback(&first));
    timer.start(Duration::from_millis(20), counting_callback(&second));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_after_firing_does_not_abort_the_callback() {
    let counter = Arc::new(AtomicU32::new(0));
    let mut timer = TimerManager::default();
    timer.start(Duration::from_millis(10), counting_callback(&counter));

    tokio::time::sleep(Duration::from_millis(60)).await;
    timer.cancel();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dropping_the_manager_cancels_the_timer() {
    let counter = Arc::new(AtomicU32::new(0));
    {
        let mut timer = TimerManager::default();
        timer.start(Duration::from_millis(20), counting_callback(&counter));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

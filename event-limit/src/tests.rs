use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use quanta::Clock;

use super::*;

fn mock_clock(start: u64) -> (UnixClock, Arc<quanta::Mock>) {
    let (clock, mock) = Clock::mock();
    (UnixClock::with_clock(clock, Duration::from_secs(start)), mock)
}

// Per-user limiters, as a moderation engine would hold them
fn users(clock: &UnixClock, n: u64) -> HashMap<u64, Arc<SaturationWindow>> {
    (0..n)
        .map(|id| {
            let window = SaturationConfig::new(3, 10)
                .build_with_clock(clock.clone())
                .unwrap();
            (id, Arc::new(window))
        })
        .collect()
}

#[test]
fn test_keys_are_independent() {
    let (clock, _mock) = mock_clock(1_000);
    let users = users(&clock, 2);

    for _ in 0..3 {
        assert!(users[&0].process().is_continue());
    }
    assert!(users[&0].process().is_break());

    // User 1 is unaffected by user 0 saturating
    for _ in 0..3 {
        assert!(users[&1].process().is_continue());
    }
}

#[tokio::test]
async fn test_many_keys_concurrently() {
    let (clock, _mock) = mock_clock(1_000);
    let users = users(&clock, 8);

    let mut handles = vec![];
    for (id, window) in &users {
        for _ in 0..10 {
            let id = *id;
            let window = Arc::clone(window);
            handles.push(tokio::spawn(
                async move { (id, window.process().is_continue()) },
            ));
        }
    }

    let mut admitted: HashMap<u64, usize> = HashMap::new();
    for result in futures::future::join_all(handles).await {
        let (id, ok) = result.unwrap();
        if ok {
            *admitted.entry(id).or_default() += 1;
        }
    }

    assert_eq!(admitted.len(), users.len());
    assert!(admitted.values().all(|count| *count == 3));
}

#[test]
fn test_dynamic_strategies() {
    let (clock, mock) = mock_clock(5_000);
    let strategies: Vec<Arc<dyn Strategy + Send + Sync>> = vec![
        Arc::new(
            ThrottleConfig::new(5)
                .build_with_clock(clock.clone())
                .unwrap(),
        ),
        Arc::new(
            SaturationConfig::new(1, 5)
                .build_with_clock(clock)
                .unwrap(),
        ),
    ];

    for strategy in &strategies {
        assert!(strategy.process().is_continue());
        assert_eq!(
            strategy.process(),
            ControlFlow::Break(Reason::Overloaded {
                retry_after: Duration::from_secs(6)
            })
        );
    }

    mock.increment(Duration::from_secs(6));
    for strategy in &strategies {
        assert!(strategy.process().is_continue());
    }
}

#[test]
fn test_shared_cell_between_components() {
    let (clock, mock) = mock_clock(100);
    let cell = Arc::new(RateLimit::with_clock(clock));
    let sent = Arc::new(AtomicUsize::new(0));

    // Two handlers guarding the same announcement
    let announce = |cell: &RateLimit| {
        if cell.rate_limit(60) {
            sent.fetch_add(1, Ordering::SeqCst);
        }
    };

    announce(&cell);
    announce(&cell);
    assert_eq!(sent.load(Ordering::SeqCst), 1);
    assert!(!cell.check_rate_limit(60));

    mock.increment(Duration::from_secs(61));
    assert!(cell.check_rate_limit(60));
    announce(&cell);
    assert_eq!(sent.load(Ordering::SeqCst), 2);
}

#[test]
fn test_silenced_flag_gates_recording() {
    let (clock, _mock) = mock_clock(100);
    let window = SaturationWindow::with_clock(
        NonZeroUsize::new(2).unwrap(),
        Duration::from_secs(30),
        clock,
    );
    let silenced = AtomicBool::default();

    for _ in 0..5 {
        if silenced.get() {
            continue;
        }
        window.record();
        if window.exceeded() {
            silenced.set(true);
        }
    }

    assert!(silenced.get());
    assert_eq!(window.limit().capacity(), 3);
}

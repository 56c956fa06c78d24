use std::sync::Barrier;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

#[test]
fn computes_once_and_shares() {
    let memo = Memo::<u32>::new();
    let calls = AtomicUsize::new(0);

    let a = memo
        .get_or_compute(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        })
        .unwrap();
    let b = memo
        .get_or_compute(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(8)
        })
        .unwrap();

    assert_eq!(*a, 7);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn fault_is_reported_to_every_reader() {
    let memo = Memo::<u32>::new();
    let first = memo.get_or_compute(|| Err(AnimError::corrupt("bad code")));
    let second = memo.get_or_compute(|| Ok(1));

    assert!(matches!(first, Err(AnimError::CorruptData(_))));
    assert!(matches!(second, Err(AnimError::CorruptData(ref m)) if m == "bad code"));
    assert!(matches!(memo.peek(), Some(Err(AnimError::CorruptData(_)))));
}

#[test]
fn concurrent_callers_share_single_computation() {
    let memo = Memo::<usize>::new();
    let calls = AtomicUsize::new(0);
    let barrier = Barrier::new(8);

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                barrier.wait();
                let v = memo
                    .get_or_compute(|| {
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        Ok(calls.fetch_add(1, Ordering::SeqCst))
                    })
                    .unwrap();
                assert_eq!(*v, 0);
            });
        }
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn peek_does_not_compute() {
    let memo = Memo::<u8>::new();
    assert!(memo.peek().is_none());
    assert!(!memo.is_resolved());

    let ready = Memo::new();
    ready.get_or_compute(|| Ok(3u8)).unwrap();
    assert!(ready.is_resolved());
    assert_eq!(*ready.peek().unwrap().unwrap(), 3);
}

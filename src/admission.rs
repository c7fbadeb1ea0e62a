use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

// 給仕 (waiter) アルゴリズム用のセマフォ
// 同時に箸を取りに行ける哲学者を capacity 人までに制限する
// n 人に対して n - 1 にしておけば全員が片方の箸を持って待つ状態 (循環待ち) にならない
pub struct Waiter {
    count: Mutex<usize>, // 使用中の許可数
    cond: Condvar,
    capacity: usize,

    // 観測用。ロックを取らずに読める
    in_use: AtomicUsize,
    high_water: AtomicUsize,
}

/// 給仕から受け取った許可。drop で返却される
#[must_use = "dropping a permit returns it immediately"]
pub struct Permit<'a> {
    waiter: &'a Waiter,
}

impl Waiter {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Waiter {
            count: Mutex::new(0),
            cond: Condvar::new(),
            capacity,
            in_use: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        }
    }

    // 許可が空くまでブロック
    pub fn acquire(&self) -> Permit<'_> {
        let mut count = self.count.lock();
        while *count >= self.capacity {
            self.cond.wait(&mut count);
        }
        *count += 1;
        self.in_use.store(*count, Ordering::Release);
        self.high_water.fetch_max(*count, Ordering::AcqRel);
        trace!(in_use = *count, capacity = self.capacity, "permit acquired");
        Permit { waiter: self }
    }

    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut count = self.count.lock();
        if *count >= self.capacity {
            return None;
        }
        *count += 1;
        self.in_use.store(*count, Ordering::Release);
        self.high_water.fetch_max(*count, Ordering::AcqRel);
        Some(Permit { waiter: self })
    }

    fn release(&self) {
        let mut count = self.count.lock();
        *count -= 1;
        self.in_use.store(*count, Ordering::Release);
        trace!(in_use = *count, capacity = self.capacity, "permit returned");
        // 待っているのは高々 1 人ぶん空いた枠にしか入れないので notify_one で十分
        self.cond.notify_one();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    // これまでに観測した同時使用数の最大値
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::Acquire)
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.waiter.release();
    }
}

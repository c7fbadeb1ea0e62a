use std::{
    sync::atomic::{AtomicIsize, Ordering},
    thread,
};

use parking_lot::{Mutex, MutexGuard};

const NO_OWNER: isize = -1;

// 箸 1 本
// lock が排他制御、owner は観測用 (ロックを持っている哲学者だけが書き込む)
pub struct Chopstick {
    lock: Mutex<()>,
    owner: AtomicIsize,
}

impl Chopstick {
    pub fn new() -> Self {
        Chopstick {
            lock: Mutex::new(()),
            owner: AtomicIsize::new(NO_OWNER),
        }
    }

    pub fn owner(&self) -> Option<usize> {
        usize::try_from(self.owner.load(Ordering::Acquire)).ok()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    // 両方の箸を持っている間だけ呼ばれる
    pub(crate) fn publish(&self, id: usize) {
        self.owner.store(id as isize, Ordering::Release);
    }

    pub(crate) fn clear(&self) {
        self.owner.store(NO_OWNER, Ordering::Release);
    }
}

impl Default for Chopstick {
    fn default() -> Self {
        Self::new()
    }
}

// 哲学者 id の左の箸
pub fn left_of(id: usize, n: usize) -> usize {
    (id + n - 1) % n
}

// 哲学者 id の右の箸
pub fn right_of(id: usize) -> usize {
    id
}

// 2 本の箸を「両方取るか、何も取らないか」で取得する
// 片方を持ったまま、もう片方を無期限に待つことはしない
// 1 本目はブロックして取り、2 本目は try_lock。失敗したら 1 本目を置いて役割を入れ替える
pub fn lock_both<'a>(
    first: &'a Chopstick,
    second: &'a Chopstick,
) -> (MutexGuard<'a, ()>, MutexGuard<'a, ()>) {
    loop {
        let a = first.lock.lock();
        if let Some(b) = second.lock.try_lock() {
            return (a, b);
        }
        drop(a);

        let b = second.lock.lock();
        if let Some(a) = first.lock.try_lock() {
            return (a, b);
        }
        drop(b);

        thread::yield_now();
    }
}

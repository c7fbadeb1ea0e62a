use parking_lot::MutexGuard;
use tracing::trace;

use crate::{
    admission::Permit,
    chopstick::{left_of, lock_both, right_of, Chopstick},
    table::Table,
};

// 箸のロック。1 人だけのテーブルでは左右が同じ箸なので 1 本だけ
// 中身は読まない。drop でロックが外れる
#[allow(dead_code)]
enum Held<'a> {
    Pair(MutexGuard<'a, ()>, MutexGuard<'a, ()>),
    Single(MutexGuard<'a, ()>),
}

/// 左右 2 本の箸と給仕の許可をまとめて持つガード
///
/// 片方だけを持った状態は外から観測できない。
/// `release` か drop のどちらかで一度だけ、
/// 持ち主の消去 → 箸の解放 → 許可の返却 の順に後始末される。
pub struct ChopstickGuard<'a> {
    table: &'a Table,
    id: usize,
    left: usize,
    right: usize,
    held: Option<Held<'a>>,
    permit: Option<Permit<'a>>,
}

impl<'a> ChopstickGuard<'a> {
    pub(crate) fn acquire(table: &'a Table, id: usize) -> Self {
        let n = table.len();
        let (left, right) = (left_of(id, n), right_of(id));

        // 先に許可をもらってから箸を取りに行く
        let permit = table.waiter().acquire();

        let l = stick(table, left);
        let r = stick(table, right);
        let held = if left == right {
            Held::Single(l.lock())
        } else {
            let (a, b) = lock_both(l, r);
            Held::Pair(a, b)
        };

        // 両方持ってから持ち主を公開する
        l.publish(id);
        r.publish(id);
        trace!(philosopher = id, left, right, "chopsticks acquired");

        ChopstickGuard {
            table,
            id,
            left,
            right,
            held: Some(held),
            permit: Some(permit),
        }
    }

    pub fn philosopher(&self) -> usize {
        self.id
    }

    pub fn left(&self) -> usize {
        self.left
    }

    pub fn right(&self) -> usize {
        self.right
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    // 2 回目以降は何もしない
    fn release_inner(&mut self) {
        if let Some(held) = self.held.take() {
            stick(self.table, self.left).clear();
            stick(self.table, self.right).clear();
            drop(held);
            trace!(philosopher = self.id, "chopsticks released");
        }
        drop(self.permit.take());
    }
}

impl Drop for ChopstickGuard<'_> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

fn stick(table: &Table, idx: usize) -> &Chopstick {
    // left/right は常に 0..n に収まる
    match table.chopstick(idx) {
        Some(c) => c,
        None => unreachable!("chopstick {idx} outside ring of {}", table.len()),
    }
}

use std::time::{Duration, Instant};

use crate::{
    admission::Waiter,
    chopstick::Chopstick,
    error::{Result, TableError},
    guard::ChopstickGuard,
    philosopher::Seat,
};

// 哲学者たちが共有するもの: 箸の輪、給仕、観測用の席
pub struct Table {
    chopsticks: Vec<Chopstick>,
    seats: Vec<Seat>,
    waiter: Waiter,
    epoch: Instant,
}

impl Table {
    pub fn new(philosophers: usize) -> Result<Self> {
        if philosophers == 0 {
            return Err(TableError::InvalidSize { philosophers });
        }

        Ok(Table {
            chopsticks: (0..philosophers).map(|_| Chopstick::new()).collect(),
            seats: (0..philosophers).map(|_| Seat::new()).collect(),
            // n - 1 人まで。1 人だけのときは競合がないので 1
            waiter: Waiter::new((philosophers - 1).max(1)),
            epoch: Instant::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn chopstick(&self, idx: usize) -> Option<&Chopstick> {
        self.chopsticks.get(idx)
    }

    pub fn seat(&self, id: usize) -> Option<&Seat> {
        self.seats.get(id)
    }

    pub fn waiter(&self) -> &Waiter {
        &self.waiter
    }

    // テーブル作成からの経過時間。空腹時間の記録に使う
    pub(crate) fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// 哲学者 id の左右の箸と給仕の許可を取得する。取れるまでブロック
    pub fn acquire(&self, id: usize) -> ChopstickGuard<'_> {
        assert!(id < self.len(), "philosopher {id} is not seated");
        ChopstickGuard::acquire(self, id)
    }
}

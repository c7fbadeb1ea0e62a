use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use rand::{rngs::StdRng, SeedableRng};
use tracing::debug;

use crate::{config::DwellRange, guard::ChopstickGuard, table::Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum State {
    Thinking = 0,
    Hungry = 1,
    Eating = 2,
}

impl State {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => State::Hungry,
            2 => State::Eating,
            _ => State::Thinking,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Thinking => "thinking",
            State::Hungry => "hungry",
            State::Eating => "eating",
        };
        f.pad(s)
    }
}

// 席: 哲学者 1 人ぶんの観測可能な状態
// 書き込むのは座っている哲学者だけ、読むのは誰でもよい
pub struct Seat {
    state: AtomicU8,
    eat_count: AtomicU64,
    // 空腹になった時刻 (テーブル作成からのマイクロ秒 + 1)。0 なら空腹ではない
    hungry_since: AtomicU64,
    longest_wait: AtomicU64, // マイクロ秒
}

impl Seat {
    pub(crate) fn new() -> Self {
        Seat {
            state: AtomicU8::new(State::Thinking as u8),
            eat_count: AtomicU64::new(0),
            hungry_since: AtomicU64::new(0),
            longest_wait: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn eat_count(&self) -> u64 {
        self.eat_count.load(Ordering::Acquire)
    }

    // 今の空腹がどれだけ続いているか。空腹でなければ None
    pub fn current_wait(&self, now: Duration) -> Option<Duration> {
        match self.hungry_since.load(Ordering::Acquire) {
            0 => None,
            since => Some(now.saturating_sub(Duration::from_micros(since - 1))),
        }
    }

    // 空腹になってから箸が取れるまでにかかった最長時間
    pub fn longest_wait(&self) -> Duration {
        Duration::from_micros(self.longest_wait.load(Ordering::Acquire))
    }

    fn set_state(&self, state: State) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn hungry(&self, now: Duration) {
        self.hungry_since
            .store(now.as_micros() as u64 + 1, Ordering::Release);
        self.set_state(State::Hungry);
    }

    fn fed(&self, now: Duration) {
        if let Some(waited) = self.current_wait(now) {
            self.longest_wait
                .fetch_max(waited.as_micros() as u64, Ordering::AcqRel);
        }
        self.hungry_since.store(0, Ordering::Release);
    }
}

// 哲学者 1 人。自分のスレッドの中で run を回す
pub struct Philosopher {
    id: usize,
    table: Arc<Table>,
    running: Arc<AtomicBool>,
    rng: StdRng,
    think: DwellRange,
    eat: DwellRange,
}

impl Philosopher {
    pub fn new(
        id: usize,
        table: Arc<Table>,
        running: Arc<AtomicBool>,
        think: DwellRange,
        eat: DwellRange,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id as u64)),
            None => StdRng::from_entropy(),
        };
        Philosopher {
            id,
            table,
            running,
            rng,
            think,
            eat,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    fn seat(&self) -> &Seat {
        match self.table.seat(self.id) {
            Some(seat) => seat,
            None => unreachable!("philosopher {} has no seat", self.id),
        }
    }

    pub fn think(&mut self) {
        self.seat().set_state(State::Thinking);
        let d = self.think.sample(&mut self.rng);
        thread::sleep(d);
    }

    // 箸を持っていることを guard で保証する
    // ここでは箸の取得も解放もしない
    pub fn eat(&mut self, guard: &ChopstickGuard<'_>) {
        debug_assert_eq!(guard.philosopher(), self.id);

        self.seat().set_state(State::Eating);
        let d = self.eat.sample(&mut self.rng);
        thread::sleep(d);
        let n = self.seat().eat_count.fetch_add(1, Ordering::AcqRel) + 1;
        self.seat().set_state(State::Thinking);
        debug!(philosopher = self.id, meals = n, took = ?d, "finished eating");
    }

    // 停止フラグを見るのはループの先頭と思考の直後だけ
    // 箸待ちの途中では止まらず、食事を 1 回終えてから抜ける
    pub fn run(&mut self) {
        debug!(philosopher = self.id, "seated");
        let table = Arc::clone(&self.table);

        while self.running.load(Ordering::Acquire) {
            self.think();

            if !self.running.load(Ordering::Acquire) {
                break;
            }

            self.seat().hungry(table.elapsed());
            let guard = table.acquire(self.id);
            self.seat().fed(table.elapsed());

            self.eat(&guard);
            drop(guard);
        }

        self.seat().set_state(State::Thinking);
        debug!(philosopher = self.id, "left the table");
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

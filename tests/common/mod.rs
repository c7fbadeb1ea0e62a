#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use dining_philosophers::{left_of, right_of, State, Table};

// 観測結果
#[derive(Debug, Default)]
pub struct Report {
    pub samples: u64,
    pub max_permits_in_use: usize,
    pub violations: Vec<String>,
}

impl Report {
    pub fn assert_clean(&self) {
        assert!(self.samples > 0, "observer never sampled");
        assert!(
            self.violations.is_empty(),
            "{} violations, first: {:?}",
            self.violations.len(),
            self.violations.iter().take(5).collect::<Vec<_>>()
        );
    }
}

// 哲学者を走らせている間、別スレッドからテーブルを覗き続ける観測者
pub struct Observer {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Report>,
}

impl Observer {
    pub fn spawn(table: Arc<Table>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop0 = stop.clone();
        let thread = thread::spawn(move || {
            let mut report = Report::default();
            while !stop0.load(Ordering::Acquire) {
                sample(&table, &mut report);
                thread::sleep(Duration::from_micros(50));
            }
            report
        });
        Observer { stop, thread }
    }

    pub fn finish(self) -> Report {
        self.stop.store(true, Ordering::Release);
        self.thread.join().unwrap()
    }
}

fn state(table: &Table, id: usize) -> State {
    table.seat(id).unwrap().state()
}

fn count(table: &Table, id: usize) -> u64 {
    table.seat(id).unwrap().eat_count()
}

// 1 回ぶんの観測
//
// 値を別々に読むので、「食事中」の判定は
// 回数 → 状態 → (調べたいもの) → 状態 → 回数 と挟んで読み、
// 前後で食事中のまま回数が変わっていないときだけ同じ食事の最中とみなす
pub fn sample(table: &Table, report: &mut Report) {
    let n = table.len();
    report.samples += 1;

    // 給仕の許可は n - 1 (1 人なら 1) を超えない
    let in_use = table.waiter().in_use();
    let capacity = table.waiter().capacity();
    report.max_permits_in_use = report.max_permits_in_use.max(in_use);
    if in_use > capacity || capacity != (n - 1).max(1) {
        report
            .violations
            .push(format!("permits in use {in_use} > capacity {capacity}"));
    }

    // 箸の持ち主はその箸を使う 2 人のどちらかに限る
    for idx in 0..n {
        if let Some(owner) = table.chopstick(idx).unwrap().owner() {
            if owner != idx && owner != (idx + 1) % n {
                report
                    .violations
                    .push(format!("chopstick {idx} owned by non-neighbour {owner}"));
            }
        }
    }

    for id in 0..n {
        let c1 = count(table, id);
        if state(table, id) != State::Eating {
            continue;
        }

        let (l, r) = (left_of(id, n), right_of(id));
        let lc = table.chopstick(l).unwrap();
        let rc = table.chopstick(r).unwrap();
        let owners = (lc.owner(), rc.owner());
        let locked = (lc.is_locked(), rc.is_locked());

        let next = (id + 1) % n;
        let neighbour_eating = next != id && state(table, next) == State::Eating;

        if state(table, id) != State::Eating || count(table, id) != c1 {
            continue;
        }

        // 食事中は左右両方を持っている (片方だけはありえない)
        if owners != (Some(id), Some(id)) || locked != (true, true) {
            report.violations.push(format!(
                "philosopher {id} eating with owners {owners:?} locked {locked:?}"
            ));
        }
        // 隣同士が同時に食事しない
        if neighbour_eating {
            report
                .violations
                .push(format!("neighbours {id} and {next} eating together"));
        }
    }
}

use std::{fmt, time::Duration};

use crate::{philosopher::State, table::Table};

// 観測者が見た 1 人ぶん
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatView {
    pub state: State,
    pub eat_count: u64,
    pub current_wait: Option<Duration>,
    pub longest_wait: Duration,
}

/// テーブル全体をアトミックな読み込みだけで写したもの
///
/// 各値は個別には正しいが、全体が同じ瞬間のものである保証はない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub seats: Vec<SeatView>,
    pub owners: Vec<Option<usize>>,
    pub permits_in_use: usize,
    pub permits: usize,
}

impl Snapshot {
    pub fn capture(table: &Table) -> Self {
        let now = table.elapsed();
        let seats = (0..table.len())
            .filter_map(|id| table.seat(id))
            .map(|seat| SeatView {
                state: seat.state(),
                eat_count: seat.eat_count(),
                current_wait: seat.current_wait(now),
                longest_wait: seat.longest_wait(),
            })
            .collect();
        let owners = (0..table.len())
            .map(|idx| table.chopstick(idx).and_then(|c| c.owner()))
            .collect();

        Snapshot {
            seats,
            owners,
            permits_in_use: table.waiter().in_use(),
            permits: table.waiter().capacity(),
        }
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    // 箸 idx の両隣のどちらかが食事中なら使用中とみなす
    pub fn chopstick_in_use(&self, idx: usize) -> bool {
        let n = self.len();
        if idx >= n {
            return false;
        }
        // 箸 idx は哲学者 idx の右、哲学者 idx + 1 の左
        self.seats[idx].state == State::Eating || self.seats[(idx + 1) % n].state == State::Eating
    }

    pub fn eating(&self) -> usize {
        self.seats
            .iter()
            .filter(|s| s.state == State::Eating)
            .count()
    }

    pub fn total_meals(&self) -> u64 {
        self.seats.iter().map(|s| s.eat_count).sum()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "eating {}/{}  permits {}/{}  meals {}",
            self.eating(),
            self.len(),
            self.permits_in_use,
            self.permits,
            self.total_meals()
        )?;

        for (id, seat) in self.seats.iter().enumerate() {
            write!(
                f,
                "  P{id:<3} {:<8} meals {:<6} longest wait {:>7.3}s",
                seat.state,
                seat.eat_count,
                seat.longest_wait.as_secs_f64()
            )?;
            if let Some(w) = seat.current_wait {
                write!(f, "  waiting {:.3}s", w.as_secs_f64())?;
            }
            writeln!(f)?;
        }

        write!(f, "  chopsticks")?;
        for (idx, owner) in self.owners.iter().enumerate() {
            match owner {
                Some(id) => write!(f, " [{idx}:P{id}]")?,
                None if self.chopstick_in_use(idx) => write!(f, " [{idx}:*]")?,
                None => write!(f, " [{idx}:-]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_capture_idle_table() {
        let table = Table::new(4).unwrap();
        let snap = Snapshot::capture(&table);
        assert_eq!(snap.len(), 4);
        assert_eq!(snap.permits, 3);
        assert_eq!(snap.permits_in_use, 0);
        assert!(snap.owners.iter().all(|o| o.is_none()));
        assert_eq!(snap.eating(), 0);
        assert_eq!(snap.total_meals(), 0);
    }

    #[test]
    fn test_capture_sees_held_chopsticks() {
        let table = Table::new(4).unwrap();
        let guard = table.acquire(1);
        let snap = Snapshot::capture(&table);
        assert_eq!(snap.owners, vec![Some(1), Some(1), None, None]);
        assert_eq!(snap.permits_in_use, 1);

        let text = snap.to_string();
        assert!(text.contains("[0:P1]"));
        assert!(text.contains("[2:-]"));
        assert!(text.contains("permits 1/3"));
        drop(guard);
    }

    #[test]
    fn test_chopstick_in_use_rule() {
        let seat = |state| SeatView {
            state,
            eat_count: 0,
            current_wait: None,
            longest_wait: Duration::ZERO,
        };
        let snap = Snapshot {
            seats: vec![
                seat(State::Eating),
                seat(State::Thinking),
                seat(State::Hungry),
            ],
            owners: vec![None; 3],
            permits_in_use: 1,
            permits: 2,
        };
        // 哲学者 0 の左右 (箸 2, 0) が使用中
        assert!(snap.chopstick_in_use(0));
        assert!(!snap.chopstick_in_use(1));
        assert!(snap.chopstick_in_use(2));
        assert!(!snap.chopstick_in_use(3));
        assert!(snap.to_string().contains("[0:*]"));
    }
}

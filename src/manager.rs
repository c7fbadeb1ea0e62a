use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{debug, error, info, warn};

use crate::{
    admission::Waiter,
    config::TableConfig,
    error::{Result, TableError},
    observer::Snapshot,
    philosopher::{Philosopher, State},
    table::Table,
};

// 哲学者スレッドのハンドル。detach せず必ず join する
struct Handle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// テーブルと哲学者スレッドの寿命を管理する
///
/// 箸の取得には関与せず、起動・停止と読み取り専用の問い合わせだけを行う。
/// 問い合わせはすべてアトミックな読み込みで、哲学者が持つロックは取らない。
pub struct Manager {
    config: TableConfig,
    table: Arc<Table>,
    handles: Vec<Handle>,
}

impl Manager {
    pub fn new(config: TableConfig) -> Result<Self> {
        config.validate()?;
        let table = Arc::new(Table::new(config.philosophers)?);
        Ok(Manager {
            config,
            table,
            handles: Vec::new(),
        })
    }

    pub fn with_philosophers(philosophers: usize) -> Result<Self> {
        Self::new(TableConfig::default().with_philosophers(philosophers))
    }

    // 実行中なら何もしない
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        self.join_all();

        for id in 0..self.config.philosophers {
            let running = Arc::new(AtomicBool::new(true));
            let mut philosopher = Philosopher::new(
                id,
                self.table.clone(),
                running.clone(),
                self.config.think,
                self.config.eat,
                self.config.seed,
            );

            let spawned = thread::Builder::new()
                .name(format!("philosopher-{id}"))
                .spawn(move || philosopher.run());

            match spawned {
                Ok(t) => self.handles.push(Handle {
                    running,
                    thread: Some(t),
                }),
                Err(source) => {
                    warn!(philosopher = id, %source, "failed to spawn philosopher");
                    // 起動済みの分は止めてから返す
                    self.stop();
                    return Err(TableError::Spawn { id, source });
                }
            }
        }

        info!(
            philosophers = self.config.philosophers,
            permits = self.table.waiter().capacity(),
            "table started"
        );
        Ok(())
    }

    // 何度呼んでもよい。start 前なら何もしない
    pub fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        // 先に全員のフラグを下ろしてから join するので、全員が並行して止まる
        for h in &self.handles {
            h.running.store(false, Ordering::Release);
        }
        self.join_all();
        info!(meals = self.total_meals(), "table stopped");
    }

    fn join_all(&mut self) {
        for (id, h) in self.handles.iter_mut().enumerate() {
            if let Some(t) = h.thread.take() {
                if t.join().is_err() {
                    error!(philosopher = id, "philosopher thread panicked");
                } else {
                    debug!(philosopher = id, "joined");
                }
            }
        }
        self.handles.clear();
    }

    pub fn is_running(&self) -> bool {
        self.handles
            .iter()
            .any(|h| h.running.load(Ordering::Acquire))
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn waiter(&self) -> &Waiter {
        self.table.waiter()
    }

    pub fn num_philosophers(&self) -> usize {
        self.table.len()
    }

    // 範囲外の id は Thinking
    pub fn state(&self, id: usize) -> State {
        self.table
            .seat(id)
            .map_or(State::Thinking, |seat| seat.state())
    }

    // 範囲外の id は 0
    pub fn eat_count(&self, id: usize) -> u64 {
        self.table.seat(id).map_or(0, |seat| seat.eat_count())
    }

    // 誰も持っていない、または範囲外なら None
    pub fn chopstick_owner(&self, idx: usize) -> Option<usize> {
        self.table.chopstick(idx).and_then(|c| c.owner())
    }

    pub fn current_wait(&self, id: usize) -> Option<Duration> {
        let now = self.table.elapsed();
        self.table.seat(id).and_then(|seat| seat.current_wait(now))
    }

    pub fn longest_wait(&self, id: usize) -> Duration {
        self.table
            .seat(id)
            .map_or(Duration::ZERO, |seat| seat.longest_wait())
    }

    pub fn total_meals(&self) -> u64 {
        (0..self.num_philosophers()).map(|id| self.eat_count(id)).sum()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.table)
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use std::time::Instant;

    use super::*;

    fn quick(n: usize) -> TableConfig {
        TableConfig::default()
            .with_philosophers(n)
            .with_think(1, 3)
            .with_eat(1, 3)
    }

    #[test]
    fn test_rejects_empty_table() {
        assert!(matches!(
            Manager::with_philosophers(0),
            Err(TableError::InvalidSize { philosophers: 0 })
        ));
        assert!(Manager::new(quick(3).with_think(5, 1)).is_err());
    }

    #[test]
    fn test_queries_before_start() {
        let manager = Manager::with_philosophers(5).unwrap();
        assert_eq!(manager.num_philosophers(), 5);
        assert_eq!(manager.waiter().capacity(), 4);
        assert!(!manager.is_running());
        for id in 0..5 {
            assert_eq!(manager.state(id), State::Thinking);
            assert_eq!(manager.eat_count(id), 0);
            assert_eq!(manager.chopstick_owner(id), None);
            assert_eq!(manager.current_wait(id), None);
        }
    }

    #[test]
    fn test_out_of_range_defaults() {
        let manager = Manager::with_philosophers(3).unwrap();
        assert_eq!(manager.state(3), State::Thinking);
        assert_eq!(manager.state(usize::MAX), State::Thinking);
        assert_eq!(manager.eat_count(17), 0);
        assert_eq!(manager.chopstick_owner(3), None);
        assert_eq!(manager.longest_wait(99), Duration::ZERO);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut manager = Manager::new(quick(3)).unwrap();
        // start 前の stop は何もしない
        manager.stop();

        manager.start().unwrap();
        assert!(manager.is_running());
        // 2 回目の start は何もしない
        manager.start().unwrap();
        assert_eq!(manager.handles.len(), 3);

        thread::sleep(Duration::from_millis(100));
        manager.stop();
        manager.stop();
        assert!(!manager.is_running());

        let meals = manager.total_meals();
        assert!(meals > 0);
        thread::sleep(Duration::from_millis(20));
        // 止めた後は誰も食べない
        assert_eq!(manager.total_meals(), meals);
        for idx in 0..3 {
            assert_eq!(manager.chopstick_owner(idx), None);
        }
    }

    #[test]
    fn test_restart_after_stop() {
        let mut manager = Manager::new(quick(2)).unwrap();
        manager.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        manager.stop();
        let meals = manager.total_meals();

        manager.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        manager.stop();
        assert!(manager.total_meals() > meals);
    }

    #[test]
    fn test_drop_stops_threads() {
        let mut manager = Manager::new(quick(4)).unwrap();
        manager.start().unwrap();
        let table = manager.table().clone();
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        drop(manager);
        assert!(started.elapsed() < Duration::from_secs(1));

        // スレッドが残っていれば Arc の参照が残る
        assert_eq!(Arc::strong_count(&table), 1);
        assert_eq!(table.waiter().in_use(), 0);
    }

    #[test]
    fn test_single_philosopher_eats() {
        let mut manager = Manager::new(quick(1)).unwrap();
        manager.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        manager.stop();
        assert!(manager.eat_count(0) > 0);
    }
}

//! 食事する哲学者
//!
//! n 本の箸の輪を n 人の哲学者が取り合う。
//! 給仕 ([`Waiter`]) が同時に箸を取りに行ける人数を n - 1 に制限するので循環待ちは起きず、
//! 左右の箸は [`ChopstickGuard`] で「両方持つか、何も持たないか」に保たれる。

pub mod admission;
pub mod chopstick;
pub mod config;
pub mod error;
pub mod guard;
pub mod manager;
pub mod observer;
pub mod philosopher;
pub mod table;

pub use admission::{Permit, Waiter};
pub use chopstick::{left_of, right_of, Chopstick};
pub use config::{DwellRange, TableConfig};
pub use error::{Result, TableError};
pub use guard::ChopstickGuard;
pub use manager::Manager;
pub use observer::{SeatView, Snapshot};
pub use philosopher::{Philosopher, Seat, State};
pub use table::Table;

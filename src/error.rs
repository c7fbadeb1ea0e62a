use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TableError>;

// 初期化時にしか起きないエラー
// 定常動作 (箸の取得・解放、状態の問い合わせ、停止) は失敗しない
#[derive(Debug, Error)]
pub enum TableError {
    #[error("a table needs at least one philosopher (got {philosophers})")]
    InvalidSize { philosophers: usize },

    #[error("{phase} interval is inverted: min {min_ms}ms > max {max_ms}ms")]
    InvalidDwell {
        phase: &'static str,
        min_ms: u64,
        max_ms: u64,
    },

    #[error("failed to spawn thread for philosopher {id}")]
    Spawn {
        id: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to read config {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

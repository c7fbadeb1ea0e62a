use std::{fs, path::Path, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

/// ミリ秒単位の閉区間。思考・食事の滞在時間をここから一様に選ぶ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwellRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DwellRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        DwellRange { min_ms, max_ms }
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }

    fn validate(&self, phase: &'static str) -> Result<()> {
        if self.min_ms > self.max_ms {
            return Err(TableError::InvalidDwell {
                phase,
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub philosophers: usize,
    pub think: DwellRange,
    pub eat: DwellRange,
    // 指定した場合は哲学者 i の乱数を seed + i で初期化する
    pub seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            philosophers: 5,
            think: DwellRange::new(1000, 5000),
            eat: DwellRange::new(1000, 3000),
            seed: None,
        }
    }
}

impl TableConfig {
    /// TOML ファイルから読み込む。書かれていないキーはデフォルト値
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| TableError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TableConfig =
            toml::from_str(&text).map_err(|source| TableError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.philosophers == 0 {
            return Err(TableError::InvalidSize {
                philosophers: self.philosophers,
            });
        }
        self.think.validate("think")?;
        self.eat.validate("eat")
    }

    pub fn with_philosophers(mut self, philosophers: usize) -> Self {
        self.philosophers = philosophers;
        self
    }

    pub fn with_think(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.think = DwellRange::new(min_ms, max_ms);
        self
    }

    pub fn with_eat(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.eat = DwellRange::new(min_ms, max_ms);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    // 1 サイクル (思考 + 食事) の最大時間
    pub fn max_cycle(&self) -> Duration {
        self.think.max() + self.eat.max()
    }
}

//! 永続ストアの実装
//!
//! - `inmemory`: `HashMap` をインメモリ DB として使う実装
//! - `seed`: 起動時に読み込むユーザー・ルームの初期データ

pub mod inmemory;
pub mod seed;

pub use inmemory::InMemoryChatStore;
pub use seed::{SeedError, StoreSeed};

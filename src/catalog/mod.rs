//! カタログモジュール
//!
//! カタログの型定義、永続化（index.json / apiid.json / 作品フォルダ）、
//! フォルダからの index.json 再構築を提供する。

pub mod rebuild;
pub mod store;
pub mod types;

pub use rebuild::{rebuild_catalog, RebuildSummary};
pub use store::CatalogStore;
pub use types::{Catalog, CatalogEntry, Point, DEFAULT_THEME_COLOR};

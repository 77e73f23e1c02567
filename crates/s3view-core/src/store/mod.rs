// ── Reactive catalog storage ──

mod catalog_store;
mod collection;
mod detail_store;
mod summary_store;

pub use catalog_store::CatalogStore;
pub use collection::Keyed;
pub use detail_store::DetailStore;
pub use summary_store::SummaryStore;

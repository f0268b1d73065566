pub mod catalog;
pub mod identity;
pub mod player;
pub mod segmenter;
pub mod staging;
pub mod vault_store;

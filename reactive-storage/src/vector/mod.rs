//! The vector engine (spec §6): embedding collections with brute-force
//! cosine nearest-neighbor search, filterable by the same predicate
//! grammar as the relational engine.

pub mod collections;
pub mod filter;
pub mod items;
pub mod similarity;

pub use collections::{
    create_collection, delete_collection, ensure_vector_tables, get_collection,
    get_or_create_collection, list_collections, VectorCollection,
};
pub use items::{add_item, count_items, delete_item, get_item, query, update_item, VectorItem};

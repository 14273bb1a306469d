pub mod hit_store;

pub mod hit_count;

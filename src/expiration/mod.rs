mod cleaner;

pub use cleaner::start_cache_sweeper;

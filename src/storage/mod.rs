pub mod csv_files;

pub use csv_files::{timestamped_file_name, Storage, COMMITS_PREFIX, RATED_PREFIX};

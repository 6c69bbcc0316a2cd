pub mod io;
pub mod json;

pub use io::atomic_write_str;
pub use json::{FsError, read_json, read_json_opt};

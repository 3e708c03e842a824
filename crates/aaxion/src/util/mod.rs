pub mod path;

pub use path::{sanitize_file_name, sanitize_file_name_or, AaxionPathExt};

pub mod http_path_resolution;
pub mod parser;
pub mod query_pairs;

pub use http_path_resolution::*;
pub use parser::*;
pub use query_pairs::*;

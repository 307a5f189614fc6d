pub mod document;
pub mod package;
pub mod search;
pub mod version;

pub use document::*;
pub use package::*;
pub use search::*;
pub use version::*;

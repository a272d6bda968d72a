pub mod filesystem;

pub use filesystem::{rename_no_clobber, FileStorage};

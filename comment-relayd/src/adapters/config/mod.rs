pub mod repo_file;
pub mod repo_mem;

pub use repo_file::FileConfigStore;
pub use repo_mem::InMemoryConfigStore;

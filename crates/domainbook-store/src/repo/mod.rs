pub mod directory;

pub use directory::DirectoryRepo;

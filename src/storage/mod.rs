mod file;

pub use file::JsonFile;

mod json_file;
mod memory;
mod object;
mod s3;
mod shard;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;
pub use object::{HttpObjectClient, MemoryObjectClient, ObjectClient, ObjectStorage};
pub use s3::S3ObjectClient;
pub use shard::ShardStorage;

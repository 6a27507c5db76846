pub mod client;

pub use client::{DirectoryClient, SECURITY_GROUP_FILTER};

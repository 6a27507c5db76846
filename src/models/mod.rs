pub mod group;

pub use group::{GroupListResponse, SecurityGroup};

pub mod token;

pub use token::{Credentials, Token, TokenProvider};

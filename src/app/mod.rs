pub mod auth;
pub mod content;
pub mod engagement;
pub mod error;
pub mod policy;
pub mod social;
pub mod users;
pub mod visibility;

pub use error::AccessError;

pub mod categories;
pub mod comments;
pub mod error;
pub mod policy;
pub mod requests;
pub mod slug;
pub mod status;
pub mod votes;

pub mod category;
pub mod comment;
pub mod feature_request;
pub mod vote;

#![allow(unused_imports)]

pub use super::category::Entity as Category;
pub use super::comment::Entity as Comment;
pub use super::feature_request::Entity as FeatureRequest;
pub use super::vote::Entity as Vote;

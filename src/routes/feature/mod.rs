mod handler;
mod model;

pub use handler::{create_feature, list_features, vote};

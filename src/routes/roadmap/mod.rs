mod handler;

pub use handler::list_roadmap;

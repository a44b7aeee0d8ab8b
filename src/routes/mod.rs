pub mod bug;
pub mod feature;
pub mod roadmap;

pub mod intersect;

pub use intersect::{intersect_groups, Intersection, Keyed};

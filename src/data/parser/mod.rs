pub mod observations;

pub use observations::{read_observations, read_observations_from};

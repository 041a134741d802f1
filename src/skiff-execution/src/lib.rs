pub mod join_probe;

pub use join_probe::{JoinProbe, JoinProbeFactory};

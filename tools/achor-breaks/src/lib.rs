pub mod cli;
pub mod config;
pub mod features;
pub mod global_extreme;
pub mod interpolate;
pub mod labels;
pub mod method;
pub mod neighbors;
pub mod pipeline;
pub mod ranges;
pub mod selection;
pub mod suggest;
pub mod sweep;

pub use config::{ClassifyConfig, SweepBudget};
pub use features::{Feature, FeatureSet, LoadOptions};
pub use labels::{Label, Labels};
pub use method::Method;
pub use neighbors::{NeighborGraph, NeighborPair};
pub use pipeline::{classify, Classification, RunStats, RunStatus, Shortfall};
pub use ranges::ClassRange;
pub use selection::SignificantPair;
pub use suggest::suggest_sweep;

pub use achor_common::{Error, Result};

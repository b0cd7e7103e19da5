pub mod clustering;
pub mod encoding;
pub mod features;
pub mod hierarchy;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod reduction;
pub mod stats;

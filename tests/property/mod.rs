//! Property-based tests
//!
//! Uses proptest to generate random inputs and verify properties

pub mod feed_proptest;
pub mod graph_proptest;
pub mod merge_proptest;

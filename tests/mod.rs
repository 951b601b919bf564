//! Test suite for CineSync
//!
//! This module organizes all tests

pub mod property;

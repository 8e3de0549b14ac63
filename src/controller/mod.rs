//! # Controller
//!
//! - `converter`: maps directory applications onto runtime `Application` resources
//! - `reconciler`: diffs desired against existing applications and applies the changes

pub mod converter;
pub mod reconciler;

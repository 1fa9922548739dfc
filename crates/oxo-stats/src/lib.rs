//! Statistics helpers for tracking a training session.
//!
//! - [`descriptive`]: min, max, mean, median and spread of a set of values
//! - [`history`]: fixed-capacity series that evict their oldest entries
//! - [`rolling`]: exponentially smoothed running averages
//!
//! # Examples
//!
//! ```
//! use oxo_stats::{descriptive::DescriptiveStats, history::BoundedHistory};
//!
//! let stats = DescriptiveStats::new([3.0, 1.0, 2.0]).unwrap();
//! assert_eq!(stats.median, 2.0);
//!
//! let mut history = BoundedHistory::new(2);
//! history.push(1.0);
//! history.push(2.0);
//! history.push(3.0);
//! assert_eq!(history.iter().copied().collect::<Vec<_>>(), [2.0, 3.0]);
//! ```

pub mod descriptive;
pub mod history;
pub mod rolling;

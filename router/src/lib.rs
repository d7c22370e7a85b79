//! Pattern-keyed publish/subscribe dispatch.
//!
//! This crate provides [`Router`], a registry of subscriptions keyed by a
//! regular expression over topic strings. Publishing a payload on a topic
//! invokes every subscription whose pattern matches that topic, in the
//! order the subscriptions were registered.
//!
//! The router knows nothing about any wire protocol; upstream crates
//! layer their own topic conventions (e.g. `response:<id>`,
//! `Debugger.paused`) on top of it.
//!
//! # Example
//!
//! ```
//! use router::Router;
//!
//! let router: Router<String> = Router::new();
//! router.subscribe(r"^greeting\.", |payload| {
//!     println!("got {payload}");
//! }).unwrap();
//!
//! let invoked = router.publish("greeting.hello", &"hi".to_string());
//! assert_eq!(invoked, 1);
//! ```

mod error;
mod registry;

pub use error::RouterError;
pub use registry::{Router, SubscriptionId};

//! Core systems for the sheet outline model.
//!
//! This crate provides the notification primitive the outline model is built
//! on: a type-safe signal/slot mechanism for synchronous change notification.
//!
//! # Signal/Slot Example
//!
//! ```
//! use sheet_outline_core::Signal;
//!
//! // Create a signal that notifies when a value changes
//! let value_changed = Signal::<i32>::new();
//!
//! // Connect a slot to handle the signal
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! // Emit the signal
//! value_changed.emit(42);
//!
//! // Disconnect when done
//! value_changed.disconnect(conn_id);
//! ```

mod signal;

pub use signal::{ConnectionGuard, ConnectionId, Signal};

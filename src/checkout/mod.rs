//! The transport-agnostic checkout flow.
//!
//! `event` defines what comes in, `channel` what goes out, `session` the
//! per-chat state, and `engine` the state machine tying them together.

pub mod channel;
pub mod engine;
pub mod event;
pub mod session;

pub use channel::{Button, ButtonAction, Channel, ImageSource, Keyboard, MessageHandle};
pub use engine::Engine;
pub use event::{CallbackAction, Command, Event, ImageRef, MenuButton};
pub use session::{CheckoutState, Session, SessionStore};

//! walkout-bot - a Telegram bot that alerts subscribers when UFC fighters walk out.
//!
//! Recipients pick fights from the current event card. A background poller
//! watches the status of every fight whose event has started and messages
//! its recipients once, when the fighters begin walking out.

pub mod bot;
pub mod clock;
pub mod config;
pub mod entity;
pub mod error;
pub mod logging;
pub mod notifier;
pub mod repository;
pub mod service;
pub mod source;
pub mod task;

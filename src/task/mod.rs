//! Background tasks.

pub mod walkout_poller;

//! External delivery channels for subscription notices.

pub mod webhook;

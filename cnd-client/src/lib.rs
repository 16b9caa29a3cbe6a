#![warn(
    unused_extern_crates,
    missing_debug_implementations,
    rust_2018_idioms,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::fallible_impl_from,
    clippy::print_stdout,
    clippy::dbg_macro
)]
#![cfg_attr(not(test), warn(clippy::unwrap_used))]
#![forbid(unsafe_code)]

//! A client-side driver for cnd's hypermedia REST API.
//!
//! Two actors, each talking to their own cnd instance, drive a swap
//! through its lifecycle by discovering the currently legal actions on
//! their swap resource, synthesizing concrete requests from the action
//! descriptors and waiting for the eventually-consistent resource to
//! catch up with what they did.

pub mod action;
pub mod actor;
pub mod client;
pub mod config;
pub mod correlate;
pub mod ledger;
pub mod poll;
pub mod swap;
pub mod trace;
pub mod wallet;

mod secret_hash;
mod timestamp;

pub use self::{
    actor::{Actor, Actors},
    client::{ApiClient, Cnd},
    config::Settings,
    secret_hash::SecretHash,
    timestamp::Timestamp,
};

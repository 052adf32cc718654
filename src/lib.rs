//! Junction is an HTTP reverse-proxy load balancer.
//!
//! A single ingress endpoint terminates client HTTP, classifies each
//! request by URI path against an ordered rule table, picks a live
//! target from the selected group according to the group's policy,
//! rewrites the path, forwards the request upstream, and relays the
//! response byte-for-byte.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, validate).
//! - [`config`] -- Configuration loading from YAML/JSON and startup
//!   validation.
//! - [`error`] -- Startup errors and the per-request error taxonomy,
//!   both using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print
//!   output.
//! - [`target`] -- A single upstream endpoint plus its live metrics
//!   (active connections, TTFB EWMA).
//! - [`group`] -- Target groups: DNS-resolved target pools sharing a
//!   selection policy and health-check settings.
//! - [`health`] -- Background health supervisor: periodic probes and
//!   the consecutive-threshold state machine gating eligibility.
//! - [`balance`] -- Selection policies: round-robin, weighted, sticky,
//!   and least-response-time.
//! - [`proxy`] -- The request pipeline: longest-prefix rule matching,
//!   header construction, and upstream forwarding.
//! - [`server`] -- Axum server setup, shared application state, HTTP
//!   client, and graceful shutdown.

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod balance;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod group;
pub mod health;
pub mod logging;
pub mod proxy;
pub mod server;
pub mod target;

// Copyright 2022 Ryan Seipp
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![deny(rust_2018_idioms, unused_imports)]

//! A single-reactor, multi-worker HTTP/1.1 server: one thread multiplexes readiness
//! over every connection, a fixed pool of worker threads does the actual parsing,
//! routing, and response writing, and a min-heap tracks idle-connection deadlines.
//!
//! ## Layout
//!
//! - [`poller`] — the readiness multiplexer (C1)
//! - [`timer`] — the idle-connection deadline heap (C2)
//! - [`pool`] — the worker thread pool (C3)
//! - [`connection`] — the per-connection state machine (C4)
//! - [`reactor`] — the event loop tying the above together (C5)
//! - [`http`] — wire-level method/version/status/request/response types
//! - [`router`], [`static_file`], [`db`], [`form`] — request handling
//! - [`config`], [`error`], [`logging`], [`net`] — ambient startup/runtime plumbing

pub mod buffer;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod form;
pub mod http;
pub mod logging;
pub mod net;
pub mod poller;
pub mod pool;
pub mod reactor;
pub mod router;
pub mod static_file;
pub mod timer;

#![doc = "dataloom: build system for the data folders of a data-science project."]

//! A project keeps its data in a fixed tree — `data/raw`, `data/entrypoint`,
//! `data/models`, `data/.localcache` — and this crate provides the machinery
//! around it: a file-keyed pipeline registry that rebuilds derived data from
//! raw data through registered cleaning and modeling tasks, and a remote-sync
//! layer that mirrors the tree against a cloud blob store.
//!
//! # Usage
//! Construct one [`pipeline::DataManager`], register tasks at startup, and
//! call `update_entrypoint` / `update_models` — or wire the manager into
//! [`cli::run_with`] for a full command-line surface.

pub mod cache;
pub mod cli;
pub mod config;
pub mod dropbox;
pub mod error;
pub mod load_config;
pub mod parsers;
pub mod pathutils;
pub mod pipeline;
pub mod remote;
pub mod reports;
pub mod sync;

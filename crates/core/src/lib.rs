#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

//! Core library for the yaml2json server.
//!
//! `yaml2json_core` provides:
//! - startup configuration resolution via [`config`]
//! - pre-shared key checks via [`auth`]
//! - request body / remote URL input selection via [`input`]
//! - the YAML to JSON translator via [`translate`]
//! - outcome to HTTP response mapping via [`response`]
//! - the request pipeline and router via [`handler`]
//! - listener setup and graceful shutdown via [`server`]
//! - shared configuration and request types via [`types`]
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use yaml2json_core::config::{resolve_config, ConfigOverrides};
//! use yaml2json_core::server::serve;
//! use yaml2json_core::translate::YamlToJson;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = resolve_config(|k| std::env::var(k).ok(), ConfigOverrides::default())?;
//! serve(config, Arc::new(YamlToJson)).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod handler;
pub mod input;
pub mod response;
pub mod server;
pub mod translate;
pub mod types;

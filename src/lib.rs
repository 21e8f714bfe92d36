//! Core library for the adaptive-connector command line application.
//!
//! The connector exports planning data from the Adaptive API, reshapes it, and
//! loads it into warehouse tables. IO adapters (request envelopes, response
//! extraction, CSV, transport, warehouse, notification) live under
//! [`adaptive::connector::io`], the tabular model in
//! [`adaptive::connector::model`], the table transforms in
//! [`adaptive::connector::reshape`] and [`adaptive::connector::personnel`], and
//! the run orchestration under [`adaptive::connector::sync`].

pub mod adaptive;

pub use adaptive::connector::{
    ConnectorError, Result, config, error, io, model, personnel, reshape, sync,
};

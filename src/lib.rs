//! Scholar - offline compiler from historical tuning trials to decision tables
//!
//! A tuning recorder stores, per problem, every trial it ran: the context
//! (input) values, the configuration (output) values it chose and the
//! measured result. Scholar reads that store once, quantizes each input's
//! domain into buckets, picks the best observed configuration per bucket and
//! emits a dense, fingerprinted table that a host indexes at run time with a
//! single mixed-radix encode.

pub mod aggregate;
pub mod artifact;
pub mod catalog;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod encoding;
pub mod error;
pub mod lookup;
pub mod space;
pub mod store;
pub mod table;
pub mod variable;

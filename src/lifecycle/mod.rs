//! # Lifecycle Module
//!
//! The lifecycle module owns the container status and decides which
//! registration, mutation and transition operations are legal in which status.
//!
//! ## States
//!
//! ```text
//! SETUP ──initialize──▶ INITIALIZED_DECLARED ──▶ INITIALIZED ──start──▶ SERVICING
//!   ▲                          │                      ▲   │                │
//!   │                          ▼                      │   │                │
//!   │                        ERROR                    │   └─────stop◀──────┘
//!   └────────────────────────destroy──────────────────┘
//! ```
//!
//! Every mutator on the container asks [`Lifecycle::verify`] before touching
//! shared state, so there is exactly one table describing the legal windows.
//! See [`Operation::legal_in`].

mod core;

pub use self::core::{Lifecycle, Operation, Status};

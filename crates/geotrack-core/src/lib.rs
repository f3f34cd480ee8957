//! # Geotrack Core Library
//!
//! This library provides the core logic for the geotrack background
//! location-tracking service. The presentation layer (a mobile shell or
//! the bundled CLI) is a thin skin over this library: it issues commands,
//! reads the query surface, and subscribes to the event stream.
//!
//! ## Architecture
//!
//! - **Tracking Controller**: The state machine. Owns all transitions,
//!   drives the provider subscription, and fans each fix out to the
//!   store, the collector sink, and the notification presenter.
//! - **Storage**: A single TOML-backed record (last fix + tracking flag)
//!   that survives process restarts, plus TOML configuration.
//! - **Provider**: Trait for the asynchronous fix source; a simulated
//!   implementation is included for demos and tests.
//! - **Sink**: Fire-and-forget HTTP push of each fix to the collector.
//!
//! ## Key Components
//!
//! - [`TrackingController`]: Core tracking state machine
//! - [`StateStore`]: Durable last-fix and tracking-flag record
//! - [`Config`]: Application configuration management
//! - [`LocationProvider`]: Trait for fix sources
//! - [`RemoteSink`]: Collector push client

pub mod controller;
pub mod error;
pub mod events;
pub mod fix;
pub mod notify;
pub mod provider;
pub mod sink;
pub mod storage;

pub use controller::{LastLocation, TrackingController, TrackingState};
pub use error::{ConfigError, CoreError, ProviderError, Result, SinkError, StoreError};
pub use events::TrackingEvent;
pub use fix::LocationFix;
pub use notify::{LogPresenter, NotificationPresenter};
pub use provider::{FixRequest, LocationProvider, ProviderSubscription, SimulatedProvider};
pub use sink::RemoteSink;
pub use storage::{Config, PersistedRecord, StateStore};

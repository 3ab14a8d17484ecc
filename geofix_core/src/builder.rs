//! Type-state builder for `Stabilizer` and the generic `build_stabilizer`
//! constructor.
//!
//! The builder enforces at compile time that a position source and a
//! publisher are provided before `build()` is available. `try_build()` is
//! always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use geofix_traits::{Clock, MonotonicClock, PositionSource};

use crate::config::EngineCfg;
use crate::error::{BuildError, Result};
use crate::event::Publisher;
use crate::stabilizer::Stabilizer;

/// Boxed, dynamically dispatched engine; what the builder produces.
pub type DynStabilizer =
    Stabilizer<Box<dyn PositionSource + Send>, Box<dyn Publisher + Send>>;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `DynStabilizer`. The configuration is validated on `build()`.
pub struct StabilizerBuilder<S, P> {
    source: Option<Box<dyn PositionSource + Send>>,
    publisher: Option<Box<dyn Publisher + Send>>,
    cfg: Option<EngineCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _s: PhantomData<S>,
    _p: PhantomData<P>,
}

impl Default for StabilizerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            source: None,
            publisher: None,
            cfg: None,
            clock: None,
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

impl DynStabilizer {
    /// Start building an engine.
    pub fn builder() -> StabilizerBuilder<Missing, Missing> {
        StabilizerBuilder::default()
    }
}

/// Validate configuration and construct the engine.
///
/// Single source of truth for validation, used by both
/// `StabilizerBuilder::try_build()` and `build_stabilizer()`.
fn validate_and_build<S: PositionSource, P: Publisher>(
    source: S,
    publisher: P,
    cfg: EngineCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<Stabilizer<S, P>> {
    cfg.validate().map_err(eyre::Report::new)?;

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    tracing::debug!(
        history_size = cfg.history_size,
        fast_ms = cfg.timeouts.fast_acquisition_ms,
        best_ms = cfg.timeouts.best_location_ms,
        "engine built"
    );
    Ok(Stabilizer::new(cfg, source, publisher, clock))
}

impl<S, P> StabilizerBuilder<S, P> {
    /// Fallible build available in any type-state; returns a detailed error
    /// for missing pieces.
    pub fn try_build(self) -> Result<DynStabilizer> {
        let source = self
            .source
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSource))?;
        let publisher = self
            .publisher
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPublisher))?;
        validate_and_build(source, publisher, self.cfg.unwrap_or_default(), self.clock)
    }

    /// Chainable setters that do not affect type-state.
    pub fn with_config(mut self, cfg: EngineCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Provide a custom clock; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<P> StabilizerBuilder<Missing, P> {
    pub fn with_source(
        self,
        source: impl PositionSource + Send + 'static,
    ) -> StabilizerBuilder<Set, P> {
        StabilizerBuilder {
            source: Some(Box::new(source)),
            publisher: self.publisher,
            cfg: self.cfg,
            clock: self.clock,
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<S> StabilizerBuilder<S, Missing> {
    pub fn with_publisher(
        self,
        publisher: impl Publisher + Send + 'static,
    ) -> StabilizerBuilder<S, Set> {
        StabilizerBuilder {
            source: self.source,
            publisher: Some(Box::new(publisher)),
            cfg: self.cfg,
            clock: self.clock,
            _s: PhantomData,
            _p: PhantomData,
        }
    }
}

impl StabilizerBuilder<Set, Set> {
    /// Validate and build. Only available once source and publisher are set.
    pub fn build(self) -> Result<DynStabilizer> {
        self.try_build()
    }
}

/// Build a statically dispatched engine from concrete collaborators.
pub fn build_stabilizer<S, P>(
    source: S,
    publisher: P,
    cfg: EngineCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<Stabilizer<S, P>>
where
    S: PositionSource,
    P: Publisher,
{
    validate_and_build(source, publisher, cfg, clock)
}

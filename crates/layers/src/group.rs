use std::rc::Rc;

use tracing::debug;

use crate::context::SceneScope;
use crate::error::LayerError;

/// Half-open range `[base, base + span)` of z-indices reserved for a subtree.
///
/// A band is split into [`ZBand::FANOUT`] equal slots. Slot `i` of a band is
/// painted above slot `i - 1`, so declaration order is paint order, bottom
/// first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ZBand {
    base: i64,
    span: i64,
}

impl ZBand {
    pub const FANOUT: i64 = 256;
    /// Band used when no group is in scope.
    pub const ROOT: ZBand = ZBand {
        base: 0,
        span: 1 << 48,
    };

    pub fn base(&self) -> i64 {
        self.base
    }

    pub fn span(&self) -> i64 {
        self.span
    }

    pub fn end(&self) -> i64 {
        self.base + self.span
    }

    pub fn contains(&self, z: i64) -> bool {
        z >= self.base && z < self.end()
    }

    pub fn overlaps(&self, other: &ZBand) -> bool {
        self.base < other.end() && other.base < self.end()
    }

    /// The sub-band reserved for the `index`-th declared child.
    pub fn slot(&self, index: usize) -> Result<ZBand, LayerError> {
        let exhausted = || LayerError::BandExhausted {
            base: self.base,
            span: self.span,
            slot: index,
        };
        let step = self.span / Self::FANOUT;
        let slot = i64::try_from(index).map_err(|_| exhausted())?;
        if step == 0 || slot >= Self::FANOUT {
            return Err(exhausted());
        }
        Ok(ZBand {
            base: self.base + slot * step,
            span: step,
        })
    }
}

/// A nesting level that scopes z-order for its descendants.
///
/// Cloning is cheap; clones compare equal and refer to the same band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerGroup {
    name: Rc<str>,
    band: ZBand,
}

impl LayerGroup {
    /// Reserves slot `slot` of the band currently in `scope`.
    ///
    /// The band is fixed here, before any child is mounted, so children never
    /// see an undefined z-index.
    pub fn nested(scope: &SceneScope, name: &str, slot: usize) -> Result<Self, LayerError> {
        let band = scope.band().slot(slot)?;
        debug!(group = name, base = band.base(), span = band.span(), "layer group band assigned");
        Ok(Self {
            name: Rc::from(name),
            band,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn band(&self) -> ZBand {
        self.band
    }
}

//! # RPS Lots
//!
//! A lot (*Lote*) is a caller-numbered batch of RPS submitted in one
//! asynchronous request. The authority accepts at most
//! [`MAX_RPS_PER_LOT`] items per lot.
//!
//! RPS rendering is owned by the caller: an [`RpsItem`] turns itself into
//! a `tipos:Rps` fragment given the provider identity. The lot builder only
//! checks that the fragment is well-formed and concatenates fragments in
//! input order.

use crate::identity::ProviderIdentity;

/// Maximum number of RPS accepted in a single lot.
pub const MAX_RPS_PER_LOT: usize = 50;

/// Failure reported by an [`RpsItem`] while rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// One provisional service receipt, renderable to its XML fragment.
///
/// The fragment is inserted verbatim inside `tipos:ListaRps`, where the
/// `tipos` prefix is already bound to [`TYPES_NAMESPACE`].
///
/// [`TYPES_NAMESPACE`]: crate::operation::TYPES_NAMESPACE
pub trait RpsItem {
    /// Render this RPS for the given provider.
    fn render(&self, identity: &ProviderIdentity) -> Result<String, RenderError>;
}

impl<T: RpsItem + ?Sized> RpsItem for &T {
    fn render(&self, identity: &ProviderIdentity) -> Result<String, RenderError> {
        (**self).render(identity)
    }
}

impl<T: RpsItem + ?Sized> RpsItem for Box<T> {
    fn render(&self, identity: &ProviderIdentity) -> Result<String, RenderError> {
        (**self).render(identity)
    }
}

/// An RPS whose fragment was rendered ahead of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerenderedRps(String);

impl PrerenderedRps {
    /// Wrap an already-rendered `tipos:Rps` fragment.
    pub fn new(fragment: impl Into<String>) -> Self {
        Self(fragment.into())
    }

    /// The wrapped fragment.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RpsItem for PrerenderedRps {
    fn render(&self, _identity: &ProviderIdentity) -> Result<String, RenderError> {
        Ok(self.0.clone())
    }
}

/// A numbered batch of RPS.
///
/// The envelope does not enforce [`MAX_RPS_PER_LOT`] itself; the lot
/// builder rejects oversized lots before rendering a single item.
#[derive(Debug, Clone)]
pub struct LotEnvelope<R> {
    lot_number: String,
    items: Vec<R>,
}

impl<R: RpsItem> LotEnvelope<R> {
    /// Create a lot with the caller-assigned number.
    pub fn new(lot_number: impl Into<String>, items: Vec<R>) -> Self {
        Self {
            lot_number: lot_number.into(),
            items,
        }
    }

    /// Caller-assigned lot number.
    pub fn lot_number(&self) -> &str {
        &self.lot_number
    }

    /// Items in submission order.
    pub fn items(&self) -> &[R] {
        &self.items
    }

    /// Number of items in the lot.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Whether the lot is within the per-lot limit.
    pub fn within_limit(&self) -> bool {
        self.item_count() <= MAX_RPS_PER_LOT
    }
}

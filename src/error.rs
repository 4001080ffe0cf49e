use thiserror::Error;

/// Errors surfaced by the viewer. Controller operations never return these;
/// they come from asset loading and platform/GPU setup.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("asset unavailable: {asset}: {reason}")]
    AssetUnavailable { asset: String, reason: String },

    #[error("asset {asset} contains no animation")]
    MissingAnimation { asset: String },

    #[error("GPU setup failed: {0}")]
    Gpu(String),

    #[error("platform error: {0}")]
    Platform(String),
}

impl ViewerError {
    pub fn asset_unavailable(asset: impl Into<String>, reason: impl ToString) -> Self {
        ViewerError::AssetUnavailable {
            asset: asset.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures the overlay reports while the viewer keeps running.
    pub fn is_asset_failure(&self) -> bool {
        matches!(
            self,
            ViewerError::AssetUnavailable { .. } | ViewerError::MissingAnimation { .. }
        )
    }
}

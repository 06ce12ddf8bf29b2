use std::sync::Arc;

use thiserror::Error;

use super::{
    BytesCodec, CodecError, CodecPipeline, CompressionError, Configuration, GzipCodec,
    NamedConfiguration, ShuffleCodec, ZstdCodec,
};
use crate::container::BackendFamily;

/// The role of a catalog entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CodecRole {
    /// A primary compressor.
    Compressor,
    /// A pre-compression filter (cloud-object family filter chains).
    Filter,
}

/// An unknown compression method error.
///
/// Raised before any bytes are written when a requested method is absent from
/// the catalog for the target backend family.
#[derive(Clone, Debug, Error)]
#[error("unknown compression method `{method}` for the {family} backend family")]
pub struct UnknownCompressionMethodError {
    /// The offending method name.
    pub method: String,
    /// The target backend family.
    pub family: BackendFamily,
}

type CodecFactory = fn(Option<&Configuration>, usize) -> Result<Arc<dyn BytesCodec>, CodecError>;

struct CatalogEntry {
    name: &'static str,
    role: CodecRole,
    classic: bool,
    cloud: bool,
    supports_options: bool,
    factory: CodecFactory,
}

impl CatalogEntry {
    fn available_for(&self, family: BackendFamily) -> bool {
        match family {
            BackendFamily::Classic => self.classic,
            BackendFamily::Cloud => self.cloud,
        }
    }
}

impl std::fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("classic", &self.classic)
            .field("cloud", &self.cloud)
            .field("supports_options", &self.supports_options)
            .finish_non_exhaustive()
    }
}

/// A registry mapping compression method names to codec capabilities for each
/// backend family.
///
/// Construct with [`CompressionCatalog::standard`] and pass the instance into
/// build/write/repack calls.
#[derive(Debug)]
pub struct CompressionCatalog {
    entries: Vec<CatalogEntry>,
    default_method: &'static str,
}

impl Default for CompressionCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl CompressionCatalog {
    /// Create the standard catalog: `gzip` and `zstd` compressors for both
    /// families, the `shuffle` filter for the cloud-object family.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            entries: vec![
                CatalogEntry {
                    name: "gzip",
                    role: CodecRole::Compressor,
                    classic: true,
                    cloud: true,
                    supports_options: true,
                    factory: |configuration, _| {
                        Ok(Arc::new(GzipCodec::new_with_configuration(configuration)?))
                    },
                },
                CatalogEntry {
                    name: "zstd",
                    role: CodecRole::Compressor,
                    classic: true,
                    cloud: true,
                    supports_options: true,
                    factory: |configuration, _| {
                        Ok(Arc::new(ZstdCodec::new_with_configuration(configuration)?))
                    },
                },
                CatalogEntry {
                    name: "shuffle",
                    role: CodecRole::Filter,
                    classic: false,
                    cloud: true,
                    supports_options: true,
                    factory: |configuration, element_size| {
                        Ok(Arc::new(ShuffleCodec::new_with_configuration(
                            configuration,
                            element_size,
                        )?))
                    },
                },
            ],
            default_method: "gzip",
        }
    }

    /// Returns true if `method` exists in the catalog for `family`.
    #[must_use]
    pub fn is_available(&self, method: &str, family: BackendFamily) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.name == method && entry.available_for(family))
    }

    /// Returns true if `method` accepts options for `family`.
    #[must_use]
    pub fn supports_options(&self, method: &str, family: BackendFamily) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.name == method && entry.available_for(family) && entry.supports_options)
    }

    /// Return the conservative always-available default method.
    ///
    /// Lossless, with no native-library dependency.
    #[must_use]
    pub fn default_method(&self, _family: BackendFamily) -> &str {
        self.default_method
    }

    fn entry(
        &self,
        method: &str,
        family: BackendFamily,
        role: CodecRole,
    ) -> Result<&CatalogEntry, UnknownCompressionMethodError> {
        self.entries
            .iter()
            .find(|entry| entry.name == method && entry.available_for(family) && entry.role == role)
            .ok_or_else(|| UnknownCompressionMethodError {
                method: method.to_string(),
                family,
            })
    }

    /// Resolve a compressor and filter chain into a [`CodecPipeline`].
    ///
    /// `element_size` is the byte size of one element of the dataset, used as
    /// the default for filters that operate element-wise.
    ///
    /// # Errors
    /// Returns [`CompressionError::UnknownMethod`] if any named method is
    /// absent from the catalog for `family` (in its role), or
    /// [`CompressionError::Codec`] if a codec rejects its options.
    pub fn build_pipeline(
        &self,
        family: BackendFamily,
        compressor: Option<&NamedConfiguration>,
        filters: Option<&[NamedConfiguration]>,
        element_size: usize,
    ) -> Result<CodecPipeline, CompressionError> {
        let mut filter_codecs = Vec::new();
        if let Some(filters) = filters {
            for filter in filters {
                let entry = self.entry(filter.name(), family, CodecRole::Filter)?;
                filter_codecs.push((entry.factory)(filter.configuration(), element_size)?);
            }
        }
        let compressor_codec = compressor
            .map(|compressor| {
                let entry = self.entry(compressor.name(), family, CodecRole::Compressor)?;
                Ok::<_, CompressionError>((entry.factory)(
                    compressor.configuration(),
                    element_size,
                )?)
            })
            .transpose()?;
        Ok(CodecPipeline::new(filter_codecs, compressor_codec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_availability() {
        let catalog = CompressionCatalog::standard();
        assert!(catalog.is_available("gzip", BackendFamily::Classic));
        assert!(catalog.is_available("gzip", BackendFamily::Cloud));
        assert!(catalog.is_available("zstd", BackendFamily::Classic));
        assert!(catalog.is_available("shuffle", BackendFamily::Cloud));
        assert!(!catalog.is_available("shuffle", BackendFamily::Classic));
        assert!(!catalog.is_available("blosc", BackendFamily::Cloud));
        assert_eq!(catalog.default_method(BackendFamily::Classic), "gzip");
        assert_eq!(catalog.default_method(BackendFamily::Cloud), "gzip");
    }

    #[test]
    fn catalog_unknown_method() {
        let catalog = CompressionCatalog::standard();
        let err = catalog
            .build_pipeline(
                BackendFamily::Cloud,
                Some(&NamedConfiguration::new("not_a_real_codec")),
                None,
                4,
            )
            .unwrap_err();
        assert!(matches!(err, CompressionError::UnknownMethod(_)));
        assert!(err.to_string().contains("not_a_real_codec"));
        assert!(err.to_string().contains("cloud"));
    }

    #[test]
    fn catalog_filter_not_a_compressor() {
        let catalog = CompressionCatalog::standard();
        assert!(
            catalog
                .build_pipeline(
                    BackendFamily::Cloud,
                    Some(&NamedConfiguration::new("shuffle")),
                    None,
                    4,
                )
                .is_err()
        );
        assert!(
            catalog
                .build_pipeline(
                    BackendFamily::Cloud,
                    Some(&NamedConfiguration::new("zstd")),
                    Some(&[NamedConfiguration::new("shuffle")]),
                    4,
                )
                .is_ok()
        );
    }

    #[test]
    fn catalog_filters_rejected_for_classic() {
        let catalog = CompressionCatalog::standard();
        assert!(
            catalog
                .build_pipeline(
                    BackendFamily::Classic,
                    Some(&NamedConfiguration::new("gzip")),
                    Some(&[NamedConfiguration::new("shuffle")]),
                    4,
                )
                .is_err()
        );
    }
}

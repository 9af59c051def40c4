//! Metrics registry and textfile export.
//!
//! Runs are short-lived, so nothing scrapes the process. After each run the
//! registry is written in text exposition format for node-exporter's textfile
//! collector.

use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in bookwarden_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
    registry
});

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}

/// Write the registry to `path`, replacing it atomically.
pub fn write_textfile(path: &Path) -> Result<()> {
    let body = encode_metrics()?;
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, body).with_context(|| format!("Failed to write {:?}", tmp))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Failed to rename {:?}", tmp))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookwarden_core::metrics::IMPORTS;
    use tempfile::TempDir;

    #[test]
    fn test_textfile_contains_core_metrics() {
        IMPORTS.with_label_values(&["ebook", "imported"]).inc();

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bookwarden.prom");
        write_textfile(&path).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("bookwarden_imports_total"));
        assert!(!temp.path().join("bookwarden.prom.tmp").exists());
    }
}

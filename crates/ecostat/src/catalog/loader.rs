use std::collections::HashSet;
use std::path::Path;

use log::info;

use crate::error::CatalogError;
use crate::stats::Statistic;

/// Reads the statistic catalog, a JSON array of `{code, name, cycle, fullPath?}`.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<Statistic>, CatalogError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let statistics = load_catalog_from_str(&content)?;
    info!("Loaded {} statistics from {:?}", statistics.len(), path);
    Ok(statistics)
}

pub fn load_catalog_from_str(content: &str) -> Result<Vec<Statistic>, CatalogError> {
    let statistics: Vec<Statistic> = serde_json::from_str(content)?;

    let mut seen = HashSet::new();
    for stat in &statistics {
        if stat.code.trim().is_empty() {
            return Err(CatalogError::InvalidEntry {
                code: stat.code.clone(),
                reason: "empty statistic code".to_string(),
            });
        }
        if !seen.insert(stat.code.as_str()) {
            return Err(CatalogError::InvalidEntry {
                code: stat.code.clone(),
                reason: "duplicate statistic code".to_string(),
            });
        }
    }

    Ok(statistics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Cycle;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_catalog_from_str() {
        let json = r#"[
            {"code": "200Y105", "name": "GDP", "cycle": "Q", "fullPath": "National Accounts > GDP"},
            {"code": "901Y009", "name": "CPI", "cycle": "M"}
        ]"#;
        let catalog = load_catalog_from_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].cycle, Cycle::Quarterly);
        assert_eq!(catalog[1].full_path, "");
    }

    #[test]
    fn test_load_catalog_rejects_duplicates() {
        let json = r#"[
            {"code": "A", "name": "x", "cycle": "M"},
            {"code": "A", "name": "y", "cycle": "M"}
        ]"#;
        let err = load_catalog_from_str(json).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidEntry { .. }));
    }

    #[test]
    fn test_load_catalog_rejects_unknown_cycle() {
        let json = r#"[{"code": "A", "name": "x", "cycle": "W"}]"#;
        assert!(matches!(
            load_catalog_from_str(json),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_load_catalog_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"code": "722Y001", "name": "Base Rate", "cycle": "M"}}]"#).unwrap();
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog[0].code, "722Y001");
    }

    #[test]
    fn test_load_catalog_missing_file() {
        let err = load_catalog("/nonexistent/catalog.json").unwrap_err();
        assert!(matches!(err, CatalogError::ReadFile { .. }));
    }
}

use super::FormatError;
use serde::Serialize;

/// YAML for any outline value
pub fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String, FormatError> {
    serde_yaml::to_string(value).map_err(FormatError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutlineMap, OutlineStats, ScanMetadata};
    use std::path::PathBuf;

    #[test]
    fn test_to_yaml() {
        let map = OutlineMap {
            root: PathBuf::from("/test"),
            files: vec![],
            stats: OutlineStats::default(),
            metadata: ScanMetadata::default(),
        };

        let yaml = to_yaml(&map).unwrap();
        assert!(yaml.contains("root:"));
        assert!(yaml.contains("files:"));
    }
}

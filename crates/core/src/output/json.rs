use super::FormatError;
use serde::Serialize;

/// Pretty-printed JSON for any outline value
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, FormatError> {
    serde_json::to_string_pretty(value).map_err(FormatError::from)
}

/// Single-line JSON
pub fn to_json_compact<T: Serialize + ?Sized>(value: &T) -> Result<String, FormatError> {
    serde_json::to_string(value).map_err(FormatError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutlineMap, OutlineStats, ScanMetadata};
    use std::path::PathBuf;

    #[test]
    fn test_to_json() {
        let map = OutlineMap {
            root: PathBuf::from("/test"),
            files: vec![],
            stats: OutlineStats::default(),
            metadata: ScanMetadata::default(),
        };

        let json = to_json(&map).unwrap();
        assert!(json.contains("\"root\""));
        assert!(json.contains("\"files\""));
        assert!(!to_json_compact(&map).unwrap().contains('\n'));
    }
}

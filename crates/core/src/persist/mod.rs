//! Binary snapshots of a parsed code base.
//!
//! The format is little-endian and written in one pass, depth first: header,
//! dialect flag and block count, the element tree, then the symbol table.
//! Locations are stored as bare line offsets (`-1` when unset).
//!
//! Loading runs in two phases. [`SnapshotReader`] rebuilds the tree and the
//! symbol table with every location unbound; [`rebind`] then walks each
//! stored offset back to the leaf that now holds it.

mod reader;
mod writer;

pub use reader::SnapshotReader;
pub use writer::SnapshotWriter;

use crate::parsers::CodeBase;
use crate::symbols::Location;
use crate::tree::CodeTree;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

pub const MAGIC: &[u8; 4] = b"FNAV";
pub const VERSION: u32 = 1;

pub(crate) const LINK_NONE: i32 = 0;
pub(crate) const LINK_STRUCT: i32 = 1;
pub(crate) const LINK_CLASS: i32 = 2;

const MAX_DEPTH: usize = 256;
const MAX_STRING_LEN: usize = 1 << 20;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a snapshot file")]
    BadMagic,
    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
    #[error("Value {0} does not fit the snapshot format")]
    Overflow(usize),
    #[error("Element {0} is missing from the tree")]
    DanglingElement(u32),
}

/// Write `code` to `path`.
pub fn save(code: &CodeBase, path: &Path) -> Result<(), PersistError> {
    let file = File::create(path)?;
    let mut writer = SnapshotWriter::new(BufWriter::new(file));
    writer.write_code_base(code)?;
    debug!(path = %path.display(), lines = code.line_count(), "saved snapshot");
    Ok(())
}

/// Read a snapshot from `path` and re-bind its locations.
pub fn load(path: &Path) -> Result<CodeBase, PersistError> {
    let file = File::open(path)?;
    let mut code = SnapshotReader::new(BufReader::new(file)).read_code_base()?;
    let unbound = rebind(&mut code);
    debug!(
        path = %path.display(),
        lines = code.line_count(),
        unbound,
        "loaded snapshot"
    );
    Ok(code)
}

/// Serialize into a byte buffer.
pub fn to_bytes(code: &CodeBase) -> Result<Vec<u8>, PersistError> {
    let mut writer = SnapshotWriter::new(Vec::new());
    writer.write_code_base(code)?;
    Ok(writer.into_inner())
}

/// Deserialize from a byte buffer, both phases.
pub fn from_bytes(bytes: &[u8]) -> Result<CodeBase, PersistError> {
    let mut code = SnapshotReader::new(bytes).read_code_base()?;
    rebind(&mut code);
    Ok(code)
}

fn bind(tree: &CodeTree, location: &mut Location) -> bool {
    location.element = tree.leaf_at(location.file_offset);
    if location.element.is_none() {
        warn!(
            line = location.file_offset + 1,
            "symbol location no longer maps to a line"
        );
        return false;
    }
    true
}

/// Second load phase: bind every stored offset to its leaf and drop symbol
/// links that name a missing type. Returns how many locations stayed unbound.
pub fn rebind(code: &mut CodeBase) -> usize {
    let CodeBase { tree, symbols, .. } = code;
    let mut unbound = 0;

    symbols.for_each_location_mut(|location| {
        if !bind(tree, location) {
            unbound += 1;
        }
    });

    for id in tree.ids().collect::<Vec<_>>() {
        if let Some(link) = tree.symbol_link(id) {
            if symbols.type_name(link).is_none() {
                warn!(?link, "dropping symbol link to a missing type");
                tree.set_symbol_link(id, None);
            }
        }
        let Some(slot) = tree.vars_mut(id) else {
            continue;
        };
        let mut vars = std::mem::take(slot);
        for var in vars.iter_mut() {
            if let Some(location) = var.location.as_mut() {
                if !bind(tree, location) {
                    unbound += 1;
                }
            }
        }
        if let Some(slot) = tree.vars_mut(id) {
            *slot = vars;
        }
    }
    unbound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseConfig;
    use crate::navigation::{resolve, NavError};
    use crate::parsers::CppParser;
    use crate::session::Session;
    use tempfile::TempDir;

    const SOURCE: &str = "\
struct Node {
  Node *next;
  int value;
};
class Foo {
public:
  Foo();
  ~Foo();
  int bar(int k);
  Node *head;
};
Foo::Foo() {
}
int Foo::bar(int k) {
  return head->value + k;
}
int tally;
int main() {
  Foo f;
  return f.bar(tally);
}
";

    fn parse() -> CodeBase {
        CppParser::new(ParseConfig::default())
            .unwrap()
            .parse_source(SOURCE)
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.fnav");
        let mut code = parse();
        let main = code.symbols().functions.get("main").unwrap().location.unwrap();
        code.tree_mut().reveal(main.element.unwrap());

        save(&code, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.dialect(), code.dialect());
        assert_eq!(loaded.tree().element_count(), code.tree().element_count());
        assert_eq!(loaded.tree().source_lines(), code.tree().source_lines());
        assert_eq!(loaded.tree().visible_lines(), code.tree().visible_lines());
        assert_eq!(loaded.symbols().entries(), code.symbols().entries());
        assert!(loaded.tree().check_lengths().is_ok());
    }

    #[test]
    fn test_locations_rebound_after_load() {
        let code = parse();
        let loaded = from_bytes(&to_bytes(&code).unwrap()).unwrap();
        let mut seen = 0;
        let mut symbols = loaded.symbols().clone();
        symbols.for_each_location_mut(|location| {
            seen += 1;
            assert!(loaded.is_current(location), "{:?}", location);
        });
        assert!(seen > 0);

        let class = loaded.symbols().classes.get("Foo").unwrap();
        assert_eq!(class.constructor.as_ref().and_then(|c| c.location).map(|l| l.file_offset), Some(11));
        assert_eq!(class.destructor.as_ref().map(|d| d.name.as_str()), Some("~Foo"));
    }

    #[test]
    fn test_resolution_survives_reload() {
        let code = parse();
        let loaded = from_bytes(&to_bytes(&code).unwrap()).unwrap();
        for c in [&code, &loaded] {
            let leaf = c.tree().leaf_at(19).unwrap();
            let column = c.element_line(leaf).unwrap().find("bar").unwrap();
            let found = resolve(c, leaf, column).map(|l| l.file_offset);
            assert_eq!(found, Some(13));

            let leaf = c.tree().leaf_at(14).unwrap();
            let column = c.element_line(leaf).unwrap().find("value").unwrap();
            assert_eq!(resolve(c, leaf, column).map(|l| l.file_offset), Some(2));
        }
    }

    #[test]
    fn test_stale_offset_stays_unbound() {
        let mut code = parse();
        if let Some(main) = code.symbols.functions.get_mut("main") {
            main.location = Some(Location::unbound(999));
        }
        let loaded = from_bytes(&to_bytes(&code).unwrap()).unwrap();
        let main = loaded.symbols().functions.get("main").unwrap();
        assert!(main.location.is_some_and(|l| !l.is_bound()));

        let mut session = Session::new(loaded);
        assert_eq!(
            session.goto_symbol("main"),
            Err(NavError::LocationUnavailable { offset: 999 })
        );
    }

    #[test]
    fn test_rejects_bad_header() {
        assert!(matches!(from_bytes(b"NOPE\x01\0\0\0"), Err(PersistError::BadMagic)));

        let mut bytes = to_bytes(&parse()).unwrap();
        bytes[4] = 9;
        assert!(matches!(
            from_bytes(&bytes),
            Err(PersistError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_truncated_snapshot_is_an_error() {
        let bytes = to_bytes(&parse()).unwrap();
        let cut = &bytes[..bytes.len() / 2];
        assert!(matches!(from_bytes(cut), Err(PersistError::Io(_))));
    }

    #[test]
    fn test_corrupt_kind_is_reported() {
        let mut bytes = to_bytes(&parse()).unwrap();
        // header (8) + dialect flag (1) + block count (4), then the root kind
        bytes[13] = 0x7f;
        assert!(matches!(from_bytes(&bytes), Err(PersistError::Corrupt(_))));
    }
}

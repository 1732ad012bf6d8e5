//! Feed parsing and file loading

use crate::borders::BorderSet;
use crate::facts::FactsTable;
use crate::matrix::VisaMatrix;
use crate::session::{Dataset, Session};
use crate::{DataError, Result};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// Visa requirement snapshot shipped with the crate, used when no matrix
/// source is configured
pub const BUNDLED_MATRIX: &[u8] = include_bytes!("../data/passport-index-matrix.json");

/// Parse the visa requirement feed
pub fn parse_matrix(bytes: &[u8]) -> Result<VisaMatrix> {
    let raw: Value = serde_json::from_slice(bytes)?;
    VisaMatrix::load(&raw)
}

/// Parse the country facts feed (a JSON array of provider records)
pub fn parse_facts(bytes: &[u8]) -> Result<FactsTable> {
    let raw: Value = serde_json::from_slice(bytes)?;
    facts_from_value(&raw)
}

/// Parse the border polygon feed
pub fn parse_borders(bytes: &[u8]) -> Result<BorderSet> {
    let raw: Value = serde_json::from_slice(bytes)?;
    BorderSet::from_value(raw)
}

fn facts_from_value(raw: &Value) -> Result<FactsTable> {
    let records = raw
        .as_array()
        .ok_or(DataError::UnexpectedShape("country facts must be a JSON array"))?;
    Ok(FactsTable::build(records))
}

fn read_json(path: &Path) -> Result<Value> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Load the visa requirement feed from a JSON file
pub fn load_matrix(path: impl AsRef<Path>) -> Result<VisaMatrix> {
    let path = path.as_ref();
    info!("Loading visa matrix from {:?}", path);
    let matrix = VisaMatrix::load(&read_json(path)?)?;
    info!("Loaded {} passports", matrix.len());
    Ok(matrix)
}

/// The bundled visa requirement snapshot
pub fn bundled_matrix() -> Result<VisaMatrix> {
    let matrix = parse_matrix(BUNDLED_MATRIX)?;
    info!("Loaded bundled visa matrix: {} passports", matrix.len());
    Ok(matrix)
}

/// Load the country facts feed from a JSON file
pub fn load_facts(path: impl AsRef<Path>) -> Result<FactsTable> {
    let path = path.as_ref();
    info!("Loading country facts from {:?}", path);
    let facts = facts_from_value(&read_json(path)?)?;
    info!("Loaded facts for {} countries", facts.len());
    Ok(facts)
}

/// Load the border polygon feed from a GeoJSON file
pub fn load_borders(path: impl AsRef<Path>) -> Result<BorderSet> {
    let path = path.as_ref();
    info!("Loading borders from {:?}", path);
    let borders = BorderSet::from_value(read_json(path)?)?;
    info!("Loaded {} border features", borders.feature_count());
    Ok(borders)
}

/// Local copies of the three feeds. A missing matrix path falls back to the
/// bundled snapshot.
#[derive(Debug, Clone, Default)]
pub struct FeedPaths {
    pub borders: Option<PathBuf>,
    pub matrix: Option<PathBuf>,
    pub facts: Option<PathBuf>,
}

/// Fill a session from local files. A missing or unreadable file marks its
/// slot failed and the other feeds still load.
pub fn load_session(session: &mut Session, paths: &FeedPaths) {
    match paths.borders.as_deref().map(load_borders) {
        Some(Ok(borders)) => {
            session.install_borders(borders);
        }
        Some(Err(e)) => {
            session.mark_failed(Dataset::Borders, e.to_string());
        }
        None => {
            session.mark_failed(Dataset::Borders, "no border file given");
        }
    }

    let matrix = match paths.matrix.as_deref() {
        Some(path) => load_matrix(path),
        None => bundled_matrix(),
    };
    match matrix {
        Ok(matrix) => {
            session.install_matrix(matrix);
        }
        Err(e) => {
            session.mark_failed(Dataset::Matrix, e.to_string());
        }
    }

    match paths.facts.as_deref().map(load_facts) {
        Some(Ok(facts)) => {
            session.install_facts(facts);
        }
        Some(Err(e)) => {
            session.mark_failed(Dataset::Facts, e.to_string());
        }
        None => {
            session.mark_failed(Dataset::Facts, "no country facts file given");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LoadPhase;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_matrix() {
        let file = write_temp(r#"{"USA": {"FRA": 90, "RUS": "e-visa"}}"#);
        let matrix = load_matrix(file.path()).unwrap();
        assert_eq!(matrix.len(), 1);
        assert!(matrix.requirement("USA", "RUS").is_some());
    }

    #[test]
    fn test_load_facts() {
        let file = write_temp(
            r#"[
                {"cca3": "FRA", "name": {"common": "France"}, "capital": ["Paris"]},
                {"name": {"common": "No Key"}}
            ]"#,
        );
        let facts = load_facts(file.path()).unwrap();
        assert_eq!(facts.len(), 1);
    }

    #[test]
    fn test_facts_must_be_array() {
        assert!(matches!(
            parse_facts(br#"{"FRA": {}}"#),
            Err(DataError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse_matrix(b"{not json"), Err(DataError::Json(_))));
        assert!(matches!(load_matrix("/nonexistent/matrix.json"), Err(DataError::Io(_))));
    }

    #[test]
    fn test_bundled_matrix() {
        let matrix = bundled_matrix().unwrap();
        assert!(matrix.len() >= 20);
        assert!(matrix.has_passport("USA"));
        assert!(matrix.has_passport("EGY"));
        // Own-country cells (-1) are not requirements
        assert_eq!(matrix.requirement("USA", "USA"), None);
        assert!(matrix.requirement("USA", "FRA").is_some());
    }

    #[test]
    fn test_missing_matrix_path_uses_bundled() {
        let mut session = Session::new();
        load_session(&mut session, &FeedPaths::default());
        assert!(session.matrix().unwrap().has_passport("USA"));
        assert_eq!(session.load_state(Dataset::Borders).state, LoadPhase::Failed);
        assert_eq!(session.load_state(Dataset::Facts).state, LoadPhase::Failed);
    }

    #[test]
    fn test_load_session_degrades_per_feed() {
        let matrix = write_temp(r#"{"USA": {"FRA": 90}}"#);
        let borders = write_temp(r#"{"type": "FeatureCollection", "features": []}"#);
        let paths = FeedPaths {
            borders: Some(borders.path().to_path_buf()),
            matrix: Some(matrix.path().to_path_buf()),
            facts: Some(PathBuf::from("/nonexistent/countries.json")),
        };

        let mut session = Session::new();
        load_session(&mut session, &paths);

        assert!(session.matrix().is_some());
        assert!(session.borders().is_some());
        assert_eq!(session.load_state(Dataset::Facts).state, LoadPhase::Failed);
        assert!(!session.is_ready());
        // Picker still lists the matrix keys without names
        let destinations = session.available_destinations();
        assert_eq!(destinations.len(), 1);
        assert_eq!(destinations[0].name, "USA");
    }
}

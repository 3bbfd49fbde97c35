//! Coordinate files: `lat_lon = [ (x, y), ... ]`, one file per area

use anyhow::{Context, Result};
use kiadb_common::{Area, Coordinate};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn pair_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\(\[]\s*(-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)\s*,\s*(-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)\s*[\)\]]")
            .expect("coordinate pattern is valid")
    })
}

/// Extract every `(x, y)` pair, in file order.
pub fn parse_coordinates(content: &str) -> Result<Vec<Coordinate>> {
    let body = match content.split_once('=') {
        Some((_, rhs)) => rhs,
        None => content,
    };

    let mut coordinates = Vec::new();
    for caps in pair_pattern().captures_iter(body) {
        let x: f64 = caps[1]
            .parse()
            .context(format!("Invalid x coordinate '{}'", &caps[1]))?;
        let y: f64 = caps[2]
            .parse()
            .context(format!("Invalid y coordinate '{}'", &caps[2]))?;
        coordinates.push(Coordinate::new(x, y));
    }
    Ok(coordinates)
}

/// One coordinate file and the area it describes.
#[derive(Debug, Clone)]
pub struct AreaInput {
    pub path: PathBuf,
    pub area: Area,
    pub coordinates: Vec<Coordinate>,
}

/// Read and parse one area file. The file stem names the area.
pub async fn load_area(path: &Path) -> Result<AreaInput> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .context(format!("Coordinate file has no usable name: {:?}", path))?;
    let area = Area::from_stem(stem)?;

    let content = tokio::fs::read_to_string(path)
        .await
        .context(format!("Failed to read coordinate file: {:?}", path))?;
    let coordinates = parse_coordinates(&content)?;

    tracing::info!("Loaded {} coordinates from {:?}", coordinates.len(), path);
    Ok(AreaInput {
        path: path.to_path_buf(),
        area,
        coordinates,
    })
}

/// `*.txt` files in `dir`, sorted by name.
pub async fn list_coordinate_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .context(format!("Coordinates directory {:?} does not exist", dir))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_python_style_list() {
        let content = "lat_lon = [\n    (8621234.5, 1459876.25),\n    (-1.5e2, 3)\n]";
        let coords = parse_coordinates(content).unwrap();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[0], Coordinate::new(8621234.5, 1459876.25));
        assert_eq!(coords[1], Coordinate::new(-150.0, 3.0));
    }

    #[test]
    fn test_parse_bracket_pairs() {
        let coords = parse_coordinates("lat_lon = [[1.0, 2.0], [3.0, 4.0]]").unwrap();
        assert_eq!(coords, vec![Coordinate::new(1.0, 2.0), Coordinate::new(3.0, 4.0)]);
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_coordinates("lat_lon = []").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_and_list_area_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("Kolar-Vemagal.txt"),
            "lat_lon = [\n    (1.0, 2.0)\n]",
        )
        .unwrap();
        std::fs::write(dir.path().join("Kolar-Malur.txt"), "lat_lon = []").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignore me").unwrap();

        let files = list_coordinate_files(dir.path()).await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("Kolar-Malur.txt"));

        let input = load_area(&files[1]).await.unwrap();
        assert_eq!(input.area.industrial_area(), "Vemagal");
        assert_eq!(input.coordinates, vec![Coordinate::new(1.0, 2.0)]);
    }

    #[tokio::test]
    async fn test_load_rejects_unnamed_area() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Kolar.txt");
        std::fs::write(&path, "lat_lon = []").unwrap();
        assert!(load_area(&path).await.is_err());
    }
}

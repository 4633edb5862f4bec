// src/ted/corpus.rs
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One `YYYY-MM` directory of the export.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Partition {
    pub year: u32,
    pub month: u32,
    pub path: PathBuf,
}

impl Partition {
    /// Parses a directory name such as `2016-01`. Anything else is not a partition.
    fn from_dir(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let (year, month) = name.split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        let year = year.parse::<u32>().ok()?;
        let month = month.parse::<u32>().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month, path })
    }
}

/// Lists every `*.xml` notice under the partitions of `root`, oldest partition first
/// and files sorted by name within a partition.
///
/// Empty `years` / `months` filters select everything.
pub fn discover(root: &Path, years: &[u32], months: &[u32]) -> io::Result<Vec<PathBuf>> {
    let mut partitions = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        match Partition::from_dir(path) {
            Some(p) if (years.is_empty() || years.contains(&p.year)) && (months.is_empty() || months.contains(&p.month)) => {
                partitions.push(p)
            }
            Some(p) => tracing::trace!("Skipping partition {} (filtered out)", p.path.display()),
            None => {}
        }
    }
    partitions.sort();

    let mut files = Vec::new();
    for partition in &partitions {
        let mut notices: Vec<PathBuf> = fs::read_dir(&partition.path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xml")))
            .collect();
        notices.sort();
        tracing::debug!("Partition {:04}-{:02}: {} notices", partition.year, partition.month, notices.len());
        files.extend(notices);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        for (partition, files) in [
            ("2016-02", vec!["b.xml", "a.xml", "notes.txt"]),
            ("2015-12", vec!["z.xml"]),
            ("2016-01", vec!["c.XML"]),
            ("misc", vec!["ignored.xml"]),
        ] {
            let part = dir.path().join(partition);
            fs::create_dir(&part).unwrap();
            for file in files {
                fs::write(part.join(file), "<TED_EXPORT/>").unwrap();
            }
        }
        dir
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.strip_prefix(p.parent().unwrap().parent().unwrap()).unwrap().display().to_string())
            .collect()
    }

    #[test]
    fn test_discover_orders_partitions_and_files() {
        let dir = corpus();
        let files = discover(dir.path(), &[], &[]).unwrap();
        let expected: Vec<String> = ["2015-12/z.xml", "2016-01/c.XML", "2016-02/a.xml", "2016-02/b.xml"]
            .iter()
            .map(|s| Path::new(s).display().to_string())
            .collect();
        assert_eq!(names(&files), expected);
    }

    #[test]
    fn test_discover_filters_years_and_months() {
        let dir = corpus();
        assert_eq!(discover(dir.path(), &[2016], &[]).unwrap().len(), 3);
        assert_eq!(discover(dir.path(), &[2016], &[2]).unwrap().len(), 2);
        assert!(discover(dir.path(), &[2014], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(discover(&dir.path().join("nope"), &[], &[]).is_err());
    }
}

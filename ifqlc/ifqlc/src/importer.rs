//! Finding the source of imported packages.
//!
//! A package is a directory `<dir>/ifql_pkgs/<path>/` of `.ifql` files which
//! all declare the same `package` name. Its files are merged into one
//! program, which the interpreter evaluates to produce the exported names.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ifqlc_parser::ast;
use ifqlc_parser::error::codes;
use itertools::Itertools;
use semver::Version;

use crate::{Error, ErrorSource, Result, WithErrorInfo};

/// Directory that holds the packages importable from a source directory.
pub const PACKAGES_DIR: &str = "ifql_pkgs";

/// Extension of source files.
pub const SOURCE_EXTENSION: &str = "ifql";

pub trait Importer {
    /// Finds and parses the package at `path`, relative to the packages
    /// directory under `dir`.
    fn import(&self, path: &str, dir: &Path) -> Result<Arc<Package>>;
}

/// A parsed package, with the statements of all its files.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
    pub version: Option<Version>,
    pub program: ast::Program,
}

/// Reads packages from the file system, parsing each directory once.
#[derive(Debug, Default)]
pub struct FileImporter {
    cache: Mutex<HashMap<PathBuf, Arc<Package>>>,
}

impl FileImporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Importer for FileImporter {
    fn import(&self, path: &str, dir: &Path) -> Result<Arc<Package>> {
        let location = dir.join(PACKAGES_DIR).join(path);
        let location = location.canonicalize().map_err(|_| {
            import_error(format!(
                "could not find package {path:?} at {:?}",
                location.display().to_string()
            ))
        })?;

        let mut cache = self
            .cache
            .lock()
            .map_err(|_| Error::new_assert("package cache is poisoned"))?;
        if let Some(package) = cache.get(&location) {
            log::debug!("package {path:?} found in cache");
            return Ok(package.clone());
        }

        log::debug!("loading package {path:?} from {}", location.display());
        let package = Arc::new(load_dir(&location).with_source(ErrorSource::Import)?);
        cache.insert(location, package.clone());
        Ok(package)
    }
}

fn load_dir(location: &Path) -> Result<Package> {
    let entries = fs::read_dir(location).map_err(|e| {
        import_error(format!(
            "failed to read package directory {:?}: {e}",
            location.display().to_string()
        ))
    })?;

    let files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == SOURCE_EXTENSION))
        .sorted()
        .collect();

    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let source = fs::read_to_string(&file)
            .map_err(|e| import_error(format!("failed to read file {name:?}: {e}")))?;
        sources.push((name, source));
    }

    merge_files(sources)
}

/// Parses the files of one package and merges them, in order.
fn merge_files(files: Vec<(String, String)>) -> Result<Package> {
    let mut package: Option<Package> = None;

    for (file, source) in files {
        let mut program = ifqlc_parser::parse_source(&source, 0).map_err(|errors| {
            import_error(format!(
                "failed to parse file {file:?}: {}",
                errors.iter().map(|e| e.to_string()).join("; ")
            ))
        })?;

        let Some(clause) = program.package.take() else {
            return Err(import_error(format!(
                "no package name declared in file {file:?}"
            )));
        };

        match &mut package {
            None => {
                package = Some(Package {
                    name: clause.name.clone(),
                    version: clause.version.clone(),
                    program: ast::Program {
                        package: Some(clause),
                        imports: program.imports,
                        body: program.body,
                    },
                });
            }
            Some(package) => {
                if package.name != clause.name {
                    return Err(import_error(format!(
                        "found conflicting package names [{:?}, {:?}] declared in file {file:?}",
                        package.name, clause.name
                    )));
                }
                if package.version.is_none() {
                    package.version = clause.version;
                }
                package.program.imports.extend(program.imports);
                package.program.body.extend(program.body);
            }
        }
    }

    package.ok_or_else(|| import_error("no package name declared"))
}

fn import_error<S: ToString>(reason: S) -> Error {
    Error::new_simple(reason)
        .with_code(codes::IMPORT)
        .with_source(ErrorSource::Import)
}

/// Refuses every import.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullImporter;

impl Importer for NullImporter {
    fn import(&self, _path: &str, _dir: &Path) -> Result<Arc<Package>> {
        Err(import_error("imports are not allowed"))
    }
}

/// Packages held in memory, one source file each, keyed by their path.
#[derive(Debug, Default, Clone)]
pub struct MapImporter {
    sources: HashMap<String, String>,
}

impl MapImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package<P: Into<String>, S: Into<String>>(mut self, path: P, source: S) -> Self {
        self.sources.insert(path.into(), source.into());
        self
    }
}

impl Importer for MapImporter {
    fn import(&self, path: &str, _dir: &Path) -> Result<Arc<Package>> {
        let source = self
            .sources
            .get(path)
            .ok_or_else(|| import_error(format!("could not find package {path:?}")))?;
        let file = format!("{path}.{SOURCE_EXTENSION}");
        merge_files(vec![(file, source.clone())]).map(Arc::new)
    }
}

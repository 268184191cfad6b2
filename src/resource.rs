//! Resource lookup by name (`AR0100.WED`, `AR0100.TIS`, ...).
//!
//! Names are matched case-insensitively. A directory provider prefers files found in the
//! `override` subdirectory over the game directory itself.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

pub trait ResourceProvider {
    fn resolve(&self, name: &str) -> Option<Vec<u8>>;

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }
}

/// Night variant of a WED name: `AR2600.WED` becomes `AR2600N.WED`
pub fn night_variant_name(name: &str) -> String {
    match name.rfind('.') {
        Some(dot) => format!("{}N{}", &name[..dot], &name[dot..]),
        None => format!("{}N", name),
    }
}

/// `resref` plus extension, upper-cased
pub fn resource_name(resref: &str, extension: &str) -> String {
    format!("{}.{}", resref.trim(), extension).to_uppercase()
}

pub struct DirectoryProvider {
    search_paths: Vec<PathBuf>,
}

impl DirectoryProvider {
    pub fn new<P: AsRef<Path>>(game_dir: P) -> Self {
        let game_dir = game_dir.as_ref().to_path_buf();
        DirectoryProvider {
            search_paths: vec![game_dir.join("override"), game_dir],
        }
    }

    fn find(&self, name: &str) -> Option<PathBuf> {
        for dir in &self.search_paths {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                if entry.file_name().to_string_lossy().eq_ignore_ascii_case(name) {
                    return Some(entry.path());
                }
            }
        }
        None
    }
}

impl ResourceProvider for DirectoryProvider {
    fn resolve(&self, name: &str) -> Option<Vec<u8>> {
        let path = self.find(name)?;
        match fs::read(&path) {
            Ok(data) => Some(data),
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn exists(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

#[derive(Default)]
pub struct MemoryProvider {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, data: Vec<u8>) {
        self.files.insert(name.to_uppercase(), data);
    }

    pub fn with(mut self, name: &str, data: Vec<u8>) -> Self {
        self.insert(name, data);
        self
    }
}

impl ResourceProvider for MemoryProvider {
    fn resolve(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(&name.to_uppercase()).cloned()
    }

    fn exists(&self, name: &str) -> bool {
        self.files.contains_key(&name.to_uppercase())
    }
}

#![warn(
    clippy::correctness,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::style,
    clippy::pedantic
)]

pub mod calibration;
mod error;
mod parser;
mod section;
mod value;

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub use error::{LoadError, SaveError, SectionError};
pub use parser::parse;
pub use section::{Entry, Section, Value};
pub use value::{IniValue, is_hex};

use section::fold_name;

/// Smallest buffer or file accepted by the loaders, in bytes.
pub const MIN_SIZE: u64 = 1;

/// Largest buffer or file accepted by the loaders, in bytes.
pub const MAX_SIZE: u64 = 5 * 1024 * 1024;

/// An INI document held entirely in memory.
///
/// Section and entry names are case-insensitive and stored lower-cased. Sections keep the
/// order in which they were first seen or added, and lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniFile {
    sections: Vec<Section>,
    path: Option<PathBuf>,
}

impl IniFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a document from an in-memory buffer.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Size`] if the buffer is empty or exceeds [`MAX_SIZE`].
    pub fn from_memory(buffer: &[u8]) -> Result<Self, LoadError> {
        let mut ini = Self::new();
        ini.load_from_memory(buffer)?;
        Ok(ini)
    }

    /// Reads and parses a document from `path`, remembering the path for [`IniFile::save`].
    ///
    /// # Errors
    ///
    /// See [`IniFile::load_from_file`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let mut ini = Self::new();
        ini.load_from_file(path)?;
        Ok(ini)
    }

    /// Replaces the document with the contents of `buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Size`] if the buffer is empty or exceeds [`MAX_SIZE`]; the document
    /// is left untouched in that case.
    pub fn load_from_memory(&mut self, buffer: &[u8]) -> Result<(), LoadError> {
        self.sections = parser::parse(buffer)?;
        log::debug!(
            "parsed {} bytes into {} sections",
            buffer.len(),
            self.sections.len()
        );
        Ok(())
    }

    /// Replaces the document with the contents of the file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist, is not a regular file inside an existing directory, is
    /// empty or larger than [`MAX_SIZE`], or cannot be read.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LoadError::NotFound {
                path: path.to_owned(),
            });
        }

        let in_directory = path
            .parent()
            .is_none_or(|parent| parent.as_os_str().is_empty() || parent.is_dir());
        if !in_directory || !path.is_file() {
            return Err(LoadError::NotAFile {
                path: path.to_owned(),
            });
        }

        let io_error = |source| LoadError::Io {
            path: path.to_owned(),
            source,
        };

        // Check the size before reading so an oversized file is never buffered.
        parser::check_size(fs::metadata(path).map_err(io_error)?.len())?;
        let buffer = fs::read(path).map_err(io_error)?;

        self.load_from_memory(&buffer)?;
        self.path = Some(path.to_owned());
        log::debug!("loaded {}", path.display());
        Ok(())
    }

    /// Loads the file the document was last loaded from or saved to.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] with an empty path if no path is known, otherwise see
    /// [`IniFile::load_from_file`].
    pub fn reload(&mut self) -> Result<(), LoadError> {
        let path = self.path.clone().ok_or_else(|| LoadError::NotFound {
            path: PathBuf::new(),
        })?;
        self.load_from_file(path)
    }

    /// Removes every section. The remembered path is kept.
    pub fn clear(&mut self) {
        self.sections.clear();
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        let name = fold_name(name);
        self.sections.iter().find(|section| section.name() == name)
    }

    fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        let name = fold_name(name);
        self.sections.iter_mut().find(|section| section.name() == name)
    }

    /// Removes the section named `name` and returns it.
    pub fn remove_section(&mut self, name: &str) -> Option<Section> {
        let name = fold_name(name);
        let index = self.sections.iter().position(|section| section.name() == name)?;
        Some(self.sections.remove(index))
    }

    /// Names of all sections, in document order.
    #[must_use]
    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(Section::name).collect()
    }

    /// Reads the scalar entry `key` from `section`, converted to `T`.
    ///
    /// Returns `None` if the section or entry is missing, or if the entry holds a list.
    #[must_use]
    pub fn get<T: IniValue>(&self, section: &str, key: &str) -> Option<T> {
        self.get_str(section, key).map(T::from_ini_str)
    }

    /// The raw text of the scalar entry `key` in `section`.
    #[must_use]
    pub fn get_str(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.entry(key)?.value().as_scalar()
    }

    /// Reads the scalar entry `key` from the section at position `index`.
    #[must_use]
    pub fn read_by_index(&self, index: usize, key: &str) -> Option<&str> {
        self.sections.get(index)?.entry(key)?.value().as_scalar()
    }

    /// Stores `value` under `key` in `section`, creating either if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::EmptyName`] if `section` or `key` is blank,
    /// [`SectionError::NotScalar`] if `key` already exists as a list entry, and
    /// [`SectionError::HoldsList`] if `key` is new but the section contains a list entry.
    pub fn set<T: IniValue>(
        &mut self,
        section: &str,
        key: &str,
        value: &T,
    ) -> Result<(), SectionError> {
        if fold_name(section).is_empty() || fold_name(key).is_empty() {
            return Err(SectionError::EmptyName);
        }

        let text = value.to_ini_string();

        let Some(target) = self.section_mut(section) else {
            self.sections.push(Section::with_entry(
                section,
                Entry::new(key, Value::Scalar(text)),
            ));
            return Ok(());
        };

        let Some(entry) = target.entry_mut(key) else {
            if target.entries().iter().any(|entry| entry.value().as_list().is_some()) {
                return Err(SectionError::HoldsList {
                    section: target.name().to_owned(),
                });
            }

            target.push(Entry::new(key, Value::Scalar(text)));
            return Ok(());
        };

        match entry.value_mut() {
            Value::Scalar(scalar) => {
                *scalar = text;
                Ok(())
            }
            Value::List(..) => Err(SectionError::NotScalar {
                section: fold_name(section),
                key: fold_name(key),
            }),
        }
    }

    /// Reads into or writes from `value`, depending on `write`.
    ///
    /// A write always succeeds unless the entry exists as a list. A read returns `true` and
    /// overwrites `value` only if the entry exists; otherwise `value` is left as it was.
    pub fn update<T: IniValue>(
        &mut self,
        section: &str,
        key: &str,
        value: &mut T,
        write: bool,
    ) -> bool {
        if write {
            return self.set(section, key, value).is_ok();
        }

        match self.get(section, key) {
            Some(read) => {
                *value = read;
                true
            }
            None => false,
        }
    }

    /// The values of a section made of a single list entry, such as a matrix block.
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::NotAList`] if the section exists but does not consist of exactly
    /// one list entry.
    pub fn section_list(&self, name: &str) -> Result<Option<&[String]>, SectionError> {
        let Some(section) = self.section(name) else {
            return Ok(None);
        };

        section.as_list().map(Some).ok_or_else(|| SectionError::NotAList {
            section: section.name().to_owned(),
        })
    }

    /// Replaces the values of a list section, or appends a new one named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::NotAList`] if a section named `name` exists but does not consist
    /// of exactly one list entry, or [`SectionError::EmptyName`] if `name` is blank.
    pub fn set_section_list(
        &mut self,
        name: &str,
        values: Vec<String>,
    ) -> Result<(), SectionError> {
        if fold_name(name).is_empty() {
            return Err(SectionError::EmptyName);
        }

        let Some(section) = self.section_mut(name) else {
            self.sections
                .push(Section::with_entry(name, Entry::new(name, Value::List(values))));
            return Ok(());
        };

        if let [entry] = section.entries_mut().as_mut_slice() {
            if let Value::List(list) = entry.value_mut() {
                *list = values;
                return Ok(());
            }
        }

        Err(SectionError::NotAList {
            section: section.name().to_owned(),
        })
    }

    /// Writes the serialized document to `path` and remembers it.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Io`] if the file cannot be written.
    pub fn write_to_file(&mut self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        let path = path.as_ref();

        fs::write(path, self.to_string()).map_err(|source| SaveError::Io {
            path: path.to_owned(),
            source,
        })?;

        self.path = Some(path.to_owned());
        log::debug!("wrote {} sections to {}", self.sections.len(), path.display());
        Ok(())
    }

    /// Writes the document back to the file it was loaded from.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::NoPath`] if no path is known, or [`SaveError::Io`] on write failure.
    pub fn save(&mut self) -> Result<(), SaveError> {
        let path = self.path.clone().ok_or(SaveError::NoPath)?;
        self.write_to_file(path)
    }
}

impl fmt::Display for IniFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{section}")?;
        }
        Ok(())
    }
}

/// Whether `path` can be opened for writing. A file created by the probe is removed again.
#[must_use]
pub fn is_file_writable(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    let existed = path.exists();

    let writable = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .is_ok();

    if writable && !existed {
        if let Err(e) = fs::remove_file(path) {
            log::debug!("failed to remove probe file {}: {e}", path.display());
        }
    }

    writable
}

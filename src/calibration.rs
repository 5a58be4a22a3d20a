//! Camera calibration files.
//!
//! A calibration file identifies the sensor, filter and light source a camera was calibrated
//! for, and carries the white balance gains and the 3×3 colour correction matrix (CCM) applied
//! to its RGB output:
//!
//! ```text
//! [Version]
//! Type=2
//! [Sensor]
//! Type=0x1A
//! [Filter]
//! Type=IR-cut
//! [Light]
//! Type=daylight
//! [wb]
//! fWB_R2G=1.250000
//! fWB_B2G=0.800000
//! [CCM]
//! R11=1.000
//! R12=0.000
//! ...
//! ```
//!
//! The matrix may also be stored under `[CCM_RGB]` with the same keys, or, in older files, as a
//! `[CCM]` section of nine bare lines following a header line.

use std::path::Path;

use crate::{IniFile, IniValue, LoadError, SectionError};

pub const DEFAULT_VERSION: u32 = 1;
pub const DEFAULT_FILTER: &str = "none";
pub const DEFAULT_LIGHT: &str = "daylight";

const CCM_SECTION: &str = "ccm";
const CCM_RGB_SECTION: &str = "ccm_rgb";

/// Row-major 3×3 colour correction matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub [[f32; 3]; 3]);

impl ColorMatrix {
    pub const IDENTITY: Self = Self([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    #[must_use]
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_identity(&self) -> bool {
        self.0 == Self::IDENTITY.0
    }

    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let mut product = [[0.0; 3]; 3];

        for (row, out) in product.iter_mut().enumerate() {
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.0[row][k] * other.0[k][col]).sum();
            }
        }

        Self(product)
    }

    #[must_use]
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        self.0.map(|row| {
            row.iter()
                .zip(rgb)
                .map(|(coefficient, channel)| coefficient * channel)
                .sum::<f32>()
        })
    }

    /// Builds a matrix from nine row-major values; `None` for any other count.
    #[must_use]
    pub fn from_values<S: AsRef<str>>(values: &[S]) -> Option<Self> {
        if values.len() != 9 {
            return None;
        }

        let mut matrix = [[0.0; 3]; 3];
        for (cell, value) in matrix.iter_mut().flatten().zip(values) {
            *cell = f32::from_ini_str(value.as_ref());
        }

        Some(Self(matrix))
    }

    /// The nine coefficients in row-major order, formatted with three decimals.
    #[must_use]
    pub fn to_values(&self) -> Vec<String> {
        self.0
            .iter()
            .flatten()
            .map(|coefficient| format!("{coefficient:.3}"))
            .collect()
    }

    fn read_keyed(ini: &IniFile, section: &str) -> Option<Self> {
        let mut matrix = [[0.0; 3]; 3];

        for (row, values) in matrix.iter_mut().enumerate() {
            for (col, cell) in values.iter_mut().enumerate() {
                *cell = ini.get(section, &coefficient_key(row, col))?;
            }
        }

        Some(Self(matrix))
    }
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// Keys are one-based: `r11` is the top-left coefficient.
fn coefficient_key(row: usize, col: usize) -> String {
    format!("r{}{}", row + 1, col + 1)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteBalance {
    /// Red to green gain.
    pub r2g: f32,
    /// Blue to green gain.
    pub b2g: f32,
}

impl Default for WhiteBalance {
    fn default() -> Self {
        Self { r2g: 1.0, b2g: 1.0 }
    }
}

/// How [`Calibration::store`] writes the colour correction matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatrixLayout {
    /// `r11`..`r33` keys in a `[ccm]` section.
    #[default]
    Keyed,
    /// Nine bare lines in a `[ccm]` section.
    List,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub version: u32,
    pub sensor_type: u16,
    pub filter: String,
    pub light: String,
    pub white_balance: WhiteBalance,
    pub ccm: ColorMatrix,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            sensor_type: 0,
            filter: DEFAULT_FILTER.to_owned(),
            light: DEFAULT_LIGHT.to_owned(),
            white_balance: WhiteBalance::default(),
            ccm: ColorMatrix::IDENTITY,
        }
    }
}

impl Calibration {
    /// Reads a calibration from `ini`. Missing fields keep their defaults.
    #[must_use]
    pub fn from_ini(ini: &IniFile) -> Self {
        let defaults = Self::default();

        let ccm = ColorMatrix::read_keyed(ini, CCM_RGB_SECTION)
            .or_else(|| ColorMatrix::read_keyed(ini, CCM_SECTION))
            .or_else(|| match ini.section_list(CCM_SECTION) {
                Ok(Some(values)) => ColorMatrix::from_values(values),
                Ok(None) | Err(..) => None,
            })
            .unwrap_or_else(|| {
                log::debug!("no colour correction matrix found, using identity");
                ColorMatrix::IDENTITY
            });

        Self {
            version: ini.get("version", "type").unwrap_or(defaults.version),
            sensor_type: ini.get("sensor", "type").unwrap_or(defaults.sensor_type),
            filter: ini.get("filter", "type").unwrap_or(defaults.filter),
            light: ini.get("light", "type").unwrap_or(defaults.light),
            white_balance: WhiteBalance {
                r2g: ini.get("wb", "fwb_r2g").unwrap_or(defaults.white_balance.r2g),
                b2g: ini.get("wb", "fwb_b2g").unwrap_or(defaults.white_balance.b2g),
            },
            ccm,
        }
    }

    /// Loads a calibration file.
    ///
    /// # Errors
    ///
    /// See [`IniFile::load_from_file`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        IniFile::from_file(path).map(|ini| Self::from_ini(&ini))
    }

    /// Writes every field into `ini`, replacing any previously stored matrix.
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::NotScalar`] if one of the scalar fields exists as a list entry.
    pub fn store(&self, ini: &mut IniFile, layout: MatrixLayout) -> Result<(), SectionError> {
        ini.set("Version", "Type", &self.version)?;
        ini.set("Sensor", "Type", &self.sensor_type)?;
        ini.set("Filter", "Type", &self.filter)?;
        ini.set("Light", "Type", &self.light)?;
        ini.set("wb", "fWB_R2G", &self.white_balance.r2g)?;
        ini.set("wb", "fWB_B2G", &self.white_balance.b2g)?;

        ini.remove_section(CCM_RGB_SECTION);
        ini.remove_section(CCM_SECTION);

        match layout {
            MatrixLayout::Keyed => {
                for (i, value) in self.ccm.to_values().iter().enumerate() {
                    ini.set(CCM_SECTION, &coefficient_key(i / 3, i % 3), value)?;
                }
                Ok(())
            }
            MatrixLayout::List => ini.set_section_list(CCM_SECTION, self.ccm.to_values()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYED: &[u8] = b"[Version]
Type=2
[Sensor]
Type=0x1A
[Filter]
Type=IR-cut
[wb]
fWB_R2G=1.250000
fWB_B2G=0.800000
[CCM]
R11=1.500
R12=-0.250
R13=-0.250
R21=-0.100
R22=1.200
R23=-0.100
R31=0.000
R32=-0.300
R33=1.300
";

    #[test]
    fn reads_keyed_matrix() {
        let ini = IniFile::from_memory(KEYED).expect("failed to parse hardcoded calibration");
        let calibration = Calibration::from_ini(&ini);

        assert_eq!(calibration.version, 2);
        assert_eq!(calibration.sensor_type, 0x1A);
        assert_eq!(calibration.filter, "IR-cut");
        assert_eq!(calibration.light, DEFAULT_LIGHT);
        assert_eq!(
            calibration.white_balance,
            WhiteBalance { r2g: 1.25, b2g: 0.8 }
        );
        assert_eq!(
            calibration.ccm,
            ColorMatrix([[1.5, -0.25, -0.25], [-0.1, 1.2, -0.1], [0.0, -0.3, 1.3]])
        );
    }

    #[test]
    fn rgb_group_takes_precedence() {
        let buffer = b"[CCM]\nR11=2\n\
            [CCM_RGB]\nR11=3\nR12=0\nR13=0\nR21=0\nR22=3\nR23=0\nR31=0\nR32=0\nR33=3\n";

        let ini = IniFile::from_memory(buffer).expect("failed to parse hardcoded calibration");

        let calibration = Calibration::from_ini(&ini);

        assert_eq!(
            calibration.ccm,
            ColorMatrix([[3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 3.0]])
        );
    }

    #[test]
    fn reads_legacy_list_matrix() {
        let ini = IniFile::from_memory(
            b"[CCM]\r\nMatrix\r\n2.0\r\n0.0\r\n0.0\r\n0.0\r\n2.0\r\n0.0\r\n0.0\r\n0.0\r\n2.0",
        )
        .expect("failed to parse hardcoded calibration");

        let calibration = Calibration::from_ini(&ini);

        assert_eq!(
            calibration.ccm,
            ColorMatrix([[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]])
        );
    }

    #[test]
    fn defaults_for_missing_fields() {
        let ini = IniFile::from_memory(b"[Sensor]\nType=5\n[CCM]\nR11=1\n")
            .expect("failed to parse hardcoded calibration");

        let calibration = Calibration::from_ini(&ini);

        assert_eq!(
            calibration,
            Calibration {
                sensor_type: 5,
                ..Calibration::default()
            }
        );
        assert!(calibration.ccm.is_identity());
    }

    #[test]
    fn store_and_read_back() {
        let calibration = Calibration {
            version: 3,
            sensor_type: 0x2B,
            filter: "BG40".to_owned(),
            light: "tungsten".to_owned(),
            white_balance: WhiteBalance { r2g: 1.5, b2g: 0.625 },
            ccm: ColorMatrix([[1.25, -0.125, -0.125], [0.0, 1.0, 0.0], [-0.5, 0.0, 1.5]]),
        };

        for layout in [MatrixLayout::Keyed, MatrixLayout::List] {
            let mut ini =
                IniFile::from_memory(KEYED).expect("failed to parse hardcoded calibration");
            calibration.store(&mut ini, layout).expect("failed to store calibration");

            let reparsed =
                IniFile::from_memory(ini.to_string().as_bytes()).expect("failed to reparse");
            assert_eq!(Calibration::from_ini(&reparsed), calibration);
        }
    }

    #[test]
    fn keyed_coefficients_use_three_decimals() {
        let calibration = Calibration {
            ccm: ColorMatrix([[0.987, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]),
            ..Calibration::default()
        };

        let mut ini = IniFile::new();
        calibration
            .store(&mut ini, MatrixLayout::Keyed)
            .expect("failed to store calibration");

        assert_eq!(ini.get_str("CCM", "R11"), Some("0.987"));
        assert_eq!(ini.get::<f32>("ccm", "r11"), Some(0.987));
        assert_eq!(ini.get_str("ccm", "r33"), Some("1.000"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("calibration.ini");
        std::fs::write(&path, KEYED).expect("failed to write calibration");

        let calibration = Calibration::load(&path).expect("failed to load calibration");

        assert_eq!(calibration.filter, "IR-cut");
        assert!(matches!(
            Calibration::load(dir.path().join("missing.ini")),
            Err(LoadError::NotFound { .. })
        ));
    }

    #[test]
    fn matrix_helpers() {
        let scale = ColorMatrix([[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]]);
        let swap = ColorMatrix([[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);

        assert_eq!(scale.multiply(&ColorMatrix::identity()), scale);
        assert_eq!(ColorMatrix::identity().multiply(&scale), scale);
        assert_eq!(
            scale.multiply(&swap),
            ColorMatrix([[0.0, 2.0, 0.0], [3.0, 0.0, 0.0], [0.0, 0.0, 4.0]])
        );
        assert_eq!(scale.apply([1.0, 1.0, 0.5]), [2.0, 3.0, 2.0]);
        assert_eq!(swap.apply([1.0, 2.0, 3.0]), [2.0, 1.0, 3.0]);

        assert_eq!(ColorMatrix::from_values(&["1"; 8]), None);
        assert_eq!(
            ColorMatrix::from_values(&["1", "0", "0", "0", "1", "0", "0", "0", "1"]),
            Some(ColorMatrix::IDENTITY)
        );
    }
}

//! Single-ion descriptions read from TOML.
//!
//! ```toml
//! [ion]
//! j = "15/2"
//! orbital = "f"
//!
//! [crystal_field]
//! symmetry = "C3v"
//! no_constant_term = false
//! coefficients = [
//!     { rank = 2, q = 0, value = -0.5 },
//!     { rank = 4, q = 3, value = 0.01 },
//! ]
//!
//! [field]
//! b = [0.0, 0.0, 1.0]
//! g = 1.2
//! ```
//!
//! `[crystal_field]` and `[field]` are optional. The field may be given either
//! as cartesian `b = [x, y, z]` or as `spherical = [r, theta, phi]`, and the
//! conversion factor as one of `factor`, `g`, or the pair `l`, `s`.

use std::path::Path;
use serde::{ de::Error as _, Deserialize, Deserializer };
use crate::{
    error::{ Error, Result },
    ion::SingleIon,
    spin::SpinTotal,
    symmetry::parse_orbital,
};

/// One crystal-field coefficient, `value · O_rank^q`.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Coefficient {
    pub rank: u32,
    pub q: i32,
    pub value: f64,
}

/// Crystal-field part of an [`IonConfig`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrystalFieldConfig {
    pub symmetry: String,
    #[serde(default)]
    pub no_constant_term: bool,
    #[serde(default)]
    pub coefficients: Vec<Coefficient>,
}

/// Direction and magnitude of the applied field.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FieldVector {
    Cartesian([f64; 3]),
    Spherical([f64; 3]),
}

/// Conversion factor between field units and energy.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FieldFactor {
    Factor(f64),
    G(f64),
    LS(f64, f64),
}

/// Magnetic-field part of an [`IonConfig`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FieldConfig {
    pub b: FieldVector,
    pub factor: FieldFactor,
}

/// Everything needed to construct a [`SingleIon`].
#[derive(Clone, Debug, PartialEq)]
pub struct IonConfig {
    pub j: SpinTotal,
    pub orbital: u32,
    pub crystal_field: Option<CrystalFieldConfig>,
    pub field: Option<FieldConfig>,
}

// file layout; alternatives in [field] are resolved afterwards
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    ion: IonTable,
    crystal_field: Option<CrystalFieldConfig>,
    field: Option<FieldTable>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IonTable {
    #[serde(deserialize_with = "de_spin")]
    j: SpinTotal,
    #[serde(default = "default_orbital", deserialize_with = "de_orbital")]
    orbital: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldTable {
    b: Option<[f64; 3]>,
    spherical: Option<[f64; 3]>,
    factor: Option<f64>,
    g: Option<f64>,
    l: Option<f64>,
    s: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SpinRepr {
    Text(String),
    Number(f64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrbitalRepr {
    Letter(String),
    Index(u32),
}

fn default_orbital() -> u32 { 3 }

fn de_spin<'de, D>(de: D) -> std::result::Result<SpinTotal, D::Error>
where D: Deserializer<'de>
{
    match SpinRepr::deserialize(de)? {
        SpinRepr::Text(s) => s.parse::<SpinTotal>().map_err(D::Error::custom),
        SpinRepr::Number(f) if f >= 0.0 && (2.0 * f).fract() == 0.0 => {
            Ok(SpinTotal::from_f64(f))
        },
        SpinRepr::Number(f) => {
            Err(D::Error::custom(Error::InvalidSpin(f.to_string())))
        },
    }
}

fn de_orbital<'de, D>(de: D) -> std::result::Result<u32, D::Error>
where D: Deserializer<'de>
{
    match OrbitalRepr::deserialize(de)? {
        OrbitalRepr::Letter(s) => parse_orbital(&s).map_err(D::Error::custom),
        OrbitalRepr::Index(l) => Ok(l),
    }
}

impl TryFrom<FieldTable> for FieldConfig {
    type Error = Error;

    fn try_from(table: FieldTable) -> Result<Self> {
        let b
            = match (table.b, table.spherical) {
                (Some(b), None) => FieldVector::Cartesian(b),
                (None, Some(s)) => FieldVector::Spherical(s),
                (None, None) => FieldVector::Cartesian([0.0; 3]),
                (Some(_), Some(_)) => {
                    return Err(Error::Config(
                        "give only one of 'field.b' and 'field.spherical'".into()
                    ));
                },
            };
        let factor
            = match (table.factor, table.g, table.l, table.s) {
                (None, None, None, None) => FieldFactor::Factor(1.0),
                (Some(f), None, None, None) => FieldFactor::Factor(f),
                (None, Some(g), None, None) => FieldFactor::G(g),
                (None, None, Some(l), Some(s)) => FieldFactor::LS(l, s),
                _ => {
                    return Err(Error::Config(
                        "give exactly one of 'field.factor', 'field.g', or 'field.l' with 'field.s'".into()
                    ));
                },
            };
        Ok(Self { b, factor })
    }
}

impl IonConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(s)?;
        let field = file.field.map(FieldConfig::try_from).transpose()?;
        Ok(Self {
            j: file.ion.j,
            orbital: file.ion.orbital,
            crystal_field: file.crystal_field,
            field,
        })
    }

    /// Read and parse a configuration file.
    pub fn from_path<P>(path: P) -> Result<Self>
    where P: AsRef<Path>
    {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "reading ion config");
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// Construct the described ion.
    pub fn build(&self) -> Result<SingleIon> {
        let mut ion = SingleIon::new(self.j, self.orbital);
        if let Some(cf_config) = &self.crystal_field {
            let mut cf = ion.crystal_field_mut();
            cf.set_no_constant_term(cf_config.no_constant_term)?;
            cf.set_symmetry(&cf_config.symmetry)?;
            for c in cf_config.coefficients.iter() {
                cf.set_coefficient(c.rank, c.q, c.value)?;
            }
        }
        if let Some(field) = &self.field {
            let mut zt = ion.zeeman_mut();
            match field.factor {
                FieldFactor::Factor(f) => zt.set_factor(f),
                FieldFactor::G(g) => zt.set_g(g),
                FieldFactor::LS(l, s) => zt.set_g_from_ls(l, s)?,
            }
            match field.b {
                FieldVector::Cartesian([x, y, z]) => zt.set_bxyz(x, y, z),
                FieldVector::Spherical([r, th, ph]) => zt.set_brtp(r, th, ph),
            }
        }
        Ok(ion)
    }
}

//! Point-group descriptors and the crystal-field terms they allow.
//!
//! For the even-rank expansions used here, every supported point group
//! reduces to one of three families with a principal rotation order `n`:
//! - [`Family::Cn`]: both cosine- and sine-type terms `O_k^{±mn}`;
//! - [`Family::Cnv`]: cosine-type terms `O_k^{mn}` only;
//! - [`Family::Dn`]: one signed term per step, `O_k^{-n}`, `O_k^{+2n}`,
//!   `O_k^{-3n}`, ...
//!
//! The axial term `O_k^0` is allowed for every family.

use std::{ fmt, str::FromStr, sync::OnceLock };
use indexmap::IndexSet;
use itertools::Itertools;
use regex::Regex;
use crate::{
    error::{ Error, Result },
    spin::SpinTotal,
};

/// One of the three point-group families distinguished by the crystal field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Cn,
    Cnv,
    Dn,
}

/// A point-group symmetry reduced to a family and principal rotation order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Symmetry {
    name: String,
    order: u32,
    family: Family,
}

impl Symmetry {
    /// Create a new descriptor directly from its family and order.
    ///
    /// Fails if `order` is zero.
    pub fn new(family: Family, order: u32) -> Result<Self> {
        if order == 0 {
            return Err(Error::InvalidSymmetry(format!("{:?}0", family)));
        }
        let name
            = match family {
                Family::Cn => format!("C{}", order),
                Family::Cnv => format!("C{}v", order),
                Family::Dn => format!("D{}", order),
            };
        Ok(Self { name, order, family })
    }

    /// Textual encoding this descriptor was created from.
    pub fn name(&self) -> &str { &self.name }

    /// Principal rotation order.
    pub fn order(&self) -> u32 { self.order }

    /// Point-group family.
    pub fn family(&self) -> Family { self.family }

    /// Allowed `(rank, q)` pairs for a multiplet `j` with orbital bound
    /// `orbital`.
    ///
    /// Ranks `2k` run over `k = 1, ..., min(floor(J), orbital)`; each rank
    /// lists its axial term first.
    pub fn basis_order(&self, j: SpinTotal, orbital: u32) -> BasisOrder {
        let n = self.order as i32;
        let kmax = j.floor().min(orbital);
        let mut order = BasisOrder::default();
        for k in 1..=kmax {
            let rank = 2 * k;
            order.insert(rank, 0);
            let steps = rank as i32 / n;
            for m in 1..=steps {
                match self.family {
                    Family::Cnv => { order.insert(rank, m * n); },
                    Family::Dn => {
                        // odd steps are sine-type (negative q), even steps
                        // cosine-type; not the all-positive `m * n` sequence
                        let sign = if m % 2 == 1 { -1 } else { 1 };
                        order.insert(rank, sign * m * n);
                    },
                    Family::Cn => {
                        order.insert(rank, m * n);
                        order.insert(rank, -m * n);
                    },
                }
            }
        }
        order
    }
}

impl fmt::Display for Symmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn symmetry_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([CDS])([1-9])([vhd]?)$").ok())
        .as_ref()
}

impl FromStr for Symmetry {
    type Err = Error;

    /// Parse a Schoenflies point-group name.
    ///
    /// Recognized forms are `Ci`, `Cs`, `Cn`, `Cnv`, `Cnh`, `Dn`, `Dnh`, `Dnd`,
    /// and `Sn` with a single-digit `n`; cubic and icosahedral groups are not
    /// supported.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidSymmetry(s.to_string());
        let (order, family)
            = match s {
                "Ci" => (1, Family::Cn),
                "Cs" => (1, Family::Cnv),
                _ => {
                    let caps = symmetry_pattern()
                        .and_then(|pat| pat.captures(s))
                        .ok_or_else(invalid)?;
                    let n: u32 = caps[2].parse().map_err(|_| invalid())?;
                    reduce(&caps[1], n, &caps[3]).ok_or_else(invalid)?
                },
            };
        Ok(Self { name: s.to_string(), order, family })
    }
}

// point group -> (order, family)
fn reduce(kind: &str, n: u32, sub: &str) -> Option<(u32, Family)> {
    use Family::*;
    let even = n % 2 == 0;
    match (kind, sub) {
        ("C", "") => Some((n, Cn)),
        ("C", "v") => Some((n, Cnv)),
        ("C", "h") => Some(if even { (n, Cn) } else { (2 * n, Cn) }),
        ("D", "") => Some(if even { (n, Cnv) } else { (n, Dn) }),
        ("D", "h") => Some(if even { (n, Cnv) } else { (2 * n, Cnv) }),
        ("D", "d") => Some(if even { (2 * n, Cnv) } else { (n, Cn) }),
        ("S", "") if n % 4 == 0 => Some((n, Cn)),
        ("S", "") if even => Some((n / 2, Cn)),
        _ => None,
    }
}

/// Ordered, duplicate-free list of `(rank, q)` pairs.
///
/// Position in the list is significant: it is the index of the matching
/// crystal-field coefficient and operator matrix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BasisOrder(IndexSet<(u32, i32)>);

impl BasisOrder {
    /// Create a new, empty order.
    pub fn new() -> Self { Self::default() }

    /// Append `(rank, q)` if not already present; returns `true` if it was
    /// added.
    pub fn insert(&mut self, rank: u32, q: i32) -> bool {
        self.0.insert((rank, q))
    }

    /// Number of terms.
    pub fn len(&self) -> usize { self.0.len() }

    /// Return `true` if there are no terms.
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Position of `(rank, q)`, if present.
    pub fn position(&self, rank: u32, q: i32) -> Option<usize> {
        self.0.get_index_of(&(rank, q))
    }

    /// Return `true` if `(rank, q)` is present.
    pub fn contains(&self, rank: u32, q: i32) -> bool {
        self.0.contains(&(rank, q))
    }

    /// Iterate over terms in order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, i32)> + '_ {
        self.0.iter().copied()
    }

    /// Remap coefficients given for `old` onto `self`.
    ///
    /// Each slot takes the old coefficient of the same `(rank, q)` key, or
    /// zero if the key is new. Missing trailing old coefficients count as zero.
    pub fn carry_over(&self, old: &BasisOrder, old_coeff: &[f64]) -> Vec<f64> {
        self.iter()
            .map(|(rank, q)| {
                old.position(rank, q)
                    .and_then(|k| old_coeff.get(k).copied())
                    .unwrap_or(0.0)
            })
            .collect()
    }
}

impl fmt::Display for BasisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]",
            self.iter().map(|(k, q)| format!("O{}{}", k, q)).join(", "))
    }
}

impl FromIterator<(u32, i32)> for BasisOrder {
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = (u32, i32)>
    {
        Self(iter.into_iter().collect())
    }
}

/// Parse an orbital bound from a letter (`s`, `p`, `d`, `f`) or an integer.
pub fn parse_orbital(s: &str) -> Result<u32> {
    let s = s.trim();
    match "spdf".find(s) {
        Some(l) if s.len() == 1 => Ok(l as u32),
        _ => s.parse().map_err(|_| Error::InvalidOrbital(s.to_string())),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sym(s: &str) -> Symmetry { s.parse().unwrap() }

    fn fam(s: &str) -> (u32, Family) {
        let y = sym(s);
        (y.order(), y.family())
    }

    #[test]
    fn reduction_table() {
        use Family::*;
        assert_eq!(fam("Ci"), (1, Cn));
        assert_eq!(fam("Cs"), (1, Cnv));
        assert_eq!(fam("C3"), (3, Cn));
        assert_eq!(fam("C3v"), (3, Cnv));
        assert_eq!(fam("C4h"), (4, Cn));
        assert_eq!(fam("C3h"), (6, Cn));
        assert_eq!(fam("D4"), (4, Cnv));
        assert_eq!(fam("D4h"), (4, Cnv));
        assert_eq!(fam("D2d"), (4, Cnv));
        assert_eq!(fam("D3"), (3, Dn));
        assert_eq!(fam("D3h"), (6, Cnv));
        assert_eq!(fam("D3d"), (3, Cn));
        assert_eq!(fam("S4"), (4, Cn));
        assert_eq!(fam("S6"), (3, Cn));
    }

    #[test]
    fn rejects_malformed() {
        for s in ["", "C", "Oh", "Td", "C0", "Cx", "C3vx", "S3", "S4v", "C3d", "c3v"] {
            assert!(
                matches!(s.parse::<Symmetry>(), Err(Error::InvalidSymmetry(_))),
                "{:?}", s,
            );
        }
    }

    #[test]
    fn c3v_orders() {
        let order = sym("C3v").basis_order(SpinTotal::integer(8), 3);
        let expected: BasisOrder
            = [(2, 0), (4, 0), (4, 3), (6, 0), (6, 3), (6, 6)]
            .into_iter().collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn cn_has_both_signs() {
        let order = sym("C4").basis_order(SpinTotal::integer(8), 3);
        let expected: BasisOrder
            = [(2, 0), (4, 0), (4, 4), (4, -4), (6, 0), (6, 4), (6, -4)]
            .into_iter().collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn dn_alternates() {
        let order = sym("D3").basis_order(SpinTotal::integer(8), 3);
        let expected: BasisOrder
            = [(2, 0), (4, 0), (4, -3), (6, 0), (6, -3), (6, 6)]
            .into_iter().collect();
        assert_eq!(order, expected);
        let order = Symmetry::new(Family::Dn, 1).unwrap()
            .basis_order(SpinTotal::integer(1), 1);
        let expected: BasisOrder
            = [(2, 0), (2, -1), (2, 2)].into_iter().collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn rank_bound() {
        // J = 3/2 -> floor(J) = 1, only rank 2 survives
        let order = sym("C1").basis_order(SpinTotal::new(3), 3);
        assert_eq!(order.len(), 5);
        assert!(order.iter().all(|(k, _)| k == 2));
        // orbital bound wins for large J
        let order = sym("C6v").basis_order(SpinTotal::integer(8), 1);
        assert_eq!(order.iter().collect::<Vec<_>>(), vec![(2, 0)]);
        assert!(sym("C3v").basis_order(SpinTotal::new(1), 3).is_empty());
    }

    #[test]
    fn carry_over_by_key() {
        let j = SpinTotal::integer(8);
        let old = sym("C3v").basis_order(j, 3);
        let new = sym("C6v").basis_order(j, 3);
        let coeff = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(new.carry_over(&old, &coeff), vec![1.0, 2.0, 4.0, 6.0]);
        assert_eq!(old.carry_over(&new, &[1.0, 2.0, 4.0, 6.0]),
            vec![1.0, 2.0, 0.0, 4.0, 0.0, 6.0]);
    }

    #[test]
    fn orbitals() {
        assert_eq!(parse_orbital("f").unwrap(), 3);
        assert_eq!(parse_orbital("s").unwrap(), 0);
        assert_eq!(parse_orbital("2").unwrap(), 2);
        assert!(parse_orbital("g").is_err());
        assert!(parse_orbital("sp").is_err());
    }

    #[test]
    fn display() {
        let order = sym("C3v").basis_order(SpinTotal::integer(2), 2);
        assert_eq!(order.to_string(), "[O20, O40, O43]");
    }
}

//! Crystal-field term: a linear combination of the Stevens operators allowed by
//! a point-group symmetry.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::{ Error, Result },
    node::{ Rebuild, Status },
    stevens::stevens,
    spin::SpinTotal,
    symmetry::{ parse_orbital, BasisOrder, Symmetry },
    system::Perturbation,
};

/// Crystal-field Hamiltonian `Σ_i c_i O_{k_i}^{q_i}` on a multiplet `J`.
///
/// The allowed `(k, q)` pairs are derived from the symmetry, `J`, and the
/// orbital bound (see [`Symmetry::basis_order`]). Whenever any of these
/// change, coefficients of pairs present both before and after are kept and
/// all others are reset to zero. Without a symmetry, no terms are allowed and
/// the field vanishes.
#[derive(Debug)]
pub struct CrystalField {
    status: Status,
    J: SpinTotal,
    orbital: u32,
    symmetry: Option<Symmetry>,
    no_constant_term: bool,
    order: BasisOrder,
    coeff: Vec<f64>,
    ops: Vec<nd::Array2<C64>>,
    CF: nd::Array2<C64>,
}

impl CrystalField {
    /// Create a new crystal field with no symmetry set.
    pub fn new(J: SpinTotal, orbital: u32) -> Self {
        let n = J.num_states();
        Self {
            status: Status::new(),
            J,
            orbital,
            symmetry: None,
            no_constant_term: false,
            order: BasisOrder::new(),
            coeff: Vec::new(),
            ops: Vec::new(),
            CF: nd::Array2::zeros((n, n)),
        }
    }

    /// Total angular momentum.
    pub fn j(&self) -> SpinTotal { self.J }

    /// Orbital bound on the expansion rank.
    pub fn orbital(&self) -> u32 { self.orbital }

    /// Current symmetry, if any.
    pub fn symmetry(&self) -> Option<&Symmetry> { self.symmetry.as_ref() }

    /// Return `true` if the constant parts of the axial operators are dropped.
    pub fn no_constant_term(&self) -> bool { self.no_constant_term }

    /// Allowed `(rank, q)` pairs, in coefficient order.
    pub fn order(&self) -> &BasisOrder { &self.order }

    /// Coefficients, one per entry of [`order`][Self::order].
    pub fn coefficients(&self) -> &[f64] { &self.coeff }

    /// Coefficient of `O_rank^q`, if it is allowed.
    pub fn coefficient(&self, rank: u32, q: i32) -> Option<f64> {
        self.order.position(rank, q).map(|k| self.coeff[k])
    }

    /// Stevens operator matrices, one per entry of [`order`][Self::order].
    pub fn operators(&self) -> &[nd::Array2<C64>] { &self.ops }

    // commit a new parameter set; coefficients are carried over by key
    fn apply(
        &mut self,
        J: SpinTotal,
        orbital: u32,
        symmetry: Option<Symmetry>,
        no_constant_term: bool,
    ) -> Result<()>
    {
        let (order, ops)
            = derive(J, orbital, symmetry.as_ref(), no_constant_term)?;
        self.invalidate();
        let coeff = order.carry_over(&self.order, &self.coeff);
        tracing::debug!(
            symmetry = symmetry.as_ref().map(|s| s.name()).unwrap_or(""),
            terms = order.len(),
            "crystal-field basis rebuilt: {}",
            order,
        );
        self.J = J;
        self.orbital = orbital;
        self.symmetry = symmetry;
        self.no_constant_term = no_constant_term;
        self.order = order;
        self.coeff = coeff;
        self.ops = ops;
        Ok(())
    }

    /// Set the total angular momentum.
    ///
    /// This changes the size of the field matrix.
    pub fn set_j(&mut self, J: SpinTotal) -> Result<()> {
        if J == self.J { return Ok(()); }
        self.apply(J, self.orbital, self.symmetry.clone(), self.no_constant_term)
    }

    /// Set the orbital bound on the expansion rank.
    pub fn set_orbital(&mut self, orbital: u32) -> Result<()> {
        if orbital == self.orbital { return Ok(()); }
        self.apply(self.J, orbital, self.symmetry.clone(), self.no_constant_term)
    }

    /// Set the orbital bound from a letter (`s`, `p`, `d`, `f`) or integer.
    pub fn set_orbital_str(&mut self, orbital: &str) -> Result<()> {
        self.set_orbital(parse_orbital(orbital)?)
    }

    /// Set the symmetry from its Schoenflies name, e.g. `"C3v"`.
    ///
    /// Setting the current name again does nothing.
    pub fn set_symmetry(&mut self, name: &str) -> Result<()> {
        if self.symmetry.as_ref().is_some_and(|s| s.name() == name) {
            return Ok(());
        }
        let sym: Symmetry = name.parse()?;
        self.set_symmetry_desc(sym)
    }

    /// Set the symmetry from a descriptor.
    pub fn set_symmetry_desc(&mut self, sym: Symmetry) -> Result<()> {
        if self.symmetry.as_ref() == Some(&sym) { return Ok(()); }
        self.apply(self.J, self.orbital, Some(sym), self.no_constant_term)
    }

    /// Choose whether the constant parts of the axial operators are dropped.
    pub fn set_no_constant_term(&mut self, no_constant_term: bool)
        -> Result<()>
    {
        if no_constant_term == self.no_constant_term { return Ok(()); }
        self.apply(self.J, self.orbital, self.symmetry.clone(), no_constant_term)
    }

    /// Set all coefficients at once, in the order of [`order`][Self::order].
    pub fn set_coefficients(&mut self, coeff: &[f64]) -> Result<()> {
        if coeff.len() != self.order.len() {
            return Err(Error::CoefficientCount {
                expected: self.order.len(),
                got: coeff.len(),
            });
        }
        if coeff == self.coeff.as_slice() { return Ok(()); }
        self.invalidate();
        self.coeff = coeff.to_vec();
        Ok(())
    }

    /// Set the coefficient of `O_rank^q`.
    pub fn set_coefficient(&mut self, rank: u32, q: i32, c: f64) -> Result<()> {
        let k
            = self.order.position(rank, q)
            .ok_or(Error::NotInBasis { rank, q })?;
        self.invalidate();
        self.coeff[k] = c;
        Ok(())
    }
}

// compute the order and operators for a set of parameters
fn derive(
    J: SpinTotal,
    orbital: u32,
    symmetry: Option<&Symmetry>,
    no_constant_term: bool,
) -> Result<(BasisOrder, Vec<nd::Array2<C64>>)>
{
    let order
        = symmetry.map(|sym| sym.basis_order(J, orbital))
        .unwrap_or_default();
    let ops
        = order.iter()
        .map(|(rank, q)| stevens(J, rank, q, no_constant_term))
        .collect::<Result<Vec<_>>>()?;
    Ok((order, ops))
}

impl Rebuild for CrystalField {
    fn status(&self) -> &Status { &self.status }

    fn rebuild(&mut self) -> Result<()> {
        let n = self.J.num_states();
        tracing::trace!(dim = n, terms = self.ops.len(), "rebuilding crystal field");
        let mut CF: nd::Array2<C64> = nd::Array2::zeros((n, n));
        self.ops.iter().zip(&self.coeff)
            .filter(|(_, c)| **c != 0.0)
            .for_each(|(op, c)| { CF.scaled_add(C64::from(*c), op); });
        self.CF = CF;
        Ok(())
    }
}

impl Perturbation for CrystalField {
    fn dim(&self) -> usize { self.J.num_states() }

    fn cached_matrix(&self) -> &nd::Array2<C64> { &self.CF }
}

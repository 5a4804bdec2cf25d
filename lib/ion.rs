//! A single magnetic ion: one `J` multiplet in a crystal field and a magnetic
//! field.

use std::ops::Deref;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::Result,
    node::ChildMut,
    operators::{ adjoint, jminus, jplus, jz },
    spin::SpinTotal,
    system::{
        CrystalField,
        Eigensolver,
        Lapack,
        QuantumSystem,
        Term,
        ZeemanTerm,
    },
    time_reversal::time_inverse,
};

const CF_TERM: usize = 0;
const ZEEMAN_TERM: usize = 1;

/// A [`QuantumSystem`] on the `2J + 1` states of a multiplet whose Hamiltonian
/// is a [`CrystalField`] plus a [`ZeemanTerm`].
///
/// Dereferences (immutably) to the underlying system; the observables that
/// may trigger a rebuild are forwarded. The two terms are fixed at
/// construction and can only be changed through
/// [`crystal_field_mut`][Self::crystal_field_mut] and
/// [`zeeman_mut`][Self::zeeman_mut].
#[derive(Debug)]
pub struct SingleIon<E = Lapack>
where E: Eigensolver
{
    J: SpinTotal,
    sys: QuantumSystem<E>,
    jz: nd::Array2<C64>,
    jp: nd::Array2<C64>,
    jm: nd::Array2<C64>,
}

impl SingleIon<Lapack> {
    /// Create a new ion with no crystal-field symmetry and zero field.
    pub fn new(J: SpinTotal, orbital: u32) -> Self {
        Self::with_solver(J, orbital, Lapack)
    }
}

impl<E> SingleIon<E>
where E: Eigensolver
{
    /// Create a new ion with a particular eigensolver.
    pub fn with_solver(J: SpinTotal, orbital: u32, solver: E) -> Self {
        let mut sys = QuantumSystem::with_solver(J.num_states(), solver);
        sys.add_term(CrystalField::new(J, orbital));
        sys.add_term(ZeemanTerm::new(J));
        Self { J, sys, jz: jz(J), jp: jplus(J), jm: jminus(J) }
    }

    /// Total angular momentum.
    pub fn j(&self) -> SpinTotal { self.J }

    /// Return a reference to the crystal field.
    pub fn crystal_field(&self) -> &CrystalField {
        match self.sys.term(CF_TERM) {
            Some(Term::CrystalField(cf)) => cf,
            _ => unreachable!("SingleIon: missing crystal-field term"),
        }
    }

    /// Return a mutable handle to the crystal field.
    ///
    /// The total angular momentum should not be changed through this
    /// handle; doing so makes the next rebuild fail with a dimension
    /// mismatch.
    pub fn crystal_field_mut(&mut self) -> ChildMut<'_, CrystalField> {
        match self.sys.term_parts_mut(CF_TERM) {
            Some((Term::CrystalField(cf), parent)) => ChildMut::new(cf, parent),
            _ => unreachable!("SingleIon: missing crystal-field term"),
        }
    }

    /// Return a reference to the Zeeman term.
    pub fn zeeman(&self) -> &ZeemanTerm {
        match self.sys.term(ZEEMAN_TERM) {
            Some(Term::Zeeman(zt)) => zt,
            _ => unreachable!("SingleIon: missing Zeeman term"),
        }
    }

    /// Return a mutable handle to the Zeeman term.
    pub fn zeeman_mut(&mut self) -> ChildMut<'_, ZeemanTerm> {
        match self.sys.term_parts_mut(ZEEMAN_TERM) {
            Some((Term::Zeeman(zt), parent)) => ChildMut::new(zt, parent),
            _ => unreachable!("SingleIon: missing Zeeman term"),
        }
    }

    /// `J_z` in the `|m⟩` basis.
    pub fn jz(&self) -> &nd::Array2<C64> { &self.jz }

    /// `J_+` in the `|m⟩` basis.
    pub fn jplus(&self) -> &nd::Array2<C64> { &self.jp }

    /// `J_-` in the `|m⟩` basis.
    pub fn jminus(&self) -> &nd::Array2<C64> { &self.jm }

    /// See [`QuantumSystem::hamiltonian`].
    pub fn hamiltonian(&mut self) -> Result<&nd::Array2<C64>> {
        self.sys.hamiltonian()
    }

    /// See [`QuantumSystem::energies`].
    pub fn energies(&mut self) -> Result<&nd::Array1<f64>> {
        self.sys.energies()
    }

    /// See [`QuantumSystem::eigenstates`].
    pub fn eigenstates(&mut self) -> Result<&nd::Array2<C64>> {
        self.sys.eigenstates()
    }

    /// See [`QuantumSystem::ground_state`].
    pub fn ground_state(&mut self) -> Result<(f64, nd::Array1<C64>)> {
        self.sys.ground_state()
    }

    /// See [`QuantumSystem::transitions`].
    pub fn transitions(&mut self, ops: &[nd::Array2<C64>])
        -> Result<Vec<nd::Array2<C64>>>
    {
        self.sys.transitions(ops)
    }

    /// See [`QuantumSystem::spectrum`].
    pub fn spectrum(&mut self, ops: &[nd::Array2<C64>], limit: Option<usize>)
        -> Result<Vec<nd::Array1<C64>>>
    {
        self.sys.spectrum(ops, limit)
    }

    /// See [`QuantumSystem::expectation_at_temperature`].
    pub fn expectation_at_temperature(
        &mut self,
        T: f64,
        ops: &[nd::Array2<C64>],
    ) -> Result<Vec<C64>>
    {
        self.sys.expectation_at_temperature(T, ops)
    }

    /// `⟨J_z⟩` in every eigenstate, in order of ascending energy.
    pub fn moments(&mut self) -> Result<nd::Array1<f64>> {
        let jz = self.jz.clone();
        let spec = self.sys.spectrum(&[jz], None)?;
        Ok(spec[0].mapv(|x| x.re))
    }

    /// Relative dipole transition strengths between the lowest `limit`
    /// eigenstates.
    ///
    /// With `T_a = X† J_a X`, entry `(f, i)` is
    /// ```text
    /// ((2 |T_z|² + |T_+|² + |T_-|²) / (2 J (J + 1)))^power
    /// ```
    /// For `power == 0`, the squared overlaps `|X† X|²` are returned instead.
    pub fn j_transitions(&mut self, power: f64, limit: Option<usize>)
        -> Result<nd::Array2<f64>>
    {
        let n = limit.map_or(self.sys.nstates(), |l| l.min(self.sys.nstates()));
        let strength: nd::Array2<f64>
            = if power == 0.0 {
                let X = self.sys.eigenstates()?;
                adjoint(X).dot(X).mapv(|x| x.norm_sqr())
            } else {
                let ops = [self.jz.clone(), self.jp.clone(), self.jm.clone()];
                let T = self.sys.transitions(&ops)?;
                let norm = 2.0 * self.J.jj();
                let mut S: nd::Array2<f64> = T[0].mapv(|x| 2.0 * x.norm_sqr());
                S.zip_mut_with(&T[1], |s, t| *s += t.norm_sqr());
                S.zip_mut_with(&T[2], |s, t| *s += t.norm_sqr());
                S.mapv(|s| (s / norm).powf(power))
            };
        Ok(strength.slice(nd::s![..n, ..n]).to_owned())
    }

    /// Time-reversed partners of every eigenstate, as the columns of a matrix.
    pub fn time_reversed_states(&mut self) -> Result<nd::Array2<C64>> {
        Ok(time_inverse(self.sys.eigenstates()?))
    }
}

impl<E> Deref for SingleIon<E>
where E: Eigensolver
{
    type Target = QuantumSystem<E>;

    fn deref(&self) -> &Self::Target { &self.sys }
}

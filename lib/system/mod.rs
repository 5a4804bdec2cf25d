//! Quantum systems assembled from lazily rebuilt perturbation terms.
//!
//! A [`QuantumSystem`] owns a list of [`Term`]s whose matrices are summed into
//! the Hamiltonian. The Hermitian eigendecomposition of the Hamiltonian is
//! computed at most once per change of any parameter anywhere in the tree, and
//! every observable is derived from that cached eigenbasis.

use ndarray as nd;
use ndarray_linalg::{ EighInto, UPLO };
use num_complex::Complex64 as C64;
use crate::{
    constants::KB,
    error::{ check_square, Error, Result },
    node::{ ChildMut, Rebuild, Status },
    operators::adjoint,
};

pub mod crystal_field;
pub use crystal_field::CrystalField;

pub mod zeeman;
pub use zeeman::ZeemanTerm;

/// Hermitian eigensolver backing a [`QuantumSystem`].
pub trait Eigensolver {
    /// Return the eigenvalues and a matrix whose columns are the matching
    /// orthonormal eigenvectors of the Hermitian matrix `H`.
    fn eigh(&self, H: nd::Array2<C64>)
        -> Result<(nd::Array1<f64>, nd::Array2<C64>)>;
}

/// LAPACK-backed eigensolver, via `ndarray-linalg`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Lapack;

impl Eigensolver for Lapack {
    fn eigh(&self, H: nd::Array2<C64>)
        -> Result<(nd::Array1<f64>, nd::Array2<C64>)>
    {
        Ok(H.eigh_into(UPLO::Lower)?)
    }
}

/// A node contributing an additive matrix to a Hamiltonian.
pub trait Perturbation: Rebuild {
    /// Size of the contributed matrix.
    fn dim(&self) -> usize;

    /// Return the contributed matrix as of the last rebuild.
    fn cached_matrix(&self) -> &nd::Array2<C64>;

    /// Bring the node up to date and return its matrix.
    fn matrix(&mut self) -> Result<&nd::Array2<C64>> {
        self.make_ready()?;
        Ok(self.cached_matrix())
    }
}

/// A constant matrix.
#[derive(Debug)]
pub struct FixedTerm {
    status: Status,
    M: nd::Array2<C64>,
}

impl FixedTerm {
    /// Create a new `FixedTerm`.
    pub fn new(M: nd::Array2<C64>) -> Self {
        Self { status: Status::new(), M }
    }

    /// Replace the matrix.
    pub fn set_matrix(&mut self, M: nd::Array2<C64>) {
        self.invalidate();
        self.M = M;
    }
}

impl Rebuild for FixedTerm {
    fn status(&self) -> &Status { &self.status }

    fn rebuild(&mut self) -> Result<()> { Ok(()) }
}

impl Perturbation for FixedTerm {
    fn dim(&self) -> usize { self.M.nrows() }

    fn cached_matrix(&self) -> &nd::Array2<C64> { &self.M }
}

/// The set of perturbation terms a [`QuantumSystem`] can hold.
#[derive(Debug)]
pub enum Term {
    CrystalField(CrystalField),
    Zeeman(ZeemanTerm),
    Fixed(FixedTerm),
}

impl From<CrystalField> for Term {
    fn from(cf: CrystalField) -> Self { Self::CrystalField(cf) }
}

impl From<ZeemanTerm> for Term {
    fn from(zt: ZeemanTerm) -> Self { Self::Zeeman(zt) }
}

impl From<FixedTerm> for Term {
    fn from(ft: FixedTerm) -> Self { Self::Fixed(ft) }
}

impl Term {
    fn inner(&self) -> &dyn Perturbation {
        match self {
            Self::CrystalField(cf) => cf,
            Self::Zeeman(zt) => zt,
            Self::Fixed(ft) => ft,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Perturbation {
        match self {
            Self::CrystalField(cf) => cf,
            Self::Zeeman(zt) => zt,
            Self::Fixed(ft) => ft,
        }
    }
}

impl Rebuild for Term {
    fn status(&self) -> &Status { self.inner().status() }

    fn rebuild(&mut self) -> Result<()> { self.inner_mut().rebuild() }
}

impl Perturbation for Term {
    fn dim(&self) -> usize { self.inner().dim() }

    fn cached_matrix(&self) -> &nd::Array2<C64> {
        self.inner().cached_matrix()
    }
}

/// A Hamiltonian `H = Σ terms` on an `n`-state space with its cached
/// eigendecomposition.
///
/// Eigenvalues are stored in ascending order, so index 0 is always a ground
/// state. All observables take `&mut self` because they may trigger a rebuild.
#[derive(Debug)]
pub struct QuantumSystem<E = Lapack>
where E: Eigensolver
{
    status: Status,
    nstates: usize,
    terms: Vec<Term>,
    solver: E,
    H: nd::Array2<C64>,
    E: nd::Array1<f64>,
    X: nd::Array2<C64>,
}

impl QuantumSystem<Lapack> {
    /// Create a new, empty system of `nstates` states using [`Lapack`].
    ///
    /// A system with no states can be built, but [`ground_state`][Self::ground_state]
    /// and [`expectation_at_temperature`][Self::expectation_at_temperature]
    /// fail on it with [`Error::EmptySystem`].
    pub fn new(nstates: usize) -> Self { Self::with_solver(nstates, Lapack) }
}

impl<E> QuantumSystem<E>
where E: Eigensolver
{
    /// Create a new, empty system of `nstates` states with a particular
    /// eigensolver.
    pub fn with_solver(nstates: usize, solver: E) -> Self {
        Self {
            status: Status::new(),
            nstates,
            terms: Vec::new(),
            solver,
            H: nd::Array2::zeros((nstates, nstates)),
            E: nd::Array1::zeros(nstates),
            X: nd::Array2::eye(nstates),
        }
    }

    /// Number of states.
    pub fn nstates(&self) -> usize { self.nstates }

    /// Return a reference to the eigensolver.
    pub fn solver(&self) -> &E { &self.solver }

    /// Add a perturbation term, returning its index.
    ///
    /// The term's dimension is checked when the Hamiltonian is next assembled.
    pub fn add_term<T>(&mut self, term: T) -> usize
    where T: Into<Term>
    {
        let term: Term = term.into();
        term.status().attach_to(&self.status);
        self.terms.push(term);
        self.terms.len() - 1
    }

    /// Return a reference to the `k`-th term.
    pub fn term(&self, k: usize) -> Option<&Term> { self.terms.get(k) }

    /// Return a mutable handle to the `k`-th term.
    ///
    /// Changes made through the term's own setters invalidate `self`; a term
    /// replaced through the handle is linked to `self` when the handle drops.
    pub fn term_mut(&mut self, k: usize) -> Option<ChildMut<'_, Term>> {
        let parent = &self.status;
        self.terms.get_mut(k).map(|term| ChildMut::new(term, parent))
    }

    // split borrow of a term and the status its handle must report to
    pub(crate) fn term_parts_mut(&mut self, k: usize)
        -> Option<(&mut Term, &Status)>
    {
        let parent = &self.status;
        self.terms.get_mut(k).map(|term| (term, parent))
    }

    /// Replace the `k`-th term, returning the old one.
    pub fn replace_term<T>(&mut self, k: usize, term: T) -> Result<Term>
    where T: Into<Term>
    {
        let slot = self.terms.get_mut(k).ok_or(Error::NoTerm(k))?;
        let term: Term = term.into();
        term.status().attach_to(&self.status);
        let old = std::mem::replace(slot, term);
        old.status().detach();
        Ok(old)
    }

    /// Return all terms.
    pub fn terms(&self) -> &[Term] { &self.terms }

    /// Assemble the Hamiltonian as the sum of all terms.
    ///
    /// The sum is recomputed on every call while `self` is stale; no
    /// eigendecomposition is performed.
    pub fn hamiltonian(&mut self) -> Result<&nd::Array2<C64>> {
        let n = self.nstates;
        let terms = &mut self.terms;
        if let Some(H) = self.status.when_stale(|| assemble(n, terms)) {
            self.H = H?;
        }
        Ok(&self.H)
    }

    /// Energies of all eigenstates, ascending.
    pub fn energies(&mut self) -> Result<&nd::Array1<f64>> {
        self.make_ready()?;
        Ok(&self.E)
    }

    /// Eigenstates as the columns of a matrix, matching
    /// [`energies`][Self::energies].
    pub fn eigenstates(&mut self) -> Result<&nd::Array2<C64>> {
        self.make_ready()?;
        Ok(&self.X)
    }

    /// Return a lowest-energy eigenstate and its energy.
    ///
    /// In general there may be more than one state minimizing the energy; no
    /// guarantee is made about which of them is returned.
    pub fn ground_state(&mut self) -> Result<(f64, nd::Array1<C64>)> {
        if self.nstates == 0 { return Err(Error::EmptySystem); }
        self.make_ready()?;
        Ok((self.E[0], self.X.column(0).to_owned()))
    }

    /// Express each operator in the eigenbasis, `X† · op · X`.
    ///
    /// Initial states span the columns and final states the rows.
    pub fn transitions(&mut self, ops: &[nd::Array2<C64>])
        -> Result<Vec<nd::Array2<C64>>>
    {
        self.make_ready()?;
        let Xh = adjoint(&self.X);
        ops.iter()
            .map(|op| {
                check_square(self.nstates, op.shape())?;
                Ok(Xh.dot(op).dot(&self.X))
            })
            .collect()
    }

    /// Expectation value of each operator in every eigenstate.
    ///
    /// With no operators, the Hamiltonian is used, giving the energy spectrum.
    /// Only the lowest `limit` states are returned, if given.
    pub fn spectrum(&mut self, ops: &[nd::Array2<C64>], limit: Option<usize>)
        -> Result<Vec<nd::Array1<C64>>>
    {
        let n = limit.map_or(self.nstates, |l| l.min(self.nstates));
        let T
            = if ops.is_empty() {
                let H = self.hamiltonian()?.clone();
                self.transitions(&[H])?
            } else {
                self.transitions(ops)?
            };
        Ok(
            T.iter()
                .map(|t| t.diag().iter().take(n).copied().collect())
                .collect()
        )
    }

    /// Boltzmann-averaged expectation value of each operator at temperature
    /// `T` (kelvin, energies in meV).
    ///
    /// Energies are measured from the ground state. `T` must be positive; no
    /// check is made, and non-positive values give non-finite results.
    pub fn expectation_at_temperature(
        &mut self,
        T: f64,
        ops: &[nd::Array2<C64>],
    ) -> Result<Vec<C64>>
    {
        if self.nstates == 0 { return Err(Error::EmptySystem); }
        let spec = self.spectrum(ops, None)?;
        let e0 = self.E[0];
        let weights: nd::Array1<f64>
            = self.E.mapv(|e| (-(e - e0) / (KB * T)).exp());
        let Z: f64 = weights.sum();
        Ok(
            spec.iter()
                .map(|vals| {
                    vals.iter().zip(&weights)
                        .map(|(v, w)| *v * *w)
                        .sum::<C64>() / Z
                })
                .collect()
        )
    }
}

fn assemble(n: usize, terms: &mut [Term]) -> Result<nd::Array2<C64>> {
    let mut H: nd::Array2<C64> = nd::Array2::zeros((n, n));
    for term in terms.iter_mut() {
        let M = term.matrix()?;
        check_square(n, M.shape())?;
        H += M;
    }
    Ok(H)
}

impl<E> Rebuild for QuantumSystem<E>
where E: Eigensolver
{
    fn status(&self) -> &Status { &self.status }

    fn rebuild(&mut self) -> Result<()> {
        let H = self.hamiltonian()?.clone();
        tracing::debug!(nstates = self.nstates, "diagonalizing hamiltonian");
        let (E, X) = self.solver.eigh(H)?;
        check_square(self.nstates, X.shape())?;
        let mut idx: Vec<usize> = (0..E.len()).collect();
        idx.sort_by(|&a, &b| E[a].total_cmp(&E[b]));
        self.E = idx.iter().map(|&k| E[k]).collect();
        self.X = X.select(nd::Axis(1), &idx);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;
    use super::*;

    #[derive(Default)]
    struct Counting {
        calls: Cell<usize>,
    }

    impl Eigensolver for Counting {
        fn eigh(&self, H: nd::Array2<C64>)
            -> Result<(nd::Array1<f64>, nd::Array2<C64>)>
        {
            self.calls.set(self.calls.get() + 1);
            Lapack.eigh(H)
        }
    }

    // Hermitian 3x3 test matrix with distinct eigenvalues
    fn hermitian() -> nd::Array2<C64> {
        let c = |re: f64, im: f64| C64::new(re, im);
        nd::array![
            [c(2.0, 0.0), c(0.5, 0.3), c(0.0, -0.2)],
            [c(0.5, -0.3), c(-1.0, 0.0), c(0.7, 0.0)],
            [c(0.0, 0.2), c(0.7, 0.0), c(0.5, 0.0)],
        ]
    }

    fn diagonal(d: &[f64]) -> nd::Array2<C64> {
        let d: nd::Array1<C64> = d.iter().map(|x| C64::from(*x)).collect();
        nd::Array2::from_diag(&d)
    }

    fn max_dev(a: &nd::Array2<C64>, b: &nd::Array2<C64>) -> f64 {
        a.iter().zip(b).map(|(x, y)| (*x - *y).norm()).fold(0.0, f64::max)
    }

    #[test]
    fn eigen_invariant() {
        let mut sys = QuantumSystem::new(3);
        sys.add_term(FixedTerm::new(hermitian()));
        let H = sys.hamiltonian().unwrap().clone();
        let E = sys.energies().unwrap().clone();
        let X = sys.eigenstates().unwrap().clone();
        let Ed: nd::Array2<C64> = nd::Array2::from_diag(&E.mapv(C64::from));
        let rebuilt = X.dot(&Ed).dot(&adjoint(&X));
        assert!(max_dev(&rebuilt, &H) < 1e-10);
        let eye: nd::Array2<C64> = nd::Array2::eye(3);
        assert!(max_dev(&adjoint(&X).dot(&X), &eye) < 1e-10);
        assert!(E.windows(2).into_iter().all(|w| w[0] <= w[1]));
    }

    #[test]
    fn terms_are_summed() {
        let mut sys = QuantumSystem::new(2);
        sys.add_term(FixedTerm::new(diagonal(&[1.0, 2.0])));
        sys.add_term(FixedTerm::new(diagonal(&[10.0, -5.0])));
        let E = sys.energies().unwrap();
        assert!((E[0] + 3.0).abs() < 1e-12);
        assert!((E[1] - 11.0).abs() < 1e-12);
    }

    #[test]
    fn eigensolve_runs_once() {
        let mut sys = QuantumSystem::with_solver(3, Counting::default());
        sys.add_term(FixedTerm::new(hermitian()));
        let e1 = sys.energies().unwrap().clone();
        let e2 = sys.energies().unwrap().clone();
        sys.eigenstates().unwrap();
        sys.spectrum(&[], None).unwrap();
        assert_eq!(e1, e2);
        assert_eq!(sys.solver().calls.get(), 1);
        // hamiltonian() alone never diagonalizes
        if let Term::Fixed(ft) = &mut *sys.term_mut(0).unwrap() {
            ft.set_matrix(diagonal(&[3.0, 2.0, 1.0]));
        }
        assert!(!sys.is_ready());
        sys.hamiltonian().unwrap();
        assert_eq!(sys.solver().calls.get(), 1);
        let E = sys.energies().unwrap();
        assert!(E.iter().zip([1.0, 2.0, 3.0]).all(|(e, x)| (e - x).abs() < 1e-12));
        assert_eq!(sys.solver().calls.get(), 2);
    }

    #[test]
    fn sorted_pairs() {
        let mut sys = QuantumSystem::new(3);
        sys.add_term(FixedTerm::new(diagonal(&[5.0, -1.0, 2.0])));
        let X = sys.eigenstates().unwrap().clone();
        // ground state is the second basis vector
        assert!((X[[1, 0]].norm() - 1.0).abs() < 1e-12);
        assert!((X[[0, 2]].norm() - 1.0).abs() < 1e-12);
        let (e0, v0) = sys.ground_state().unwrap();
        assert!((e0 + 1.0).abs() < 1e-12);
        assert!((v0[1].norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn spectrum_truncation() {
        let mut sys = QuantumSystem::new(3);
        sys.add_term(FixedTerm::new(hermitian()));
        let op = hermitian().mapv(|x| x * x.conj());
        let full = sys.spectrum(&[op.clone()], None).unwrap();
        let part = sys.spectrum(&[op.clone()], Some(2)).unwrap();
        let T = sys.transitions(&[op.clone()]).unwrap();
        assert_eq!(part[0].len(), 2);
        for k in 0..2 {
            assert_eq!(part[0][k], full[0][k]);
            assert_eq!(part[0][k], T[0][[k, k]]);
        }
        let over = sys.spectrum(&[op], Some(10)).unwrap();
        assert_eq!(over[0].len(), 3);
    }

    #[test]
    fn default_spectrum_is_energies() {
        let mut sys = QuantumSystem::new(3);
        sys.add_term(FixedTerm::new(hermitian()));
        let spec = sys.spectrum(&[], None).unwrap();
        let E = sys.energies().unwrap();
        assert_eq!(spec.len(), 1);
        for (s, e) in spec[0].iter().zip(E) {
            assert!((s.re - e).abs() < 1e-10);
            assert!(s.im.abs() < 1e-10);
        }
    }

    #[test]
    fn thermal_limits() {
        let mut sys = QuantumSystem::new(3);
        sys.add_term(FixedTerm::new(diagonal(&[0.0, 1.0, 3.0])));
        let op = diagonal(&[10.0, 20.0, 60.0]);
        let hot = sys.expectation_at_temperature(1e9, &[op.clone()]).unwrap();
        assert!((hot[0].re - 30.0).abs() < 1e-5);
        let cold = sys.expectation_at_temperature(0.01, &[op]).unwrap();
        assert!((cold[0].re - 10.0).abs() < 1e-10);
    }

    #[test]
    fn thermal_shift_prevents_overflow() {
        let mut sys = QuantumSystem::new(2);
        sys.add_term(FixedTerm::new(diagonal(&[-1e5, -1e5 + 1.0])));
        let op = diagonal(&[1.0, 0.0]);
        let v = sys.expectation_at_temperature(1.0, &[op]).unwrap();
        assert!(v[0].re.is_finite());
        assert!(v[0].re > 0.99);
    }

    #[test]
    fn dimension_mismatch() {
        let mut sys = QuantumSystem::new(3);
        sys.add_term(FixedTerm::new(hermitian()));
        let bad = diagonal(&[1.0, 2.0]);
        assert!(matches!(
            sys.transitions(&[bad.clone()]),
            Err(Error::DimensionMismatch { expected: 3, got: (2, 2) }),
        ));
        assert!(sys.spectrum(&[bad.clone()], None).is_err());
        sys.add_term(FixedTerm::new(bad));
        assert!(!sys.is_ready());
        assert!(matches!(
            sys.energies(),
            Err(Error::DimensionMismatch { .. }),
        ));
        assert!(!sys.is_ready());
        if let Term::Fixed(ft) = &mut *sys.term_mut(1).unwrap() {
            ft.set_matrix(diagonal(&[0.0, 0.0, 0.0]));
        }
        assert!(sys.energies().is_ok());
    }

    fn assert_levels(sys: &mut QuantumSystem, expected: &[f64]) {
        let E = sys.energies().unwrap();
        assert_eq!(E.len(), expected.len());
        assert!(E.iter().zip(expected).all(|(e, x)| (e - x).abs() < 1e-12));
    }

    #[test]
    fn replaced_term_invalidates() {
        let mut sys = QuantumSystem::new(2);
        sys.add_term(FixedTerm::new(diagonal(&[1.0, 2.0])));
        assert_levels(&mut sys, &[1.0, 2.0]);
        *sys.term_mut(0).unwrap() = FixedTerm::new(diagonal(&[10.0, 20.0])).into();
        assert!(!sys.is_ready());
        assert_levels(&mut sys, &[10.0, 20.0]);
        // the replacement is linked: its setters reach the system
        if let Term::Fixed(ft) = &mut *sys.term_mut(0).unwrap() {
            ft.set_matrix(diagonal(&[5.0, 6.0]));
        }
        assert!(!sys.is_ready());
        assert_levels(&mut sys, &[5.0, 6.0]);
    }

    #[test]
    fn replace_term_returns_old() {
        let mut sys = QuantumSystem::new(2);
        sys.add_term(FixedTerm::new(diagonal(&[1.0, 2.0])));
        sys.energies().unwrap();
        let old = sys.replace_term(0, FixedTerm::new(diagonal(&[3.0, 4.0]))).unwrap();
        assert!(old.status().parent().is_none());
        assert!(!sys.is_ready());
        assert_levels(&mut sys, &[3.0, 4.0]);
        assert!(sys.term(0).unwrap().status().parent().unwrap().same_as(sys.status()));
        assert!(matches!(
            sys.replace_term(3, FixedTerm::new(diagonal(&[0.0, 0.0]))),
            Err(Error::NoTerm(3)),
        ));
        assert!(sys.is_ready());
    }

    #[test]
    fn empty_system() {
        let mut sys = QuantumSystem::new(0);
        assert!(matches!(sys.ground_state(), Err(Error::EmptySystem)));
        assert!(matches!(
            sys.expectation_at_temperature(1.0, &[]),
            Err(Error::EmptySystem),
        ));
    }
}

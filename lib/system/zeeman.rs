//! Zeeman term `f B·J` for a static magnetic field.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    constants::{ G_L, G_S, MU_B },
    error::{ Error, Result },
    node::{ Rebuild, Status },
    operators::{ jminus, jplus, jz },
    spin::SpinTotal,
    system::Perturbation,
};

/// Coupling `f B·J` of a multiplet to a magnetic field.
///
/// The field is kept in both cartesian `(Bx, By, Bz)` and spherical
/// `(Br, θ, φ)` coordinates, with `θ` measured from +z and `φ` from +x in the
/// xy plane; setting either set updates the other. The conversion factor `f`
/// defaults to 1, i.e. the field is given in energy units. Use
/// [`set_g`][Self::set_g] to give the field in tesla instead.
#[derive(Debug)]
pub struct ZeemanTerm {
    status: Status,
    J: SpinTotal,
    jz: nd::Array2<C64>,
    jp: nd::Array2<C64>,
    jm: nd::Array2<C64>,
    bx: f64,
    by: f64,
    bz: f64,
    br: f64,
    bth: f64,
    bph: f64,
    factor: f64,
    B: nd::Array2<C64>,
}

impl ZeemanTerm {
    /// Create a new Zeeman term with zero field.
    pub fn new(J: SpinTotal) -> Self {
        let n = J.num_states();
        Self {
            status: Status::new(),
            J,
            jz: jz(J),
            jp: jplus(J),
            jm: jminus(J),
            bx: 0.0,
            by: 0.0,
            bz: 0.0,
            br: 0.0,
            bth: 0.0,
            bph: 0.0,
            factor: 1.0,
            B: nd::Array2::zeros((n, n)),
        }
    }

    /// Total angular momentum.
    pub fn j(&self) -> SpinTotal { self.J }

    /// Cartesian field components `(Bx, By, Bz)`.
    pub fn bxyz(&self) -> (f64, f64, f64) { (self.bx, self.by, self.bz) }

    /// Spherical field components `(Br, θ, φ)`.
    pub fn brtp(&self) -> (f64, f64, f64) { (self.br, self.bth, self.bph) }

    /// Conversion factor `f`.
    pub fn factor(&self) -> f64 { self.factor }

    fn update_spherical(&mut self) {
        self.br = (self.bx.powi(2) + self.by.powi(2) + self.bz.powi(2)).sqrt();
        if self.br == 0.0 {
            self.bth = 0.0;
            self.bph = 0.0;
        } else {
            self.bth = self.bx.hypot(self.by).atan2(self.bz);
            self.bph = self.by.atan2(self.bx);
        }
    }

    fn update_cartesian(&mut self) {
        let (sth, cth) = self.bth.sin_cos();
        let (sph, cph) = self.bph.sin_cos();
        self.bx = self.br * sth * cph;
        self.by = self.br * sth * sph;
        self.bz = self.br * cth;
    }

    /// Set the x component; the y and z components are not affected.
    pub fn set_bx(&mut self, bx: f64) {
        if bx == self.bx { return; }
        self.set_bxyz(bx, self.by, self.bz);
    }

    /// Set the y component; the x and z components are not affected.
    pub fn set_by(&mut self, by: f64) {
        if by == self.by { return; }
        self.set_bxyz(self.bx, by, self.bz);
    }

    /// Set the z component; the x and y components are not affected.
    pub fn set_bz(&mut self, bz: f64) {
        if bz == self.bz { return; }
        self.set_bxyz(self.bx, self.by, bz);
    }

    /// Set all cartesian components.
    pub fn set_bxyz(&mut self, bx: f64, by: f64, bz: f64) {
        self.invalidate();
        self.bx = bx;
        self.by = by;
        self.bz = bz;
        self.update_spherical();
    }

    /// Set the magnitude; the direction is not affected.
    pub fn set_br(&mut self, br: f64) {
        if br == self.br { return; }
        self.set_brtp(br, self.bth, self.bph);
    }

    /// Set the angle from the z axis; magnitude and azimuth are not affected.
    pub fn set_btheta(&mut self, bth: f64) {
        if bth == self.bth { return; }
        self.set_brtp(self.br, bth, self.bph);
    }

    /// Set the azimuthal angle; magnitude and polar angle are not affected.
    pub fn set_bphi(&mut self, bph: f64) {
        if bph == self.bph { return; }
        self.set_brtp(self.br, self.bth, bph);
    }

    /// Set all spherical components.
    pub fn set_brtp(&mut self, br: f64, bth: f64, bph: f64) {
        self.invalidate();
        self.br = br;
        self.bth = bth;
        self.bph = bph;
        self.update_cartesian();
    }

    /// Set the conversion factor, so that the term is `f B·J`.
    pub fn set_factor(&mut self, factor: f64) {
        if factor == self.factor { return; }
        self.invalidate();
        self.factor = factor;
    }

    /// Set the factor to `g μ_B`, so that the field is given in tesla and
    /// energies in meV.
    pub fn set_g(&mut self, g: f64) { self.set_factor(g * MU_B); }

    /// Set the factor from the Landé g-factor of a term with orbital and spin
    /// angular momenta `L` and `S`, assuming `J = L + S`.
    ///
    /// Fails if `L + S` is zero.
    pub fn set_g_from_ls(&mut self, L: f64, S: f64) -> Result<()> {
        let g = lande_g(L, S)?;
        self.set_g(g);
        Ok(())
    }
}

/// Landé g-factor for `J = L + S`.
pub fn lande_g(L: f64, S: f64) -> Result<f64> {
    let J = L + S;
    let jj = J * (J + 1.0);
    if jj <= 0.0 {
        return Err(Error::InvalidSpin(format!("L = {}, S = {}", L, S)));
    }
    let ll = L * (L + 1.0);
    let ss = S * (S + 1.0);
    Ok(
        (G_L * (jj - ss + ll) + G_S * (jj + ss - ll)) / (2.0 * jj)
    )
}

impl Rebuild for ZeemanTerm {
    fn status(&self) -> &Status { &self.status }

    fn rebuild(&mut self) -> Result<()> {
        tracing::trace!(
            dim = self.J.num_states(), bx = self.bx, by = self.by, bz = self.bz,
            "rebuilding zeeman term",
        );
        // B·J = Bz Jz + (B- J+ + B+ J-) / 2 with B± = Bx ± i By
        let bplus = C64::new(self.bx, self.by);
        let bminus = bplus.conj();
        let mut B: nd::Array2<C64> = self.jz.mapv(|x| x * self.bz);
        B.scaled_add(bminus * 0.5, &self.jp);
        B.scaled_add(bplus * 0.5, &self.jm);
        B *= C64::from(self.factor);
        self.B = B;
        Ok(())
    }
}

impl Perturbation for ZeemanTerm {
    fn dim(&self) -> usize { self.J.num_states() }

    fn cached_matrix(&self) -> &nd::Array2<C64> { &self.B }
}

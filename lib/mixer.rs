//! Tensor-product spaces built from a sequence of subspaces.

use indexmap::IndexMap;
use ndarray::{ self as nd, linalg::kron };
use num_complex::Complex64 as C64;
use crate::error::{ check_square, Error, Result };

/// Address of a subspace, by position or by tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Subspace<'a> {
    Index(usize),
    Tag(&'a str),
}

impl From<usize> for Subspace<'_> {
    fn from(k: usize) -> Self { Self::Index(k) }
}

impl<'a> From<&'a str> for Subspace<'a> {
    fn from(tag: &'a str) -> Self { Self::Tag(tag) }
}

/// Product space `S_0 ⊗ S_1 ⊗ ... ⊗ S_{n-1}`.
///
/// Operators acting on a single factor are embedded in the full space as
/// `1_before ⊗ op ⊗ 1_after`, where `1_before` and `1_after` are identities on
/// the factors preceding and following it.
#[derive(Clone, Debug, Default)]
pub struct SpaceMixer {
    sizes: Vec<usize>,
    tags: IndexMap<String, usize>,
}

impl SpaceMixer {
    /// Create a new, empty product space.
    pub fn new() -> Self { Self::default() }

    /// Append a factor of dimension `size`, optionally tagged, and return its
    /// index.
    ///
    /// Fails if `tag` is already in use.
    pub fn add_subspace(&mut self, size: usize, tag: Option<&str>)
        -> Result<usize>
    {
        let k = self.sizes.len();
        if let Some(tag) = tag {
            if self.tags.contains_key(tag) {
                return Err(Error::DuplicateTag(tag.to_string()));
            }
            self.tags.insert(tag.to_string(), k);
        }
        self.sizes.push(size);
        Ok(k)
    }

    /// Number of factors.
    pub fn num_subspaces(&self) -> usize { self.sizes.len() }

    /// Dimension of the full space.
    pub fn size(&self) -> usize { self.sizes.iter().product() }

    /// Dimension of a single factor.
    pub fn subspace_size<'a, S>(&self, subspace: S) -> Result<usize>
    where S: Into<Subspace<'a>>
    {
        self.index_of(subspace.into()).map(|k| self.sizes[k])
    }

    fn index_of(&self, subspace: Subspace<'_>) -> Result<usize> {
        match subspace {
            Subspace::Index(k) if k < self.sizes.len() => Ok(k),
            Subspace::Index(k) => Err(Error::UnknownSubspace(k.to_string())),
            Subspace::Tag(tag) => {
                self.tags.get(tag).copied()
                    .ok_or_else(|| Error::UnknownSubspace(tag.to_string()))
            },
        }
    }

    /// Embed an operator on a single factor into the full space.
    ///
    /// Fails if the subspace does not exist or `op` is not square with the
    /// factor's dimension.
    pub fn embed<'a, S>(&self, subspace: S, op: &nd::Array2<C64>)
        -> Result<nd::Array2<C64>>
    where S: Into<Subspace<'a>>
    {
        let k = self.index_of(subspace.into())?;
        check_square(self.sizes[k], op.shape())?;
        let before: usize = self.sizes.iter().take(k).product();
        let after: usize = self.sizes.iter().skip(k + 1).product();
        let eye1: nd::Array2<C64> = nd::Array2::eye(before);
        let eye2: nd::Array2<C64> = nd::Array2::eye(after);
        Ok(kron(&kron(&eye1, op), &eye2))
    }
}

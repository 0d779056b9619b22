//! Labels and the patch sites waiting on them.
//!
//! A reference to a label that is not defined yet records the cell it
//! appeared in. When the definition arrives its address is added into
//! every recorded cell and the list is dropped.
use std::collections::HashMap;

use crate::machine::memory::Cell;

pub const MAX_LABEL_LEN: usize = 126;

/// A cell whose operand still needs a label's address.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PatchSite {
    pub address: usize,
    pub line: usize,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Label {
    pub address: Option<usize>,
    pub pending: Vec<PatchSite>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SymbolError {
    Duplicate,
    InvalidName,
    TooMany,
}

/// What a reference resolved to.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Reference {
    Known(usize),
    Deferred,
}

/// Adds a now-known label address into a cell's operand.
pub fn resolve(cell: Cell, address: usize) -> Cell {
    cell + address as Cell
}

#[derive(Clone, Debug)]
pub struct SymbolTable {
    labels: HashMap<String, Label>,
    order: Vec<String>,
    max_len: usize,
    max_labels: Option<usize>,
}

impl SymbolTable {
    pub fn new(max_len: usize, max_labels: Option<usize>) -> Self {
        SymbolTable {
            labels: HashMap::new(),
            order: Vec::new(),
            max_len,
            max_labels,
        }
    }

    /// Defines `name` at `address`. Returns the patch sites that were
    /// waiting on it; the caller applies `resolve` to each.
    pub fn define(&mut self, name: &str, address: usize) -> Result<Vec<PatchSite>, SymbolError> {
        let label = self.entry(name)?;
        if label.address.is_some() {
            return Err(SymbolError::Duplicate);
        }
        label.address = Some(address);
        Ok(std::mem::take(&mut label.pending))
    }

    /// Looks up `name` for use at `site`, recording the site if the
    /// label is not defined yet.
    pub fn reference(&mut self, name: &str, site: PatchSite) -> Result<Reference, SymbolError> {
        let label = self.entry(name)?;
        match label.address {
            Some(address) => Ok(Reference::Known(address)),
            None => {
                label.pending.push(site);
                Ok(Reference::Deferred)
            }
        }
    }

    /// Labels that were referenced but never defined, in first-mention order.
    pub fn unresolved(&self) -> impl Iterator<Item = (&str, &Label)> + '_ {
        self.order.iter().filter_map(move |name| {
            let label = &self.labels[name];
            if label.pending.is_empty() {
                None
            } else {
                Some((name.as_str(), label))
            }
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    fn entry(&mut self, name: &str) -> Result<&mut Label, SymbolError> {
        if name.is_empty() || name.len() > self.max_len {
            return Err(SymbolError::InvalidName);
        }
        if !self.labels.contains_key(name) {
            if let Some(max) = self.max_labels {
                if self.labels.len() >= max {
                    return Err(SymbolError::TooMany);
                }
            }
            trace!("new label `{}`", name);
            self.order.push(name.to_owned());
        }
        Ok(self.labels.entry(name.to_owned()).or_default())
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new(MAX_LABEL_LEN, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(address: usize) -> PatchSite {
        PatchSite { address, line: 1 }
    }

    #[test]
    fn test_backward_reference() {
        let mut table = SymbolTable::default();
        assert_eq!(table.define("start", 4), Ok(vec![]));
        assert_eq!(table.reference("start", site(9)), Ok(Reference::Known(4)));
        assert_eq!(table.unresolved().count(), 0);
    }

    #[test]
    fn test_forward_reference() {
        let mut table = SymbolTable::default();
        assert_eq!(table.reference("end", site(0)), Ok(Reference::Deferred));
        assert_eq!(table.reference("end", site(3)), Ok(Reference::Deferred));
        assert_eq!(table.unresolved().count(), 1);

        assert_eq!(table.define("end", 7), Ok(vec![site(0), site(3)]));
        assert_eq!(table.unresolved().count(), 0);
        assert_eq!(table.reference("end", site(8)), Ok(Reference::Known(7)));
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut table = SymbolTable::default();
        assert!(table.define("a", 0).is_ok());
        assert_eq!(table.define("a", 5), Err(SymbolError::Duplicate));
        assert_eq!(table.reference("a", site(6)), Ok(Reference::Known(0)));
    }

    #[test]
    fn test_unresolved_order() {
        let mut table = SymbolTable::default();
        table.reference("zeta", site(0)).unwrap();
        table.define("mid", 1).unwrap();
        table.reference("alpha", site(2)).unwrap();
        let names: Vec<&str> = table.unresolved().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_limits() {
        let mut table = SymbolTable::new(4, Some(2));
        assert_eq!(table.define("", 0), Err(SymbolError::InvalidName));
        assert_eq!(table.define("toolong", 0), Err(SymbolError::InvalidName));
        assert!(table.define("a", 0).is_ok());
        assert!(table.reference("b", site(1)).is_ok());
        assert_eq!(table.reference("c", site(2)), Err(SymbolError::TooMany));
        assert_eq!(table.reference("a", site(3)), Ok(Reference::Known(0)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve(600, 0), 600);
        assert_eq!(resolve(600, 42), 642);
        assert_eq!(resolve(0, 99), 99);
    }
}

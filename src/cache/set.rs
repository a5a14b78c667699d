use super::block::Line;
use crate::address;

/// One associative set, holding exactly `associativity` ways.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Set {
    lines: Vec<Line>,
}

impl Set {
    #[must_use]
    pub fn new(associativity: usize) -> Self {
        Self {
            lines: vec![Line::default(); associativity],
        }
    }

    #[inline]
    #[must_use]
    pub fn associativity(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    #[must_use]
    pub fn line(&self, way: usize) -> &Line {
        &self.lines[way]
    }

    #[inline]
    pub fn line_mut(&mut self, way: usize) -> &mut Line {
        &mut self.lines[way]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Line> {
        self.lines.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Line> {
        self.lines.iter_mut()
    }

    /// First way holding `tag` for `core_id`.
    #[must_use]
    pub fn find(&self, tag: address, core_id: u32) -> Option<usize> {
        self.lines.iter().position(|line| line.matches(tag, core_id))
    }

    /// First invalid way.
    #[must_use]
    pub fn free_way(&self) -> Option<usize> {
        self.lines.iter().position(|line| !line.is_valid())
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free_way().is_none()
    }

    /// Number of valid ways owned by `core_id`.
    #[must_use]
    pub fn occupancy(&self, core_id: u32) -> usize {
        self.lines
            .iter()
            .filter(|line| line.is_owned_by(core_id))
            .count()
    }
}

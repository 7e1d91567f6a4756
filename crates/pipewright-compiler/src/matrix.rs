//! Matrix job counting
//!
//! Counts the jobs a matrix strategy runs without expanding the strategy in
//! the output: `final = base + include additions - exclude removals`.
//!
//! - `base` is the product of the axis lengths (zero when there are no axes).
//! - An include entry that shares at least one key with the axes and whose
//!   shared values are all axis values lands on existing points and adds
//!   nothing. Any other include entry is a new point and adds one.
//! - Each distinct point of base ∪ includes matched by at least one exclude
//!   entry removes one job. An exclude entry matches a point when the point
//!   agrees on every key the entry names.

use pipewright_core::ast::{MatrixCombination, MatrixSpec};
use pipewright_core::Scalar;
use std::fmt;

/// The arithmetic behind a matrix job count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixCount {
    /// Axis names and lengths, in declaration order
    pub axes: Vec<(String, usize)>,
    pub base: u128,
    pub include_additions: u128,
    pub exclude_removals: u128,
    pub total: u128,
}

impl MatrixCount {
    /// `os=2 × version=3 = 6`
    pub fn product(&self) -> String {
        if self.axes.is_empty() {
            return format!("no axes = {}", self.base);
        }
        let factors: Vec<String> = self
            .axes
            .iter()
            .map(|(name, len)| format!("{}={}", name, len))
            .collect();
        format!("{} = {}", factors.join(" × "), self.base)
    }
}

impl fmt::Display for MatrixCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, +{} include, -{} exclude = {}",
            self.product(),
            self.include_additions,
            self.exclude_removals,
            self.total
        )
    }
}

/// Computes exact job counts of matrix strategies
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixExpander;

impl MatrixExpander {
    pub fn count(spec: &MatrixSpec) -> MatrixCount {
        let axes: Vec<(String, usize)> = spec
            .axes
            .iter()
            .map(|(name, values)| (name.clone(), values.len()))
            .collect();
        let base = if axes.is_empty() {
            0
        } else {
            axes.iter()
                .fold(1u128, |acc, (_, len)| acc.saturating_mul(*len as u128))
        };

        let added = Self::added_includes(spec, base);
        let include_additions = added.len() as u128;

        let base_removed = Self::excluded_base_points(spec, base);
        let include_removed = added
            .iter()
            .filter(|point| spec.exclude.iter().any(|ex| matches(ex, point)))
            .count() as u128;
        let exclude_removals = base_removed + include_removed;

        MatrixCount {
            axes,
            base,
            include_additions,
            exclude_removals,
            total: (base + include_additions).saturating_sub(exclude_removals),
        }
    }

    /// Include entries that introduce a new point, deduplicated
    fn added_includes(spec: &MatrixSpec, base: u128) -> Vec<&MatrixCombination> {
        let mut added: Vec<&MatrixCombination> = Vec::new();
        for entry in &spec.include {
            if base > 0 && lands_on_base(spec, entry) {
                continue;
            }
            if !added.iter().any(|seen| same_point(seen, entry)) {
                added.push(entry);
            }
        }
        added
    }

    /// Distinct base points matched by at least one exclude entry
    fn excluded_base_points(spec: &MatrixSpec, base: u128) -> u128 {
        if base == 0 {
            return 0;
        }
        // An entry naming a key outside the axes matches no base point
        let entries: Vec<Entry<'_>> = spec
            .exclude
            .iter()
            .filter(|ex| ex.keys().all(|k| spec.axes.contains_key(k)))
            .map(|ex| Entry {
                combination: ex,
                end: ex
                    .keys()
                    .filter_map(|k| spec.axes.get_index_of(k))
                    .map(|i| i + 1)
                    .max()
                    .unwrap_or(0),
            })
            .collect();
        if entries.is_empty() {
            return 0;
        }
        let axes: Vec<AxisClasses<'_>> = spec
            .axes
            .iter()
            .map(|(name, values)| AxisClasses::new(name, values, &entries))
            .collect();
        covered(&axes, 0, &entries)
    }
}

/// An exclude entry and one past the last axis it constrains
#[derive(Clone, Copy)]
struct Entry<'a> {
    combination: &'a MatrixCombination,
    end: usize,
}

/// An axis with its values grouped by how exclude entries see them
///
/// Every value some entry names is its own class. The values no entry names
/// are interchangeable and share one class.
struct AxisClasses<'a> {
    name: &'a str,
    /// Class value (`None` for the unnamed rest) and its multiplicity
    classes: Vec<(Option<&'a Scalar>, u128)>,
}

impl<'a> AxisClasses<'a> {
    fn new(name: &'a str, values: &'a [Scalar], entries: &[Entry<'a>]) -> Self {
        let mut named: Vec<&'a Scalar> = Vec::new();
        for entry in entries {
            if let Some(value) = entry.combination.get(name) {
                if !named.contains(&value) {
                    named.push(value);
                }
            }
        }

        let mut classes: Vec<(Option<&'a Scalar>, u128)> = named
            .iter()
            .map(|value| (Some(*value), values.iter().filter(|v| v == value).count() as u128))
            .filter(|(_, weight)| *weight > 0)
            .collect();
        let rest = values.iter().filter(|v| !named.contains(v)).count() as u128;
        if rest > 0 {
            classes.push((None, rest));
        }
        Self { name, classes }
    }

    fn weight(&self) -> u128 {
        self.classes.iter().map(|(_, weight)| weight).sum()
    }
}

/// Points over `axes[depth..]` matched by some entry in `alive`, given that
/// every entry in `alive` agrees with the values chosen for `axes[..depth]`
fn covered(axes: &[AxisClasses<'_>], depth: usize, alive: &[Entry<'_>]) -> u128 {
    if alive.is_empty() {
        return 0;
    }
    if alive.iter().any(|entry| entry.end <= depth) {
        return axes[depth..]
            .iter()
            .fold(1u128, |acc, axis| acc.saturating_mul(axis.weight()));
    }

    let axis = &axes[depth];
    let mut total = 0u128;
    for (value, weight) in &axis.classes {
        let next: Vec<Entry<'_>> = alive
            .iter()
            .filter(|entry| match entry.combination.get(axis.name) {
                Some(wanted) => *value == Some(wanted),
                None => true,
            })
            .copied()
            .collect();
        total = total.saturating_add(weight.saturating_mul(covered(axes, depth + 1, &next)));
    }
    total
}

/// Whether every key the include shares with the axes has an axis value,
/// with at least one key shared
fn lands_on_base(spec: &MatrixSpec, entry: &MatrixCombination) -> bool {
    let mut shared = 0;
    for (key, value) in entry {
        if let Some(values) = spec.axes.get(key) {
            if !values.contains(value) {
                return false;
            }
            shared += 1;
        }
    }
    shared > 0
}

fn same_point(a: &MatrixCombination, b: &MatrixCombination) -> bool {
    a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
}

/// Whether `point` agrees with every key of the exclude entry
fn matches(exclude: &MatrixCombination, point: &MatrixCombination) -> bool {
    exclude.iter().all(|(k, v)| point.get(k) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(n: usize) -> Vec<Scalar> {
        (0..n as i64).map(Scalar::Int).collect()
    }

    fn combo(pairs: &[(&str, Scalar)]) -> MatrixCombination {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn os_version() -> MatrixSpec {
        MatrixSpec::from_axes([
            ("os", vec![Scalar::from("linux"), Scalar::from("macos")]),
            ("version", vec![Scalar::from(1i64), Scalar::from(2i64), Scalar::from(3i64)]),
        ])
    }

    #[test]
    fn test_base_product() {
        let count = MatrixExpander::count(&MatrixSpec::from_axes([("a", axis(17)), ("b", axis(16))]));
        assert_eq!(count.base, 272);
        assert_eq!(count.total, 272);
        assert_eq!(count.product(), "a=17 × b=16 = 272");
    }

    #[test]
    fn test_no_axes() {
        let count = MatrixExpander::count(&MatrixSpec::default());
        assert_eq!(count.total, 0);
    }

    #[test]
    fn test_include_on_existing_point_adds_nothing() {
        let mut spec = os_version();
        spec.include.push(combo(&[("os", "linux".into()), ("experimental", true.into())]));
        assert_eq!(MatrixExpander::count(&spec).total, 6);
    }

    #[test]
    fn test_include_outside_ranges_adds_one() {
        let mut spec = os_version();
        spec.include.push(combo(&[("os", "windows".into()), ("version", 3i64.into())]));
        spec.include.push(combo(&[("os", "windows".into()), ("version", 3i64.into())]));
        spec.include.push(combo(&[("runner", "gpu".into())]));
        let count = MatrixExpander::count(&spec);
        assert_eq!(count.include_additions, 2);
        assert_eq!(count.total, 8);
    }

    #[test]
    fn test_partial_exclude_removes_every_matching_point() {
        let mut spec = os_version();
        spec.exclude.push(combo(&[("os", "macos".into())]));
        let count = MatrixExpander::count(&spec);
        assert_eq!(count.exclude_removals, 3);
        assert_eq!(count.total, 3);
    }

    #[test]
    fn test_overlapping_excludes_count_points_once() {
        let mut spec = os_version();
        spec.exclude.push(combo(&[("os", "macos".into())]));
        spec.exclude.push(combo(&[("os", "macos".into()), ("version", 1i64.into())]));
        spec.exclude.push(combo(&[("version", 9i64.into())]));
        assert_eq!(MatrixExpander::count(&spec).total, 3);
    }

    #[test]
    fn test_exclude_can_remove_an_include() {
        let mut spec = os_version();
        spec.include.push(combo(&[("os", "windows".into()), ("version", 3i64.into())]));
        spec.exclude.push(combo(&[("os", "windows".into())]));
        let count = MatrixExpander::count(&spec);
        assert_eq!(count.include_additions, 1);
        assert_eq!(count.exclude_removals, 1);
        assert_eq!(count.total, 6);
    }

    #[test]
    fn test_large_base_counts_exactly() {
        let mut spec = MatrixSpec::from_axes([("a", axis(300)), ("b", axis(300))]);
        spec.exclude.push(combo(&[("a", 0i64.into())]));
        spec.exclude.push(combo(&[("b", 0i64.into())]));
        let count = MatrixExpander::count(&spec);
        assert_eq!(count.base, 90_000);
        assert_eq!(count.exclude_removals, 599);
    }

    #[test]
    fn test_many_excludes_on_a_large_base() {
        let mut spec = MatrixSpec::from_axes([("a", axis(256)), ("b", axis(257))]);
        for b in 1..=256i64 {
            spec.exclude.push(combo(&[("b", b.into())]));
        }
        let count = MatrixExpander::count(&spec);
        assert_eq!(count.base, 65_792);
        assert_eq!(count.exclude_removals, 65_536);
        assert_eq!(count.total, 256);
    }

    #[test]
    fn test_overlapping_excludes_across_axes() {
        let mut spec = MatrixSpec::from_axes([("a", axis(400)), ("b", axis(400)), ("c", axis(3))]);
        for v in 0..20i64 {
            spec.exclude.push(combo(&[("a", v.into())]));
            spec.exclude.push(combo(&[("b", v.into()), ("c", 0i64.into())]));
        }
        // 20 * 400 * 3 rows of a, plus 380 * 20 * 1 of b/c outside them
        assert_eq!(MatrixExpander::count(&spec).exclude_removals, 24_000 + 7_600);
    }

    #[test]
    fn test_repeated_axis_values_count_separately() {
        let mut spec = MatrixSpec::from_axes([("os", vec![Scalar::from("linux"), Scalar::from("linux"), Scalar::from("macos")])]);
        spec.exclude.push(combo(&[("os", "linux".into())]));
        assert_eq!(MatrixExpander::count(&spec).total, 1);
    }

    #[test]
    fn test_exclude_outside_axes_removes_nothing() {
        let mut spec = os_version();
        spec.exclude.push(combo(&[("arch", "arm64".into())]));
        spec.exclude.push(combo(&[("os", "linux".into()), ("arch", "arm64".into())]));
        assert_eq!(MatrixExpander::count(&spec).total, 6);
    }

    #[test]
    fn test_empty_exclude_removes_everything() {
        let mut spec = os_version();
        spec.exclude.push(MatrixCombination::new());
        assert_eq!(MatrixExpander::count(&spec).total, 0);
    }

    #[test]
    fn test_display_shows_arithmetic() {
        let mut spec = os_version();
        spec.exclude.push(combo(&[("os", "macos".into()), ("version", 1i64.into())]));
        assert_eq!(
            MatrixExpander::count(&spec).to_string(),
            "os=2 × version=3 = 6, +0 include, -1 exclude = 5"
        );
    }
}

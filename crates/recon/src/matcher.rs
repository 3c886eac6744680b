use std::collections::BTreeMap;

use crate::aggregate::Group;

/// Leading key parts shared by both sides: (dealer code, site code).
pub const JOIN_KEY_PARTS: usize = 2;

/// One target group paired with one actual group on the same codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedPair<'a> {
    pub target: &'a Group,
    pub actual: &'a Group,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinOutput<'a> {
    pub matched: Vec<JoinedPair<'a>>,
    pub target_only: Vec<&'a Group>,
    pub actual_only: Vec<&'a Group>,
}

fn codes(group: &Group) -> &[String] {
    &group.key[..JOIN_KEY_PARTS.min(group.key.len())]
}

/// Inner join on the first [`JOIN_KEY_PARTS`] key parts.
///
/// Actual groups may carry extra key parts (display names); a target group
/// pairs with every actual group sharing its codes. Output follows target
/// key order, then actual key order.
pub fn join_on_codes<'a>(target: &'a [Group], actual: &'a [Group]) -> JoinOutput<'a> {
    let mut actual_map: BTreeMap<&[String], Vec<&'a Group>> = BTreeMap::new();
    for group in actual {
        actual_map.entry(codes(group)).or_default().push(group);
    }
    let target_map: BTreeMap<&[String], &'a Group> =
        target.iter().map(|g| (codes(g), g)).collect();

    let mut out = JoinOutput::default();
    for (key, &target_group) in &target_map {
        match actual_map.get(key) {
            Some(actual_groups) => out.matched.extend(actual_groups.iter().map(|&a| JoinedPair {
                target: target_group,
                actual: a,
            })),
            None => out.target_only.push(target_group),
        }
    }
    for (key, actual_groups) in &actual_map {
        if !target_map.contains_key(key) {
            out.actual_only.extend(actual_groups.iter().copied());
        }
    }
    out
}

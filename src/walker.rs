use crate::node::NodePath;
use log::trace;
use serde_yaml::{Mapping, Value};

/// Calls `visitor` for every mapping-valued entry below `root`, parents
/// before children, in document order.
pub fn walk<F>(root: &Mapping, mut visitor: F)
where
    F: FnMut(&Mapping, &NodePath),
{
    walk_at(root, &NodePath::root(), &mut visitor);
}

fn walk_at<F>(node: &Mapping, path: &NodePath, visitor: &mut F)
where
    F: FnMut(&Mapping, &NodePath),
{
    for (key, value) in node {
        if let Some(child) = value.as_mapping() {
            let child_path = path.child(key.clone());
            visitor(child, &child_path);
            walk_at(child, &child_path, visitor);
        }
    }
}

/// Same traversal as [`walk`], but an entry for which `visitor` returns
/// `true` is removed from its parent and its subtree is not visited.
/// Returns the number of entries removed.
pub fn filter<F>(root: &mut Mapping, mut visitor: F) -> usize
where
    F: FnMut(&Mapping, &NodePath) -> bool,
{
    let mut removed = 0;
    filter_at(root, &NodePath::root(), &mut visitor, &mut removed);
    removed
}

fn filter_at<F>(node: &mut Mapping, path: &NodePath, visitor: &mut F, removed: &mut usize)
where
    F: FnMut(&Mapping, &NodePath) -> bool,
{
    // Keys are snapshotted since entries may be removed while iterating.
    let keys: Vec<Value> = node.keys().cloned().collect();

    for key in keys {
        let child_path = path.child(key.clone());
        let drop = match node.get(&key).and_then(Value::as_mapping) {
            Some(child) => visitor(child, &child_path),
            None => continue,
        };

        if drop {
            node.shift_remove(&key);
            *removed += 1;
            trace!("filtered out {child_path}");
        } else if let Some(Value::Mapping(child)) = node.get_mut(&key) {
            filter_at(child, &child_path, visitor, removed);
        }
    }
}

/// Returns a filtered copy of `root`, leaving the original untouched.
#[must_use]
pub fn pruned<F>(root: &Mapping, visitor: F) -> Mapping
where
    F: FnMut(&Mapping, &NodePath) -> bool,
{
    let mut copy = root.clone();
    filter(&mut copy, visitor);
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(source: &str) -> Mapping {
        serde_yaml::from_str(source).unwrap()
    }

    const TREE: &str = r"
title: Shop
/widgets:
  description: w
  get:
    responses:
      200:
        body: {}
  /{id}:
    delete: {}
/orders:
  post: {}
";

    #[test]
    fn test_walk_visits_every_mapping_once() {
        let root = mapping(TREE);
        let mut seen = Vec::new();
        walk(&root, |_, path| seen.push(path.to_string()));

        assert_eq!(
            seen,
            vec![
                "/widgets",
                "/widgets > get",
                "/widgets > get > responses",
                "/widgets > get > responses > 200",
                "/widgets > get > responses > 200 > body",
                "/widgets > /{id}",
                "/widgets > /{id} > delete",
                "/orders",
                "/orders > post",
            ]
        );
    }

    #[test]
    fn test_filter_never_visits_removed_subtree() {
        let mut root = mapping(TREE);
        let mut seen = Vec::new();
        let removed = filter(&mut root, |_, path| {
            seen.push(path.to_string());
            path.to_string() == "/widgets"
        });

        assert_eq!(removed, 1);
        assert_eq!(seen, vec!["/widgets", "/orders", "/orders > post"]);
        assert!(!root.contains_key("/widgets"));
        assert!(root.contains_key("/orders"));
    }

    #[test]
    fn test_filter_removes_adjacent_siblings() {
        let mut root = mapping("a: {x: {}}\nb: {}\nc: {}\nd: 1\n");
        let removed = filter(&mut root, |node, _| node.is_empty());

        assert_eq!(removed, 3);
        let keys: Vec<&str> = root.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["a", "d"]);
    }

    #[test]
    fn test_filter_keeps_sibling_order() {
        let mut root = mapping("a: {}\nb: 1\nc: {k: v}\nd: 2\n");
        filter(&mut root, |_, path| path.to_string() == "a");
        let keys: Vec<&str> = root.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_pruned_leaves_source_untouched() {
        let root = mapping(TREE);
        let copy = pruned(&root, |_, path| path.len() == 1);
        assert_eq!(copy.len(), 1);
        assert!(copy.contains_key("title"));
        assert_eq!(root.len(), 3);
    }
}

use schedule_engine::{Hierarchy, ScheduleError, TreeNode};
use std::cmp::Ordering;

const ROOT: TreeNode = TreeNode::SyntheticRoot;

// 1
//   2
//     4
//   3
// 5
fn sample_tree() -> Hierarchy {
    let mut tree = Hierarchy::new();
    tree.insert(1, ROOT, None).unwrap();
    tree.insert(2, TreeNode::Task(1), None).unwrap();
    tree.insert(3, TreeNode::Task(1), None).unwrap();
    tree.insert(4, TreeNode::Task(2), None).unwrap();
    tree.insert(5, ROOT, None).unwrap();
    tree
}

#[test]
fn children_and_descendants() {
    let tree = sample_tree();
    assert_eq!(tree.children(ROOT), &[1, 5]);
    assert_eq!(tree.children(TreeNode::Task(1)), &[2, 3]);
    assert!(tree.children(TreeNode::Task(4)).is_empty());
    assert_eq!(tree.descendants(TreeNode::Task(1)), vec![2, 4, 3]);
    assert_eq!(tree.pre_order(), vec![1, 2, 4, 3, 5]);
    assert_eq!(tree.parent(4), Some(2));
    assert_eq!(tree.parent(1), None);
    assert_eq!(tree.ancestors(4), vec![2, 1]);
}

#[test]
fn outline_path_and_depth() {
    let tree = sample_tree();
    assert_eq!(tree.outline_path(4), vec![1, 1, 1]);
    assert_eq!(tree.outline_path(3), vec![1, 2]);
    assert_eq!(tree.outline_path(5), vec![2]);
    assert_eq!(tree.depth(ROOT), 0);
    assert_eq!(tree.depth(TreeNode::Task(1)), 1);
    assert_eq!(tree.depth(TreeNode::Task(4)), 3);
}

#[test]
fn document_order_follows_pre_order() {
    let tree = sample_tree();
    assert_eq!(tree.document_order(4, 3), Ordering::Less);
    assert_eq!(tree.document_order(5, 4), Ordering::Greater);
    assert_eq!(tree.document_order(3, 3), Ordering::Equal);
}

#[test]
fn move_under_own_descendant_is_rejected() {
    let mut tree = sample_tree();
    let before = tree.pre_order();

    let err = tree.move_to(1, TreeNode::Task(4), 0).unwrap_err();
    assert!(matches!(err, ScheduleError::CycleDetected(_)));
    let err = tree.move_to(1, TreeNode::Task(1), 0).unwrap_err();
    assert!(matches!(err, ScheduleError::CycleDetected(_)));

    assert_eq!(tree.pre_order(), before);
    assert_eq!(tree.outline_path(4), vec![1, 1, 1]);
}

#[test]
fn move_reports_old_and_new_ancestors() {
    let mut tree = sample_tree();
    let affected = tree.move_to(4, TreeNode::Task(5), 0).unwrap();
    assert!(affected.contains(&4));
    assert!(affected.contains(&2));
    assert!(affected.contains(&1));
    assert!(affected.contains(&5));
    assert_eq!(tree.children(TreeNode::Task(5)), &[4]);
    assert!(!tree.has_children(2));
}

#[test]
fn move_renumbers_siblings() {
    let mut tree = sample_tree();
    tree.move_to(3, ROOT, 0).unwrap();
    assert_eq!(tree.pre_order(), vec![3, 1, 2, 4, 5]);
    assert_eq!(tree.outline_path(1), vec![2]);
    assert_eq!(tree.outline_path(4), vec![2, 1, 1]);
    assert_eq!(tree.document_order(3, 1), Ordering::Less);
}

#[test]
fn move_index_is_clamped() {
    let mut tree = sample_tree();
    tree.move_to(4, ROOT, 99).unwrap();
    assert_eq!(tree.children(ROOT), &[1, 5, 4]);
}

#[test]
fn remove_requires_a_leaf() {
    let mut tree = sample_tree();
    let err = tree.remove(2).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::HasDependents {
            task: 2,
            references: 1
        }
    );
    tree.remove(4).unwrap();
    tree.remove(2).unwrap();
    assert_eq!(tree.outline_path(3), vec![1, 1]);
    assert!(!tree.contains(2));
}

#[test]
fn insert_checks_identity_and_parent() {
    let mut tree = sample_tree();
    assert_eq!(
        tree.insert(3, ROOT, None).unwrap_err(),
        ScheduleError::AlreadyInHierarchy(3)
    );
    assert_eq!(
        tree.insert(9, TreeNode::Task(77), None).unwrap_err(),
        ScheduleError::TaskNotFound(77)
    );
    tree.insert(9, TreeNode::Task(1), Some(0)).unwrap();
    assert_eq!(tree.children(TreeNode::Task(1)), &[9, 2, 3]);
}

#[test]
fn breadth_first_visits_level_by_level() {
    let tree = sample_tree();
    assert_eq!(tree.breadth_first(ROOT), vec![1, 5, 2, 3, 4]);
    assert_eq!(tree.breadth_first(TreeNode::Task(1)), vec![2, 3, 4]);
}

#[test]
fn breadth_first_search_prunes_subtrees() {
    let tree = sample_tree();
    let mut seen = Vec::new();
    tree.breadth_first_search(ROOT, |_, task| {
        seen.push(task);
        task != 2
    });
    assert_eq!(seen, vec![1, 5, 2, 3]);
}

#[test]
fn sort_keeps_expand_state_by_id() {
    let mut tree = sample_tree();
    tree.set_expanded(2, false).unwrap();
    tree.sort_by(|a, b| b.cmp(&a));

    assert_eq!(tree.children(ROOT), &[5, 1]);
    assert_eq!(tree.children(TreeNode::Task(1)), &[3, 2]);
    assert_eq!(tree.outline_path(2), vec![2, 2]);
    assert!(!tree.is_expanded(2));
    assert!(tree.is_expanded(1));
}

#[test]
fn relation_queries() {
    let tree = sample_tree();
    assert!(tree.is_ancestor(1, 4));
    assert!(!tree.is_ancestor(4, 1));
    assert!(!tree.are_unrelated(1, 4));
    assert!(tree.are_unrelated(3, 4));
    assert!(tree.are_unrelated(5, 2));
}
